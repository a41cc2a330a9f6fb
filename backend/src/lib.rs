pub mod catchers;
pub mod config;
pub mod cors;
pub mod error;
pub mod routes;
pub mod store;
pub use shared::{models::*, error::*, validation::*};

#[cfg(test)]
mod tests;
