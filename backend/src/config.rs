use std::net::SocketAddr;
use rocket::figment::Figment;
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:1080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub const LISTEN_ADDR_VAR: &str = "VOTER_API_LISTEN_ADDR";
pub const STORE_VAR: &str = "VOTER_API_STORE";
pub const DATABASE_URL_VAR: &str = "VOTER_API_DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "VOTER_API_MAX_CONNECTIONS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid listen address {0:?}")]
    InvalidListenAddr(String),
    #[error("Unknown store {0:?} (expected \"memory\" or \"postgres\")")]
    UnknownStore(String),
    #[error("{DATABASE_URL_VAR} must be set when the postgres store is selected")]
    MissingDatabaseUrl,
    #[error("Invalid max connections {0:?}")]
    InvalidMaxConnections(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Postgres { database_url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen = get(LISTEN_ADDR_VAR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into());
        let listen_addr = listen.trim()
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(listen.clone()))?;

        let store = match get(STORE_VAR).as_deref().map(str::trim) {
            None | Some("memory") => StoreConfig::Memory,
            Some("postgres") => {
                let database_url = get(DATABASE_URL_VAR).ok_or(ConfigError::MissingDatabaseUrl)?;
                let max_connections = match get(MAX_CONNECTIONS_VAR) {
                    Some(raw) => raw.trim()
                        .parse()
                        .ok()
                        .filter(|&n: &u32| n > 0)
                        .ok_or(ConfigError::InvalidMaxConnections(raw))?,
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                StoreConfig::Postgres { database_url, max_connections }
            }
            Some(other) => return Err(ConfigError::UnknownStore(other.to_string())),
        };

        Ok(Self { listen_addr, store })
    }

    /// Rocket configuration bound to the listen address.
    pub fn figment(&self) -> Figment {
        rocket::Config::figment()
            .merge(("address", self.listen_addr.ip()))
            .merge(("port", self.listen_addr.port()))
    }
}
