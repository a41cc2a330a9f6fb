use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorCode, ErrorResponse, ValidationError};
use thiserror::Error;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Store(StoreError::NotFound(_)) => Status::NotFound,
            ApiError::Store(StoreError::PollNotFound { .. }) => Status::NotFound,
            ApiError::Store(StoreError::AlreadyExists(_)) => Status::Conflict,
            ApiError::Store(StoreError::DuplicatePoll { .. }) => Status::Conflict,
            ApiError::Store(StoreError::StorageUnavailable(_)) => Status::ServiceUnavailable,
            ApiError::Store(StoreError::Internal(_)) => Status::InternalServerError,
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::InvalidBody(_) => Status::BadRequest,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Store(e) => e.code(),
            ApiError::Validation(_) | ApiError::InvalidBody(_) => ErrorCode::InvalidInput,
        }
    }
}

impl From<rocket::serde::json::Error<'_>> for ApiError {
    fn from(e: rocket::serde::json::Error<'_>) -> Self {
        ApiError::InvalidBody(e.to_string())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let body = Json(ErrorResponse::with_code(self.code(), self.to_string()));

        rocket::Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}
