use rocket::{Request, catch, serde::json::Json};
use shared::{ErrorCode, ErrorResponse};

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::with_code(ErrorCode::InvalidInput, "Invalid request parameters."))
}

#[catch(404)]
pub fn not_found(req: &Request) -> Json<ErrorResponse> {
    let error_msg = match req.uri().path().segments().next() {
        Some("voters") => "No such voter resource.",
        _ => "The requested resource was not found."
    };

    Json(ErrorResponse::new(error_msg))
}

#[catch(422)]
pub fn unprocessable_entity(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::with_code(ErrorCode::InvalidInput, "Voter and poll ids must be non-negative integers."))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::with_code(ErrorCode::SystemError, "An internal server error occurred."))
}

#[catch(503)]
pub fn service_unavailable(_req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::with_code(ErrorCode::StorageUnavailable, "Voter storage is unavailable."))
}
