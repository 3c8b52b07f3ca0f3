use rocket::{Request, catch, serde::json::Json};
use shared::{ErrorCode, ErrorResponse};

fn body(error: &str, code: ErrorCode) -> Json<ErrorResponse> {
    Json(ErrorResponse { error: error.into(), code })
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorResponse> {
    body("Invalid request parameters.", ErrorCode::ValidationFailed)
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> Json<ErrorResponse> {
    body("Authentication required.", ErrorCode::Unauthenticated)
}

#[catch(403)]
pub fn forbidden(_req: &Request) -> Json<ErrorResponse> {
    body("Access forbidden.", ErrorCode::Forbidden)
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorResponse> {
    body("The requested resource was not found.", ErrorCode::NotFound)
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ErrorResponse> {
    body("Malformed request body.", ErrorCode::ValidationFailed)
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorResponse> {
    body("An internal server error occurred.", ErrorCode::SystemError)
}
