//! Path parameter parsing

use crate::ApiError;

/// Parse a worker port from a path segment.
///
/// # Errors
/// Returns `ApiError::BadRequest` for anything that is not an integer in
/// `1..=65535`.
pub fn parse_port(s: &str) -> Result<u16, ApiError> {
    match s.parse::<u16>() {
        Ok(0) | Err(_) => Err(ApiError::bad_request(format!(
            "Invalid port '{s}': expected a number between 1 and 65535"
        ))),
        Ok(port) => Ok(port),
    }
}
