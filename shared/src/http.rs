//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{ErrorBody, Issue};
use crate::Error;

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create an empty response (e.g. 204).
pub fn empty_response(status: u16) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder().status(status).body(Body::Empty)?)
}

/// Create an error response with a machine-readable code.
pub fn error_response(status: u16, code: &str) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ErrorBody::new(code))
}

/// 400 with the invalid fields listed.
pub fn bad_request(issues: Vec<Issue>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(400, &ErrorBody::new("BAD_REQUEST").with_issues(issues))
}

/// Map a crate error to a status and the given code.
pub fn failure_response(error: &Error, code: &str) -> Result<Response<Body>, lambda_http::Error> {
    let status = error.status_code();
    let code = if status == 400 { "BAD_REQUEST" } else { code };
    json_response(status, &ErrorBody::new(code).with_message(error.to_string()))
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    let bytes: &[u8] = body.as_ref();
    let bytes = if bytes.is_empty() { b"{}".as_slice() } else { bytes };

    match serde_json::from_slice(bytes) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = json_response(
                400,
                &ErrorBody::new("BAD_REQUEST").with_message(format!("Invalid request body: {}", e)),
            )?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: ChatRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match shared::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRequest;

    #[test]
    fn test_bad_body_is_400() {
        let parsed = parse_json_body::<ChatRequest>(&Body::from("not json")).unwrap();
        assert_eq!(parsed.unwrap_err().status(), 400);
    }

    #[test]
    fn test_empty_body_parses_as_empty_object() {
        let parsed = parse_json_body::<crate::models::SummaryRequest>(&Body::Empty).unwrap();
        let request = parsed.unwrap();
        assert!(request.session_id.is_none());
        assert!(request.transcript.is_none());
    }

    #[test]
    fn test_failure_response_status() {
        let response = failure_response(&Error::Internal("boom".into()), "SUMMARY_ERROR").unwrap();
        assert_eq!(response.status(), 500);
        let response =
            failure_response(&Error::Validation("missing".into()), "SUMMARY_ERROR").unwrap();
        assert_eq!(response.status(), 400);
    }
}
