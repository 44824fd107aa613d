//! HTTP surface on top of hyper
//!
//! Common response helpers and type aliases shared by every handler.

pub mod connection;
pub mod files;
pub mod ingest;
pub mod router;
pub mod status;
pub mod timeout;

pub use connection::handle_connection;
pub use router::{route, Route};
pub use timeout::TimedIo;

use bytes::Bytes;
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

/// Response body: either a buffered payload or a streamed file
pub type RespBody = UnsyncBoxBody<Bytes, std::io::Error>;
pub type Req = Request<hyper::body::Incoming>;
pub type Resp = Response<RespBody>;

/// Create a response body from any data that can be converted to Bytes
pub fn body_from<T: Into<Bytes>>(data: T) -> RespBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed_unsync()
}

/// Serialize `value` as a JSON response with the given status
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Resp {
    match serde_json::to_vec(value) {
        Ok(body) => json_bytes_response(status, body),
        Err(e) => internal_server_error_response(&e.to_string()),
    }
}

/// Like [`json_response`], but indented for humans
pub fn pretty_json_response<T: Serialize>(status: StatusCode, value: &T) -> Resp {
    match serde_json::to_vec_pretty(value) {
        Ok(body) => json_bytes_response(status, body),
        Err(e) => internal_server_error_response(&e.to_string()),
    }
}

fn json_bytes_response(status: StatusCode, body: Vec<u8>) -> Resp {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Content-Length", body.len())
        .body(body_from(body))
        .expect("valid HTTP response")
}

/// Create a JSON error response with given status code
pub fn json_error_response(status: StatusCode, error: &str, message: &str) -> Resp {
    json_response(
        status,
        &serde_json::json!({
            "error": error,
            "message": message
        }),
    )
}

pub fn not_found_response(path: &str) -> Resp {
    json_error_response(StatusCode::NOT_FOUND, "not_found", &format!("{} not found", path))
}

pub fn internal_server_error_response(context: &str) -> Resp {
    json_error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_server_error",
        &format!("Internal server error: {}", context),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Resp) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let resp = json_error_response(StatusCode::SERVICE_UNAVAILABLE, "busy", "queue full");
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.headers()["content-type"], "application/json");
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"error": "busy", "message": "queue full"})
        );
    }

    #[tokio::test]
    async fn test_content_length_matches_body() {
        let resp = json_response(StatusCode::OK, &serde_json::json!({"status": "success"}));
        let declared: usize =
            resp.headers()["content-length"].to_str().unwrap().parse().unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(declared, bytes.len());
        assert_eq!(&bytes[..], br#"{"status":"success"}"#);
    }
}
