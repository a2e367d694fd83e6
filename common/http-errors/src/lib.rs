use axum::{http::{header::CONTENT_TYPE, HeaderValue, StatusCode}, response::{IntoResponse, Response}, Json};
use serde::Serialize;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, message: Option<String> },
    NotFound { code: &'static str },
    /// Backing store could not answer; body is the raw error text.
    StoreUnavailable { message: String },
    Internal { message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self { Self::Internal { message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str) -> Self { Self::BadRequest { code, message: None } }
    pub fn store_unavailable<E: std::fmt::Display>(e: E) -> Self { Self::StoreUnavailable { message: e.to_string() } }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } => *code,
            ApiError::NotFound { code } => *code,
            ApiError::StoreUnavailable { .. } => "store_unavailable",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest { code, message: Some(m) } => write!(f, "{code}: {m}"),
            ApiError::StoreUnavailable { message } => f.write_str(message),
            ApiError::Internal { message: Some(m) } => write!(f, "internal_error: {m}"),
            other => f.write_str(other.code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_code = self.code();
        let mut resp = match self {
            ApiError::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody { code: code.into(), message }),
            ).into_response(),
            ApiError::NotFound { code } => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody { code: code.into(), message: None }),
            ).into_response(),
            ApiError::StoreUnavailable { message } => {
                let mut r = (StatusCode::INTERNAL_SERVER_ERROR, format!("{message}\n")).into_response();
                r.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
                r
            }
            ApiError::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody { code: "internal_error".into(), message }),
            ).into_response(),
        };
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
