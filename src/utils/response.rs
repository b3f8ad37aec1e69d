use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

fn respond<T>(status: StatusCode, data: Option<T>, message: String, count: Option<usize>) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        success: true,
        data,
        message: Some(message),
        count,
    };
    (status, Json(body)).into_response()
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    respond(StatusCode::OK, Some(data), message.into(), None)
}

pub fn created<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    respond(StatusCode::CREATED, Some(data), message.into(), None)
}

/// Success response for list endpoints, with the item count alongside.
pub fn listed<T>(items: Vec<T>, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    let count = items.len();
    respond(StatusCode::OK, Some(items), message.into(), Some(count))
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}
