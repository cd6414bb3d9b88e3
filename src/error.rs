use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound,
    #[error("{0}")] InvalidArgument(String),
    #[error("{0}")] Forbidden(String),
    #[error("{0}")] Conflict(String),
    #[error("too many requests, slow down")] RateLimited,
    #[error("internal error")] Internal,
}

impl ApiError {
    /// Machine-stable code carried in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "not_found",
            ApiError::InvalidArgument(_) => "invalid_argument",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::RateLimited => "rate_limited",
            ApiError::Internal => "internal",
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound => ApiError::NotFound,
            LedgerError::InvalidArgument(msg) => ApiError::InvalidArgument(msg),
            LedgerError::Forbidden(msg) => ApiError::Forbidden(msg.to_string()),
            e @ LedgerError::Conflict => ApiError::Conflict(e.to_string()),
            LedgerError::Internal => ApiError::Internal,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        LedgerError::from(e).into()
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody { error: self.code(), message: self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn ledger_errors_map_to_status_and_code() {
        let cases = [
            (ApiError::from(LedgerError::NotFound), 404, "not_found"),
            (ApiError::from(LedgerError::InvalidArgument("bad".into())), 400, "invalid_argument"),
            (ApiError::from(LedgerError::Forbidden("nope")), 403, "forbidden"),
            (ApiError::from(LedgerError::Conflict), 409, "conflict"),
            (ApiError::from(RepoError::Internal("disk".into())), 500, "internal"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code().as_u16(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[actix_web::test]
    async fn internal_detail_is_not_leaked() {
        let resp = ApiError::from(RepoError::Internal("password=hunter2".into())).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal");
        assert_eq!(json["message"], "internal error");
    }
}
