use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

use crate::core::{DocumentError, ErrorKind};

#[derive(Debug)]
pub struct ApiError {
    kind: &'static str,
    message: String,
    status_code: StatusCode,
}

impl ApiError {
    pub fn new(kind: &'static str, message: impl Into<String>, status_code: StatusCode) -> Self {
        ApiError {
            kind,
            message: message.into(),
            status_code,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new("internal", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("validation", message, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message, StatusCode::NOT_FOUND)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message, StatusCode::UNAUTHORIZED)
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code).json(serde_json::json!({
            "ok": false,
            "error": {
                "kind": self.kind,
                "message": self.message,
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        let (kind, status) = match err.kind() {
            ErrorKind::NotFound => ("not_found", StatusCode::NOT_FOUND),
            ErrorKind::Validation => ("validation", StatusCode::BAD_REQUEST),
            ErrorKind::Generation => ("generation", StatusCode::INTERNAL_SERVER_ERROR),
            ErrorKind::Storage => ("storage", StatusCode::INTERNAL_SERVER_ERROR),
        };
        ApiError::new(kind, err.to_string(), status)
    }
}

impl From<prometheus::Error> for ApiError {
    fn from(err: prometheus::Error) -> Self {
        ApiError::internal_server_error(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    #[test]
    fn document_errors_map_to_status_codes() {
        let cases = [
            (DocumentError::TemplateNotFound("x".into()), StatusCode::NOT_FOUND),
            (DocumentError::MissingSections(vec!["a".into()]), StatusCode::BAD_REQUEST),
            (DocumentError::Generation("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DocumentError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn envelope_carries_kind_and_message() {
        let err = ApiError::from(DocumentError::MissingSections(vec!["parties".into()]));
        let body = err.error_response().into_body().try_into_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["kind"], "validation");
        assert_eq!(json["error"]["message"], "missing required sections: parties");
    }
}
