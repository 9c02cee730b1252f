use actix_web::dev::{Payload, ServiceRequest};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use actix_web_httpauth::extractors::bearer::{BearerAuth, Config};
use actix_web_httpauth::extractors::AuthenticationError;
use actix_web_httpauth::middleware::HttpAuthentication;
use std::future::{ready, Ready};

use crate::api::{ApiError, ApiState};

pub const WORKSPACE_HEADER: &str = "X-Workspace-Id";
pub const USER_HEADER: &str = "X-User-Id";

type Validator = fn(ServiceRequest, BearerAuth) -> Ready<Result<ServiceRequest, (Error, ServiceRequest)>>;

pub fn create_auth_middleware() -> HttpAuthentication<BearerAuth, Validator> {
    HttpAuthentication::bearer(validator)
}

/// Tenant and user the request acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub tenant_id: String,
    pub user_id: String,
}

fn token_matches(expected: &str, presented: &str) -> bool {
    !expected.is_empty() && blake3::hash(expected.as_bytes()) == blake3::hash(presented.as_bytes())
}

fn header(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validator(req: ServiceRequest, credentials: BearerAuth) -> Ready<Result<ServiceRequest, (Error, ServiceRequest)>> {
    let expected = req
        .app_data::<web::Data<ApiState>>()
        .map(|state| state.api_token.clone())
        .unwrap_or_default();

    if expected.is_empty() {
        tracing::error!("No API token configured, rejecting request");
    }
    if !token_matches(&expected, credentials.token()) {
        let config = req.app_data::<Config>().cloned().unwrap_or_default();
        return ready(Err((AuthenticationError::from(config).into(), req)));
    }

    let (tenant_id, user_id) = match (header(&req, WORKSPACE_HEADER), header(&req, USER_HEADER)) {
        (Some(tenant_id), Some(user_id)) => (tenant_id, user_id),
        _ => {
            let err = ApiError::bad_request(format!(
                "{} and {} headers are required",
                WORKSPACE_HEADER, USER_HEADER
            ));
            return ready(Err((err.into(), req)));
        }
    };

    req.extensions_mut().insert(Caller { tenant_id, user_id });
    ready(Ok(req))
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Caller>()
                .cloned()
                .ok_or_else(|| ApiError::unauthorized("missing caller identity")),
        )
    }
}
