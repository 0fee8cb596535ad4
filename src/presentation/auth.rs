// Request identity supplied by the authenticating reverse proxy
use crate::application::contribution_fetcher::Credential;
use crate::presentation::error::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

pub const FORWARDED_USER: &str = "x-forwarded-user";
pub const FORWARDED_ACCESS_TOKEN: &str = "x-forwarded-access-token";

/// The logged-in account and, when forwarded, its access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub login: String,
    pub credential: Option<Credential>,
}

impl AuthenticatedUser {
    /// Imports act on the user's behalf and need their token.
    pub fn require_credential(&self) -> Result<&Credential, AppError> {
        self.credential
            .as_ref()
            .ok_or_else(|| AppError::Unauthenticated("missing forwarded access token".to_string()))
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let login = header_value(&parts.headers, FORWARDED_USER)
            .ok_or_else(|| AppError::Unauthenticated("missing forwarded user".to_string()))?;
        let credential = header_value(&parts.headers, FORWARDED_ACCESS_TOKEN).map(Credential::new);

        Ok(AuthenticatedUser {
            login: login.to_string(),
            credential,
        })
    }
}
