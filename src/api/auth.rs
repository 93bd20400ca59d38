use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

use crate::api::error::{error_response, ApiError};
use crate::config::AuthConfig;
use crate::error::CatalogError;

const DEVELOPMENT_SUBJECT: &str = "cerebrum-development";

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject claim issued by the identity provider.
    pub subject: String,
    pub roles: Vec<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Caller used for every request when authentication is switched off.
    pub fn development() -> Self {
        Self {
            subject: DEVELOPMENT_SUBJECT.to_string(),
            roles: Vec::new(),
            email: None,
            name: Some("Development User".to_string()),
        }
    }
}

/// Verifies HS256 bearer tokens and applies the write-role rule.
pub struct TokenVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
    roles_claim: String,
    write_role: Option<String>,
}

impl TokenVerifier {
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let Some(secret) = config.jwt_secret.as_deref().filter(|s| !s.is_empty()) else {
            anyhow::bail!("auth.jwt_secret must be set when authentication is enabled");
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            key: Some(DecodingKey::from_secret(secret.as_bytes())),
            validation,
            roles_claim: config.roles_claim.clone(),
            write_role: config.write_role.clone(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            key: None,
            validation: Validation::new(Algorithm::HS256),
            roles_claim: String::new(),
            write_role: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn verify(&self, token: &str) -> Result<Principal, CatalogError> {
        let Some(key) = &self.key else {
            return Ok(Principal::development());
        };
        let claims = jsonwebtoken::decode::<Value>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                CatalogError::Unauthorized(format!("invalid bearer token: {}", e))
            })?;

        let subject = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CatalogError::Unauthorized("token carries no subject".to_string()))?;

        Ok(Principal {
            subject: subject.to_string(),
            roles: roles_at(&claims, &self.roles_claim),
            email: claims.get("email").and_then(Value::as_str).map(str::to_string),
            name: claims.get("name").and_then(Value::as_str).map(str::to_string),
        })
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, CatalogError> {
        if !self.is_enabled() {
            return Ok(Principal::development());
        }
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| CatalogError::Unauthorized("missing bearer token".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CatalogError::Unauthorized("missing bearer token".to_string()))?;
        self.verify(token)
    }

    pub fn authorize_write(&self, principal: &Principal) -> Result<(), CatalogError> {
        match &self.write_role {
            Some(role) if self.is_enabled() && !principal.has_role(role) => Err(
                CatalogError::Forbidden(format!("role '{}' is required", role)),
            ),
            _ => Ok(()),
        }
    }
}

/// Reads the role list at a dotted claim path. Arrays of strings and
/// space-separated strings are both accepted.
fn roles_at(claims: &Value, path: &str) -> Vec<String> {
    let mut current = claims;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    match current {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Any authenticated caller.
#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);
        verifier.authenticate(&parts.headers).map_err(error_response)
    }
}

/// An authenticated caller allowed to mutate the catalog.
#[derive(Debug, Clone)]
pub struct Writer(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Writer
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);
        let principal = verifier.authenticate(&parts.headers).map_err(error_response)?;
        verifier.authorize_write(&principal).map_err(error_response)?;
        Ok(Writer(principal))
    }
}
