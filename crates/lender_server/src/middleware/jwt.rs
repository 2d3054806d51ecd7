//! Bearer-token authentication.
//!
//! Verifies an HS256 token, loads the principal named by its `uid` claim and
//! inserts `Principal` and `DataScope` as request extensions.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use lender_core::error::LenderError;
use lender_core::principal::JwtClaims;
use lender_core::LenderService;

use crate::error::AppError;

#[derive(Clone)]
pub struct JwtConfig {
    key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signature and `exp` are both checked.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, LenderError> {
        decode::<JwtClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                unauthorized()
            })
    }
}

fn unauthorized() -> LenderError {
    LenderError::Unauthenticated("Unauthorized".into())
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    Extension(service): Extension<Arc<LenderService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or_else(unauthorized)?;
    let claims = config.verify(token)?;

    let principal = service
        .principals()
        .find_principal(claims.uid)
        .await?
        .ok_or_else(|| {
            tracing::warn!(principal_id = claims.uid, "token names an unknown user");
            unauthorized()
        })?;

    req.extensions_mut().insert(claims.data_scope());
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn token(secret: &[u8], exp: usize) -> String {
        let claims = JwtClaims {
            uid: 5,
            scope: vec!["archive".into()],
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn far_future() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn valid_token_yields_claims() {
        let cfg = JwtConfig::from_secret(b"k");
        let claims = cfg.verify(&token(b"k", far_future())).unwrap();
        assert_eq!(claims.uid, 5);
        assert_eq!(claims.data_scope(), lender_core::principal::DataScope::Archive);
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let cfg = JwtConfig::from_secret(b"k");
        let err = cfg.verify(&token(b"other", far_future())).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let cfg = JwtConfig::from_secret(b"k");
        let err = cfg.verify(&token(b"k", 1_000)).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }
}
