//! # Bearer Authentication
//!
//! JWT gate middleware. Attach it to a group or route; requests without a
//! valid `Authorization: Bearer <token>` header are answered with 401 and
//! never reach downstream middleware or the handler.

use crate::error::Result;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// JWT bearer-token middleware
///
/// On success the decoded claims are stored in [`Request::claims`].
#[derive(Clone)]
pub struct BearerAuth {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl BearerAuth {
    /// HS256 with a shared secret
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Replace the validation rules (algorithms, audience, leeway)
    #[must_use]
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    fn unauthorized(message: &str) -> Response {
        Response::json(serde_json::json!({ "error": message }).to_string()).with_status(401)
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(&self, mut req: Request, next: Next) -> Result<Response> {
        let Some(token) = req
            .header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
        else {
            warn!(path = %req.path(), "Missing or invalid Authorization header");
            return Ok(Self::unauthorized("Missing or invalid Authorization header"));
        };

        match decode::<Value>(token, &self.decoding_key, &self.validation) {
            Ok(data) => {
                req.claims = Some(data.claims);
                next.run(req).await
            }
            Err(e) => {
                warn!(path = %req.path(), error = %e, "JWT validation failed");
                Ok(Self::unauthorized("Unauthorized"))
            }
        }
    }

    fn name(&self) -> &'static str {
        "BearerAuth"
    }
}
