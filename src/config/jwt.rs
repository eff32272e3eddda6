//! JWT verification configuration.
//!
//! Slateboard does not issue tokens; the identity service does. This
//! config only carries what token verification needs.
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`: HMAC secret shared with the identity service (required)

use std::env;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
        }
    }
}
