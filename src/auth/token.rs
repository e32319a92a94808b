use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// Fallback TTL when a caller issues a token without one. Login uses the
/// configured `access_token_expire_minutes` instead.
const DEFAULT_TTL_MINUTES: i64 = 15;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Claims as they appear on the wire, before the presence checks. Both fields
/// are required for a token to be accepted; decoding them as optional lets
/// verification tell "missing claim" apart from "bad signature".
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    exp: Option<i64>,
}

#[derive(Debug)]
pub enum TokenError {
    Invalid(String),
    Expired,
    MissingClaim(&'static str),
    Generation(String),
    InvalidSecret,
    UnsupportedAlgorithm(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Invalid(msg) => write!(f, "invalid token: {}", msg),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::MissingClaim(claim) => write!(f, "token is missing '{}' claim", claim),
            TokenError::Generation(msg) => write!(f, "JWT generation error: {}", msg),
            TokenError::InvalidSecret => write!(f, "invalid JWT secret"),
            TokenError::UnsupportedAlgorithm(name) => {
                write!(f, "unsupported signing algorithm '{}'", name)
            }
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies signed, time-limited bearer tokens. The keys are
/// derived once from the configured secret and shared read-only for the
/// process lifetime; verification needs no other state.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(security: &SecurityConfig) -> Result<Self, TokenError> {
        if security.secret_key.is_empty() {
            return Err(TokenError::InvalidSecret);
        }
        let algorithm = Algorithm::from_str(&security.algorithm)
            .map_err(|_| TokenError::UnsupportedAlgorithm(security.algorithm.clone()))?;

        Ok(Self {
            encoding: EncodingKey::from_secret(security.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(security.secret_key.as_bytes()),
            algorithm,
            default_ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
        })
    }

    /// Create a signed access token for `subject`, expiring after `ttl`
    /// (or the fixed service default when none is given).
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + ttl.unwrap_or(self.default_ttl)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Verify signature and structure, then require both `exp` and `sub`
    /// before anything else looks at the token. Returns the subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry and claim presence are checked by hand below so that a
        // missing claim is reported as such, not as a generic failure.
        validation.validate_exp = false;
        validation.required_spec_claims = std::collections::HashSet::new();

        let data = decode::<RawClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        let exp = data.claims.exp.ok_or(TokenError::MissingClaim("exp"))?;
        let sub = data.claims.sub.ok_or(TokenError::MissingClaim("sub"))?;

        if exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(sub)
    }
}
