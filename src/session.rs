use axum::http::{HeaderMap, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Sessions last 24 hours from issuance; the cookie max-age matches.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Claims
///
/// Payload of a session token. The administrator's email is the only identity claim;
/// `iat`/`exp` are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

/// IssuedSession
///
/// Result of a successful login: the signed token and the `Set-Cookie` value that stores it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub cookie: String,
    pub claims: Claims,
}

/// SessionGuard
///
/// Issues and verifies the stateless admin session. Tokens are HS256 JWTs signed with the
/// configured secret; nothing is tracked server-side, so a token stays valid until it
/// expires even after the cookie is cleared.
#[derive(Clone)]
pub struct SessionGuard {
    secret: Option<String>,
    admin_email: Option<String>,
    admin_password: Option<String>,
    secure_cookie: bool,
}

impl SessionGuard {
    pub fn new(
        secret: Option<String>,
        admin_email: Option<String>,
        admin_password: Option<String>,
        secure_cookie: bool,
    ) -> Self {
        Self {
            secret,
            admin_email,
            admin_password,
            secure_cookie,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.admin_email.clone(),
            config.admin_password.clone(),
            config.secure_cookies(),
        )
    }

    /// issue
    ///
    /// Checks the submitted credentials against the configured admin pair and signs a token
    /// for `email` valid for [`SESSION_TTL_SECS`].
    ///
    /// A wrong email and a wrong password both yield `InvalidCredentials`.
    pub fn issue(&self, email: &str, password: &str) -> AppResult<IssuedSession> {
        let secret = self
            .secret
            .as_deref()
            .ok_or(AppError::ServerMisconfigured("session signing secret is not set"))?;

        let (Some(admin_email), Some(admin_password)) =
            (self.admin_email.as_deref(), self.admin_password.as_deref())
        else {
            return Err(AppError::ServerMisconfigured(
                "admin credentials are not set",
            ));
        };

        // Evaluate both comparisons so timing does not reveal which one failed.
        let email_ok = constant_time_eq(email, admin_email);
        let password_ok = constant_time_eq(password, admin_password);
        if !(email_ok & password_ok) {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            email: email.to_string(),
            iat: now as usize,
            exp: (now + SESSION_TTL_SECS) as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("failed to sign session token: {e}");
            AppError::ServerMisconfigured("session signing failed")
        })?;

        let cookie = self.session_cookie(&token);
        Ok(IssuedSession {
            token,
            cookie,
            claims,
        })
    }

    /// verify
    ///
    /// Returns the claims of a token whose signature and expiry both check out. Every other
    /// outcome (no secret configured, malformed, tampered, foreign key, expired) is `None`.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let secret = self.secret.as_deref()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("session token rejected: {:?}", e.kind());
                None
            }
        }
    }

    /// revoke
    ///
    /// `Set-Cookie` value that clears the session cookie in the browser. Copies of the token
    /// held elsewhere stay valid until they expire.
    pub fn revoke(&self) -> String {
        let mut cookie = format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Verifies the session carried by the request's `Cookie` headers, if any.
    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<Claims> {
        let token = cookie_value(headers, SESSION_COOKIE)?;
        self.verify(token)
    }

    fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={SESSION_TTL_SECS}"
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// cookie_value
///
/// Finds the named cookie across every `Cookie` header of a request.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn constant_time_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    // Fold over the expected length regardless of the provided length.
    let diff = expected.iter().enumerate().fold(0u8, |acc, (i, byte)| {
        acc | (byte ^ provided.get(i).copied().unwrap_or(!byte))
    });
    diff == 0 && provided.len() == expected.len()
}

