//! Admin session authentication.
//!
//! A single configured admin credential; successful logins get an HS256 JWT
//! in an http-only cookie. Handlers opt into protection by taking an
//! [`AdminSession`] extractor argument; page handlers extract
//! `Result<AdminSession, _>` and redirect to the login form instead of
//! returning 401.

pub mod ui;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::COOKIE, request::Parts, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_cookies::{Cookie, Cookies};

use crate::config::AdminConfig;
use crate::shared::state::AppState;

pub const SESSION_COOKIE: &str = "viberdesk_session";

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
}

pub fn create_session_token(
    config: &AdminConfig,
    username: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = AdminClaims {
        sub: username.to_string(),
        role: "admin".to_string(),
        exp: Utc::now().timestamp() + config.session_ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

pub fn verify_session_token(config: &AdminConfig, token: &str) -> Option<AdminClaims> {
    decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

fn password_matches(config: &AdminConfig, password: &str) -> bool {
    if let Some(hash) = &config.password_hash {
        use argon2::{Argon2, PasswordHash, PasswordVerifier};
        return PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);
    }
    !config.password.is_empty() && password == config.password
}

pub fn authenticate(config: &AdminConfig, username: &str, password: &str) -> bool {
    username == config.username && password_matches(config, password)
}

#[derive(Debug, Clone)]
pub struct AdminSession {
    pub username: String,
    pub role: String,
}

fn session_cookie(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').map(str::trim).find_map(|pair| {
        pair.strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_cookie(parts).ok_or((
            StatusCode::UNAUTHORIZED,
            "authentication required".to_string(),
        ))?;
        let claims = verify_session_token(&state.config.admin, &token)
            .ok_or((StatusCode::UNAUTHORIZED, "session expired".to_string()))?;
        Ok(AdminSession {
            username: claims.sub,
            role: claims.role,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login_page() -> Html<String> {
    Html(ui::render_login_page(None))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Response {
    if !authenticate(&state.config.admin, &form.username, &form.password) {
        warn!("failed admin login attempt for {:?}", form.username);
        return Html(ui::render_login_page(Some("Invalid username or password")))
            .into_response();
    }

    match create_session_token(&state.config.admin, &form.username) {
        Ok(token) => {
            let mut cookie = Cookie::new(SESSION_COOKIE, token);
            cookie.set_path("/");
            cookie.set_http_only(true);
            cookies.add(cookie);
            Redirect::to("/admin").into_response()
        }
        Err(e) => {
            error!("could not create admin session token: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "could not create session".to_string(),
            )
                .into_response()
        }
    }
}

pub async fn logout(cookies: Cookies) -> Redirect {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);
    Redirect::to("/admin/login")
}

pub fn configure_admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/login", get(login_page).post(login))
        .route("/admin/logout", get(logout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdminConfig {
        AdminConfig {
            username: "admin".to_string(),
            password: "secure_password".to_string(),
            password_hash: None,
            jwt_secret: "unit-test-secret-at-least-32-bytes!".to_string(),
            session_ttl_secs: 3600,
        }
    }

    #[test]
    fn session_token_round_trips() {
        let cfg = config();
        let token = create_session_token(&cfg, "admin").unwrap();
        let claims = verify_session_token(&cfg, &token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let cfg = config();
        let token = create_session_token(&cfg, "admin").unwrap();
        let mut other = config();
        other.jwt_secret = "a-completely-different-signing-key!!".to_string();
        assert!(verify_session_token(&other, &token).is_none());
        assert!(verify_session_token(&cfg, "not-a-token").is_none());
    }

    #[test]
    fn authenticate_checks_both_fields() {
        let cfg = config();
        assert!(authenticate(&cfg, "admin", "secure_password"));
        assert!(!authenticate(&cfg, "admin", "wrong"));
        assert!(!authenticate(&cfg, "root", "secure_password"));
    }

    #[test]
    fn empty_configured_password_never_authenticates() {
        let mut cfg = config();
        cfg.password = String::new();
        assert!(!authenticate(&cfg, "admin", ""));
    }

    #[test]
    fn argon2_hash_takes_precedence() {
        use argon2::password_hash::SaltString;
        use argon2::{Argon2, PasswordHasher};

        let salt = SaltString::encode_b64(b"viberdesk-test-salt").unwrap();
        let hash = Argon2::default()
            .hash_password(b"hashed_password", &salt)
            .unwrap()
            .to_string();

        let mut cfg = config();
        cfg.password_hash = Some(hash);
        assert!(authenticate(&cfg, "admin", "hashed_password"));
        // The plaintext fallback is ignored once a hash is configured.
        assert!(!authenticate(&cfg, "admin", "secure_password"));
    }
}
