//! Login state and flash messages, both kept in signed cookies.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};

use crate::{AppState, entities::user, error::AppError};

const SESSION_COOKIE: &str = "session";
const FLASH_COOKIE: &str = "flash";
const LOGIN_REQUIRED: &str = "Please log in to access this page.";

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Signing key from the configured secret, or a throwaway one.
pub fn cookie_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => Key::derive_from(secret.as_bytes()),
        None => {
            tracing::warn!("SECRET_KEY not set - sessions will not survive a restart");
            Key::generate()
        },
    }
}

pub fn log_in(jar: SignedCookieJar, user_id: i32, ttl_days: i64) -> SignedCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, user_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(ttl_days));
    jar.add(cookie)
}

pub fn log_out(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Queues a message for the next rendered page.
pub fn flash(jar: SignedCookieJar, message: &str) -> SignedCookieJar {
    let mut messages = read_flashes(&jar);
    messages.push(message.to_string());
    let value = serde_json::to_string(&messages).unwrap_or_default();
    jar.add(Cookie::build((FLASH_COOKIE, value)).path("/").http_only(true).same_site(SameSite::Lax))
}

/// Drains pending messages. The returned jar must be sent back so they are cleared.
pub fn take_flashes(jar: SignedCookieJar) -> (SignedCookieJar, Vec<String>) {
    let messages = read_flashes(&jar);
    if messages.is_empty() {
        return (jar, messages);
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), messages)
}

fn read_flashes(jar: &SignedCookieJar) -> Vec<String> {
    jar.get(FLASH_COOKIE)
        .and_then(|c| serde_json::from_str(c.value()).ok())
        .unwrap_or_default()
}

/// The logged-in user, if any. A session pointing at a deleted user is anonymous.
pub struct CurrentUser(pub Option<user::Model>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        let Some(user_id) = jar.get(SESSION_COOKIE).and_then(|c| c.value().parse::<i32>().ok())
        else {
            return Ok(Self(None));
        };

        let user = state.accounts.find_by_id(user_id).await?;
        if user.is_none() {
            tracing::debug!(user_id, "session refers to unknown user");
        }
        Ok(Self(user))
    }
}

/// Like [`CurrentUser`] but sends anonymous visitors to the login page.
pub struct RequireUser(pub user::Model);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) =
            CurrentUser::from_request_parts(parts, state).await.map_err(IntoResponse::into_response)?;

        match user {
            Some(user) => Ok(Self(user)),
            None => {
                let jar = SignedCookieJar::<Key>::from_request_parts(parts, state)
                    .await
                    .unwrap_or_else(|never| match never {});
                Err((flash(jar, LOGIN_REQUIRED), Redirect::to("/login")).into_response())
            },
        }
    }
}
