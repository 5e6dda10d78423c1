//! Opaque caller identity.
//!
//! Placements need a stable per-user id for cooldowns and counters. It is
//! carried in a cookie and minted on first contact; this is identity
//! plumbing, not authentication. Upstream proxies may replace this scheme
//! entirely as long as handlers get a UUID per caller.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

pub const IDENTITY_COOKIE: &str = "mural_uid";

/// Resolve the caller's id from the jar, minting a fresh one when the
/// cookie is absent or unparseable. Returns the jar to send back, with the
/// new cookie added if one was minted.
#[must_use]
pub fn resolve(jar: CookieJar) -> (Uuid, CookieJar) {
    if let Some(cookie) = jar.get(IDENTITY_COOKIE) {
        if let Ok(user_id) = cookie.value().parse::<Uuid>() {
            return (user_id, jar);
        }
    }

    let user_id = Uuid::new_v4();
    let cookie = Cookie::build((IDENTITY_COOKIE, user_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (user_id, jar.add(cookie))
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
