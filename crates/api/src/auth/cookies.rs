//! Session cookies.
//!
//! Successful login and refresh set `accessToken` and `refreshToken` as
//! HttpOnly cookies (Secure unless disabled for local development); logout
//! expires both.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::auth::tokens::TokenPair;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn session_cookie(name: &'static str, value: String, max_age: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(Duration::seconds(max_age.max(0)))
        .build()
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new(), 0, secure);
    cookie.make_removal();
    cookie
}

/// Add cookies carrying a freshly issued pair to `jar`.
pub fn with_session(jar: CookieJar, pair: &TokenPair, now: i64, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        pair.access_token.clone(),
        pair.access_expires_at - now,
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        pair.refresh_token.clone(),
        pair.refresh_expires_at - now,
        secure,
    ))
}

/// Expire both session cookies, whether or not the request carried them.
pub fn without_session(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(expired_cookie(ACCESS_COOKIE, secure))
        .add(expired_cookie(REFRESH_COOKIE, secure))
}

/// Value of cookie `name`; an empty value counts as absent.
pub fn read_cookie(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
