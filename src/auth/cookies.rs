use axum::http::{header, HeaderMap};
use time::Duration;

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Extract a named cookie value from request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

fn attributes(secure: bool) -> &'static str {
    if secure {
        "HttpOnly; Secure; SameSite=None; Path=/"
    } else {
        "HttpOnly; SameSite=Lax; Path=/"
    }
}

/// `Set-Cookie` value delivering a refresh token.
pub fn refresh_cookie(token: &str, max_age: Duration, secure: bool) -> String {
    format!(
        "{REFRESH_COOKIE}={token}; {}; Max-Age={}",
        attributes(secure),
        max_age.whole_seconds()
    )
}

/// `Set-Cookie` value removing the refresh token from the client.
pub fn cleared_refresh_cookie(secure: bool) -> String {
    format!("{REFRESH_COOKIE}=; {}; Max-Age=0", attributes(secure))
}
