//! Reading the session cookie and rendering its `Set-Cookie` header.

use std::fmt;
use std::time::Duration;

use http::{header, HeaderMap};

/// Finds the value of cookie `name` across every `Cookie` header.
///
/// The last occurrence wins. Headers that are not valid UTF-8 and pairs
/// without `=` are skipped.
///
/// # Example
///
/// ```
/// use http::{header, HeaderMap, HeaderValue};
/// use pathway_middleware::cookie::find;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; pathway.sid=abc123"));
///
/// assert_eq!(find(&headers, "pathway.sid"), Some("abc123"));
/// assert_eq!(find(&headers, "missing"), None);
/// ```
#[must_use]
pub fn find<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .last()
}

/// A `Set-Cookie` value for the session cookie.
///
/// Always scoped to `/`, `HttpOnly` and `SameSite=Lax`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    name: String,
    value: String,
    max_age: Duration,
    secure: bool,
}

impl SessionCookie {
    /// Hands the client session `value` for `max_age`.
    #[must_use]
    pub fn issue(name: &str, value: impl Into<String>, max_age: Duration, secure: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            max_age,
            secure,
        }
    }

    /// Tells the client to drop the cookie.
    #[must_use]
    pub fn clear(name: &str, secure: bool) -> Self {
        Self::issue(name, "", Duration::ZERO, secure)
    }

    /// Whether this cookie removes the session.
    #[must_use]
    pub fn is_clearing(&self) -> bool {
        self.max_age.is_zero()
    }
}

impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name,
            self.value,
            self.max_age.as_secs()
        )?;
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with(values: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(header::COOKIE, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_find_across_headers() {
        let headers = headers_with(&["a=1; garbage", "pathway.sid=\"abc\""]);
        assert_eq!(find(&headers, "pathway.sid"), Some("abc"));
        assert_eq!(find(&headers, "a"), Some("1"));
        assert_eq!(find(&headers, "garbage"), None);
    }

    #[test]
    fn test_find_without_cookie_header() {
        assert_eq!(find(&HeaderMap::new(), "pathway.sid"), None);
    }

    #[test]
    fn test_issued_cookie() {
        let cookie = SessionCookie::issue("pathway.sid", "abc", Duration::from_secs(3600), false);
        assert_eq!(
            cookie.to_string(),
            "pathway.sid=abc; Path=/; Max-Age=3600; HttpOnly; SameSite=Lax"
        );
        assert!(!cookie.is_clearing());
    }

    #[test]
    fn test_cleared_cookie() {
        let cookie = SessionCookie::clear("pathway.sid", true);
        assert_eq!(
            cookie.to_string(),
            "pathway.sid=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax; Secure"
        );
        assert!(cookie.is_clearing());
    }
}
