//! A minimal cookie jar so session cookies survive across test requests.

use std::collections::BTreeMap;

use http::header::SET_COOKIE;
use http::HeaderMap;
use parking_lot::Mutex;

/// Cookies remembered from `Set-Cookie` headers.
///
/// Attributes other than `Max-Age` are ignored; a cookie set with
/// `Max-Age=0` is removed.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Mutex<BTreeMap<String, String>>,
}

impl CookieJar {
    /// Creates an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every `Set-Cookie` header in `headers`.
    pub fn store(&self, headers: &HeaderMap) {
        let mut cookies = self.cookies.lock();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let mut parts = value.split(';');
            let Some((name, cookie_value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let expired = parts.any(|attr| {
                attr.trim()
                    .split_once('=')
                    .is_some_and(|(key, age)| key.eq_ignore_ascii_case("max-age") && age.trim() == "0")
            });

            let name = name.trim().to_string();
            if expired {
                cookies.remove(&name);
            } else {
                cookies.insert(name, cookie_value.trim().to_string());
            }
        }
    }

    /// Returns a cookie's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    /// Renders the `Cookie` request header, if the jar is not empty.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        let cookies = self.cookies.lock();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Forgets every cookie.
    pub fn clear(&self) {
        self.cookies.lock().clear();
    }
}
