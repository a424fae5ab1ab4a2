//! Session cookie parsing and rendering.

use serde::Deserialize;

use crate::token::SessionId;

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of the session cookie.
///
/// The defaults render `sessionid=<sid>; Path=/; Secure; HttpOnly` with no
/// `Max-Age`, so the browser keeps the cookie for its own session while the
/// store entry lives for the server-side TTL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub max_age_secs: Option<u64>,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "sessionid".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: None,
            max_age_secs: None,
        }
    }
}

impl CookieSettings {
    /// Render the `Set-Cookie` header value for a new session.
    pub fn set_cookie(&self, sid: &SessionId) -> String {
        let mut cookie = format!("{}={}; Path={}", self.name, sid, self.path);

        if let Some(ref domain) = self.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if let Some(max_age) = self.max_age_secs {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }

        if let Some(same_site) = self.same_site {
            cookie.push_str(&format!("; SameSite={}", same_site.as_str()));
        }

        cookie
    }

    /// Find this cookie's value in a `Cookie` request header.
    pub fn find<'a>(&self, header: &'a str) -> Option<&'a str> {
        find_cookie(header, &self.name)
    }
}

/// Value of the first non-empty cookie called `name` in a `Cookie` header.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .find(|value| !value.is_empty())
}

/// Cookie names must be RFC 6265 tokens.
pub(crate) fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        })
}
