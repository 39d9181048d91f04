//! Netscape cookie-file format, as read by curl and yt-dlp.

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use super::Cookie;

const HEADER: &str = "# Netscape HTTP Cookie File\n\
# https://curl.haxx.se/rfc/cookie_spec.html\n\
# This is a generated file!  Do not edit.\n\n";

const ONE_YEAR_SECS: i64 = 31_536_000;

pub fn parse(text: &str) -> Vec<Cookie> {
    let mut cookies = Vec::new();
    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let line = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => rest,
            None if line.trim().is_empty() || line.trim_start().starts_with('#') => continue,
            None => line,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            warn!(line = number + 1, "Skipping malformed cookie line");
            continue;
        }

        cookies.push(Cookie {
            domain: fields[0].to_string(),
            include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            expires: fields[4].trim().parse().unwrap_or(0),
            name: fields[5].to_string(),
            value: SecretString::from(fields[6..].join("\t")),
        });
    }
    cookies
}

/// Cookies without an expiry are given one year from `now`, so that the
/// consumer does not treat them as already expired session cookies.
pub fn render(cookies: &[Cookie], now: i64) -> String {
    let mut out = String::from(HEADER);
    for cookie in cookies {
        let domain = if cookie.domain.starts_with('.') {
            cookie.domain.clone()
        } else {
            format!(".{}", cookie.domain)
        };
        let path = if cookie.path.is_empty() {
            "/"
        } else {
            cookie.path.as_str()
        };
        let secure = if cookie.secure { "TRUE" } else { "FALSE" };
        let expires = if cookie.expires > 0 {
            cookie.expires
        } else {
            now + ONE_YEAR_SECS
        };
        out.push_str(&format!(
            "{}\tTRUE\t{}\t{}\t{}\t{}\t{}\n",
            domain,
            path,
            secure,
            expires,
            cookie.name,
            cookie.value.expose_secret()
        ));
    }
    out
}

/// `Cookie` request header for `host`, skipping cookies that expired before `now`.
pub fn cookie_header(cookies: &[Cookie], host: &str, now: i64) -> Option<SecretString> {
    let host = host.to_lowercase();
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| c.expires == 0 || c.expires > now)
        .filter(|c| {
            let domain = c.domain.trim_start_matches('.').to_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        })
        .map(|c| format!("{}={}", c.name, c.value.expose_secret()))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(SecretString::from(pairs.join("; ")))
    }
}
