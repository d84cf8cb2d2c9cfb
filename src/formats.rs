//! Hand-rolled checkers for the fixed format grammars: email, http/https
//! URL, UUID, and the two IP address families. Formats operate on decoded
//! scalar strings only; presence handling happens upstream.

use std::net::IpAddr;

pub(crate) fn is_email(s: &str) -> bool {
    let at = match s.find('@') {
        Some(pos) if pos > 0 => pos,
        _ => return false,
    };
    let local = &s[..at];
    let domain = &s[at + 1..];

    if local.is_empty() || domain.is_empty() {
        return false;
    }
    for ch in local.chars() {
        if ch.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(ch) {
            continue;
        }
        return false;
    }
    is_hostname(domain)
}

/// URL restricted to `http`/`https` with a non-empty host.
pub(crate) fn is_url(s: &str) -> bool {
    let rest = if let Some(r) = s.strip_prefix("https://") {
        r
    } else if let Some(r) = s.strip_prefix("http://") {
        r
    } else {
        return false;
    };
    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    if host.is_empty() {
        return false;
    }
    !rest.contains(char::is_whitespace)
}

/// 8-4-4-4-12 hex groups with dashes.
pub(crate) fn is_uuid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    for (i, &b) in s.as_bytes().iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if b != b'-' {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

// The two address families are mutually exclusive: both checks parse the
// same address and test which family it resolved to.

pub(crate) fn is_ipv4(s: &str) -> bool {
    matches!(s.parse::<IpAddr>(), Ok(IpAddr::V4(_)))
}

pub(crate) fn is_ipv6(s: &str) -> bool {
    matches!(s.parse::<IpAddr>(), Ok(IpAddr::V6(_)))
}

pub(crate) fn is_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    for label in s.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }
    true
}
