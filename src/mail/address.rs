//! Host address parsing.
//!
//! SMTP host addresses are configured as a single `host:port` string. IPv6
//! literals must be bracketed (`[::1]:25`).

use super::error::HostParseError;

const MISSING_PORT: &str = "missing port in address";
const TOO_MANY_COLONS: &str = "too many colons in address";
const MISSING_BRACKET: &str = "missing ']' in address";
const UNEXPECTED_OPEN: &str = "unexpected '[' in address";
const UNEXPECTED_CLOSE: &str = "unexpected ']' in address";
const INVALID_PORT: &str = "invalid port in address";

/// Splits `address` into its hostname and port.
///
/// The hostname is returned without IPv6 brackets, ready to be used as a TLS
/// server name.
///
/// # Errors
/// Returns a [`HostParseError`] if the address has no port, an ambiguous
/// number of colons, unbalanced brackets or a port outside `0..=65535`.
pub fn split_host_port(address: &str) -> Result<(String, u16), HostParseError> {
    let Some(last_colon) = address.rfind(':') else {
        return Err(HostParseError::new(address, MISSING_PORT));
    };

    let (host, open_from, close_from) = if address.starts_with('[') {
        let Some(end) = address.find(']') else {
            return Err(HostParseError::new(address, MISSING_BRACKET));
        };
        match end + 1 {
            after if after == address.len() => {
                return Err(HostParseError::new(address, MISSING_PORT));
            }
            after if after == last_colon => {}
            _ => {
                // "[host]:port" is the only form allowed after the bracket
                let reason = if address.as_bytes()[end + 1] == b':' {
                    TOO_MANY_COLONS
                } else {
                    MISSING_PORT
                };
                return Err(HostParseError::new(address, reason));
            }
        }
        (&address[1..end], 1, end + 1)
    } else {
        let host = &address[..last_colon];
        if host.contains(':') {
            return Err(HostParseError::new(address, TOO_MANY_COLONS));
        }
        (host, 0, 0)
    };

    if address[open_from..].contains('[') {
        return Err(HostParseError::new(address, UNEXPECTED_OPEN));
    }
    if address[close_from..].contains(']') {
        return Err(HostParseError::new(address, UNEXPECTED_CLOSE));
    }

    let port = address[last_colon + 1..]
        .parse::<u16>()
        .map_err(|_| HostParseError::new(address, INVALID_PORT))?;

    Ok((host.to_string(), port))
}
