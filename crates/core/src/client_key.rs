//! Client key derivation from an originating network address.
//!
//! The default mode keeps only what precedes the first `:` of the address, so
//! `10.0.0.1:5555` becomes `10.0.0.1` and an address without a colon (a Unix
//! socket path, for instance) is used verbatim. IPv6 literals lose
//! everything after their first hextet in that mode (`[2001:db8::1]:80` becomes
//! `[2001`, `[::1]:80` becomes `[`); [`KeyMode::Ip`] keys them by their parsed
//! address instead.

use crate::config::FALLBACK_CLIENT_KEY;
use std::net::SocketAddr;
use std::str::FromStr;

/// How a client key is derived from the peer address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyMode {
    /// Split the address on its first colon and keep the first segment.
    #[default]
    FirstColon,
    /// Use the IP of the socket address, falling back to first-colon splitting
    /// for addresses that do not parse.
    Ip,
}

impl FromStr for KeyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-colon" => Ok(KeyMode::FirstColon),
            "ip" => Ok(KeyMode::Ip),
            other => Err(format!(
                "unknown key mode '{}', expected 'first-colon' or 'ip'",
                other
            )),
        }
    }
}

/// Keeps everything before the first colon. Never fails.
pub fn host_portion(addr: &str) -> &str {
    addr.split(':').next().unwrap_or(addr)
}

/// Derives the client key for a textual peer address.
///
/// `None` (no address available) and an empty result both map to the shared
/// [`FALLBACK_CLIENT_KEY`].
pub fn derive_client_key(addr: Option<&str>, mode: KeyMode) -> String {
    let Some(addr) = addr else {
        return FALLBACK_CLIENT_KEY.to_string();
    };
    let key = match mode {
        KeyMode::FirstColon => host_portion(addr).to_string(),
        KeyMode::Ip => match addr.parse::<SocketAddr>() {
            Ok(sock) => sock.ip().to_string(),
            Err(_) => host_portion(addr).to_string(),
        },
    };
    if key.is_empty() {
        FALLBACK_CLIENT_KEY.to_string()
    } else {
        key
    }
}

/// Derives the client key for a connected socket peer.
pub fn client_key_for_socket(addr: Option<&SocketAddr>, mode: KeyMode) -> String {
    match addr {
        Some(addr) => derive_client_key(Some(&addr.to_string()), mode),
        None => derive_client_key(None, mode),
    }
}
