//! Connection descriptor for one run: target, optional relay hop, and auth.

use std::fmt;

use crate::domain::error::ConfigError;
use crate::domain::files::PRINCIPAL_RE;
use crate::domain::request::PrivateKey;

/// Default SSH port for the target and the relay.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// How the transport authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Key material supplied in the request.
    PrivateKey(PrivateKey),
    /// Keys held by the local SSH agent.
    Agent,
}

/// One SSH hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl Endpoint {
    /// `user@host`, as passed to the SSH client.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Transport descriptor. The relay, when present, shares the target's user,
/// port and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub target: Endpoint,
    pub relay: Option<Endpoint>,
    pub auth: Auth,
}

/// Declared connection inputs.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInput<'a> {
    pub host: &'a str,
    pub bastion_host: Option<&'a str>,
    pub user: &'a str,
    pub private_key: Option<&'a PrivateKey>,
    pub agent: bool,
    /// Whether any files or commands are declared.
    pub has_work: bool,
    pub port: u16,
}

/// Build the connection descriptor, or fail before any network I/O.
///
/// Checks, in order: host present; user present and a valid login name when
/// work is declared; some
/// authentication available when work is declared; key and agent not both
/// set. The relay falls back to `default_relay`; an empty value means direct.
///
/// Returns `Ok(None)` when no work is declared.
///
/// # Errors
///
/// Returns the first violated rule as a [`ConfigError`].
pub fn build_connection_spec(
    input: &ConnectionInput<'_>,
    default_relay: Option<&str>,
) -> Result<Option<ConnectionSpec>, ConfigError> {
    if input.host.trim().is_empty() {
        return Err(ConfigError::MissingHost);
    }
    let key = input.private_key.filter(|k| !k.is_empty());
    if input.has_work {
        if input.user.trim().is_empty() {
            return Err(ConfigError::MissingUser);
        }
        if !PRINCIPAL_RE.is_match(input.user.trim()) {
            return Err(ConfigError::InvalidUser {
                value: input.user.to_string(),
            });
        }
        if key.is_none() && !input.agent {
            return Err(ConfigError::NoAuthMethod);
        }
    }
    if key.is_some() && input.agent {
        return Err(ConfigError::AmbiguousAuth);
    }
    if !input.has_work {
        return Ok(None);
    }

    let auth = match key {
        Some(k) => Auth::PrivateKey(k.clone()),
        None => Auth::Agent,
    };
    let relay_host = input
        .bastion_host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .or_else(|| default_relay.map(str::trim).filter(|h| !h.is_empty()));

    let endpoint = |host: &str| Endpoint {
        host: host.to_string(),
        port: input.port,
        user: input.user.trim().to_string(),
    };
    Ok(Some(ConnectionSpec {
        target: endpoint(input.host.trim()),
        relay: relay_host.map(endpoint),
        auth,
    }))
}
