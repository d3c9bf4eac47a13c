//! SMTP authentication strategies.
//!
//! A strategy drives one SASL exchange: [`AuthStrategy::start`] picks the
//! mechanism and optional initial response, then [`AuthStrategy::next`]
//! answers each server challenge until the server accepts.

use std::fmt;

use super::error::AuthError;
use super::login_auth::LoginAuth;

/// Hostnames PLAIN credentials may be sent to without TLS
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// What the client knows about the server when authentication starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Hostname the client dialled
    pub name: String,
    /// Whether the connection is encrypted
    pub tls: bool,
    /// Mechanisms advertised in the EHLO `AUTH` keyword
    pub auth: Vec<String>,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, tls: bool, auth: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tls,
            auth,
        }
    }

    fn is_localhost(&self) -> bool {
        LOCAL_HOSTS.contains(&self.name.as_str())
    }
}

/// First step of an exchange: `AUTH <mechanism> [initial response]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStart {
    pub mechanism: &'static str,
    pub initial_response: Option<Vec<u8>>,
}

impl AuthStart {
    pub fn new(mechanism: &'static str, initial_response: Option<Vec<u8>>) -> Self {
        Self {
            mechanism,
            initial_response,
        }
    }
}

/// `AUTH PLAIN` credentials bound to the host they were issued for
#[derive(Clone, PartialEq, Eq)]
pub struct PlainAuth {
    identity: String,
    username: String,
    password: String,
    host: String,
}

impl PlainAuth {
    /// Creates PLAIN credentials.
    ///
    /// `identity` is the authorization identity and is usually empty, so the
    /// server derives it from `username`. `host` must match the hostname the
    /// notifier connects to, otherwise authentication is refused.
    pub fn new(
        identity: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            username: username.into(),
            password: password.into(),
            host: host.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Builds `identity \0 username \0 password` as the initial response.
    ///
    /// # Errors
    /// Refuses to send credentials in clear text to anything but the local
    /// machine, or to a server other than the configured host.
    pub fn start(&self, server: &ServerInfo) -> Result<AuthStart, AuthError> {
        if !server.tls && !server.is_localhost() {
            return Err(AuthError::UnencryptedConnection);
        }
        if server.name != self.host {
            return Err(AuthError::WrongHostName);
        }

        let response = format!("{}\0{}\0{}", self.identity, self.username, self.password);
        Ok(AuthStart::new("PLAIN", Some(response.into_bytes())))
    }

    /// PLAIN is a single step, any further challenge is a protocol error.
    pub fn next(&self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>, AuthError> {
        if more {
            return Err(AuthError::UnexpectedChallenge {
                challenge: String::from_utf8_lossy(from_server).to_lowercase(),
            });
        }
        Ok(None)
    }
}

impl fmt::Debug for PlainAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainAuth")
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

/// Authentication strategy of a notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    Plain(PlainAuth),
    Login(LoginAuth),
}

impl AuthStrategy {
    /// SASL mechanism name sent with `AUTH`
    pub fn mechanism(&self) -> &'static str {
        match self {
            AuthStrategy::Plain(_) => "PLAIN",
            AuthStrategy::Login(_) => "LOGIN",
        }
    }

    pub fn start(&self, server: &ServerInfo) -> Result<AuthStart, AuthError> {
        match self {
            AuthStrategy::Plain(auth) => auth.start(server),
            AuthStrategy::Login(auth) => auth.start(server),
        }
    }

    pub fn next(&self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>, AuthError> {
        match self {
            AuthStrategy::Plain(auth) => auth.next(from_server, more),
            AuthStrategy::Login(auth) => auth.next(from_server, more),
        }
    }
}

impl From<PlainAuth> for AuthStrategy {
    fn from(auth: PlainAuth) -> Self {
        AuthStrategy::Plain(auth)
    }
}

impl From<LoginAuth> for AuthStrategy {
    fn from(auth: LoginAuth) -> Self {
        AuthStrategy::Login(auth)
    }
}
