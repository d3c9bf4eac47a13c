//! SMTP delivery.
//!
//! [`Transport`] is the only seam where network I/O happens. The default
//! [`SmtpTransport`] drives `lettre`'s blocking [`SmtpConnection`] and runs
//! the SASL exchange itself, so custom strategies such as LOGIN can answer
//! the server's challenges.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lettre::Message;
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::Ehlo;
use lettre::transport::smtp::extension::ClientId;
use tracing::debug;

use super::address::split_host_port;
use super::auth::{AuthStrategy, ServerInfo};
use super::error::TransportError;
use super::message::MailMessage;

/// Upper bound on challenges a server may send during one AUTH exchange
const MAX_CHALLENGES: usize = 10;

const DEFAULT_HELLO_NAME: &str = "localhost";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the connection is secured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Security {
    /// Connect in clear text and upgrade with STARTTLS when the server offers it
    Opportunistic,
    /// TLS from the first byte, verifying the certificate against `server_name`
    Implicit { server_name: String },
}

/// Where and how one delivery connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// `host:port` of the SMTP server
    pub address: String,
    pub security: Security,
}

impl Session {
    pub fn opportunistic(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            security: Security::Opportunistic,
        }
    }

    pub fn implicit_tls(address: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            security: Security::Implicit {
                server_name: server_name.into(),
            },
        }
    }
}

/// Delivers one message over one connection
pub trait Transport: Send + Sync {
    /// Opens a session, authenticates when `auth` is set, sends `message`
    /// and closes the session.
    fn deliver(
        &self,
        session: &Session,
        auth: Option<&AuthStrategy>,
        message: &MailMessage,
    ) -> Result<(), TransportError>;
}

/// [`Transport`] backed by `lettre`'s SMTP client
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    hello_name: ClientId,
    timeout: Option<Duration>,
}

impl SmtpTransport {
    /// Creates a transport announcing itself as `hello_name` in EHLO
    ///
    /// # Arguments
    /// * `hello_name` - Domain sent with EHLO
    /// * `timeout` - Connect and I/O timeout, `None` waits forever
    pub fn new(hello_name: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            hello_name: ClientId::Domain(hello_name.into()),
            timeout,
        }
    }

    fn connect(&self, session: &Session) -> Result<(SmtpConnection, String), TransportError> {
        let (host, port) = split_host_port(&session.address)?;

        let connection = match &session.security {
            Security::Implicit { server_name } => {
                let tls = TlsParameters::new(server_name.clone())?;
                SmtpConnection::connect(
                    (host.as_str(), port),
                    self.timeout,
                    &self.hello_name,
                    Some(&tls),
                    None,
                )?
            }
            Security::Opportunistic => {
                let mut connection = SmtpConnection::connect(
                    (host.as_str(), port),
                    self.timeout,
                    &self.hello_name,
                    None,
                    None,
                )?;
                if connection.can_starttls() {
                    debug!(host = %host, "Upgrading SMTP session with STARTTLS");
                    let tls = TlsParameters::new(host.clone())?;
                    connection.starttls(&tls, &self.hello_name)?;
                }
                connection
            }
        };

        Ok((connection, host))
    }

    fn transact(
        &self,
        connection: &mut SmtpConnection,
        host: &str,
        security: &Security,
        auth: Option<&AuthStrategy>,
        message: &Message,
    ) -> Result<(), TransportError> {
        if let Some(auth) = auth {
            let advertised = self.advertised_auth(connection)?;
            match auth_mechanisms(security, advertised)? {
                Some(mechanisms) => {
                    let server = ServerInfo::new(host, connection.is_encrypted(), mechanisms);
                    authenticate(connection, auth, &server)?;
                }
                None => debug!(host = %host, "Server does not offer AUTH, sending unauthenticated"),
            }
        }

        connection.send(message.envelope(), &message.formatted())?;
        Ok(())
    }

    /// Mechanisms listed with the EHLO `AUTH` keyword, `None` without the keyword.
    ///
    /// `lettre` only keeps the mechanisms it implements, so the greeting is
    /// requested again to see every advertised one.
    fn advertised_auth(
        &self,
        connection: &mut SmtpConnection,
    ) -> Result<Option<Vec<String>>, TransportError> {
        let response = connection.command(Ehlo::new(self.hello_name.clone()))?;
        Ok(parse_auth_keyword(response.message()))
    }
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_HELLO_NAME, Some(DEFAULT_TIMEOUT))
    }
}

impl Transport for SmtpTransport {
    fn deliver(
        &self,
        session: &Session,
        auth: Option<&AuthStrategy>,
        message: &MailMessage,
    ) -> Result<(), TransportError> {
        let message = message.to_message()?;
        let (mut connection, host) = self.connect(session)?;

        match self.transact(&mut connection, &host, &session.security, auth, &message) {
            Ok(()) => {
                // The message is accepted once DATA completes, a failed QUIT changes nothing
                if let Err(e) = connection.quit() {
                    debug!(host = %host, error = %e, "SMTP QUIT failed after delivery");
                }
                Ok(())
            }
            Err(e) => {
                connection.abort();
                Err(e)
            }
        }
    }
}

/// Extracts the mechanisms of an `AUTH` (or legacy `AUTH=`) EHLO line
fn parse_auth_keyword<'a>(lines: impl Iterator<Item = &'a str>) -> Option<Vec<String>> {
    lines.into_iter().find_map(|line| {
        let mut words = line.split_whitespace();
        let keyword = words.next()?.to_ascii_uppercase();
        let first = match keyword.strip_prefix("AUTH") {
            Some("") => None,
            Some(rest) => Some(rest.strip_prefix('=')?.to_string()),
            None => return None,
        };
        Some(
            first
                .into_iter()
                .filter(|m| !m.is_empty())
                .chain(words.map(str::to_string))
                .map(|m| m.to_ascii_uppercase())
                .collect(),
        )
    })
}

/// Decides how authentication proceeds for a configured strategy.
///
/// Without the `AUTH` keyword an implicit TLS session sends unauthenticated,
/// while a plain or STARTTLS session refuses to send.
fn auth_mechanisms(
    security: &Security,
    advertised: Option<Vec<String>>,
) -> Result<Option<Vec<String>>, TransportError> {
    match (advertised, security) {
        (Some(mechanisms), _) => Ok(Some(mechanisms)),
        (None, Security::Implicit { .. }) => Ok(None),
        (None, Security::Opportunistic) => Err(TransportError::AuthNotSupported),
    }
}

/// Runs the SASL exchange for `auth`.
///
/// Every `334` reply carries a base64 challenge that is decoded and handed to
/// the strategy; the final positive reply is handed over with `more = false`.
/// A strategy error cancels the exchange with `*` before it is returned.
fn authenticate(
    connection: &mut SmtpConnection,
    auth: &AuthStrategy,
    server: &ServerInfo,
) -> Result<(), TransportError> {
    let start = auth.start(server)?;
    let command = match &start.initial_response {
        Some(response) => format!("AUTH {} {}\r\n", start.mechanism, STANDARD.encode(response)),
        None => format!("AUTH {}\r\n", start.mechanism),
    };
    debug!(mechanism = start.mechanism, "Authenticating SMTP session");
    let mut response = connection.command(command)?;

    for _ in 0..MAX_CHALLENGES {
        let more = response.has_code(334);
        let text = response.first_line().unwrap_or_default();
        let challenge = if more {
            // Servers that do not encode their prompts get them passed through as is
            STANDARD
                .decode(text.trim())
                .unwrap_or_else(|_| text.as_bytes().to_vec())
        } else {
            text.as_bytes().to_vec()
        };

        match auth.next(&challenge, more) {
            Ok(Some(reply)) => {
                response = connection.command(format!("{}\r\n", STANDARD.encode(reply)))?;
            }
            Ok(None) => return Ok(()),
            Err(e) => {
                let _ = connection.command("*\r\n");
                return Err(e.into());
            }
        }
    }

    Err(TransportError::TooManyChallenges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::auth::PlainAuth;
    use crate::mail::error::AuthError;
    use crate::mail::login_auth::LoginAuth;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::sync::{Arc, Mutex};
    use std::thread::{self, JoinHandle};

    /// Behaviour of the fake server
    #[derive(Clone)]
    struct Script {
        /// Value of the EHLO `AUTH` line, no line when `None`
        advertise_auth: Option<&'static str>,
        first_prompt: &'static str,
        /// Send prompts base64 encoded
        encode_prompts: bool,
        /// Answer every LOGIN reply with another `Username:` prompt
        endless_prompts: bool,
    }

    impl Default for Script {
        fn default() -> Self {
            Self {
                advertise_auth: Some("PLAIN LOGIN"),
                first_prompt: "Username:",
                encode_prompts: true,
                endless_prompts: false,
            }
        }
    }

    impl Script {
        fn prompt(&self, text: &str) -> String {
            if self.encode_prompts {
                format!("334 {}\r\n", STANDARD.encode(text))
            } else {
                format!("334 {}\r\n", text)
            }
        }
    }

    /// Single-connection SMTP server that records every line it receives
    struct FakeServer {
        address: SocketAddr,
        lines: Arc<Mutex<Vec<String>>>,
        handle: JoinHandle<()>,
    }

    impl FakeServer {
        fn start(script: Script) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind fake server");
            let address = listener.local_addr().expect("Failed to read local address");
            let lines = Arc::new(Mutex::new(Vec::new()));
            let recorded = Arc::clone(&lines);

            let handle = thread::spawn(move || {
                let (stream, _) = listener.accept().expect("Failed to accept client");
                let mut reader = BufReader::new(stream.try_clone().expect("Failed to clone stream"));
                let mut writer = stream;
                let mut reply = |text: &str| {
                    let _ = writer.write_all(text.as_bytes());
                    let _ = writer.flush();
                };

                reply("220 localhost ESMTP fake\r\n");

                let mut login_step = 0;
                let mut in_data = false;
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string();

                    if in_data {
                        if line == "." {
                            in_data = false;
                            reply("250 2.0.0 Ok: queued\r\n");
                        }
                        continue;
                    }
                    recorded.lock().unwrap().push(line.clone());

                    if line.eq_ignore_ascii_case("QUIT") {
                        reply("221 2.0.0 Bye\r\n");
                        break;
                    }

                    if login_step > 0 {
                        if line == "*" {
                            login_step = 0;
                            reply("501 5.7.0 Authentication cancelled\r\n");
                        } else if script.endless_prompts {
                            reply(&script.prompt("Username:"));
                        } else if login_step == 1 {
                            login_step = 2;
                            reply(&script.prompt("Password:"));
                        } else {
                            login_step = 0;
                            reply("235 2.7.0 Authentication successful\r\n");
                        }
                        continue;
                    }

                    let upper = line.to_ascii_uppercase();
                    if upper.starts_with("EHLO") {
                        match script.advertise_auth {
                            Some(mechanisms) => reply(&format!(
                                "250-localhost\r\n250-AUTH {}\r\n250 HELP\r\n",
                                mechanisms
                            )),
                            None => reply("250-localhost\r\n250 HELP\r\n"),
                        }
                    } else if upper == "AUTH LOGIN" {
                        login_step = 1;
                        reply(&script.prompt(script.first_prompt));
                    } else if upper.starts_with("AUTH PLAIN") {
                        reply("235 2.7.0 Authentication successful\r\n");
                    } else if upper.starts_with("MAIL FROM") || upper.starts_with("RCPT TO") {
                        reply("250 2.1.0 Ok\r\n");
                    } else if upper == "DATA" {
                        in_data = true;
                        reply("354 End data with <CR><LF>.<CR><LF>\r\n");
                    } else {
                        reply("502 5.5.2 Command not recognized\r\n");
                    }
                }
            });

            Self {
                address,
                lines,
                handle,
            }
        }

        fn finish(self) -> Vec<String> {
            self.handle.join().expect("Fake server panicked");
            Arc::try_unwrap(self.lines)
                .expect("Lines still shared")
                .into_inner()
                .unwrap()
        }
    }

    fn transport() -> SmtpTransport {
        SmtpTransport::new("localhost", Some(Duration::from_secs(5)))
    }

    fn message() -> MailMessage {
        MailMessage::new(
            &["a@x.com".to_string(), "b@x.com".to_string()],
            "noreply@example.com",
            "Deploy finished",
            "<p>ok</p>",
        )
    }

    #[test]
    fn test_deliver_with_login_auth() {
        let server = FakeServer::start(Script::default());
        let session = Session::opportunistic(server.address.to_string());
        let auth = AuthStrategy::Login(LoginAuth::new("user", "s3cret"));

        transport().deliver(&session, Some(&auth), &message()).unwrap();

        let lines = server.finish();
        let auth_at = lines.iter().position(|l| l == "AUTH LOGIN").unwrap();
        assert_eq!(lines[auth_at + 1], STANDARD.encode("user"));
        assert_eq!(lines[auth_at + 2], STANDARD.encode("s3cret"));
        assert!(lines.iter().any(|l| l.starts_with("MAIL FROM:<noreply@example.com>")));
        let rcpts: Vec<&String> = lines.iter().filter(|l| l.starts_with("RCPT TO")).collect();
        assert_eq!(rcpts.len(), 2);
        assert_eq!(lines.last().map(String::as_str), Some("QUIT"));
    }

    #[test]
    fn test_deliver_with_plain_auth_on_localhost() {
        let server = FakeServer::start(Script::default());
        let session = Session::opportunistic(server.address.to_string());
        let auth = AuthStrategy::Plain(PlainAuth::new("", "user", "s3cret", "127.0.0.1"));

        transport().deliver(&session, Some(&auth), &message()).unwrap();

        let lines = server.finish();
        let expected = format!("AUTH PLAIN {}", STANDARD.encode("\0user\0s3cret"));
        assert!(lines.contains(&expected));
    }

    #[test]
    fn test_unexpected_challenge_cancels_exchange() {
        let server = FakeServer::start(Script {
            first_prompt: "Foo:",
            ..Script::default()
        });
        let session = Session::opportunistic(server.address.to_string());
        let auth = AuthStrategy::Login(LoginAuth::new("user", "s3cret"));

        let err = transport()
            .deliver(&session, Some(&auth), &message())
            .unwrap_err();

        assert_eq!(
            err.as_auth(),
            Some(&AuthError::UnexpectedChallenge {
                challenge: "foo:".to_string()
            })
        );
        let lines = server.finish();
        assert!(lines.contains(&"*".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("MAIL FROM")));
        assert!(!lines.contains(&STANDARD.encode("s3cret")));
    }

    #[test]
    fn test_auth_not_advertised() {
        let server = FakeServer::start(Script {
            advertise_auth: None,
            ..Script::default()
        });
        let session = Session::opportunistic(server.address.to_string());
        let auth = AuthStrategy::Login(LoginAuth::new("user", "s3cret"));

        let err = transport()
            .deliver(&session, Some(&auth), &message())
            .unwrap_err();

        assert!(matches!(err, TransportError::AuthNotSupported));
        server.finish();
    }

    #[test]
    fn test_deliver_without_auth() {
        let server = FakeServer::start(Script {
            advertise_auth: None,
            ..Script::default()
        });
        let session = Session::opportunistic(server.address.to_string());

        transport().deliver(&session, None, &message()).unwrap();

        let lines = server.finish();
        assert!(!lines.iter().any(|l| l.starts_with("AUTH")));
        assert!(lines.contains(&"DATA".to_string()));
    }

    #[test]
    fn test_invalid_address_fails_before_connecting() {
        let session = Session::opportunistic("smtp.example.com");
        let err = transport().deliver(&session, None, &message()).unwrap_err();
        assert!(matches!(err, TransportError::Endpoint(_)));
    }

    #[test]
    fn test_endless_challenges_are_cut_off() {
        let server = FakeServer::start(Script {
            endless_prompts: true,
            ..Script::default()
        });
        let session = Session::opportunistic(server.address.to_string());
        let auth = AuthStrategy::Login(LoginAuth::new("user", "s3cret"));

        let err = transport()
            .deliver(&session, Some(&auth), &message())
            .unwrap_err();

        assert!(matches!(err, TransportError::TooManyChallenges));
        let lines = server.finish();
        let answers = lines.iter().filter(|l| **l == STANDARD.encode("user")).count();
        assert_eq!(answers, MAX_CHALLENGES);
        assert!(!lines.iter().any(|l| l.starts_with("MAIL FROM")));
    }

    #[test]
    fn test_unencoded_prompts_are_passed_through() {
        let server = FakeServer::start(Script {
            encode_prompts: false,
            ..Script::default()
        });
        let session = Session::opportunistic(server.address.to_string());
        let auth = AuthStrategy::Login(LoginAuth::new("user", "s3cret"));

        transport().deliver(&session, Some(&auth), &message()).unwrap();

        let lines = server.finish();
        let auth_at = lines.iter().position(|l| l == "AUTH LOGIN").unwrap();
        assert_eq!(lines[auth_at + 1], STANDARD.encode("user"));
        assert_eq!(lines[auth_at + 2], STANDARD.encode("s3cret"));
        assert!(lines.contains(&"DATA".to_string()));
    }

    #[test]
    fn test_unsupported_mechanisms_still_advertise_auth() {
        let server = FakeServer::start(Script {
            advertise_auth: Some("CRAM-MD5"),
            ..Script::default()
        });
        let session = Session::opportunistic(server.address.to_string());
        let auth = AuthStrategy::Login(LoginAuth::new("user", "s3cret"));

        transport().deliver(&session, Some(&auth), &message()).unwrap();

        let lines = server.finish();
        assert!(lines.contains(&"AUTH LOGIN".to_string()));
        assert!(lines.contains(&"DATA".to_string()));
    }

    #[test]
    fn test_implicit_tls_without_auth_keyword_sends_unauthenticated() {
        let server = FakeServer::start(Script {
            advertise_auth: None,
            ..Script::default()
        });
        let transport = transport();
        let mut connection = SmtpConnection::connect(
            server.address,
            Some(Duration::from_secs(5)),
            &transport.hello_name,
            None,
            None,
        )
        .unwrap();
        let security = Security::Implicit {
            server_name: "127.0.0.1".to_string(),
        };
        let auth = AuthStrategy::Login(LoginAuth::new("user", "s3cret"));
        let message = message().to_message().unwrap();

        transport
            .transact(&mut connection, "127.0.0.1", &security, Some(&auth), &message)
            .unwrap();
        connection.quit().unwrap();

        let lines = server.finish();
        assert!(!lines.iter().any(|l| l.starts_with("AUTH")));
        assert!(lines.contains(&"DATA".to_string()));
    }

    #[test]
    fn test_auth_mechanisms_by_security() {
        let implicit = Security::Implicit {
            server_name: "smtp.example.com".to_string(),
        };
        let login = Some(vec!["LOGIN".to_string()]);

        assert_eq!(auth_mechanisms(&implicit, None).unwrap(), None);
        assert!(matches!(
            auth_mechanisms(&Security::Opportunistic, None),
            Err(TransportError::AuthNotSupported)
        ));
        assert_eq!(auth_mechanisms(&implicit, login.clone()).unwrap(), login);
        assert_eq!(
            auth_mechanisms(&Security::Opportunistic, login.clone()).unwrap(),
            login
        );
    }

    #[test]
    fn test_parse_auth_keyword() {
        let lines = ["smtp.example.com", "PIPELINING", "AUTH cram-md5 PLAIN", "HELP"];
        assert_eq!(
            parse_auth_keyword(lines.into_iter()),
            Some(vec!["CRAM-MD5".to_string(), "PLAIN".to_string()])
        );
        assert_eq!(
            parse_auth_keyword(["localhost", "AUTH=LOGIN"].into_iter()),
            Some(vec!["LOGIN".to_string()])
        );
        assert_eq!(parse_auth_keyword(["localhost", "AUTH"].into_iter()), Some(vec![]));
        assert_eq!(parse_auth_keyword(["localhost", "AUTHORITY x"].into_iter()), None);
        assert_eq!(parse_auth_keyword(["localhost", "8BITMIME"].into_iter()), None);
    }
}
