//! SMTP `AUTH LOGIN` challenge responder.
//!
//! LOGIN is not a registered SASL mechanism, but most submission servers
//! still offer it. The server prompts twice, with `Username:` and then
//! `Password:` (base64 encoded on the wire), and the client answers each
//! prompt with the matching credential.

use std::fmt;

use super::auth::{AuthStart, ServerInfo};
use super::error::AuthError;

const USERNAME_PROMPT: &str = "username:";
const PASSWORD_PROMPT: &str = "password:";

/// Credentials answered through the two LOGIN prompts
#[derive(Clone, PartialEq, Eq)]
pub struct LoginAuth {
    username: String,
    password: String,
}

impl LoginAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Declares the `LOGIN` mechanism without an initial response.
    pub fn start(&self, _server: &ServerInfo) -> Result<AuthStart, AuthError> {
        Ok(AuthStart::new("LOGIN", None))
    }

    /// Answers one server prompt.
    ///
    /// Prompts are matched case-insensitively. An unknown prompt fails the
    /// exchange instead of guessing which credential to reveal. Once the server
    /// has nothing more to ask, there is nothing left to send.
    pub fn next(&self, from_server: &[u8], more: bool) -> Result<Option<Vec<u8>>, AuthError> {
        if !more {
            return Ok(None);
        }

        let challenge = String::from_utf8_lossy(from_server).to_lowercase();
        match challenge.as_str() {
            USERNAME_PROMPT => Ok(Some(self.username.as_bytes().to_vec())),
            PASSWORD_PROMPT => Ok(Some(self.password.as_bytes().to_vec())),
            _ => Err(AuthError::UnexpectedChallenge { challenge }),
        }
    }
}

impl fmt::Debug for LoginAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn auth() -> LoginAuth {
        LoginAuth::new("user@example.com", "s3cret")
    }

    fn server() -> ServerInfo {
        ServerInfo::new("smtp.example.com", true, vec!["LOGIN".to_string()])
    }

    #[test]
    fn test_start_declares_login_without_initial_response() {
        let start = auth().start(&server()).unwrap();
        assert_eq!(start.mechanism, "LOGIN");
        assert!(start.initial_response.is_none());
    }

    #[test]
    fn test_next_answers_username_prompt() {
        let reply = auth().next(b"Username:", true).unwrap();
        assert_eq!(reply, Some(b"user@example.com".to_vec()));
    }

    #[test]
    fn test_next_answers_password_prompt() {
        let reply = auth().next(b"Password:", true).unwrap();
        assert_eq!(reply, Some(b"s3cret".to_vec()));
    }

    #[test]
    fn test_next_rejects_unknown_prompt() {
        let err = auth().next(b"Foo:", true).unwrap_err();
        assert_eq!(
            err,
            AuthError::UnexpectedChallenge {
                challenge: "foo:".to_string()
            }
        );
        assert!(err.to_string().contains("foo:"));
    }

    #[test]
    fn test_next_without_more_data_sends_nothing() {
        assert_eq!(auth().next(b"2.7.0 Authentication successful", false).unwrap(), None);
        assert_eq!(auth().next(b"Foo:", false).unwrap(), None);
        assert_eq!(auth().next(b"", false).unwrap(), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", auth());
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("s3cret"));
    }

    proptest! {
        #[test]
        fn property_prompts_match_in_any_case(
            mask in proptest::collection::vec(any::<bool>(), 9),
            username in "[a-z0-9@.]{1,30}",
        ) {
            let prompt: String = USERNAME_PROMPT
                .chars()
                .zip(mask.iter())
                .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
                .collect();

            let auth = LoginAuth::new(username.clone(), "pw");
            let reply = auth.next(prompt.as_bytes(), true).unwrap();
            prop_assert_eq!(reply, Some(username.into_bytes()));
        }
    }
}
