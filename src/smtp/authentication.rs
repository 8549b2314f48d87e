//! `AUTH LOGIN` authentication
//!
//! The exchange itself is pluggable through [`Authenticator`]. Sessions use
//! [`BlindLogin`] unless told otherwise: it sends the three lines of the
//! `LOGIN` mechanism without looking at the server's replies, leaving the
//! verdict to the rest of the transaction. [`CheckedLogin`] validates every
//! challenge and the final reply instead.

use std::fmt::{self, Debug, Formatter};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::smtp::{
    commands::AuthLogin,
    error::{self, Error},
    response::Response,
    SmtpSession,
};

/// Contains user credentials
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Credentials {
    authentication_identity: String,
    secret: String,
}

impl Credentials {
    /// Create a `Credentials` struct from username and password
    pub fn new(username: String, password: String) -> Credentials {
        Credentials {
            authentication_identity: username,
            secret: password,
        }
    }

    /// The username
    pub fn username(&self) -> &str {
        &self.authentication_identity
    }
}

impl<S, T> From<(S, T)> for Credentials
where
    S: Into<String>,
    T: Into<String>,
{
    fn from((username, password): (S, T)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.authentication_identity)
            .finish_non_exhaustive()
    }
}

/// Runs the authentication step of a session's handshake
///
/// Implementations send their commands through [`SmtpSession::exchange`] (or
/// [`SmtpSession::exchange_secret`] for anything derived from the password) so
/// every step ends up in the conversation log.
pub trait Authenticator: Debug + Send + Sync {
    /// Authenticates `credentials` on a session that finished its `EHLO`
    fn authenticate(&self, session: &mut SmtpSession, credentials: &Credentials)
        -> Result<(), Error>;
}

/// Fixed three line `AUTH LOGIN` exchange
///
/// Sends `AUTH LOGIN`, the base64 username and the base64 password, logging
/// them as `AUTH LOGIN`, `USERNAME` and `PASSWORD`. Reply codes are not
/// inspected: a refused login shows up later as a failed transaction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlindLogin;

impl Authenticator for BlindLogin {
    fn authenticate(
        &self,
        session: &mut SmtpSession,
        credentials: &Credentials,
    ) -> Result<(), Error> {
        session.exchange("AUTH LOGIN", AuthLogin)?;
        session.exchange_secret("USERNAME", &encode(&credentials.authentication_identity))?;
        session.exchange_secret("PASSWORD", &encode(&credentials.secret))?;
        Ok(())
    }
}

/// `AUTH LOGIN` exchange that checks every server reply
///
/// Each line is only sent after a `334` challenge asking for it, and the final
/// reply must be `235`. Any other answer fails with an authentication error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckedLogin;

impl Authenticator for CheckedLogin {
    fn authenticate(
        &self,
        session: &mut SmtpSession,
        credentials: &Credentials,
    ) -> Result<(), Error> {
        let response = session.exchange("AUTH LOGIN", AuthLogin)?;
        expect_challenge(&response, Challenge::Username)?;

        let response =
            session.exchange_secret("USERNAME", &encode(&credentials.authentication_identity))?;
        expect_challenge(&response, Challenge::Password)?;

        let response = session.exchange_secret("PASSWORD", &encode(&credentials.secret))?;
        if response.has_code(235) {
            Ok(())
        } else {
            Err(error::authentication(format!(
                "authentication refused: {response}"
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Challenge {
    Username,
    Password,
}

impl Challenge {
    fn prompts(self) -> &'static [&'static str] {
        match self {
            Challenge::Username => &["User Name", "Username:", "Username"],
            Challenge::Password => &["Password", "Password:"],
        }
    }
}

fn expect_challenge(response: &Response, expected: Challenge) -> Result<(), Error> {
    if !response.has_code(334) {
        return Err(error::authentication(format!(
            "expected a {expected:?} challenge, got: {response}"
        )));
    }

    let prompt = response
        .message()
        .next()
        .and_then(|challenge| STANDARD.decode(challenge).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .ok_or_else(|| error::authentication("challenge is not valid base64"))?;

    if expected.prompts().contains(&prompt.as_str()) {
        Ok(())
    } else {
        Err(error::authentication(format!(
            "unrecognized challenge {prompt:?}"
        )))
    }
}

fn encode(value: &str) -> String {
    STANDARD.encode(value)
}
