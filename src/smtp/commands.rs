//! SMTP commands
//!
//! Commands render without their trailing `<CRLF>`, which is appended by
//! [`SmtpSession::send_command`](crate::smtp::SmtpSession::send_command).

use std::{
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, Ipv6Addr},
};

/// Client identifier, the parameter to `EHLO`
///
/// Defaults to [`ClientId::Empty`], which sends a bare `EHLO`.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
#[non_exhaustive]
pub enum ClientId {
    /// No parameter at all
    #[default]
    Empty,
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
    /// An IPv6 address
    Ipv6(Ipv6Addr),
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Empty => Ok(()),
            Self::Domain(ref value) => f.write_str(value),
            Self::Ipv4(ref value) => write!(f, "[{value}]"),
            Self::Ipv6(ref value) => write!(f, "[IPv6:{value}]"),
        }
    }
}

impl ClientId {
    /// Builds a `ClientId` from the local hostname
    ///
    /// Falls back to the `127.0.0.1` address literal when the hostname is
    /// unavailable or not valid unicode.
    #[cfg(feature = "hostname")]
    #[cfg_attr(docsrs, doc(cfg(feature = "hostname")))]
    pub fn hostname() -> Self {
        hostname::get()
            .ok()
            .and_then(|s| s.into_string().map(Self::Domain).ok())
            .unwrap_or(Self::Ipv4(Ipv4Addr::LOCALHOST))
    }
}

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.client_id {
            ClientId::Empty => f.write_str("EHLO"),
            ref client_id => write!(f, "EHLO {client_id}"),
        }
    }
}

impl Ehlo {
    /// Creates a EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Starttls;

impl Display for Starttls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STARTTLS")
    }
}

/// AUTH LOGIN command, without initial response
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct AuthLogin;

impl Display for AuthLogin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("AUTH LOGIN")
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail {
    sender: String,
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MAIL FROM:<{}>", self.sender)
    }
}

impl Mail {
    /// Creates a MAIL command from a bare address
    pub fn new<S: Into<String>>(sender: S) -> Mail {
        Mail {
            sender: sender.into(),
        }
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rcpt {
    recipient: String,
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RCPT TO:<{}>", self.recipient)
    }
}

impl Rcpt {
    /// Creates an RCPT command from a bare address
    pub fn new<S: Into<String>>(recipient: S) -> Rcpt {
        Rcpt {
            recipient: recipient.into(),
        }
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT")
    }
}
