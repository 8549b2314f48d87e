//! The SMTP side of relaymail
//!
//! This module talks to a relay over one blocking connection. An
//! [`SmtpSession`] is opened from a [`ConnectionProfile`](crate::config::ConnectionProfile)
//! and performs the whole handshake before it is handed back:
//!
//! * read the greeting
//! * `EHLO`
//! * `STARTTLS` and a second `EHLO` when the profile asks for `tls`
//! * `AUTH LOGIN`, or any other [`Authenticator`](authentication::Authenticator)
//!
//! Every reply is recorded in the session's [`ConversationLog`](conversation::ConversationLog)
//! under a tag naming the step that produced it.
//!
//! Implicit TLS (the `ssl` mode) is refused.
//!
//! #### References
//!
//! * [RFC 5321](https://tools.ietf.org/html/rfc5321): Simple Mail Transfer Protocol
//! * [RFC 3207](https://tools.ietf.org/html/rfc3207): SMTP Service Extension for Secure SMTP over TLS
//! * [RFC 4954](https://tools.ietf.org/html/rfc4954): SMTP Service Extension for Authentication

pub mod authentication;
pub mod client;
pub mod commands;
pub mod conversation;
pub mod error;
pub mod response;

pub use self::{client::SmtpSession, error::Error};
