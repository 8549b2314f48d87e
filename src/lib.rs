//! relaymail is a minimal, blocking SMTP client.
//!
//! It opens one connection to a relay server, performs the handshake
//! (`EHLO`, optional `STARTTLS`, `AUTH LOGIN`) and sends a single composed
//! message through it. Every exchange with the server is kept in a
//! [`ConversationLog`](smtp::conversation::ConversationLog) that can be inspected
//! once the message has been sent.
//!
//! This client is designed to send emails to a relay server, and should *not* be
//! used to send emails directly to the destination.
//!
//! ## Example
//!
//! ```rust,no_run
//! use relaymail::{config::MailerConfig, Mail};
//!
//! let config = MailerConfig::from_json(
//!     r#"{
//!         "defaults": { "connection": "relay", "port": 25, "timeout": 30, "security": "none" },
//!         "connections": {
//!             "relay": {
//!                 "host": "smtp.example.com",
//!                 "port": 587,
//!                 "username": "user@example.com",
//!                 "password": "password",
//!                 "security": "TLS"
//!             }
//!         }
//!     }"#,
//! )?;
//!
//! let mut mail = Mail::connect(&config)?;
//! mail.set_html();
//! mail.from = "John Doe <john@example.com>".to_owned();
//! mail.to = "to@example.com".into();
//! mail.cc = ["cc1@example.com", "cc2@example.com"].into();
//! mail.bcc = "bcc@example.com".into();
//! mail.subject = "Test email!".to_owned();
//! mail.body = "<h1>Test email</h1><b>HTML</b> is supported.".to_owned();
//! mail.add_header("X-Mailer", format!("relaymail/{}", relaymail::package_info().version));
//!
//! if mail.send() {
//!     println!("Success!");
//! }
//! print!("{}", mail.display_log());
//! # Ok::<(), relaymail::smtp::Error>(())
//! ```
//!
//! ## Features
//!
//! * `native-tls` (default): `STARTTLS` through the platform TLS library
//! * `rustls`: `STARTTLS` through rustls, trusting the `webpki-roots` certificates
//! * `tracing` (default): debug events for every line written to and read from the server
//! * `hostname`: [`ClientId::hostname`](smtp::commands::ClientId::hostname) to announce
//!   the local hostname in `EHLO`

#![doc(html_root_url = "https://docs.rs/crate/relaymail/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    unsafe_code
)]

pub mod config;
pub mod message;
pub mod smtp;

pub use crate::{config::MailerConfig, message::Mail};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Information about this package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageInfo {
    /// Crate name
    pub name: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Project homepage, empty when unknown
    pub homepage: &'static str,
}

/// Returns the name, version and homepage of this package
pub fn package_info() -> PackageInfo {
    PackageInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        homepage: env!("CARGO_PKG_HOMEPAGE"),
    }
}
