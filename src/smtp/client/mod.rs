//! SMTP client
//!
//! `SmtpSession` lets you send commands on one connection to a relay. Opening
//! a session performs the whole handshake:
//!
//! ```rust,no_run
//! use relaymail::{
//!     config::{ConnectionProfile, Security},
//!     smtp::{
//!         commands::{Data, Mail, Quit, Rcpt},
//!         SmtpSession,
//!     },
//! };
//!
//! let profile = ConnectionProfile::new("smtp.example.com", ("user", "password").into())
//!     .with_port(587)
//!     .with_security(Security::Tls);
//!
//! let mut session = SmtpSession::open(profile)?;
//! session.exchange("MAIL FROM", Mail::new("user@example.com"))?;
//! session.exchange("RCPT TO", Rcpt::new("root@example.org"))?;
//! session.exchange("DATA", Data)?;
//! session.exchange("DATA", "Subject: hi\r\n\r\nHello\r\n.")?;
//! session.exchange("QUIT", Quit)?;
//! session.close();
//!
//! for entry in session.log() {
//!     println!("{entry}");
//! }
//! # Ok::<(), relaymail::smtp::Error>(())
//! ```

#[doc(hidden)]
pub mod mock;
mod net;
mod session;
#[cfg(any(feature = "native-tls", feature = "rustls"))]
mod tls;

pub use self::{
    net::NetworkStream,
    session::{SessionBuilder, SessionState, SmtpSession},
};
#[cfg(any(feature = "native-tls", feature = "rustls"))]
pub use self::tls::TlsParameters;

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
#[cfg(feature = "tracing")]
pub(super) fn escape_crlf(string: &str) -> String {
    string.replace("\r\n", "<CRLF>")
}
