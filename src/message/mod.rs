//! Composes one message and sends it through a session
//!
//! A [`Mail`] owns the [`SmtpSession`] it sends through. Sending runs a single
//! transaction and then closes the session, so a `Mail` is good for one send.
//!
//! ```rust,no_run
//! use relaymail::{
//!     config::{ConnectionProfile, Security},
//!     smtp::SmtpSession,
//!     Mail,
//! };
//!
//! let profile = ConnectionProfile::new("smtp.example.com", ("user", "password").into())
//!     .with_security(Security::Tls);
//! let mut mail = Mail::new(SmtpSession::open(profile)?);
//!
//! mail.from = "NoBody <nobody@example.com>".to_owned();
//! mail.to = ["Hei <hei@example.com>", "root@example.org"].into();
//! mail.subject = "Happy new year".to_owned();
//! mail.body = "Be happy!".to_owned();
//!
//! match mail.try_send() {
//!     Ok(response) if response.has_code(250) => println!("queued: {response}"),
//!     Ok(response) => println!("refused: {response}"),
//!     Err(err) => println!("could not send: {err}"),
//! }
//! # Ok::<(), relaymail::smtp::Error>(())
//! ```
//!
//! Bcc addresses are given to the relay as recipients but never written in the
//! headers.

use crate::{
    config::MailerConfig,
    smtp::{
        commands::{self, Data, Quit, Rcpt},
        conversation::ConversationLog,
        error,
        response::Response,
        Error, SmtpSession,
    },
};

pub use self::{
    address::{bare_address, Recipients, ADDRESS_SEPARATOR},
    header::Headers,
};

mod address;
pub mod header;

/// Value of the `MIME-Version` header starting every message
pub const MIME_VERSION: &str = "1.0";

/// Default value of [`Mail::charset`]
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// A message and the session it will be sent through
#[derive(Debug)]
pub struct Mail {
    /// Author, bare or in display form
    pub from: String,
    /// Main recipients, rendered in `To`
    pub to: Recipients,
    /// Copied recipients, rendered in `Cc`
    pub cc: Recipients,
    /// Only given to the relay, never rendered
    pub bcc: Recipients,
    /// Left out of the headers when empty
    pub subject: String,
    /// Message text, any line ending convention
    pub body: String,
    /// Charset announced with HTML bodies
    pub charset: String,
    html: bool,
    /// Caller supplied headers, they win over the computed ones
    headers: Headers,
    session: SmtpSession,
}

impl Mail {
    /// Creates an empty message bound to an open session
    pub fn new(session: SmtpSession) -> Self {
        Mail {
            from: String::new(),
            to: Recipients::new(),
            cc: Recipients::new(),
            bcc: Recipients::new(),
            subject: String::new(),
            body: String::new(),
            charset: DEFAULT_CHARSET.to_owned(),
            html: false,
            headers: Headers::new(),
            session,
        }
    }

    /// Opens a session with the default profile of `config`
    pub fn connect(config: &MailerConfig) -> Result<Self, Error> {
        SmtpSession::from_config(config, None).map(Self::new)
    }

    /// Marks the body as HTML
    pub fn set_html(&mut self) {
        self.html = true;
    }

    /// Tells if [`set_html`](Mail::set_html) was called
    pub fn is_html(&self) -> bool {
        self.html
    }

    /// Adds a header, replacing a computed one with the same name
    ///
    /// Adding the same name twice keeps the last value. Line breaks are
    /// replaced by spaces.
    pub fn add_header<N: AsRef<str>, V: AsRef<str>>(&mut self, name: N, value: V) {
        self.headers.set(name, value);
    }

    /// Every envelope recipient: `to`, then `cc`, then `bcc`
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }

    /// `Content-Type` of the body, if it is not plain text
    pub fn content_type(&self) -> Option<String> {
        self.html
            .then(|| format!("text/html; charset={}", self.charset))
    }

    /// The header block as it will be sent
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.set("MIME-Version", MIME_VERSION);
        if !self.from.is_empty() {
            headers.set("From", &self.from);
        }
        if !self.subject.is_empty() {
            headers.set("Subject", &self.subject);
        }
        if !self.to.is_empty() {
            headers.set("To", self.to.to_string());
        }
        if !self.cc.is_empty() {
            headers.set("Cc", self.cc.to_string());
        }
        if let Some(content_type) = self.content_type() {
            headers.set("Content-Type", content_type);
        }
        for (name, value) in self.headers.iter() {
            headers.set(name, value);
        }
        headers
    }

    /// Everything sent after `DATA`, without the final `<CRLF>`
    ///
    /// Headers, a blank line, the body with `<CRLF>` line endings and dot
    /// stuffing, then the `<CRLF>.` terminator.
    pub fn data(&self) -> String {
        let mut data = self.headers().to_string();
        data.push_str("\r\n");

        let body = self.body.replace("\r\n", "\n").replace('\r', "\n");
        for (i, line) in body.split('\n').enumerate() {
            if i > 0 {
                data.push_str("\r\n");
            }
            if line.starts_with('.') {
                data.push('.');
            }
            data.push_str(line);
        }

        data.push_str("\r\n.");
        data
    }

    /// Sends the message and tells if the relay accepted it
    ///
    /// `true` only when the reply to the end of data has code 250. Transport
    /// failures are reported as `false`, see [`try_send`](Mail::try_send) to
    /// tell them apart.
    pub fn send(&mut self) -> bool {
        match self.try_send() {
            Ok(response) => response.has_code(250),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("could not send message: {_err}");
                false
            }
        }
    }

    /// Runs the transaction and returns the reply to the end of data
    ///
    /// Refusals of the sender or of some recipients do not stop the
    /// transaction, they only show in the log. The session is closed on
    /// every path.
    pub fn try_send(&mut self) -> Result<Response, Error> {
        let result = self.transaction();
        self.session.close();
        result
    }

    fn transaction(&mut self) -> Result<Response, Error> {
        let from = envelope_address(&self.from)?;
        let recipients = self
            .recipients()
            .map(envelope_address)
            .collect::<Result<Vec<_>, _>>()?;

        self.session
            .exchange("MAIL FROM", commands::Mail::new(from))?;
        for recipient in recipients {
            self.session.exchange("RCPT TO", Rcpt::new(recipient))?;
        }
        self.session.exchange("DATA", Data)?;

        let data = self.data();
        let response = self.session.exchange("DATA", data)?;

        // the message is queued whatever happens from here
        if let Err(_err) = self.session.exchange("QUIT", Quit) {
            #[cfg(feature = "tracing")]
            tracing::debug!("QUIT failed: {_err}");
        }

        Ok(response)
    }

    /// The session this message is sent through
    pub fn session(&self) -> &SmtpSession {
        &self.session
    }

    /// Every exchange with the relay, including the handshake
    pub fn conversation_log(&self) -> &ConversationLog {
        self.session.log()
    }

    /// The log rendered between start and end markers
    pub fn display_log(&self) -> String {
        self.conversation_log().to_string()
    }
}

/// Bare form of an envelope address
///
/// A line break would end the command early and let the rest of the address
/// be read by the relay as another command.
fn envelope_address(address: &str) -> Result<String, Error> {
    let bare = bare_address(address);
    if bare.contains(['\r', '\n']) {
        return Err(error::client(format!(
            "line break in envelope address {bare:?}"
        )));
    }
    Ok(bare.to_owned())
}
