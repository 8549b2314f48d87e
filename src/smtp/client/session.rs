use std::{
    fmt::Display,
    io::{BufRead, BufReader, Read, Write},
    net::Shutdown,
    time::Duration,
};

#[cfg(feature = "tracing")]
use super::escape_crlf;
#[cfg(any(feature = "native-tls", feature = "rustls"))]
use super::TlsParameters;
use super::NetworkStream;
use crate::{
    config::{ConnectionProfile, MailerConfig, Security},
    smtp::{
        authentication::{Authenticator, BlindLogin},
        commands::{ClientId, Ehlo, Starttls},
        conversation::ConversationLog,
        error::{self, Error},
        response::{is_last_line, Response},
    },
};

/// Longest reply line accepted, `<CRLF>` included
///
/// RFC 5321 limits reply lines to 512 octets; relays exceeding it are
/// tolerated up to the text line limit.
const MAX_LINE_LENGTH: usize = 1000;

/// What a session upgrades its connection with when `STARTTLS` is requested
#[cfg(any(feature = "native-tls", feature = "rustls"))]
type Upgrade = TlsParameters;
#[cfg(not(any(feature = "native-tls", feature = "rustls")))]
type Upgrade = std::convert::Infallible;

/// Lifecycle of a session
///
/// `Disconnected → Connecting → HandshakeInit → (SecurityUpgrade) →
/// Authenticating → Ready → Closed`. Any failure before `Ready` closes the
/// session.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SessionState {
    /// Nothing dialed yet
    Disconnected,
    /// Socket connected, waiting for the greeting
    Connecting,
    /// Greeting received, `EHLO` exchange in progress
    HandshakeInit,
    /// `STARTTLS` exchange and TLS negotiation in progress
    SecurityUpgrade,
    /// Authenticator running
    Authenticating,
    /// Handshake complete, ready for a mail transaction
    Ready,
    /// Socket released
    Closed,
}

/// Configures and opens an [`SmtpSession`]
#[derive(Debug)]
pub struct SessionBuilder {
    profile: ConnectionProfile,
    hello_name: ClientId,
    authenticator: Box<dyn Authenticator>,
    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    tls_parameters: Option<TlsParameters>,
}

impl SessionBuilder {
    /// Starts from a resolved profile, a bare `EHLO` and [`BlindLogin`]
    pub fn new(profile: ConnectionProfile) -> Self {
        Self {
            profile,
            hello_name: ClientId::default(),
            authenticator: Box::new(BlindLogin),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            tls_parameters: None,
        }
    }

    /// Sets the name sent with `EHLO`
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.hello_name = name;
        self
    }

    /// Replaces the authentication step
    pub fn authenticator<A: Authenticator + 'static>(mut self, authenticator: A) -> Self {
        self.authenticator = Box::new(authenticator);
        self
    }

    /// Sets the parameters used after `STARTTLS`
    ///
    /// Only used with the `tls` security mode.
    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    #[cfg_attr(docsrs, doc(cfg(any(feature = "native-tls", feature = "rustls"))))]
    pub fn tls_parameters(mut self, tls_parameters: TlsParameters) -> Self {
        self.tls_parameters = Some(tls_parameters);
        self
    }

    /// Dials the relay and performs the handshake
    pub fn open(mut self) -> Result<SmtpSession, Error> {
        let upgrade = self.upgrade()?;
        if self.profile.host().is_empty() {
            return Err(error::configuration("mail connection has no host"));
        }

        let stream = NetworkStream::connect(
            self.profile.host(),
            self.profile.port(),
            Some(self.profile.timeout()),
        )?;
        self.handshake(stream, upgrade)
    }

    /// Performs the handshake on an already connected stream
    ///
    /// The greeting has not been read yet. Nothing is dialed, but the profile's
    /// security mode and timeout still apply.
    pub fn open_on(mut self, stream: NetworkStream) -> Result<SmtpSession, Error> {
        let upgrade = self.upgrade()?;
        self.handshake(stream, upgrade)
    }

    fn upgrade(&mut self) -> Result<Option<Upgrade>, Error> {
        match self.profile.security() {
            Security::None => Ok(None),
            Security::Ssl => Err(error::configuration(
                "SSL is not supported because of the POODLE vulnerability, use \"tls\" instead",
            )),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            Security::Tls => match self.tls_parameters.take() {
                Some(tls_parameters) => Ok(Some(tls_parameters)),
                None => TlsParameters::new(self.profile.host().to_owned()).map(Some),
            },
            #[cfg(not(any(feature = "native-tls", feature = "rustls")))]
            Security::Tls => Err(error::configuration(
                "STARTTLS requested but relaymail was built without a TLS backend",
            )),
        }
    }

    fn handshake(self, stream: NetworkStream, upgrade: Option<Upgrade>) -> Result<SmtpSession, Error> {
        let SessionBuilder {
            profile,
            hello_name,
            authenticator,
            ..
        } = self;
        let credentials = profile.credentials().clone();
        let timeout = profile.timeout();

        // dropping the session on any error below closes it
        let mut session = SmtpSession {
            profile,
            stream: Some(BufReader::new(stream)),
            state: SessionState::Disconnected,
            log: ConversationLog::new(),
        };
        session.transition(SessionState::Connecting);
        session.set_timeout(timeout)?;

        let greeting = session.read_response()?;
        session.log.add("CONNECTION", &greeting);

        session.transition(SessionState::HandshakeInit);
        session.exchange("EHLO", Ehlo::new(hello_name.clone()))?;

        if let Some(upgrade) = upgrade {
            session.transition(SessionState::SecurityUpgrade);
            session.exchange("STARTTLS", Starttls)?;
            session.upgrade_tls(&upgrade)?;
            // capabilities must be queried again on the encrypted channel
            session.exchange("EHLO", Ehlo::new(hello_name))?;
        }

        session.transition(SessionState::Authenticating);
        authenticator.authenticate(&mut session, &credentials)?;

        session.transition(SessionState::Ready);
        Ok(session)
    }
}

/// One connection to a relay, from handshake to close
///
/// The session owns its socket; it is released by [`close`](SmtpSession::close)
/// or when the session is dropped, whichever comes first. A read or write
/// failure also closes the session, as the reply stream can no longer be
/// trusted.
///
/// Sessions are not meant to be shared between threads while in use.
#[derive(Debug)]
pub struct SmtpSession {
    profile: ConnectionProfile,
    /// `None` once closed
    stream: Option<BufReader<NetworkStream>>,
    state: SessionState,
    log: ConversationLog,
}

impl SmtpSession {
    /// Returns a builder to customize the handshake
    pub fn builder(profile: ConnectionProfile) -> SessionBuilder {
        SessionBuilder::new(profile)
    }

    /// Opens a session with the default handshake
    pub fn open(profile: ConnectionProfile) -> Result<Self, Error> {
        SessionBuilder::new(profile).open()
    }

    /// Resolves a named profile (or the default one) and opens a session with it
    pub fn from_config(config: &MailerConfig, name: Option<&str>) -> Result<Self, Error> {
        Self::open(config.profile(name)?)
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Tells if the socket is still held
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Tells if the connection was upgraded to TLS
    pub fn is_encrypted(&self) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|stream| stream.get_ref().is_encrypted())
    }

    /// The profile this session was opened with
    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    /// Everything exchanged with the server so far
    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Sends a command and reads one logical reply
    ///
    /// `<CRLF>` is appended to the command. Nothing is logged.
    pub fn send_command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        self.send_line(&command.to_string(), false)
    }

    /// Sends a command and logs its reply under `tag`
    pub fn exchange<T: Into<String>, C: Display>(
        &mut self,
        tag: T,
        command: C,
    ) -> Result<Response, Error> {
        let response = self.send_command(command)?;
        self.log.add(tag, &response);
        Ok(response)
    }

    /// Like [`exchange`](SmtpSession::exchange), but the line never reaches debug output
    pub fn exchange_secret<T: Into<String>>(
        &mut self,
        tag: T,
        secret: &str,
    ) -> Result<Response, Error> {
        let response = self.send_line(secret, true)?;
        self.log.add(tag, &response);
        Ok(response)
    }

    /// Releases the socket
    ///
    /// `QUIT` is not sent. Calling this on a closed session does nothing.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // the peer may already be gone, nothing left to report
            let _ = stream.get_ref().shutdown(Shutdown::Both);
            #[cfg(feature = "tracing")]
            tracing::debug!("connection to {} closed", self.profile.host());
        }
        self.state = SessionState::Closed;
    }

    fn transition(&mut self, state: SessionState) {
        #[cfg(feature = "tracing")]
        tracing::trace!("session {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        let timeout = (!timeout.is_zero()).then_some(timeout);
        let stream = self.stream_mut()?.get_mut();
        stream.set_read_timeout(timeout).map_err(error::network)?;
        stream.set_write_timeout(timeout).map_err(error::network)
    }

    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        let result = self.stream_mut()?.get_mut().upgrade_tls(tls_parameters);
        match result {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("connection encrypted");
                Ok(())
            }
            Err(err) => {
                self.close();
                Err(err)
            }
        }
    }

    #[cfg(not(any(feature = "native-tls", feature = "rustls")))]
    fn upgrade_tls(&mut self, upgrade: &Upgrade) -> Result<(), Error> {
        match *upgrade {}
    }

    fn stream_mut(&mut self) -> Result<&mut BufReader<NetworkStream>, Error> {
        self.stream
            .as_mut()
            .ok_or_else(|| error::client("the session is closed"))
    }

    fn send_line(&mut self, line: &str, secret: bool) -> Result<Response, Error> {
        let result = self.write_line(line, secret).and_then(|()| self.read_response());
        if let Err(ref err) = result {
            if err.is_network() || err.is_protocol() {
                self.close();
            }
        }
        result
    }

    /// Writes one line followed by `<CRLF>`
    fn write_line(&mut self, line: &str, secret: bool) -> Result<(), Error> {
        let mut buf = String::with_capacity(line.len() + 2);
        buf.push_str(line);
        buf.push_str("\r\n");

        let stream = self.stream_mut()?.get_mut();
        stream.write_all(buf.as_bytes()).map_err(error::network)?;
        stream.flush().map_err(error::network)?;

        #[cfg(feature = "tracing")]
        {
            if secret {
                tracing::debug!("Wrote: <redacted><CRLF>");
            } else {
                tracing::debug!("Wrote: {}", escape_crlf(&buf));
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _ = secret;

        Ok(())
    }

    /// Reads lines until the one ending the reply
    pub(crate) fn read_response(&mut self) -> Result<Response, Error> {
        let stream = self.stream_mut()?;
        let mut lines = Vec::new();
        let mut buffer = Vec::with_capacity(100);

        loop {
            buffer.clear();
            let read = stream
                .by_ref()
                .take(MAX_LINE_LENGTH as u64)
                .read_until(b'\n', &mut buffer)
                .map_err(error::network)?;
            if read == 0 {
                return Err(error::protocol("incomplete response"));
            }
            if read == MAX_LINE_LENGTH && buffer.last() != Some(&b'\n') {
                return Err(error::protocol(format!(
                    "reply line longer than {MAX_LINE_LENGTH} bytes"
                )));
            }

            let line = String::from_utf8_lossy(&buffer);
            #[cfg(feature = "tracing")]
            tracing::debug!("<< {}", escape_crlf(&line));

            let last = is_last_line(&line);
            lines.push(line.into_owned());
            if last {
                return Ok(Response::new(lines));
            }
        }
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        self.close();
    }
}
