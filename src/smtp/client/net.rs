#[cfg(any(feature = "native-tls", feature = "rustls"))]
use std::mem;
#[cfg(feature = "rustls")]
use std::sync::Arc;
use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

#[cfg(feature = "native-tls")]
use native_tls::TlsStream;
#[cfg(feature = "rustls")]
use rustls::{pki_types::ServerName, ClientConnection, StreamOwned};

use super::mock::MockStream;
#[cfg(any(feature = "native-tls", feature = "rustls"))]
use super::tls::{InnerTlsParameters, TlsParameters};
use crate::smtp::error::{self, Error};

/// A network stream
pub struct NetworkStream {
    inner: InnerNetworkStream,
}

/// Represents the different types of underlying network streams
// usually only one TLS backend at a time is going to be enabled,
// so clippy::large_enum_variant doesn't make sense here
#[allow(clippy::large_enum_variant)]
enum InnerNetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    #[cfg(feature = "native-tls")]
    NativeTls(TlsStream<TcpStream>),
    /// Encrypted TCP stream
    #[cfg(feature = "rustls")]
    Rustls(StreamOwned<ClientConnection, TcpStream>),
    /// Mock stream
    Mock(MockStream),
    /// Left behind by a failed TLS upgrade
    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    None,
}

impl NetworkStream {
    fn new(inner: InnerNetworkStream) -> Self {
        NetworkStream { inner }
    }

    /// Wraps an in-memory stream
    #[doc(hidden)]
    pub fn mock(stream: MockStream) -> Self {
        Self::new(InnerNetworkStream::Mock(stream))
    }

    /// Opens a plain TCP connection to `host:port`
    ///
    /// Every address `host` resolves to is tried in turn, each bounded by
    /// `timeout`. There is no retry beyond that.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<NetworkStream, Error> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(error::connection)?;

        let mut last_err = None;
        for addr in addrs {
            match try_connect(&addr, timeout) {
                Ok(tcp_stream) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("connected to {addr}");
                    return Ok(Self::new(InnerNetworkStream::Tcp(tcp_stream)));
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => error::connection(err),
            None => error::connection(format!("could not resolve {host}:{port}")),
        })
    }

    /// Tells if the stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        match self.inner {
            InnerNetworkStream::Tcp(_) | InnerNetworkStream::Mock(_) => false,
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(_) => true,
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(_) => true,
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => false,
        }
    }

    /// Upgrades a plain TCP stream to TLS, on the same socket
    ///
    /// Encrypted and mock streams are left untouched.
    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        let inner = mem::replace(&mut self.inner, InnerNetworkStream::None);
        self.inner = match inner {
            InnerNetworkStream::Tcp(tcp_stream) => upgrade_tcp(tcp_stream, tls_parameters)?,
            other => other,
        };
        Ok(())
    }

    /// Shutdowns the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref s) => s.shutdown(how),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref s) => s.get_ref().shutdown(how),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref s) => s.sock.shutdown(how),
            InnerNetworkStream::Mock(_) => Ok(()),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => Ok(()),
        }
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut stream) => stream.set_read_timeout(duration),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut stream) => {
                stream.get_ref().set_read_timeout(duration)
            }
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut stream) => stream.sock.set_read_timeout(duration),
            InnerNetworkStream::Mock(_) => Ok(()),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => Ok(()),
        }
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut stream) => stream.set_write_timeout(duration),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut stream) => {
                stream.get_ref().set_write_timeout(duration)
            }
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut stream) => stream.sock.set_write_timeout(duration),
            InnerNetworkStream::Mock(_) => Ok(()),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => Ok(()),
        }
    }
}

fn try_connect(addr: &SocketAddr, timeout: Option<Duration>) -> io::Result<TcpStream> {
    match timeout {
        Some(timeout) if !timeout.is_zero() => TcpStream::connect_timeout(addr, timeout),
        _ => TcpStream::connect(addr),
    }
}

#[cfg(any(feature = "native-tls", feature = "rustls"))]
fn upgrade_tcp(
    tcp_stream: TcpStream,
    tls_parameters: &TlsParameters,
) -> Result<InnerNetworkStream, Error> {
    match tls_parameters.connector {
        #[cfg(feature = "native-tls")]
        InnerTlsParameters::NativeTls(ref connector) => {
            let stream = connector
                .connect(tls_parameters.domain(), tcp_stream)
                .map_err(|e| error::tls(e.to_string()))?;
            Ok(InnerNetworkStream::NativeTls(stream))
        }
        #[cfg(feature = "rustls")]
        InnerTlsParameters::Rustls(ref config) => {
            let server_name =
                ServerName::try_from(tls_parameters.domain().to_owned()).map_err(error::tls)?;
            let connection =
                ClientConnection::new(Arc::clone(config), server_name).map_err(error::tls)?;
            let mut stream = StreamOwned::new(connection, tcp_stream);
            // drive the handshake now so certificate errors surface during STARTTLS
            while stream.conn.is_handshaking() {
                stream
                    .conn
                    .complete_io(&mut stream.sock)
                    .map_err(error::tls)?;
            }
            Ok(InnerNetworkStream::Rustls(stream))
        }
    }
}

impl Debug for NetworkStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            InnerNetworkStream::Tcp(_) => "Tcp",
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(_) => "NativeTls",
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(_) => "Rustls",
            InnerNetworkStream::Mock(_) => "Mock",
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => "None",
        };
        f.debug_tuple("NetworkStream").field(&kind).finish()
    }
}

#[cfg(any(feature = "native-tls", feature = "rustls"))]
fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "tls upgrade failed")
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.read(buf),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.read(buf),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut s) => s.read(buf),
            InnerNetworkStream::Mock(ref mut s) => s.read(buf),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => Err(not_connected()),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.write(buf),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.write(buf),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut s) => s.write(buf),
            InnerNetworkStream::Mock(ref mut s) => s.write(buf),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => Err(not_connected()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner {
            InnerNetworkStream::Tcp(ref mut s) => s.flush(),
            #[cfg(feature = "native-tls")]
            InnerNetworkStream::NativeTls(ref mut s) => s.flush(),
            #[cfg(feature = "rustls")]
            InnerNetworkStream::Rustls(ref mut s) => s.flush(),
            InnerNetworkStream::Mock(ref mut s) => s.flush(),
            #[cfg(any(feature = "native-tls", feature = "rustls"))]
            InnerNetworkStream::None => Err(not_connected()),
        }
    }
}

#[cfg(test)]
mod test {
    use std::{io::Write, net::TcpListener, time::Duration};

    use super::{MockStream, NetworkStream};

    #[test]
    fn connect_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream =
            NetworkStream::connect("127.0.0.1", port, Some(Duration::from_secs(5))).unwrap();
        assert!(!stream.is_encrypted());
    }

    #[test]
    fn refused_connection_is_a_connection_error() {
        // bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = NetworkStream::connect("127.0.0.1", port, Some(Duration::from_secs(5)))
            .unwrap_err();
        assert!(err.is_connection());
    }

    #[test]
    fn mock_stream_passthrough() {
        let mock = MockStream::new();
        let mut stream = NetworkStream::mock(mock.clone());
        stream.write_all(b"NOOP\r\n").unwrap();
        assert_eq!(mock.written(), "NOOP\r\n");
        assert!(stream.shutdown(std::net::Shutdown::Both).is_ok());
        assert_eq!(format!("{stream:?}"), "NetworkStream(\"Mock\")");
    }
}
