use std::fmt::{self, Debug};
#[cfg(feature = "rustls")]
use std::sync::Arc;

#[cfg(feature = "native-tls")]
use native_tls::TlsConnector;
#[cfg(feature = "rustls")]
use rustls::{ClientConfig, RootCertStore};

use crate::smtp::error::{self, Error};

/// Parameters used to upgrade a session with `STARTTLS`
///
/// When a session is opened with the `tls` security mode and no parameters
/// were given, [`TlsParameters::new`] is called with the profile's host.
#[derive(Clone)]
pub struct TlsParameters {
    pub(super) connector: InnerTlsParameters,
    /// The domain name which is expected in the TLS certificate from the server
    domain: String,
}

#[derive(Clone)]
pub(super) enum InnerTlsParameters {
    #[cfg(feature = "native-tls")]
    NativeTls(TlsConnector),
    #[cfg(feature = "rustls")]
    Rustls(Arc<ClientConfig>),
}

impl TlsParameters {
    /// Creates parameters checking the server certificate against `domain`
    ///
    /// Uses `native-tls` when that feature is enabled, rustls otherwise.
    pub fn new(domain: String) -> Result<Self, Error> {
        #[cfg(feature = "native-tls")]
        return Self::new_native(domain);

        #[cfg(not(feature = "native-tls"))]
        return Self::new_rustls(domain);
    }

    /// Creates parameters for the `native-tls` backend with the system roots
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    pub fn new_native(domain: String) -> Result<Self, Error> {
        let connector = TlsConnector::builder().build().map_err(error::tls)?;
        Ok(Self::from_native_connector(domain, connector))
    }

    /// Uses a custom `native-tls` connector
    #[cfg(feature = "native-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
    pub fn from_native_connector(domain: String, connector: TlsConnector) -> Self {
        Self {
            connector: InnerTlsParameters::NativeTls(connector),
            domain,
        }
    }

    /// Creates parameters for the rustls backend trusting the `webpki-roots` certificates
    #[cfg(feature = "rustls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls")))]
    pub fn new_rustls(domain: String) -> Result<Self, Error> {
        let mut root_cert_store = RootCertStore::empty();
        root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();
        Ok(Self::from_rustls_config(domain, Arc::new(config)))
    }

    /// Uses a custom rustls client configuration
    #[cfg(feature = "rustls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls")))]
    pub fn from_rustls_config(domain: String, config: Arc<ClientConfig>) -> Self {
        Self {
            connector: InnerTlsParameters::Rustls(config),
            domain,
        }
    }

    /// The domain the server certificate must match
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self.connector {
            #[cfg(feature = "native-tls")]
            InnerTlsParameters::NativeTls(_) => "native-tls",
            #[cfg(feature = "rustls")]
            InnerTlsParameters::Rustls(_) => "rustls",
        };
        f.debug_struct("TlsParameters")
            .field("backend", &backend)
            .field("domain", &self.domain)
            .finish()
    }
}
