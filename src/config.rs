//! Connection profiles and the configuration they are resolved from
//!
//! A [`MailerConfig`] holds a `defaults` record and any number of named, partial
//! connection profiles. Resolving a name produces a complete, immutable
//! [`ConnectionProfile`]: every field the named profile omits is taken from the
//! defaults, except `host`, `username` and `password` which must be given by the
//! profile itself.
//!
//! ```rust
//! use relaymail::config::{MailerConfig, Security};
//!
//! let config = MailerConfig::from_json(
//!     r#"{
//!         "defaults": { "connection": "local", "port": 25, "timeout": 300, "security": "none" },
//!         "connections": {
//!             "local": { "host": "localhost", "username": "u", "password": "p" },
//!             "gmail": { "host": "smtp.gmail.com", "port": 587, "username": "u", "password": "p", "security": "TLS" }
//!         }
//!     }"#,
//! )?;
//!
//! let local = config.profile(None)?;
//! assert_eq!(local.port(), 25);
//! let gmail = config.profile(Some("gmail"))?;
//! assert_eq!(gmail.security(), Security::Tls);
//! # Ok::<(), relaymail::smtp::Error>(())
//! ```

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;

use crate::smtp::{
    authentication::Credentials,
    error::{self, Error},
};

/// Default smtp port
pub const SMTP_PORT: u16 = 25;

/// Default timeout, in seconds, when neither the profile nor the defaults set one
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How the connection to the relay is secured
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Security {
    /// Plaintext connection only
    #[default]
    None,
    /// Plaintext connection upgraded in place with `STARTTLS`
    Tls,
    /// Implicit TLS, recognized but always refused when opening a session
    Ssl,
}

impl FromStr for Security {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "tls" => Ok(Self::Tls),
            "ssl" => Ok(Self::Ssl),
            _ => Err(error::configuration(format!(
                "unknown security mode {s:?}, expected \"none\" or \"tls\""
            ))),
        }
    }
}

impl TryFrom<String> for Security {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for Security {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::None => "none",
            Self::Tls => "tls",
            Self::Ssl => "ssl",
        })
    }
}

/// Fallback values applied to every named profile
#[derive(PartialEq, Eq, Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Name of the profile used when none is given
    pub connection: Option<String>,
    /// Port used when a profile has none
    pub port: u16,
    /// Timeout in seconds used when a profile has none
    pub timeout: u64,
    /// Security mode used when a profile has none
    pub security: Security,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            connection: None,
            port: SMTP_PORT,
            timeout: DEFAULT_TIMEOUT_SECS,
            security: Security::None,
        }
    }
}

/// A named profile as written in the configuration, any field may be missing
#[derive(PartialEq, Eq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialProfile {
    /// Relay host name or address
    pub host: Option<String>,
    /// Relay port
    pub port: Option<u16>,
    /// Login for `AUTH LOGIN`
    pub username: Option<String>,
    /// Password for `AUTH LOGIN`
    pub password: Option<String>,
    /// Security mode
    pub security: Option<Security>,
    /// Timeout in seconds, for connecting and for each read or write
    pub timeout: Option<u64>,
}

impl Debug for PartialProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Named connection profiles and their defaults
#[derive(PartialEq, Eq, Clone, Debug, Default, Deserialize)]
pub struct MailerConfig {
    #[serde(default)]
    defaults: Defaults,
    #[serde(default)]
    connections: BTreeMap<String, PartialProfile>,
}

impl MailerConfig {
    /// Creates a configuration without any profile
    pub fn new(defaults: Defaults) -> Self {
        Self {
            defaults,
            connections: BTreeMap::new(),
        }
    }

    /// Reads a configuration from its JSON form
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(error::configuration)
    }

    /// Adds or replaces a named profile
    pub fn with_connection<N: Into<String>>(mut self, name: N, profile: PartialProfile) -> Self {
        self.connections.insert(name.into(), profile);
        self
    }

    /// The defaults record
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Tells if no profile was configured
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Resolves a profile against the defaults
    ///
    /// Without a name, the profile named by `defaults.connection` is used.
    pub fn profile(&self, name: Option<&str>) -> Result<ConnectionProfile, Error> {
        if self.is_empty() {
            return Err(error::configuration("mail configuration not set"));
        }

        let name = match name.or(self.defaults.connection.as_deref()) {
            Some(name) => name,
            None => return Err(error::configuration("no mail connection name given")),
        };
        let partial = self
            .connections
            .get(name)
            .ok_or_else(|| error::configuration(format!("mail connection not found: {name:?}")))?;

        let required = |field: &Option<String>, what: &str| {
            field.clone().ok_or_else(|| {
                error::configuration(format!("mail connection {name:?} has no {what}"))
            })
        };
        let host = required(&partial.host, "host")?;
        let username = required(&partial.username, "username")?;
        let password = required(&partial.password, "password")?;

        Ok(ConnectionProfile {
            host,
            port: partial.port.unwrap_or(self.defaults.port),
            credentials: Credentials::new(username, password),
            security: partial.security.unwrap_or(self.defaults.security),
            timeout: Duration::from_secs(partial.timeout.unwrap_or(self.defaults.timeout)),
        })
    }
}

/// Complete parameters for one connection
///
/// The password is never shown by the `Debug` implementation.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ConnectionProfile {
    host: String,
    port: u16,
    credentials: Credentials,
    security: Security,
    timeout: Duration,
}

impl ConnectionProfile {
    /// Creates a plaintext profile for `host` on port 25
    pub fn new<H: Into<String>>(host: H, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port: SMTP_PORT,
            credentials,
            security: Security::None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the security mode
    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Relay host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Relay port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Credentials for `AUTH LOGIN`
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Security mode
    pub fn security(&self) -> Security {
        self.security
    }

    /// Connect, read and write timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    const CONFIG: &str = r#"{
        "defaults": { "connection": "server 1", "port": 25, "timeout": 300, "security": "none" },
        "connections": {
            "server 1": {
                "host": "smtp.gmail.com",
                "port": 587,
                "username": "example@gmail.com",
                "password": "password",
                "security": "TLS"
            },
            "server 3": {
                "host": "smtp.example.com",
                "username": "email@example.com",
                "password": "password"
            },
            "broken": { "host": "smtp.example.com", "username": "email@example.com" }
        }
    }"#;

    #[test]
    fn named_profile_overrides_defaults() {
        let config = MailerConfig::from_json(CONFIG).unwrap();
        let profile = config.profile(Some("server 1")).unwrap();

        assert_eq!(profile.host(), "smtp.gmail.com");
        assert_eq!(profile.port(), 587);
        assert_eq!(profile.security(), Security::Tls);
        assert_eq!(profile.timeout(), Duration::from_secs(300));
        assert_eq!(
            profile.credentials(),
            &Credentials::new("example@gmail.com".to_owned(), "password".to_owned())
        );
    }

    #[test]
    fn missing_fields_come_from_defaults() {
        let config = MailerConfig::from_json(CONFIG).unwrap();
        let profile = config.profile(Some("server 3")).unwrap();

        assert_eq!(profile.port(), 25);
        assert_eq!(profile.security(), Security::None);
        assert_eq!(profile.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn default_connection_is_used_without_a_name() {
        let config = MailerConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.profile(None).unwrap().host(), "smtp.gmail.com");
    }

    #[test]
    fn required_fields_are_never_defaulted() {
        let config = MailerConfig::from_json(CONFIG).unwrap();
        let err = config.profile(Some("broken")).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn unknown_or_empty_configuration_is_rejected() {
        let config = MailerConfig::from_json(CONFIG).unwrap();
        assert!(config
            .profile(Some("server 9"))
            .unwrap_err()
            .is_configuration());

        let empty = MailerConfig::default();
        assert!(empty.is_empty());
        assert!(empty.profile(Some("server 1")).unwrap_err().is_configuration());

        let unnamed = MailerConfig::new(Defaults::default()).with_connection(
            "relay",
            PartialProfile {
                host: Some("localhost".to_owned()),
                username: Some("u".to_owned()),
                password: Some("p".to_owned()),
                ..Default::default()
            },
        );
        assert!(unnamed.profile(None).unwrap_err().is_configuration());
        assert_eq!(unnamed.profile(Some("relay")).unwrap().port(), SMTP_PORT);
    }

    #[test]
    fn security_parsing() {
        assert_eq!("TLS".parse::<Security>().unwrap(), Security::Tls);
        assert_eq!("none".parse::<Security>().unwrap(), Security::None);
        assert_eq!("Ssl".parse::<Security>().unwrap(), Security::Ssl);
        assert!("starttls".parse::<Security>().unwrap_err().is_configuration());

        assert!(MailerConfig::from_json(
            r#"{ "connections": { "a": { "host": "h", "security": "pop3" } } }"#
        )
        .unwrap_err()
        .is_configuration());
    }

    #[test]
    fn password_is_not_debug_printed() {
        let config = MailerConfig::from_json(CONFIG).unwrap();
        let printed = format!("{config:?} {:?}", config.profile(None).unwrap());
        assert!(!printed.contains("password\""));
        assert!(printed.contains("example@gmail.com"));
    }
}
