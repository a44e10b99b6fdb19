//! # Host and object addressing

use std::fmt;
use std::str::FromStr;

/// Network location of a host, compared by value.
///
/// Used both as a migration destination and as the registry lookup key.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostAddress {
    host: String,
    port: u16,
}

impl HostAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Failure to parse a `host:port` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    MissingPort(String),
    EmptyHost(String),
    InvalidPort(String),
}

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPort(s) => write!(f, "address '{}' has no port", s),
            Self::EmptyHost(s) => write!(f, "address '{}' has an empty host", s),
            Self::InvalidPort(s) => write!(f, "address '{}' has an invalid port", s),
        }
    }
}

impl std::error::Error for AddressParseError {}

impl FromStr for HostAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // rsplit so that bracketed ipv6 hosts keep their inner colons
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressParseError::MissingPort(s.to_string()))?;
        if host.is_empty() {
            return Err(AddressParseError::EmptyHost(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressParseError::InvalidPort(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

/// Strong type for object identifiers.
///
/// Allocated once by the host that first instantiates the object and kept
/// unchanged for the object's whole logical lifetime, across migrations.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object-{}", self.0)
    }
}
