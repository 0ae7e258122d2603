use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

/// Default TCP port probed on every resolved address.
pub const DEFAULT_TLS_PORT: u16 = 443;

/// One resolved address of the scanned domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub hostname: String,
    pub address: IpAddr,
    pub port: u16,
}

impl ScanTarget {
    pub fn new(hostname: impl Into<String>, address: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            address,
            port: DEFAULT_TLS_PORT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// A protocol version whose cipher suites get enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapabilityProbe {
    Ssl2_0CipherSuites,
    Ssl3_0CipherSuites,
    Tls1_0CipherSuites,
    Tls1_1CipherSuites,
    Tls1_2CipherSuites,
    Tls1_3CipherSuites,
}

impl CapabilityProbe {
    /// The fixed probe set attached to every scan request.
    pub const ALL: [CapabilityProbe; 6] = [
        CapabilityProbe::Ssl2_0CipherSuites,
        CapabilityProbe::Ssl3_0CipherSuites,
        CapabilityProbe::Tls1_0CipherSuites,
        CapabilityProbe::Tls1_1CipherSuites,
        CapabilityProbe::Tls1_2CipherSuites,
        CapabilityProbe::Tls1_3CipherSuites,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CapabilityProbe::Ssl2_0CipherSuites => "ssl_2_0_cipher_suites",
            CapabilityProbe::Ssl3_0CipherSuites => "ssl_3_0_cipher_suites",
            CapabilityProbe::Tls1_0CipherSuites => "tls_1_0_cipher_suites",
            CapabilityProbe::Tls1_1CipherSuites => "tls_1_1_cipher_suites",
            CapabilityProbe::Tls1_2CipherSuites => "tls_1_2_cipher_suites",
            CapabilityProbe::Tls1_3CipherSuites => "tls_1_3_cipher_suites",
        }
    }

    pub fn version(self) -> TlsVersion {
        match self {
            CapabilityProbe::Ssl2_0CipherSuites => TlsVersion::Ssl2_0,
            CapabilityProbe::Ssl3_0CipherSuites => TlsVersion::Ssl3_0,
            CapabilityProbe::Tls1_0CipherSuites => TlsVersion::Tls1_0,
            CapabilityProbe::Tls1_1CipherSuites => TlsVersion::Tls1_1,
            CapabilityProbe::Tls1_2CipherSuites => TlsVersion::Tls1_2,
            CapabilityProbe::Tls1_3CipherSuites => TlsVersion::Tls1_3,
        }
    }

    pub fn full_set() -> BTreeSet<CapabilityProbe> {
        Self::ALL.into_iter().collect()
    }
}

impl fmt::Display for CapabilityProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// SSL/TLS protocol versions, ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    Ssl2_0,
    Ssl3_0,
    Tls1_0,
    Tls1_1,
    Tls1_2,
    Tls1_3,
}

impl TlsVersion {
    /// Wire value of the version field (SSL 2.0 uses 0x0002).
    pub fn wire(self) -> u16 {
        match self {
            TlsVersion::Ssl2_0 => 0x0002,
            TlsVersion::Ssl3_0 => 0x0300,
            TlsVersion::Tls1_0 => 0x0301,
            TlsVersion::Tls1_1 => 0x0302,
            TlsVersion::Tls1_2 => 0x0303,
            TlsVersion::Tls1_3 => 0x0304,
        }
    }

    pub fn from_wire(v: u16) -> Option<Self> {
        match v {
            0x0002 => Some(TlsVersion::Ssl2_0),
            0x0300 => Some(TlsVersion::Ssl3_0),
            0x0301 => Some(TlsVersion::Tls1_0),
            0x0302 => Some(TlsVersion::Tls1_1),
            0x0303 => Some(TlsVersion::Tls1_2),
            0x0304 => Some(TlsVersion::Tls1_3),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TlsVersion::Ssl2_0 => "SSL_2_0",
            TlsVersion::Ssl3_0 => "SSL_3_0",
            TlsVersion::Tls1_0 => "TLS_1_0",
            TlsVersion::Tls1_1 => "TLS_1_1",
            TlsVersion::Tls1_2 => "TLS_1_2",
            TlsVersion::Tls1_3 => "TLS_1_3",
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of work handed to a scan engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub target: ScanTarget,
    pub probes: BTreeSet<CapabilityProbe>,
}

impl ScanRequest {
    /// Requests always carry the full probe set.
    pub fn new(target: ScanTarget) -> Self {
        Self {
            target,
            probes: CapabilityProbe::full_set(),
        }
    }
}
