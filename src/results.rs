//! Result graph produced by [`crate::scanner::CipherSuiteScanner`].

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use uuid::Uuid;

use crate::suites::CipherSuite;
use crate::transcode::{CertificateLeaf, Inspect, Node, OcspResponseLeaf};
use crate::types::{CapabilityProbe, TlsVersion};

#[derive(Debug, Clone)]
pub struct ServerScanResult {
    pub uuid: Uuid,
    pub server_location: ServerNetworkLocation,
    pub network_configuration: NetworkConfiguration,
    pub connectivity_status: ConnectivityStatus,
    pub connectivity_error_trace: Option<ErrorTrace>,
    pub connectivity_result: Option<ConnectivityResult>,
    pub scan_status: ScanStatus,
    pub scan_result: Option<AllScanCommandsAttempts>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNetworkLocation {
    pub hostname: String,
    pub ip_address: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfiguration {
    pub tls_server_name_indication: String,
    pub network_timeout_ms: u64,
    pub network_max_retries: u32,
    pub tls_client_auth_credentials: Option<ClientAuthCredentials>,
}

/// PEM certificate chain and PKCS#8 key presented when the server asks for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAuthCredentials {
    pub certificate_chain_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Completed,
    ErrorNoConnectivity,
}

#[derive(Debug, Clone)]
pub struct ConnectivityResult {
    pub highest_tls_version_supported: TlsVersion,
    pub cipher_suite_supported: String,
    pub leaf_certificate: Option<CertificateLeaf>,
    pub ocsp_response: Option<OcspResponseLeaf>,
}

/// One attempt per requested probe.
#[derive(Debug, Clone, Default)]
pub struct AllScanCommandsAttempts {
    pub attempts: BTreeMap<CapabilityProbe, ScanCommandAttempt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommandAttemptStatus {
    Completed,
    Error,
}

#[derive(Debug, Clone)]
pub struct ScanCommandAttempt {
    pub status: ScanCommandAttemptStatus,
    pub error_reason: Option<String>,
    pub error_trace: Option<ErrorTrace>,
    pub result: Option<CipherSuitesScanResult>,
}

impl ScanCommandAttempt {
    pub fn completed(result: CipherSuitesScanResult) -> Self {
        Self {
            status: ScanCommandAttemptStatus::Completed,
            error_reason: None,
            error_trace: None,
            result: Some(result),
        }
    }

    pub fn failed(reason: &str, trace: ErrorTrace) -> Self {
        Self {
            status: ScanCommandAttemptStatus::Error,
            error_reason: Some(reason.to_string()),
            error_trace: Some(trace),
            result: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CipherSuitesScanResult {
    pub tls_version_used: TlsVersion,
    pub accepted_cipher_suites: Vec<CipherSuiteAcceptedByServer>,
    pub rejected_cipher_suites: Vec<CipherSuiteRejectedByServer>,
}

impl CipherSuitesScanResult {
    pub fn is_tls_version_supported(&self) -> bool {
        !self.accepted_cipher_suites.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CipherSuiteAcceptedByServer {
    pub cipher_suite: CipherSuite,
    /// Raw server hello that selected this suite.
    pub server_hello: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CipherSuiteRejectedByServer {
    pub cipher_suite: CipherSuite,
    pub error_message: String,
}

/// Message chain of a failure, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTrace {
    pub messages: Vec<String>,
}

impl ErrorTrace {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut messages = vec![err.to_string()];
        let mut source = err.source();
        while let Some(e) = source {
            messages.push(e.to_string());
            source = e.source();
        }
        Self { messages }
    }
}

impl ConnectivityStatus {
    fn as_str(self) -> &'static str {
        match self {
            ConnectivityStatus::Completed => "COMPLETED",
            ConnectivityStatus::Error => "ERROR",
        }
    }
}

impl ScanStatus {
    fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Completed => "COMPLETED",
            ScanStatus::ErrorNoConnectivity => "ERROR_NO_CONNECTIVITY",
        }
    }
}

impl ScanCommandAttemptStatus {
    fn as_str(self) -> &'static str {
        match self {
            ScanCommandAttemptStatus::Completed => "COMPLETED",
            ScanCommandAttemptStatus::Error => "ERROR",
        }
    }
}

impl Inspect for TlsVersion {
    fn inspect(&self) -> Node {
        Node::text(self.name())
    }
}

impl Inspect for ErrorTrace {
    fn inspect(&self) -> Node {
        Node::Tree(Box::new(self.messages.inspect()))
    }
}

impl Inspect for ServerScanResult {
    fn inspect(&self) -> Node {
        Node::object("ServerScanResult")
            .field("uuid", &self.uuid)
            .field("server_location", &self.server_location)
            .field("network_configuration", &self.network_configuration)
            .node("connectivity_status", Node::text(self.connectivity_status.as_str()))
            .field("connectivity_error_trace", &self.connectivity_error_trace)
            .field("connectivity_result", &self.connectivity_result)
            .node("scan_status", Node::text(self.scan_status.as_str()))
            .field("scan_result", &self.scan_result)
            .build()
    }
}

impl Inspect for ServerNetworkLocation {
    fn inspect(&self) -> Node {
        Node::object("ServerNetworkLocation")
            .field("hostname", &self.hostname)
            .field("ip_address", &self.ip_address)
            .field("port", &self.port)
            .build()
    }
}

impl Inspect for NetworkConfiguration {
    fn inspect(&self) -> Node {
        Node::object("ServerNetworkConfiguration")
            .field("tls_server_name_indication", &self.tls_server_name_indication)
            .field("network_timeout_ms", &self.network_timeout_ms)
            .field("network_max_retries", &self.network_max_retries)
            .field("tls_client_auth_credentials", &self.tls_client_auth_credentials)
            .build()
    }
}

impl Inspect for ClientAuthCredentials {
    fn inspect(&self) -> Node {
        Node::object("ClientAuthenticationCredentials")
            .field("certificate_chain_path", &self.certificate_chain_path)
            .field("key_path", &self.key_path)
            .build()
    }
}

impl Inspect for ConnectivityResult {
    fn inspect(&self) -> Node {
        Node::object("ServerTlsProbingResult")
            .field("highest_tls_version_supported", &self.highest_tls_version_supported)
            .field("cipher_suite_supported", &self.cipher_suite_supported)
            .field("leaf_certificate", &self.leaf_certificate)
            .field("ocsp_response", &self.ocsp_response)
            .build()
    }
}

impl Inspect for AllScanCommandsAttempts {
    fn inspect(&self) -> Node {
        let mut obj = Node::object("AllScanCommandsAttempts");
        for (probe, attempt) in &self.attempts {
            obj = obj.field(probe.name(), attempt);
        }
        obj.build()
    }
}

impl Inspect for ScanCommandAttempt {
    fn inspect(&self) -> Node {
        Node::object("ScanCommandAttempt")
            .node("status", Node::text(self.status.as_str()))
            .field("error_reason", &self.error_reason)
            .field("error_trace", &self.error_trace)
            .field("result", &self.result)
            .build()
    }
}

impl Inspect for CipherSuitesScanResult {
    fn inspect(&self) -> Node {
        Node::object("CipherSuitesScanResult")
            .field("tls_version_used", &self.tls_version_used)
            .field("is_tls_version_supported", &self.is_tls_version_supported())
            .field("accepted_cipher_suites", &self.accepted_cipher_suites)
            .field("rejected_cipher_suites", &self.rejected_cipher_suites)
            .build()
    }
}

impl Inspect for CipherSuiteAcceptedByServer {
    fn inspect(&self) -> Node {
        Node::object("CipherSuiteAcceptedByServer")
            .field("cipher_suite", &self.cipher_suite)
            .node("server_hello", Node::Bytes(self.server_hello.clone()))
            .build()
    }
}

impl Inspect for CipherSuiteRejectedByServer {
    fn inspect(&self) -> Node {
        Node::object("CipherSuiteRejectedByServer")
            .field("cipher_suite", &self.cipher_suite)
            .field("error_message", &self.error_message)
            .build()
    }
}
