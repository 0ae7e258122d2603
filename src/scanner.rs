use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;
use x509_parser::prelude::*;

use crate::error::ScanRequestError;
use crate::results::{
    AllScanCommandsAttempts, CipherSuiteAcceptedByServer, CipherSuiteRejectedByServer,
    CipherSuitesScanResult, ClientAuthCredentials, ConnectivityResult, ConnectivityStatus,
    ErrorTrace, NetworkConfiguration, ScanCommandAttempt, ScanStatus, ServerNetworkLocation,
    ServerScanResult,
};
use crate::suites::{self, CipherSuite, SSL2_CIPHER_KINDS};
use crate::tls::{self, ClientHello, ServerReply, Ssl2Reply, TlsProbeError};
use crate::transcode::{CertificateLeaf, Inspect, OcspResponseLeaf};
use crate::types::{ScanRequest, ScanTarget, TlsVersion, DEFAULT_TLS_PORT};

/// Runs a batch of scan requests and yields one result per request.
///
/// An engine is consumed by [`ScanEngine::submit`], so each batch gets its
/// own instance and nothing leaks between unrelated scans.
pub trait ScanEngine: Send + 'static {
    type Output: Inspect + Send + 'static;

    fn submit(self, requests: Vec<ScanRequest>) -> ResultStream<Self::Output>;
}

/// Results of a submitted batch, in completion order.
///
/// Dropping the stream cancels whatever is still running.
pub struct ResultStream<T> {
    rx: mpsc::Receiver<Result<T, ScanRequestError>>,
    _cancel: Option<DropGuard>,
}

impl<T> ResultStream<T> {
    pub fn new(rx: mpsc::Receiver<Result<T, ScanRequestError>>) -> Self {
        Self { rx, _cancel: None }
    }

    pub fn with_cancel(
        rx: mpsc::Receiver<Result<T, ScanRequestError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            rx,
            _cancel: Some(cancel.drop_guard()),
        }
    }

    /// Next finished result, or `None` once the engine is exhausted.
    pub async fn next(&mut self) -> Option<Result<T, ScanRequestError>> {
        self.rx.recv().await
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub port: u16,
    /// Servers scanned at the same time.
    pub concurrency: usize,
    pub network_timeout: Duration,
    pub max_retries: u32,
    pub client_auth: Option<ClientAuthCredentials>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_TLS_PORT,
            concurrency: 16,
            network_timeout: Duration::from_secs(5),
            max_retries: 2,
            client_auth: None,
        }
    }
}

/// Default engine: raw ClientHello probing over TCP.
///
/// - Limits concurrently scanned servers using a `Semaphore`.
/// - Uses `tokio::time::timeout` to bound every connect and read.
/// - Runs a connectivity check first; servers failing it get no probe results.
/// - Probes of one server run one after another.
#[derive(Debug, Clone, Default)]
pub struct CipherSuiteScanner {
    config: Arc<EngineConfig>,
}

impl CipherSuiteScanner {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }
}

impl ScanEngine for CipherSuiteScanner {
    type Output = ServerScanResult;

    fn submit(self, requests: Vec<ScanRequest>) -> ResultStream<ServerScanResult> {
        let (tx, rx) = mpsc::channel(requests.len().max(1));
        let cancel = CancellationToken::new();
        let config = self.config;
        let driver_cancel = cancel.clone();

        info!(servers = requests.len(), "Queueing scan batch.");
        tokio::spawn(async move {
            let sem = Arc::new(Semaphore::new(config.concurrency.clamp(1, 256)));
            let mut set = JoinSet::new();
            let mut addresses = HashMap::new();

            for req in requests {
                if driver_cancel.is_cancelled() {
                    break;
                }
                let permit = match sem.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => break,
                };
                let address = req.target.address.to_string();
                let tx = tx.clone();
                let config = config.clone();
                let cancel = driver_cancel.clone();

                let handle = set.spawn(async move {
                    let _permit = permit; // keep permit until the server is done
                    let result = scan_server(&config, req, &cancel).await;
                    let _ = tx.send(Ok(result)).await;
                });
                addresses.insert(handle.id(), address);
            }

            loop {
                let joined = tokio::select! {
                    _ = driver_cancel.cancelled() => {
                        set.abort_all();
                        break;
                    }
                    joined = set.join_next_with_id() => joined,
                };
                let Some(joined) = joined else { break };
                if let Err(e) = joined {
                    if e.is_cancelled() {
                        continue;
                    }
                    let address = addresses.remove(&e.id()).unwrap_or_default();
                    warn!(%address, error = %e, "Scan task failed.");
                    let _ = tx
                        .send(Err(ScanRequestError::Task {
                            address,
                            reason: e.to_string(),
                        }))
                        .await;
                }
            }
        });

        ResultStream::with_cancel(rx, cancel)
    }
}

#[derive(Error, Debug)]
enum ConnectivityError {
    #[error("could not connect to {addr}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {addr} failed")]
    Handshake {
        addr: SocketAddr,
        #[source]
        source: TlsProbeError,
    },

    #[error("server rejected the TLS handshake: {0}")]
    Rejected(&'static str),

    #[error("server negotiated unknown version {0:#06x}")]
    UnknownVersion(u16),
}

#[derive(Error, Debug)]
enum ProbeError {
    #[error("could not connect to {addr}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send ClientHello")]
    Write(#[source] std::io::Error),
}

#[derive(Error, Debug)]
enum CertificateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("TLS handshake timed out")]
    Timeout,

    #[error("server sent no certificate")]
    Missing,

    #[error("X.509 parse error: {0}")]
    Parse(String),
}

async fn scan_server(
    config: &EngineConfig,
    req: ScanRequest,
    cancel: &CancellationToken,
) -> ServerScanResult {
    let target = req.target;
    let addr = SocketAddr::new(target.address, target.port);
    info!(%addr, hostname = %target.hostname, "Starting server scan.");

    let mut result = ServerScanResult {
        uuid: Uuid::new_v4(),
        server_location: ServerNetworkLocation {
            hostname: target.hostname.clone(),
            ip_address: target.address,
            port: target.port,
        },
        network_configuration: NetworkConfiguration {
            tls_server_name_indication: target.hostname.clone(),
            network_timeout_ms: config.network_timeout.as_millis() as u64,
            network_max_retries: config.max_retries,
            tls_client_auth_credentials: config.client_auth.clone(),
        },
        connectivity_status: ConnectivityStatus::Completed,
        connectivity_error_trace: None,
        connectivity_result: None,
        scan_status: ScanStatus::Completed,
        scan_result: None,
    };

    match check_connectivity(config, &target).await {
        Ok(connectivity) => result.connectivity_result = Some(connectivity),
        Err(e) => {
            warn!(%addr, error = %e, "Connectivity check failed.");
            result.connectivity_status = ConnectivityStatus::Error;
            result.connectivity_error_trace = Some(ErrorTrace::from_error(&e));
            result.scan_status = ScanStatus::ErrorNoConnectivity;
            return result;
        }
    }

    let mut attempts = AllScanCommandsAttempts::default();
    for probe in req.probes {
        // The stream is gone once cancelled, so the partial result is never read.
        if cancel.is_cancelled() {
            debug!(%addr, "Scan cancelled, skipping remaining probes.");
            break;
        }
        let version = probe.version();
        debug!(%addr, %probe, "Running probe.");
        let outcome = if version == TlsVersion::Ssl2_0 {
            probe_ssl2(config, &target).await
        } else {
            enumerate_suites(config, &target, version).await
        };
        let attempt = match outcome {
            Ok(res) => {
                debug!(
                    %addr,
                    %probe,
                    accepted = res.accepted_cipher_suites.len(),
                    "Probe finished."
                );
                ScanCommandAttempt::completed(res)
            }
            Err(e) => {
                warn!(%addr, %probe, error = %e, "Probe failed.");
                ScanCommandAttempt::failed("connection_error", ErrorTrace::from_error(&e))
            }
        };
        attempts.attempts.insert(probe, attempt);
    }
    result.scan_result = Some(attempts);

    info!(%addr, "Server scan finished.");
    result
}

async fn check_connectivity(
    config: &EngineConfig,
    target: &ScanTarget,
) -> Result<ConnectivityResult, ConnectivityError> {
    let addr = SocketAddr::new(target.address, target.port);
    let mut stream = connect(config, addr)
        .await
        .map_err(|source| ConnectivityError::Connect { addr, source })?;

    let hello = ClientHello::connectivity(&suites::connectivity_suites(), &target.hostname);
    stream
        .write_all(&hello.encode())
        .await
        .map_err(|e| ConnectivityError::Handshake {
            addr,
            source: TlsProbeError::Io(e),
        })?;
    let reply = tls::read_server_reply(&mut stream, config.network_timeout, true)
        .await
        .map_err(|source| ConnectivityError::Handshake { addr, source })?;

    let hello = match reply {
        ServerReply::Hello(h) => h,
        ServerReply::Alert { description, .. } => {
            return Err(ConnectivityError::Rejected(tls::alert_name(description)))
        }
    };
    let version =
        TlsVersion::from_wire(hello.version).ok_or(ConnectivityError::UnknownVersion(hello.version))?;
    let cipher_suite_supported = suites::find_by_id(u32::from(hello.cipher_suite))
        .map(|s| s.name.to_string())
        .unwrap_or_else(|| format!("{:#06x}", hello.cipher_suite));

    let leaf_certificate = match fetch_leaf_certificate(config, target).await {
        Ok(cert) => Some(cert),
        Err(e) => {
            debug!(%addr, error = %e, "Could not retrieve leaf certificate.");
            None
        }
    };

    Ok(ConnectivityResult {
        highest_tls_version_supported: version,
        cipher_suite_supported,
        leaf_certificate,
        ocsp_response: hello.ocsp_response.map(|der| OcspResponseLeaf { der }),
    })
}

/// Offer the remaining candidates until the server stops picking one.
async fn enumerate_suites(
    config: &EngineConfig,
    target: &ScanTarget,
    version: TlsVersion,
) -> Result<CipherSuitesScanResult, ProbeError> {
    let addr = SocketAddr::new(target.address, target.port);
    let mut remaining: Vec<CipherSuite> = suites::suites_for(version);
    let mut accepted = Vec::new();
    let mut last_error = String::from("server rejected the handshake");

    while !remaining.is_empty() {
        let hello = ClientHello::for_version(version, &remaining, &target.hostname).encode();
        let mut stream = connect(config, addr)
            .await
            .map_err(|source| ProbeError::Connect { addr, source })?;
        stream.write_all(&hello).await.map_err(ProbeError::Write)?;

        match tls::read_server_reply(&mut stream, config.network_timeout, false).await {
            Ok(ServerReply::Hello(h)) if h.version != version.wire() => {
                last_error = format!(
                    "server negotiated {} instead",
                    TlsVersion::from_wire(h.version)
                        .map(TlsVersion::name)
                        .unwrap_or("an unknown version")
                );
                break;
            }
            Ok(ServerReply::Hello(h)) => {
                let Some(pos) = remaining
                    .iter()
                    .position(|s| s.id == u32::from(h.cipher_suite))
                else {
                    last_error = format!(
                        "server selected a cipher suite that was not offered ({:#06x})",
                        h.cipher_suite
                    );
                    break;
                };
                accepted.push(CipherSuiteAcceptedByServer {
                    cipher_suite: remaining.remove(pos),
                    server_hello: h.raw,
                });
            }
            Ok(ServerReply::Alert { description, .. }) => {
                last_error = format!("TLS alert: {}", tls::alert_name(description));
                break;
            }
            Err(e) => {
                last_error = e.to_string();
                break;
            }
        }
    }

    Ok(CipherSuitesScanResult {
        tls_version_used: version,
        accepted_cipher_suites: accepted,
        rejected_cipher_suites: rejected(remaining, &last_error),
    })
}

async fn probe_ssl2(
    config: &EngineConfig,
    target: &ScanTarget,
) -> Result<CipherSuitesScanResult, ProbeError> {
    let addr = SocketAddr::new(target.address, target.port);
    let mut stream = connect(config, addr)
        .await
        .map_err(|source| ProbeError::Connect { addr, source })?;
    stream
        .write_all(&tls::ssl2_client_hello(SSL2_CIPHER_KINDS))
        .await
        .map_err(ProbeError::Write)?;

    let (accepted, remaining, message) =
        match tls::read_ssl2_reply(&mut stream, config.network_timeout).await {
            Ok(Ssl2Reply::Hello { cipher_kinds, raw }) => {
                let (accepted, remaining): (Vec<_>, Vec<_>) = SSL2_CIPHER_KINDS
                    .iter()
                    .copied()
                    .partition(|k| cipher_kinds.contains(&k.id));
                let accepted = accepted
                    .into_iter()
                    .map(|cipher_suite| CipherSuiteAcceptedByServer {
                        cipher_suite,
                        server_hello: raw.clone(),
                    })
                    .collect();
                (accepted, remaining, "cipher kind not listed by the server".to_string())
            }
            Ok(Ssl2Reply::Error { code }) => (
                Vec::new(),
                SSL2_CIPHER_KINDS.to_vec(),
                format!("SSLv2 error {code:#06x}"),
            ),
            Ok(Ssl2Reply::TlsAlert) => (
                Vec::new(),
                SSL2_CIPHER_KINDS.to_vec(),
                "server answered with a TLS alert".to_string(),
            ),
            Err(e) => (Vec::new(), SSL2_CIPHER_KINDS.to_vec(), e.to_string()),
        };

    Ok(CipherSuitesScanResult {
        tls_version_used: TlsVersion::Ssl2_0,
        accepted_cipher_suites: accepted,
        rejected_cipher_suites: rejected(remaining, &message),
    })
}

fn rejected(suites: Vec<CipherSuite>, message: &str) -> Vec<CipherSuiteRejectedByServer> {
    suites
        .into_iter()
        .map(|cipher_suite| CipherSuiteRejectedByServer {
            cipher_suite,
            error_message: message.to_string(),
        })
        .collect()
}

/// Leaf certificate via a regular TLS handshake; trust is not checked.
async fn fetch_leaf_certificate(
    config: &EngineConfig,
    target: &ScanTarget,
) -> Result<CertificateLeaf, CertificateError> {
    let mut builder = native_tls::TlsConnector::builder();
    builder
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true);
    if let Some(creds) = &config.client_auth {
        let chain = tokio::fs::read(&creds.certificate_chain_path).await?;
        let key = tokio::fs::read(&creds.key_path).await?;
        builder.identity(native_tls::Identity::from_pkcs8(&chain, &key)?);
    }
    let connector = tokio_native_tls::TlsConnector::from(builder.build()?);

    let tcp = connect(config, SocketAddr::new(target.address, target.port)).await?;
    let stream = time::timeout(config.network_timeout, connector.connect(&target.hostname, tcp))
        .await
        .map_err(|_| CertificateError::Timeout)??;

    let cert = stream
        .get_ref()
        .peer_certificate()?
        .ok_or(CertificateError::Missing)?;
    let der = cert.to_der()?;
    parse_certificate(der)
}

fn parse_certificate(der: Vec<u8>) -> Result<CertificateLeaf, CertificateError> {
    let (_, x509) =
        parse_x509_certificate(&der).map_err(|e| CertificateError::Parse(e.to_string()))?;
    let validity = x509.validity();
    Ok(CertificateLeaf {
        not_valid_before: validity.not_before.to_datetime(),
        not_valid_after: validity.not_after.to_datetime(),
        subject: x509.subject().to_string(),
        serial_number: x509.raw_serial_as_string(),
        der: der.clone(),
    })
}

/// TCP connect bounded by the network timeout, retried on failure.
async fn connect(config: &EngineConfig, addr: SocketAddr) -> std::io::Result<TcpStream> {
    connect_with_retries(config, addr, |a| TcpStream::connect(a)).await
}

async fn connect_with_retries<T, F, Fut>(
    config: &EngineConfig,
    addr: SocketAddr,
    mut dial: F,
) -> std::io::Result<T>
where
    F: FnMut(SocketAddr) -> Fut,
    Fut: Future<Output = std::io::Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match time::timeout(config.network_timeout, dial(addr)).await {
            Ok(Ok(stream)) => return Ok(stream),
            Ok(Err(e)) => e,
            Err(_) => std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
        };
        if attempt >= config.max_retries {
            return Err(err);
        }
        attempt += 1;
        debug!(%addr, attempt, error = %err, "Retrying connect.");
    }
}
