use std::net::IpAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ScanError;
use crate::resolver::{distinct_addresses, AddressResolver};
use crate::scanner::{CipherSuiteScanner, EngineConfig, ScanEngine};
use crate::types::{ScanRequest, ScanTarget, DEFAULT_TLS_PORT};

/// Factory handing out a fresh [`CipherSuiteScanner`] per run.
pub type ScannerFactory = Box<dyn Fn() -> CipherSuiteScanner + Send + Sync>;

/// Resolve a domain, scan every address with the full probe set and collect
/// the results.
///
/// `engine_factory` is called once per [`Orchestrator::scan`], so every run
/// drives its own engine.
pub struct Orchestrator<R, F> {
    resolver: R,
    engine_factory: F,
    port: u16,
}

impl<R, F, E> Orchestrator<R, F>
where
    R: AddressResolver,
    F: Fn() -> E + Send + Sync,
    E: ScanEngine,
{
    pub fn new(resolver: R, engine_factory: F) -> Self {
        Self {
            resolver,
            engine_factory,
            port: DEFAULT_TLS_PORT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// One request per distinct address, each carrying every probe.
    pub fn build_requests(&self, domain: &str, addrs: &[IpAddr]) -> Vec<ScanRequest> {
        distinct_addresses(addrs.iter().copied())
            .into_iter()
            .map(|ip| ScanRequest::new(ScanTarget::new(domain, ip).with_port(self.port)))
            .collect()
    }

    /// Results come back in completion order. Resolution failures and
    /// request errors raised by the engine abort the whole run.
    pub async fn scan(&self, domain: &str) -> Result<Vec<E::Output>, ScanError> {
        info!(domain, "Starting domain scan.");
        let addrs = self.resolver.resolve(domain).await?;
        let requests = self.build_requests(domain, &addrs);
        let expected = requests.len();

        let engine = (self.engine_factory)();
        let mut stream = engine.submit(requests);

        let mut results = Vec::with_capacity(expected);
        while let Some(item) = stream.next().await {
            let result = item?;
            results.push(result);
            info!(domain, collected = results.len(), expected, "Attaching result.");
            if results.len() == expected {
                break;
            }
        }

        if results.len() < expected {
            warn!(
                domain,
                collected = results.len(),
                expected,
                "Scan engine finished before every request yielded a result."
            );
        }
        Ok(results)
    }
}

impl<R: AddressResolver> Orchestrator<R, ScannerFactory> {
    /// Orchestrator backed by [`CipherSuiteScanner`].
    pub fn with_engine_config(resolver: R, config: EngineConfig) -> Self {
        let port = config.port;
        let config = Arc::new(config);
        let factory: ScannerFactory = Box::new(move || CipherSuiteScanner::new(config.clone()));
        Self {
            resolver,
            engine_factory: factory,
            port,
        }
    }
}
