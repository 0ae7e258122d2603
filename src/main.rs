use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use tls_suite_scan::logging;
use tls_suite_scan::orchestrator::Orchestrator;
use tls_suite_scan::resolver::DnsResolver;
use tls_suite_scan::results::ClientAuthCredentials;
use tls_suite_scan::scanner::EngineConfig;
use tls_suite_scan::server;
use tls_suite_scan::transcode::transcode;

/// tls-suite-scan: enumerate the SSL/TLS cipher suites accepted by every address of a domain.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tls-suite-scan",
    version,
    about = "Enumerate the SSL/TLS cipher suites accepted by every address of a domain.",
    long_about = None
)]
struct Cli {
    /// Address the HTTP API listens on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// TLS port probed on every resolved address.
    #[arg(long, default_value_t = 443)]
    port: u16,

    /// Max servers scanned at the same time.
    #[arg(long, default_value_t = 16)]
    concurrency: usize,

    /// Connect and read timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 5000)]
    timeout_ms: u64,

    /// Connect retries per handshake.
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// PEM client certificate chain for servers requiring client auth.
    #[arg(long = "client-cert", requires = "client_key")]
    client_cert: Option<PathBuf>,

    /// PKCS#8 PEM key matching `--client-cert`.
    #[arg(long = "client-key", requires = "client_cert")]
    client_key: Option<PathBuf>,

    /// Scan this domain once, print the JSON and exit instead of serving.
    #[arg(long)]
    domain: Option<String>,

    /// With `--domain`, also write the JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        if self.concurrency == 0 {
            bail!("--concurrency must be at least 1");
        }
        let client_auth = match (&self.client_cert, &self.client_key) {
            (Some(cert), Some(key)) => Some(ClientAuthCredentials {
                certificate_chain_path: cert.clone(),
                key_path: key.clone(),
            }),
            _ => None,
        };
        Ok(EngineConfig {
            port: self.port,
            concurrency: self.concurrency,
            network_timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.retries,
            client_auth,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize_logging(cli.log_level.as_deref())?;

    let config = cli.engine_config()?;
    info!(
        port = config.port,
        concurrency = config.concurrency,
        timeout_ms = cli.timeout_ms,
        retries = config.max_retries,
        "tls-suite-scan configuration."
    );
    let orchestrator = Orchestrator::with_engine_config(DnsResolver::new(), config);

    if let Some(domain) = cli.domain.as_deref() {
        let results = orchestrator.scan(domain).await?;
        let body = json!({ "results": transcode(&results, None) });
        println!("{}", serde_json::to_string_pretty(&body)?);
        if let Some(path) = cli.output.as_deref() {
            write_results_json(path, &body)
                .with_context(|| format!("failed to write JSON to {}", path.display()))?;
            info!("Wrote JSON results to {}", path.display());
        }
        return Ok(());
    }

    server::spawn_server(&cli.bind, server::router(orchestrator)).await
}

fn write_results_json(path: &std::path::Path, body: &serde_json::Value) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, body)?;
    Ok(())
}
