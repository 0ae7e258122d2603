#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

use tls_suite_scan::error::{ResolutionError, ScanRequestError};
use tls_suite_scan::resolver::AddressResolver;
use tls_suite_scan::scanner::{ResultStream, ScanEngine};
use tls_suite_scan::transcode::Node;
use tls_suite_scan::types::ScanRequest;
use tokio::sync::mpsc;

pub fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(a, b, c, d))
}

/// Resolver answering every domain with a fixed list, or failing.
pub struct StaticResolver {
    pub addrs: Option<Vec<IpAddr>>,
}

impl AddressResolver for StaticResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, ResolutionError> {
        match &self.addrs {
            Some(addrs) if !addrs.is_empty() => Ok(addrs.clone()),
            Some(_) => Err(ResolutionError::NoAddresses {
                domain: domain.to_string(),
            }),
            None => Err(ResolutionError::Lookup {
                domain: domain.to_string(),
                reason: "NXDOMAIN".into(),
            }),
        }
    }
}

/// Engine that answers every request with a small nested result, in
/// reverse submission order, and records what it was given.
///
/// `fail_address` gets a raised error instead of a result; `drop_address`
/// gets nothing at all before the stream ends.
#[derive(Clone, Default)]
pub struct StubEngine {
    pub submitted: Arc<Mutex<Vec<ScanRequest>>>,
    pub fail_address: Option<IpAddr>,
    pub drop_address: Option<IpAddr>,
}

impl ScanEngine for StubEngine {
    type Output = Node;

    fn submit(self, requests: Vec<ScanRequest>) -> ResultStream<Node> {
        let (tx, rx) = mpsc::channel(requests.len().max(1));
        for req in requests.iter().rev() {
            if Some(req.target.address) == self.drop_address {
                continue;
            }
            let item = if Some(req.target.address) == self.fail_address {
                Err(ScanRequestError::Engine(format!(
                    "connection refused by {}",
                    req.target.address
                )))
            } else {
                Ok(stub_result(req))
            };
            tx.try_send(item).expect("channel sized for the batch");
        }
        self.submitted.lock().unwrap().extend(requests);
        ResultStream::new(rx)
    }
}

pub fn stub_result(req: &ScanRequest) -> Node {
    let probes = req
        .probes
        .iter()
        .map(|p| {
            (
                p.name(),
                Node::object("ScanCommandAttempt")
                    .node("status", Node::text("COMPLETED"))
                    .node(
                        "result",
                        Node::object("CipherSuitesScanResult")
                            .node("accepted_cipher_suites", Node::Sequence(vec![Node::text("TLS_AES_128_GCM_SHA256")]))
                            .build(),
                    )
                    .build(),
            )
        })
        .collect::<Vec<_>>();
    Node::object("ServerScanResult")
        .node(
            "server_location",
            Node::object("ServerNetworkLocation")
                .field("hostname", &req.target.hostname)
                .field("ip_address", &req.target.address)
                .build(),
        )
        .node("scan_result", Node::mapping(probes))
        .build()
}
