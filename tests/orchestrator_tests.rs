mod common;

use common::{v4, StaticResolver, StubEngine};
use tls_suite_scan::error::{ResolutionError, ScanError, ScanRequestError};
use tls_suite_scan::orchestrator::Orchestrator;
use tls_suite_scan::transcode::transcode;
use tls_suite_scan::types::CapabilityProbe;

fn orchestrator(
    addrs: Option<Vec<std::net::IpAddr>>,
    engine: StubEngine,
) -> Orchestrator<StaticResolver, impl Fn() -> StubEngine + Send + Sync> {
    Orchestrator::new(StaticResolver { addrs }, move || engine.clone())
}

#[tokio::test]
async fn one_request_and_one_result_per_address() {
    let engine = StubEngine::default();
    let submitted = engine.submitted.clone();
    let addrs = vec![v4(1, 2, 3, 4), v4(5, 6, 7, 8), v4(9, 9, 9, 9)];

    let results = orchestrator(Some(addrs.clone()), engine)
        .scan("example.com")
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let submitted = submitted.lock().unwrap();
    assert_eq!(submitted.len(), 3);
    for (req, addr) in submitted.iter().zip(&addrs) {
        assert_eq!(req.target.address, *addr);
        assert_eq!(req.target.hostname, "example.com");
        assert_eq!(req.target.port, 443);
    }
}

#[tokio::test]
async fn every_request_carries_the_full_probe_set() {
    let engine = StubEngine::default();
    let submitted = engine.submitted.clone();

    orchestrator(Some(vec![v4(1, 2, 3, 4), v4(5, 6, 7, 8)]), engine)
        .scan("example.com")
        .await
        .unwrap();

    for req in submitted.lock().unwrap().iter() {
        assert_eq!(req.probes, CapabilityProbe::full_set());
    }
}

#[tokio::test]
async fn duplicate_addresses_are_scanned_once() {
    let engine = StubEngine::default();
    let submitted = engine.submitted.clone();

    let results = orchestrator(
        Some(vec![v4(1, 2, 3, 4), v4(1, 2, 3, 4), v4(5, 6, 7, 8)]),
        engine,
    )
    .scan("example.com")
    .await
    .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(submitted.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn custom_port_is_applied_to_targets() {
    let engine = StubEngine::default();
    let submitted = engine.submitted.clone();

    orchestrator(Some(vec![v4(1, 2, 3, 4)]), engine)
        .with_port(8443)
        .scan("example.com")
        .await
        .unwrap();

    assert_eq!(submitted.lock().unwrap()[0].target.port, 8443);
}

#[tokio::test]
async fn resolution_failure_propagates() {
    let err = orchestrator(None, StubEngine::default())
        .scan("does-not-exist.invalid")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScanError::Resolution(ResolutionError::Lookup { .. })
    ));

    let err = orchestrator(Some(vec![]), StubEngine::default())
        .scan("empty.example")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScanError::Resolution(ResolutionError::NoAddresses { .. })
    ));
}

#[tokio::test]
async fn a_raised_request_error_fails_the_whole_run() {
    let engine = StubEngine {
        fail_address: Some(v4(5, 6, 7, 8)),
        ..Default::default()
    };

    let err = orchestrator(Some(vec![v4(1, 2, 3, 4), v4(5, 6, 7, 8)]), engine)
        .scan("example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Request(ScanRequestError::Engine(_))));
}

#[tokio::test]
async fn exhausted_engine_returns_what_it_collected() {
    let engine = StubEngine {
        drop_address: Some(v4(5, 6, 7, 8)),
        ..Default::default()
    };
    let submitted = engine.submitted.clone();

    let results = orchestrator(
        Some(vec![v4(1, 2, 3, 4), v4(5, 6, 7, 8), v4(9, 9, 9, 9)]),
        engine,
    )
    .scan("example.com")
    .await
    .unwrap();

    assert_eq!(submitted.lock().unwrap().len(), 3);
    assert_eq!(results.len(), 2);
    let json = transcode(&results, None);
    let ips: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["server_location"]["ip_address"].as_str().unwrap())
        .collect();
    assert!(!ips.contains(&"5.6.7.8"));
}

#[tokio::test]
async fn results_transcode_with_both_addresses_present() {
    let results = orchestrator(Some(vec![v4(1, 2, 3, 4), v4(5, 6, 7, 8)]), StubEngine::default())
        .scan("example.com")
        .await
        .unwrap();

    let json = transcode(&results, None);
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    let mut ips: Vec<&str> = arr
        .iter()
        .map(|r| r["server_location"]["ip_address"].as_str().unwrap())
        .collect();
    ips.sort();
    assert_eq!(ips, vec!["1.2.3.4", "5.6.7.8"]);
    assert_eq!(
        arr[0]["scan_result"]["tls_1_3_cipher_suites"]["result"]["accepted_cipher_suites"][0],
        "TLS_AES_128_GCM_SHA256"
    );
}
