use std::collections::HashSet;
use std::future::Future;
use std::net::IpAddr;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, info};

use crate::error::ResolutionError;

/// Maps a domain name to the addresses that will be scanned.
pub trait AddressResolver: Send + Sync {
    fn resolve(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<Vec<IpAddr>, ResolutionError>> + Send;
}

/// A-record resolver backed by hickory.
#[derive(Clone)]
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default(), ResolverOpts::default())
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressResolver for DnsResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, ResolutionError> {
        debug!(domain, "Looking up A records.");
        let lookup = self
            .inner
            .ipv4_lookup(domain)
            .await
            .map_err(|e| lookup_error(domain, &e))?;

        let addrs = distinct_addresses(lookup.iter().map(|a| IpAddr::V4(a.0)));
        if addrs.is_empty() {
            return Err(ResolutionError::NoAddresses {
                domain: domain.to_string(),
            });
        }
        info!(domain, count = addrs.len(), "Resolved domain.");
        Ok(addrs)
    }
}

fn lookup_error(domain: &str, err: &ResolveError) -> ResolutionError {
    let response_code = match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Some(*response_code),
        _ => None,
    };
    classify_failure(domain, response_code, err.to_string())
}

/// An empty answer for an existing name is `NoAddresses`; NXDOMAIN and every
/// other failure is `Lookup`.
fn classify_failure(
    domain: &str,
    response_code: Option<ResponseCode>,
    reason: String,
) -> ResolutionError {
    match response_code {
        Some(ResponseCode::NXDomain) | None => ResolutionError::Lookup {
            domain: domain.to_string(),
            reason,
        },
        Some(_) => ResolutionError::NoAddresses {
            domain: domain.to_string(),
        },
    }
}

/// Drop repeated addresses, keeping first-seen order.
pub fn distinct_addresses(addrs: impl IntoIterator<Item = IpAddr>) -> Vec<IpAddr> {
    let mut seen = HashSet::new();
    addrs.into_iter().filter(|ip| seen.insert(*ip)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn duplicates_are_collapsed_in_order() {
        let a = IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8));
        let b = IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(distinct_addresses([a, b, a, b]), vec![a, b]);
    }

    #[test]
    fn nxdomain_is_a_lookup_failure() {
        let err = classify_failure("nope.invalid", Some(ResponseCode::NXDomain), "no record".into());
        assert!(matches!(err, ResolutionError::Lookup { ref domain, .. } if domain == "nope.invalid"));
    }

    #[test]
    fn empty_answer_means_no_addresses() {
        let err = classify_failure("example.com", Some(ResponseCode::NoError), "no record".into());
        assert!(matches!(err, ResolutionError::NoAddresses { .. }));
    }

    #[test]
    fn other_failures_keep_the_reason() {
        let err = classify_failure("example.com", None, "request timed out".into());
        match err {
            ResolutionError::Lookup { reason, .. } => assert_eq!(reason, "request timed out"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
