use crate::{
    errors::{Error, Result},
    models::Host,
};

use {
    std::net::{IpAddr, SocketAddr},
    tracing::{debug, trace},
    trust_dns_resolver::{
        config::{ResolverConfig, ResolverOpts},
        TokioAsyncResolver,
    },
};

pub struct Resolver {
    inner: TokioAsyncResolver,
}

impl Resolver {
    /// Uses the system resolver configuration, falling back to the library defaults.
    pub fn new() -> Result<Self> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .or_else(|e| {
                debug!("System resolver unavailable ({}), using defaults", e);
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            })
            .map_err(|e| Error::Resolve {
                host: "<resolver>".into(),
                reason: e.to_string(),
            })?;

        Ok(Self { inner })
    }

    /// Resolves a host, preferring IPv4 addresses.
    pub async fn resolve(&self, host: &Host) -> Result<SocketAddr> {
        let s = match host {
            Host::A(addr) => return Ok(*addr),
            Host::S(s) => s,
        };

        let ips = self
            .inner
            .lookup_ip(s.host.as_str())
            .await
            .map_err(|e| Error::Resolve {
                host: s.host.clone(),
                reason: e.to_string(),
            })?
            .iter()
            .collect::<Vec<IpAddr>>();

        let ip = ips
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| ips.first())
            .copied()
            .ok_or_else(|| Error::Resolve {
                host: s.host.clone(),
                reason: "no addresses".into(),
            })?;

        trace!("Resolved {} to {}", s, ip);

        Ok(SocketAddr::new(ip, s.port))
    }
}
