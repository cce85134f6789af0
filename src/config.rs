use std::time::Duration;

/// Tunables for the scan pipeline and the vulnerability checks.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Max concurrent probes.
    pub concurrency: usize,
    pub connect_timeout: Duration,
    /// Bounds both the banner connect and the banner read.
    pub banner_timeout: Duration,
    pub banner_read_limit: usize,
    pub ftp_timeout: Duration,
    pub http_timeout: Duration,
    /// Verify certificates and hostnames when grabbing banners over TLS.
    ///
    /// Off by default so self-signed and misconfigured hosts can still be
    /// fingerprinted. Only banner probes on `tls_ports` are affected.
    pub verify_tls: bool,
    /// Ports whose banner probe is wrapped in TLS.
    pub tls_ports: Vec<u16>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 50,
            connect_timeout: Duration::from_secs(1),
            banner_timeout: Duration::from_secs(2),
            banner_read_limit: 1024,
            ftp_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(3),
            verify_tls: false,
            tls_ports: vec![443],
        }
    }
}

impl ScanConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Pool size actually used by the orchestrator.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, 5_000)
    }
}
