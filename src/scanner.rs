use crate::banner::{banner_text, grab_banner};
use crate::config::ScanConfig;
use crate::error::{ProbeError, ResolveError};
use crate::fingerprint::guess_os;
use crate::types::{PortResult, ScanResults};
use anyhow::Result;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Resolve a hostname or literal IP to a single address, preferring IPv4.
pub async fn resolve_target(host: &str) -> Result<IpAddr, ResolveError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|source| ResolveError::Lookup {
            host: host.to_string(),
            source,
        })?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| a.ip())
        .ok_or_else(|| ResolveError::NoAddress(host.to_string()))
}

/// Probe one port: TCP connect, then banner grab and OS guess on success.
///
/// A single attempt, bounded by `config.connect_timeout`.
pub async fn probe_port(
    ip: IpAddr,
    port: u16,
    config: &ScanConfig,
) -> Result<PortResult, ProbeError> {
    let addr = SocketAddr::new(ip, port);
    let stream = time::timeout(config.connect_timeout, TcpStream::connect(addr)).await??;
    drop(stream);

    let banner = banner_text(grab_banner(ip, port, config).await);
    let os_guess = guess_os(&banner).to_string();
    Ok(PortResult {
        port,
        banner,
        os_guess,
    })
}

/// Scan `ports` on `ip` with a bounded pool of concurrent probes.
///
/// Closed, filtered and failed ports are dropped from `entries` and only show
/// up in the failure counters. Entries come back sorted by port.
pub async fn scan_target(ip: IpAddr, ports: &[u16], config: &ScanConfig) -> Result<ScanResults> {
    scan_target_internal(ip, ports, config, CancellationToken::new()).await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
///
/// On cancellation no new probes start, in-flight probes are abandoned and the
/// partial results come back with `interrupted` set.
pub async fn scan_target_with_cancel(
    ip: IpAddr,
    ports: &[u16],
    config: &ScanConfig,
    cancel: CancellationToken,
) -> Result<ScanResults> {
    scan_target_internal(ip, ports, config, cancel).await
}

#[derive(Debug, Default)]
struct Aggregate {
    done: u64,
    refused: u64,
    timed_out: u64,
    errored: u64,
    entries: Vec<PortResult>,
}

impl Aggregate {
    fn record(&mut self, outcome: Result<PortResult, ProbeError>) {
        self.done += 1;
        match outcome {
            Ok(entry) => {
                info!(port = entry.port, banner = %entry.banner, "port open");
                self.entries.push(entry);
            }
            Err(ProbeError::Refused) => self.refused += 1,
            Err(ProbeError::Timeout) => self.timed_out += 1,
            Err(e) => {
                trace!(error = %e, "probe failed");
                self.errored += 1;
            }
        }
    }
}

async fn scan_target_internal(
    ip: IpAddr,
    ports: &[u16],
    config: &ScanConfig,
    cancel: CancellationToken,
) -> Result<ScanResults> {
    let mut queue = ports.to_vec();
    queue.sort_unstable();
    queue.dedup();
    let total = queue.len() as u64;

    let concurrency = config.effective_concurrency();
    let sem = Arc::new(Semaphore::new(concurrency));
    let config = Arc::new(config.clone());
    let (tx, mut rx) = mpsc::channel::<Result<PortResult, ProbeError>>(concurrency);

    // Single consumer owns the results; workers only send.
    let aggregator = tokio::spawn(async move {
        let mut agg = Aggregate::default();
        while let Some(outcome) = rx.recv().await {
            agg.record(outcome);
        }
        agg
    });

    debug!(%ip, total, concurrency, "scan starting");
    let mut set = JoinSet::new();
    for port in queue {
        if cancel.is_cancelled() {
            break;
        }
        let permit = tokio::select! {
            permit = sem.clone().acquire_owned() => permit?,
            _ = cancel.cancelled() => break,
        };
        let tx = tx.clone();
        let cancel = cancel.clone();
        let config = config.clone();

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            let outcome = tokio::select! {
                outcome = probe_port(ip, port, &config) => outcome,
                _ = cancel.cancelled() => return,
            };
            let _ = tx.send(outcome).await;
        });
    }
    drop(tx);

    while set.join_next().await.is_some() {}
    let mut agg = aggregator.await?;
    agg.entries.sort_by_key(|e| e.port);

    let results = ScanResults {
        target: ip.to_string(),
        scanned_total: total,
        scanned_done: agg.done,
        open_count: agg.entries.len() as u64,
        refused: agg.refused,
        timed_out: agg.timed_out,
        errored: agg.errored,
        interrupted: cancel.is_cancelled(),
        entries: agg.entries,
    };
    debug!(
        open = results.open_count,
        done = results.scanned_done,
        interrupted = results.interrupted,
        "scan finished"
    );
    Ok(results)
}
