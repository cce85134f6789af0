use std::path::PathBuf;
use std::time::Instant;

use viperscan_rs::config::ScanConfig;
use viperscan_rs::ports::{self, DEFAULT_PORT_SPEC};
use viperscan_rs::store::{ScanStore, DEFAULT_DB_PATH};
use viperscan_rs::types::ScanResults;
use viperscan_rs::{console, report, scanner, vuln};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// viperscan-rs: single-target TCP reconnaissance with banner grabbing, basic
/// vulnerability checks and scan history diffing.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "viperscan-rs",
    version,
    about = "Single-target TCP reconnaissance & vulnerability scanner. For educational use only.",
    long_about = None
)]
struct Cli {
    /// Target IP address or hostname.
    #[arg(short = 't', long)]
    target: String,

    /// Ports to scan: a range (1-1000), a list (80,443) or a single port.
    #[arg(short = 'p', long, default_value = DEFAULT_PORT_SPEC)]
    ports: String,

    /// Number of concurrent probes.
    #[arg(long, default_value_t = 50)]
    threads: usize,

    /// Save results to a file; `.html` writes HTML, anything else JSON.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Scan history database.
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Verify TLS certificates and hostnames when grabbing port 443 banners.
    #[arg(long = "verify-tls", default_value_t = false)]
    verify_tls: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    console::print_banner();

    let port_list = match ports::parse_port_spec(&cli.ports) {
        Ok(p) => p,
        Err(e) => Cli::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("invalid --ports '{}': {e:#}", cli.ports),
            )
            .exit(),
    };

    println!("[*] Validating target: {}...", cli.target);
    let target_ip = match scanner::resolve_target(&cli.target).await {
        Ok(ip) => ip,
        Err(e) => {
            console::print_error(&e.to_string());
            std::process::exit(1);
        }
    };
    println!("[*] Target resolved to: {target_ip}");
    println!("[*] Ports parsed: Scanning {} ports", port_list.len());
    println!("[*] Threads set to: {}", cli.threads);

    let config = ScanConfig {
        verify_tls: cli.verify_tls,
        ..ScanConfig::default()
    }
    .with_concurrency(cli.threads);
    if !config.verify_tls {
        warn!("TLS certificate and hostname verification disabled for banner grabs");
    }

    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    println!("\n[+] Starting Scan... (Press Ctrl+C to stop)");
    let started = Instant::now();
    let results =
        scanner::scan_target_with_cancel(target_ip, &port_list, &config, cancel.clone()).await?;
    if results.interrupted {
        println!("\n[!] Scan interrupted by user.");
        return Ok(());
    }
    console::print_scan_results(&results);

    if !results.entries.is_empty() {
        let outcomes = tokio::select! {
            outcomes = vuln::run_checks(target_ip, &results.entries, &config) => outcomes,
            _ = cancel.cancelled() => {
                println!("\n[!] Scan interrupted by user.");
                return Ok(());
            }
        };
        console::print_check_outcomes(&outcomes);
    }
    println!("[+] Scan completed in {:.2?}", started.elapsed());
    if cancel.is_cancelled() {
        println!("\n[!] Scan interrupted by user.");
        return Ok(());
    }

    if let Some(path) = cli.output.as_deref() {
        if results.entries.is_empty() {
            console::print_alert("No open ports found. Skipping report.");
        } else {
            match report::write_report(&results.target, &results.entries, path) {
                Ok(written) => println!("[+] Report successfully saved to {}", written.display()),
                Err(e) => {
                    error!(error = %e, "report write failed");
                    console::print_error(&format!("saving report: {e}"));
                }
            }
        }
    }

    if cancel.is_cancelled() {
        println!("\n[!] Interrupted before saving history.");
        return Ok(());
    }
    if let Err(e) = track_history(&cli.db, &results) {
        error!(error = %e, "history update failed");
        console::print_error(&format!("updating scan history: {e}"));
    }

    Ok(())
}

/// Diff against the last recorded scan of this target, then record this one.
fn track_history(db: &std::path::Path, results: &ScanResults) -> Result<()> {
    println!("{}", "-".repeat(40));
    println!("[*] Analyzing changes for {}...", results.target);

    let store = ScanStore::open(db)?;
    if let Some(update) = store.track(results)? {
        console::print_diff(&update.diff);
        info!(scan_id = update.scan_id, "scan saved");
        println!(
            "[+] Saved scan results to database (Scan ID: {})",
            update.scan_id
        );
    }
    Ok(())
}
