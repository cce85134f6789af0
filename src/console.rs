//! Colored operator output.

use colored::Colorize;

use crate::diff::PortDiff;
use crate::types::{PortResult, ScanResults};
use crate::vuln::{CheckOutcome, Severity, Verdict};

const BANNER_ART: &str = r"
    __      __  _
    \ \    / / (_)
     \ \  / /   _   _ __     ___   _ __
      \ \/ /   | | | '_ \   / _ \ | '__|
       \  /    | | | |_) | |  __/ | |
        \/     |_| | .__/   \___| |_|
                   | |
                   |_|
    -------------------------------------
    Reconnaissance & Vulnerability Scanner
    For Educational Use Only
    -------------------------------------
";

pub fn print_banner() {
    println!("{}", BANNER_ART.green().bold());
}

/// One line per open port: port, first 40 chars of the banner, OS guess.
pub fn format_open_port(r: &PortResult) -> String {
    let snippet: String = r.banner.chars().take(40).collect();
    format!(
        "    {} | {:<40} | {}",
        format!("[+] Port {:<5} OPEN", r.port).green().bold(),
        snippet,
        r.os_guess.yellow().bold()
    )
}

pub fn print_scan_results(results: &ScanResults) {
    for r in &results.entries {
        println!("{}", format_open_port(r));
    }
    println!(
        "\n[*] Scan complete. Found {} open ports ({} probed: {} refused, {} timed out, {} errored).",
        results.open_count,
        results.scanned_done,
        results.refused,
        results.timed_out,
        results.errored
    );
}

pub fn print_check_outcomes(outcomes: &[CheckOutcome]) {
    println!("\n{}", "[*] Initiating vulnerability checks...".cyan().bold());
    let mut any_finding = false;
    for o in outcomes {
        println!("    [*] Checking port {} ({:?})...", o.port, o.kind);
        if let Verdict::Inconclusive(reason) = &o.verdict {
            println!("    {}", format!("[?] Check inconclusive: {reason}").dimmed());
        }
        for f in &o.findings {
            any_finding = true;
            let line = match f.severity {
                Severity::Critical => format!("[!] CRITICAL: {} on port {}!", f.message, o.port)
                    .red()
                    .bold(),
                Severity::Risk => format!("[!] {}", f.message).yellow().bold(),
                Severity::Info => format!("[i] {}", f.message).cyan().bold(),
            };
            println!("    {line}");
        }
    }
    if !any_finding {
        println!(
            "    {}",
            "[*] No obvious vulnerabilities found in basic checks.".green().bold()
        );
    }
}

pub fn print_diff(diff: &PortDiff) {
    match diff {
        PortDiff::Baseline => println!(
            "{}",
            "[*] First time scanning this target. Saving baseline.".cyan().bold()
        ),
        PortDiff::Unchanged => println!(
            "{}",
            "[*] No changes detected since last scan.".green().bold()
        ),
        PortDiff::Changed { new, closed } => {
            for p in new {
                println!(
                    "{}",
                    format!("[!] ALERT: Port {p} is NEW (was closed previously)!").red().bold()
                );
            }
            for p in closed {
                println!(
                    "{}",
                    format!("[-] Note: Port {p} has CLOSED (was open previously).").yellow().bold()
                );
            }
        }
    }
}

pub fn print_alert(msg: &str) {
    println!("{}", format!("[!] {msg}").red().bold());
}

pub fn print_error(msg: &str) {
    eprintln!("{}", format!("[!] Error: {msg}").red().bold());
}
