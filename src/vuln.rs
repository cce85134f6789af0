//! Fixed per-port vulnerability checks run after the scan.
//!
//! Each check yields a [`CheckOutcome`] with a tri-state [`Verdict`], so a
//! check that could not complete is never mistaken for one that passed.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_SECURITY_POLICY, SERVER, X_FRAME_OPTIONS};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, info};

use crate::config::ScanConfig;
use crate::error::ProbeError;
use crate::types::PortResult;

const FTP_PORT: u16 = 21;
const HTTP_PORTS: [u16; 2] = [80, 8080];
const FTP_ANON_USER: &str = "anonymous";
const FTP_ANON_PASS: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Information disclosure worth noting, not a risk by itself.
    Info,
    Risk,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Pass,
    Fail,
    /// The check could not complete; carries the reason.
    Inconclusive(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckKind {
    AnonymousFtp,
    HttpSecurityHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub port: u16,
    pub kind: CheckKind,
    pub verdict: Verdict,
    pub findings: Vec<Finding>,
}

impl CheckOutcome {
    fn inconclusive(port: u16, kind: CheckKind, reason: impl Into<String>) -> Self {
        Self {
            port,
            kind,
            verdict: Verdict::Inconclusive(reason.into()),
            findings: Vec::new(),
        }
    }
}

/// Run the check matching each open port. Ports without a check are skipped.
pub async fn run_checks(ip: IpAddr, open: &[PortResult], config: &ScanConfig) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::new();
    for entry in open {
        let addr = SocketAddr::new(ip, entry.port);
        let outcome = match entry.port {
            FTP_PORT => check_ftp_anonymous(addr, config.ftp_timeout).await,
            p if HTTP_PORTS.contains(&p) => check_http_headers(addr, config.http_timeout).await,
            _ => continue,
        };
        info!(port = outcome.port, kind = ?outcome.kind, verdict = ?outcome.verdict, "check done");
        outcomes.push(outcome);
    }
    outcomes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FtpLogin {
    Accepted,
    Rejected(u16),
    /// Server refused service before login (non-2xx greeting).
    Unavailable(u16),
}

/// Try an anonymous FTP login; the whole exchange is bounded by `limit`.
pub async fn check_ftp_anonymous(addr: SocketAddr, limit: Duration) -> CheckOutcome {
    let port = addr.port();
    let kind = CheckKind::AnonymousFtp;
    let login = match time::timeout(limit, ftp_login(addr, FTP_ANON_USER, FTP_ANON_PASS)).await {
        Ok(Ok(login)) => login,
        Ok(Err(e)) => return CheckOutcome::inconclusive(port, kind, e.to_string()),
        Err(_) => return CheckOutcome::inconclusive(port, kind, "timed out"),
    };
    debug!(port, ?login, "ftp anonymous login attempt");

    match login {
        FtpLogin::Accepted => CheckOutcome {
            port,
            kind,
            verdict: Verdict::Fail,
            findings: vec![Finding {
                severity: Severity::Critical,
                message: "Anonymous FTP Login Allowed".to_string(),
            }],
        },
        FtpLogin::Rejected(_) => CheckOutcome {
            port,
            kind,
            verdict: Verdict::Pass,
            findings: Vec::new(),
        },
        FtpLogin::Unavailable(code) => {
            CheckOutcome::inconclusive(port, kind, format!("server greeting {code}"))
        }
    }
}

async fn ftp_login(addr: SocketAddr, user: &str, pass: &str) -> Result<FtpLogin, ProbeError> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let greeting = read_reply(&mut reader).await?;
    if greeting / 100 != 2 {
        return Ok(FtpLogin::Unavailable(greeting));
    }

    write_half.write_all(format!("USER {user}\r\n").as_bytes()).await?;
    let mut code = read_reply(&mut reader).await?;
    if code / 100 == 3 {
        write_half.write_all(format!("PASS {pass}\r\n").as_bytes()).await?;
        code = read_reply(&mut reader).await?;
    }

    let login = if code / 100 == 2 {
        FtpLogin::Accepted
    } else {
        FtpLogin::Rejected(code)
    };
    let _ = write_half.write_all(b"QUIT\r\n").await;
    Ok(login)
}

/// Read one (possibly multi-line) FTP reply and return its code.
async fn read_reply<R>(reader: &mut R) -> Result<u16, ProbeError>
where
    R: AsyncBufRead + Unpin,
{
    let first = read_line(reader).await?;
    let code = reply_code(&first)?;
    if first.as_bytes().get(3) == Some(&b'-') {
        let terminator = format!("{code} ");
        loop {
            let line = read_line(reader).await?;
            if line.starts_with(&terminator) || line.trim_end() == code.to_string() {
                break;
            }
        }
    }
    Ok(code)
}

async fn read_line<R>(reader: &mut R) -> Result<String, ProbeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "ftp server closed connection").into());
    }
    Ok(line)
}

fn reply_code(line: &str) -> Result<u16, ProbeError> {
    line.get(..3)
        .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("bad ftp reply: {}", line.trim_end())).into()
        })
}

/// Fetch `/` over plain HTTP and inspect the response headers.
pub async fn check_http_headers(addr: SocketAddr, limit: Duration) -> CheckOutcome {
    let port = addr.port();
    let kind = CheckKind::HttpSecurityHeaders;
    let client = match reqwest::Client::builder().timeout(limit).no_proxy().build() {
        Ok(c) => c,
        Err(e) => return CheckOutcome::inconclusive(port, kind, e.to_string()),
    };
    let url = format!("http://{addr}/");
    match client.get(&url).send().await {
        Ok(resp) => evaluate_headers(port, resp.headers()),
        Err(e) => {
            debug!(port, error = %e, "http check failed");
            CheckOutcome::inconclusive(port, kind, e.to_string())
        }
    }
}

/// Grade a set of HTTP response headers.
pub fn evaluate_headers(port: u16, headers: &HeaderMap) -> CheckOutcome {
    let mut findings = Vec::new();
    if !headers.contains_key(X_FRAME_OPTIONS) {
        findings.push(Finding {
            severity: Severity::Risk,
            message: "Missing 'X-Frame-Options' header (Clickjacking Risk)".to_string(),
        });
    }
    if !headers.contains_key(CONTENT_SECURITY_POLICY) {
        findings.push(Finding {
            severity: Severity::Risk,
            message: "Missing 'Content-Security-Policy' header (XSS Risk)".to_string(),
        });
    }
    if let Some(server) = headers.get(SERVER) {
        findings.push(Finding {
            severity: Severity::Info,
            message: format!(
                "Server Header Revealed: {}",
                String::from_utf8_lossy(server.as_bytes())
            ),
        });
    }

    let verdict = if findings.iter().any(|f| f.severity >= Severity::Risk) {
        Verdict::Fail
    } else {
        Verdict::Pass
    };
    CheckOutcome {
        port,
        kind: CheckKind::HttpSecurityHeaders,
        verdict,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn bare_headers_fail_with_two_risks() {
        let out = evaluate_headers(80, &HeaderMap::new());
        assert_eq!(out.verdict, Verdict::Fail);
        assert_eq!(out.findings.len(), 2);
        assert!(out.findings.iter().all(|f| f.severity == Severity::Risk));
    }

    #[test]
    fn server_header_is_info_only() {
        let mut h = HeaderMap::new();
        h.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        h.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static("default-src 'self'"));
        h.insert(SERVER, HeaderValue::from_static("nginx/1.25"));
        let out = evaluate_headers(8080, &h);
        assert_eq!(out.verdict, Verdict::Pass);
        assert_eq!(
            out.findings,
            vec![Finding {
                severity: Severity::Info,
                message: "Server Header Revealed: nginx/1.25".into(),
            }]
        );
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut h = HeaderMap::new();
        h.insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));
        let out = evaluate_headers(80, &h);
        assert_eq!(out.findings.len(), 1);
        assert!(out.findings[0].message.contains("Content-Security-Policy"));
    }

    #[test]
    fn reply_codes() {
        assert_eq!(reply_code("220 ready\r\n").unwrap(), 220);
        assert_eq!(reply_code("230-welcome\r\n").unwrap(), 230);
        assert!(reply_code("SSH-2.0-OpenSSH\r\n").is_err());
        assert!(reply_code("22").is_err());
    }

    #[tokio::test]
    async fn multiline_reply_consumed_whole() {
        let data: &[u8] = b"220-Welcome\r\n220-to the server\r\n220 ready\r\n331 need password\r\n";
        let mut reader = BufReader::new(data);
        assert_eq!(read_reply(&mut reader).await.unwrap(), 220);
        assert_eq!(read_reply(&mut reader).await.unwrap(), 331);
    }

    #[tokio::test]
    async fn unknown_ports_are_skipped() {
        let open = vec![PortResult {
            port: 22,
            banner: "SSH-2.0".into(),
            os_guess: "Unknown OS".into(),
        }];
        let out = run_checks(IpAddr::from([127, 0, 0, 1]), &open, &ScanConfig::default()).await;
        assert!(out.is_empty());
    }
}
