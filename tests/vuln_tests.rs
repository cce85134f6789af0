use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use viperscan_rs::vuln::{check_ftp_anonymous, check_http_headers, CheckKind, Severity, Verdict};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const LIMIT: Duration = Duration::from_secs(2);

/// Minimal FTP server: greets, then answers USER with 331 and PASS with
/// `pass_reply`.
async fn fake_ftp(pass_reply: &'static str) -> SocketAddr {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (r, mut w) = stream.into_split();
        let mut lines = BufReader::new(r).lines();
        w.write_all(b"220-Welcome\r\n220 FTP ready\r\n").await.unwrap();
        while let Ok(Some(line)) = lines.next_line().await {
            let reply: &[u8] = if line.starts_with("USER anonymous") {
                b"331 Please specify the password.\r\n"
            } else if line.starts_with("PASS anonymous") {
                pass_reply.as_bytes()
            } else if line.starts_with("QUIT") {
                let _ = w.write_all(b"221 Goodbye.\r\n").await;
                break;
            } else {
                b"500 Unknown command.\r\n"
            };
            if w.write_all(reply).await.is_err() {
                break;
            }
        }
    });
    addr
}

async fn fake_http(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    listener.local_addr().unwrap()
}

#[tokio::test]
async fn anonymous_ftp_accepted_is_critical() {
    let addr = fake_ftp("230 Login successful.\r\n").await;
    let out = check_ftp_anonymous(addr, LIMIT).await;
    assert_eq!(out.kind, CheckKind::AnonymousFtp);
    assert_eq!(out.verdict, Verdict::Fail);
    assert_eq!(out.findings.len(), 1);
    assert_eq!(out.findings[0].severity, Severity::Critical);
    assert_eq!(out.findings[0].message, "Anonymous FTP Login Allowed");
}

#[tokio::test]
async fn anonymous_ftp_rejected_passes() {
    let addr = fake_ftp("530 Login incorrect.\r\n").await;
    let out = check_ftp_anonymous(addr, LIMIT).await;
    assert_eq!(out.verdict, Verdict::Pass);
    assert!(out.findings.is_empty());
}

#[tokio::test]
async fn unreachable_ftp_is_inconclusive() {
    let out = check_ftp_anonymous(unused_addr().await, LIMIT).await;
    assert!(matches!(out.verdict, Verdict::Inconclusive(_)));
    assert!(out.findings.is_empty());
}

#[tokio::test]
async fn silent_ftp_times_out_inconclusive() {
    let listener = TcpListener::bind((LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    let out = check_ftp_anonymous(addr, Duration::from_millis(300)).await;
    assert_eq!(out.verdict, Verdict::Inconclusive("timed out".into()));
}

#[tokio::test]
async fn http_missing_headers_flagged() {
    let addr = fake_http(
        "HTTP/1.1 200 OK\r\nServer: Apache/2.4.1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let out = check_http_headers(addr, LIMIT).await;
    assert_eq!(out.kind, CheckKind::HttpSecurityHeaders);
    assert_eq!(out.verdict, Verdict::Fail);
    let risks = out.findings.iter().filter(|f| f.severity == Severity::Risk).count();
    assert_eq!(risks, 2);
    assert!(out
        .findings
        .iter()
        .any(|f| f.severity == Severity::Info && f.message == "Server Header Revealed: Apache/2.4.1"));
}

#[tokio::test]
async fn http_hardened_headers_pass() {
    let addr = fake_http(
        "HTTP/1.1 200 OK\r\nx-frame-options: DENY\r\nContent-Security-Policy: default-src 'self'\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let out = check_http_headers(addr, LIMIT).await;
    assert_eq!(out.verdict, Verdict::Pass);
    assert!(out.findings.is_empty());
}

#[tokio::test]
async fn unreachable_http_is_inconclusive() {
    let out = check_http_headers(unused_addr().await, LIMIT).await;
    assert!(matches!(out.verdict, Verdict::Inconclusive(_)));
}
