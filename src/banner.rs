//! Best-effort banner grabbing.
//!
//! Every port gets the same HTTP `HEAD` probe regardless of the service behind
//! it; whatever comes back first is taken as the banner. Ports listed in
//! `ScanConfig::tls_ports` (443 by default) are wrapped in TLS before probing.

use std::net::{IpAddr, SocketAddr};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, trace};

use crate::config::ScanConfig;
use crate::error::ProbeError;

/// Banner used when the service answered with nothing.
pub const UNKNOWN_SERVICE: &str = "Unknown Service";
/// Banner used when the grab itself failed.
pub const NO_BANNER: &str = "No Banner / Timeout";

/// Connect to `ip:port`, send the probe and return the first response line.
///
/// `Ok(None)` means the service accepted the probe but sent nothing back before
/// the read timeout (or closed the connection).
pub async fn grab_banner(
    ip: IpAddr,
    port: u16,
    config: &ScanConfig,
) -> Result<Option<String>, ProbeError> {
    let addr = SocketAddr::new(ip, port);
    let stream = time::timeout(config.banner_timeout, TcpStream::connect(addr)).await??;
    let probe = http_probe(ip);

    if config.tls_ports.contains(&port) {
        let connector = tls_connector(config.verify_tls)?;
        let mut tls = time::timeout(
            config.banner_timeout,
            connector.connect(&ip.to_string(), stream),
        )
        .await??;
        exchange(&mut tls, &probe, config).await
    } else {
        let mut stream = stream;
        exchange(&mut stream, &probe, config).await
    }
}

/// Collapse a grab outcome into the banner string shown to the operator.
pub fn banner_text(outcome: Result<Option<String>, ProbeError>) -> String {
    match outcome {
        Ok(Some(line)) => line,
        Ok(None) => UNKNOWN_SERVICE.to_string(),
        Err(e) => {
            debug!(error = %e, "banner grab failed");
            NO_BANNER.to_string()
        }
    }
}

/// First line of a raw response, decoded lossily. `None` for blank responses.
pub fn first_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    text.trim()
        .lines()
        .next()
        .map(|line| line.trim_end().to_string())
}

fn http_probe(ip: IpAddr) -> Vec<u8> {
    format!("HEAD / HTTP/1.1\r\nHost: {ip}\r\n\r\n").into_bytes()
}

fn tls_connector(verify: bool) -> Result<tokio_native_tls::TlsConnector, ProbeError> {
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(!verify)
        .danger_accept_invalid_hostnames(!verify)
        // targets are bare IPs
        .use_sni(false)
        .build()?;
    Ok(tokio_native_tls::TlsConnector::from(connector))
}

async fn exchange<S>(
    stream: &mut S,
    probe: &[u8],
    config: &ScanConfig,
) -> Result<Option<String>, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    time::timeout(config.banner_timeout, stream.write_all(probe)).await??;

    let mut buf = vec![0u8; config.banner_read_limit];
    let n = match time::timeout(config.banner_timeout, stream.read(&mut buf)).await {
        Ok(read) => read?,
        Err(_) => {
            trace!("service stayed silent after probe");
            0
        }
    };
    Ok(first_line(&buf[..n]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_strips_crlf() {
        let raw = b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n";
        assert_eq!(first_line(raw).as_deref(), Some("HTTP/1.1 200 OK"));
    }

    #[test]
    fn first_line_skips_leading_whitespace() {
        assert_eq!(first_line(b"\r\n  220 ProFTPD ready\r\n").as_deref(), Some("220 ProFTPD ready"));
    }

    #[test]
    fn blank_response_is_none() {
        assert_eq!(first_line(b""), None);
        assert_eq!(first_line(b" \r\n\t"), None);
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let line = first_line(b"SSH-2.0-\xff\xfeOpenSSH\n").unwrap();
        assert!(line.starts_with("SSH-2.0-"));
        assert!(line.ends_with("OpenSSH"));
    }

    #[test]
    fn policy_maps_outcomes_to_sentinels() {
        assert_eq!(banner_text(Ok(Some("x".into()))), "x");
        assert_eq!(banner_text(Ok(None)), UNKNOWN_SERVICE);
        assert_eq!(banner_text(Err(ProbeError::Timeout)), NO_BANNER);
        assert_eq!(banner_text(Err(ProbeError::Refused)), NO_BANNER);
    }

    #[test]
    fn probe_carries_host_header() {
        let p = http_probe("10.0.0.5".parse().unwrap());
        assert_eq!(p, b"HEAD / HTTP/1.1\r\nHost: 10.0.0.5\r\n\r\n".to_vec());
    }
}
