use anyhow::{bail, Context, Result};

/// Port spec used when the operator gives none.
pub const DEFAULT_PORT_SPEC: &str = "1-1000";

/// Parse a port spec into a deduplicated list of TCP ports (1..=65535).
///
/// Supported forms:
/// - single port number: `80`
/// - inclusive range: `1-1000`
/// - comma-separated list: `22,80,443`, whose elements may themselves be ranges
///
/// Order of first appearance is preserved.
pub fn parse_port_spec(s: &str) -> Result<Vec<u16>> {
    let spec = s.trim();
    if spec.is_empty() {
        bail!("empty port spec");
    }

    let mut out: Vec<u16> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for raw in spec.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            bail!("empty entry in port list: {spec}");
        }

        // Range `start-end`
        if let Some((a, b)) = token.split_once('-') {
            let start = parse_port_str(a.trim())
                .with_context(|| format!("invalid start in range: {token}"))?;
            let end = parse_port_str(b.trim())
                .with_context(|| format!("invalid end in range: {token}"))?;
            if start > end {
                bail!("invalid range {start}-{end} (start > end)");
            }
            for p in start..=end {
                if seen.insert(p) {
                    out.push(p);
                }
            }
            continue;
        }

        // Single number
        let p = parse_port_str(token).with_context(|| format!("invalid port value: {token}"))?;
        if seen.insert(p) {
            out.push(p);
        }
    }

    Ok(out)
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}
