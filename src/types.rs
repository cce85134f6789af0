use serde::{Deserialize, Serialize};
use ::time::{format_description::well_known, OffsetDateTime};

/// One open port found on the target.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortResult {
    pub port: u16,
    pub banner: String,
    pub os_guess: String,
}

/// Aggregate results and counters for one scan of one target.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanResults {
    pub target: String,
    pub scanned_total: u64,
    pub scanned_done: u64,
    pub open_count: u64,
    pub refused: u64,
    pub timed_out: u64,
    pub errored: u64,
    pub interrupted: bool,
    /// Open ports, ascending by port number.
    pub entries: Vec<PortResult>,
}

impl ScanResults {
    pub fn open_ports(&self) -> std::collections::BTreeSet<u16> {
        self.entries.iter().map(|e| e.port).collect()
    }
}

/// RFC3339 UTC timestamp for records and reports.
pub fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
