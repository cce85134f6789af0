use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::diff::{compute_diff, PortDiff};
use crate::error::StoreError;
use crate::types::{now_rfc3339, PortResult, ScanResults};

/// Default database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "viperscan.db";

const SCHEMA_SQL: &str = r#"
-- One row per completed scan
CREATE TABLE IF NOT EXISTS scans (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    target_ip  TEXT NOT NULL,
    scan_date  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scans_target ON scans(target_ip);

-- Open ports found by a scan
CREATE TABLE IF NOT EXISTS ports (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id      INTEGER NOT NULL REFERENCES scans(id),
    port_number  INTEGER NOT NULL,
    banner       TEXT
);
CREATE INDEX IF NOT EXISTS idx_ports_scan ON ports(scan_id);
"#;

fn initialize(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// A persisted scan header.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScanRecord {
    pub id: i64,
    pub target_ip: String,
    pub scan_date: String,
}

/// Outcome of recording a completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryUpdate {
    pub scan_id: i64,
    pub diff: PortDiff,
}

/// Append-only scan history backed by SQLite.
pub struct ScanStore {
    conn: Connection,
}

impl ScanStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        initialize(&conn)?;
        debug!(path = %path.display(), "scan database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Record a completed scan and its open ports. Returns the new scan id.
    pub fn record_scan(&self, target_ip: &str, results: &[PortResult]) -> Result<i64, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO scans (target_ip, scan_date) VALUES (?1, ?2)",
            params![target_ip, now_rfc3339()],
        )?;
        let scan_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO ports (scan_id, port_number, banner) VALUES (?1, ?2, ?3)",
            )?;
            for r in results {
                stmt.execute(params![scan_id, i64::from(r.port), r.banner])?;
            }
        }
        tx.commit()?;

        debug!(scan_id, target_ip, ports = results.len(), "scan recorded");
        Ok(scan_id)
    }

    /// Most recent scan of `target_ip`, if any.
    pub fn latest_scan(&self, target_ip: &str) -> Result<Option<ScanRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                "SELECT id, target_ip, scan_date FROM scans
                 WHERE target_ip = ?1 ORDER BY id DESC LIMIT 1",
                params![target_ip],
                |row| {
                    Ok(ScanRecord {
                        id: row.get(0)?,
                        target_ip: row.get(1)?,
                        scan_date: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Open ports from the most recent scan of `target_ip`.
    ///
    /// `None` when the target has never been scanned, which is distinct from a
    /// previous scan that found nothing open.
    pub fn last_scan_ports(&self, target_ip: &str) -> Result<Option<BTreeSet<u16>>, StoreError> {
        let Some(scan) = self.latest_scan(target_ip)? else {
            return Ok(None);
        };
        let mut stmt = self
            .conn
            .prepare("SELECT port_number FROM ports WHERE scan_id = ?1")?;
        let ports = stmt
            .query_map(params![scan.id], |row| row.get::<_, u16>(0))?
            .collect::<Result<BTreeSet<u16>, _>>()?;
        Ok(Some(ports))
    }

    /// Diff a scan against the target's previous one, then record it.
    ///
    /// Interrupted scans are never recorded and return `None`.
    pub fn track(&self, results: &ScanResults) -> Result<Option<HistoryUpdate>, StoreError> {
        if results.interrupted {
            debug!(target_ip = %results.target, "interrupted scan not recorded");
            return Ok(None);
        }
        let previous = self.last_scan_ports(&results.target)?;
        let diff = compute_diff(previous.as_ref(), &results.open_ports());
        let scan_id = self.record_scan(&results.target, &results.entries)?;
        Ok(Some(HistoryUpdate { scan_id, diff }))
    }

    pub fn scan_count(&self, target_ip: &str) -> Result<u64, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scans WHERE target_ip = ?1",
            params![target_ip],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}
