use crate::config::StorageConfig;
use crate::models::{DayKey, StockRecord};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use duckdb::{params, AccessMode, Config, Connection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One day's tables, keyed by screener id.
pub type ScreenerTables = BTreeMap<String, Vec<StockRecord>>;

const UNIT_EXT: &str = "duckdb";

// ── Schema ────────────────────────────────────────────────────────────────────

fn screener_table_ddl(table: &str) -> String {
    format!(
        r#"CREATE TABLE "{table}" (
            stock_name  VARCHAR NOT NULL,
            price       DOUBLE,
            change      DOUBLE,
            volume      BIGINT,
            symbol      VARCHAR NOT NULL
        );"#
    )
}

const INDEX_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    day         VARCHAR PRIMARY KEY,
    db_path     VARCHAR NOT NULL,
    indexed_at  TIMESTAMP NOT NULL
);
"#;

/// Table names are interpolated into SQL, so only registry-style ids pass.
fn check_table_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !ok {
        bail!("Refusing table name {:?}", name);
    }
    Ok(())
}

fn close(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, e)| e).context("Failed to close DuckDB")
}

// ── Snapshot store ────────────────────────────────────────────────────────────

/// Per-day DuckDB units plus a separate day → unit index.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    daily_dir: PathBuf,
    index_path: PathBuf,
}

impl SnapshotStore {
    pub fn open(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.daily_dir)
            .with_context(|| format!("Could not create dir {:?}", config.daily_dir))?;
        if let Some(parent) = config.index_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        Ok(Self {
            daily_dir: config.daily_dir.clone(),
            index_path: config.index_path.clone(),
        })
    }

    pub fn unit_path(&self, day: &DayKey) -> PathBuf {
        self.daily_dir.join(format!("{}.{}", day, UNIT_EXT))
    }

    // ── Write side ────────────────────────────────────────────────────────────

    /// Write the whole day as one unit, replacing any earlier unit for that
    /// day. The file only appears under its final name once complete.
    pub fn persist(&self, day: &DayKey, tables: &ScreenerTables) -> Result<PathBuf> {
        for name in tables.keys() {
            check_table_name(name)?;
        }

        let final_path = self.unit_path(day);
        let tmp_path = final_path.with_extension(format!("{}.tmp", UNIT_EXT));
        remove_unit_files(&tmp_path)?;

        let conn = Connection::open(&tmp_path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", tmp_path))?;

        let tx = conn.unchecked_transaction()?;
        for (name, rows) in tables {
            tx.execute_batch(&screener_table_ddl(name))
                .with_context(|| format!("create table {}", name))?;

            let sql = format!(
                r#"INSERT INTO "{name}" (stock_name, price, change, volume, symbol) VALUES (?, ?, ?, ?, ?)"#
            );
            let mut stmt = tx.prepare(&sql)?;
            for r in rows {
                stmt.execute(params![r.stock_name, r.price, r.change, r.volume, r.symbol])
                    .with_context(|| format!("insert {} into {}", r.symbol, name))?;
            }
            debug!("{}: {} rows staged", name, rows.len());
        }
        tx.commit()?;
        conn.execute_batch("CHECKPOINT;")?;
        close(conn)?;

        std::fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("Failed to move {:?} into place", tmp_path))?;

        info!("Saved daily snapshot → {:?} ({} tables)", final_path, tables.len());
        Ok(final_path)
    }

    /// Record where a day's unit lives. Called after `persist` succeeded.
    pub fn index_day(&self, day: &DayKey, location: &Path) -> Result<()> {
        let conn = Connection::open(&self.index_path)
            .with_context(|| format!("Failed to open index at {:?}", self.index_path))?;
        conn.execute_batch(INDEX_DDL).context("Index DDL failed")?;
        conn.execute(
            "INSERT OR REPLACE INTO records (day, db_path, indexed_at) VALUES (?, ?, ?)",
            params![day.as_str(), location.to_string_lossy().into_owned(), Utc::now().naive_utc()],
        )
        .with_context(|| format!("index day {}", day))?;
        close(conn)?;

        debug!("Index updated: {} → {:?}", day, location);
        Ok(())
    }

    // ── Read side ─────────────────────────────────────────────────────────────

    /// Days with a unit on disk, newest first.
    pub fn list_days(&self) -> Result<Vec<DayKey>> {
        if !self.daily_dir.exists() {
            return Ok(vec![]);
        }

        let mut days = Vec::new();
        for entry in std::fs::read_dir(&self.daily_dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map(|e| e != UNIT_EXT).unwrap_or(true) {
                continue;
            }
            // Only canonical stems: `unit_path` must map the day back to this file.
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<DayKey>() {
                Ok(day) if day.as_str() == stem => days.push(day),
                _ => debug!("Ignoring stray unit file {:?}", path),
            }
        }
        days.sort_by(|a, b| b.cmp(a));
        Ok(days)
    }

    /// Resolve a day (or the newest day on disk) to its unit. Ignores the
    /// index so a lost or stale index never hides data.
    pub fn locate(&self, day: Option<&DayKey>) -> Result<Option<PathBuf>> {
        match day {
            Some(day) => {
                let path = self.unit_path(day);
                Ok(path.is_file().then_some(path))
            }
            None => Ok(self.list_days()?.first().map(|d| self.unit_path(d))),
        }
    }

    /// Index entries, newest first.
    pub fn indexed_days(&self) -> Result<Vec<(DayKey, PathBuf)>> {
        if !self.index_path.exists() {
            return Ok(vec![]);
        }
        let conn = open_read_only(&self.index_path)?;
        let mut stmt = conn.prepare("SELECT day, db_path FROM records ORDER BY day DESC")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .filter_map(|r| r.ok())
            .filter_map(|(day, path)| Some((day.parse().ok()?, PathBuf::from(path))))
            .collect();
        Ok(rows)
    }

    /// Rows of one screener table in stored order. A table missing from the
    /// unit reads as empty.
    pub fn read_table(&self, unit: &Path, table: &str) -> Result<Vec<StockRecord>> {
        let conn = open_read_only(unit)?;
        read_table_with(&conn, table)
    }

    pub fn read_tables(&self, unit: &Path, tables: &[String]) -> Result<ScreenerTables> {
        let conn = open_read_only(unit)?;
        tables
            .iter()
            .map(|t| Ok((t.clone(), read_table_with(&conn, t)?)))
            .collect()
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    let config = Config::default().access_mode(AccessMode::ReadOnly)?;
    Connection::open_with_flags(path, config)
        .with_context(|| format!("Failed to open DuckDB at {:?}", path))
}

fn read_table_with(conn: &Connection, table: &str) -> Result<Vec<StockRecord>> {
    check_table_name(table)?;

    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        params![table],
        |r| r.get(0),
    )?;
    if exists == 0 {
        return Ok(vec![]);
    }

    let mut stmt = conn.prepare(&format!(
        r#"SELECT stock_name, price, change, volume, symbol FROM "{table}" ORDER BY rowid"#
    ))?;
    let rows = stmt
        .query_map([], |r| {
            Ok(StockRecord {
                stock_name: r.get(0)?,
                price: r.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                change: r.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                volume: r.get::<_, Option<i64>>(3)?.unwrap_or(0),
                symbol: r.get(4)?,
            })
        })?
        .collect::<duckdb::Result<Vec<_>>>()
        .with_context(|| format!("read table {}", table))?;
    Ok(rows)
}

/// Remove a unit file and the WAL DuckDB may leave next to it.
fn remove_unit_files(path: &Path) -> Result<()> {
    let mut wal = path.as_os_str().to_owned();
    wal.push(".wal");
    for p in [path.to_path_buf(), PathBuf::from(wal)] {
        if p.exists() {
            std::fs::remove_file(&p).with_context(|| format!("Failed to remove {:?}", p))?;
        }
    }
    Ok(())
}
