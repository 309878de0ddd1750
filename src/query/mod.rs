//! Read path over stored snapshots. No network I/O; every call opens its
//! own read-only connection, so the service can be shared freely.

pub mod report;

use crate::models::DayKey;
use crate::registry::Registry;
use crate::storage::{ScreenerTables, SnapshotStore};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub use self::report::{compose_report, ReportDocument};

/// `get_table` target: every registered screener, or a single one.
pub const ALL_TABLES: &str = "all";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no snapshot stored for {}", day_label(.0))]
    DayNotFound(Option<DayKey>),

    #[error("unknown screener {0:?}")]
    UnknownScreener(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

fn day_label(day: &Option<DayKey>) -> &str {
    day.as_ref().map(DayKey::as_str).unwrap_or("latest")
}

#[derive(Clone)]
pub struct QueryService {
    store: SnapshotStore,
    registry: Arc<Registry>,
}

impl QueryService {
    pub fn new(store: SnapshotStore, registry: Arc<Registry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list_days(&self) -> Result<Vec<DayKey>, QueryError> {
        Ok(self.store.list_days()?)
    }

    /// Stored rows for `selector` ("all" or a screener id) on `day`, or on the
    /// newest stored day when `day` is `None`.
    pub fn get_table(&self, day: Option<&DayKey>, selector: &str) -> Result<ScreenerTables, QueryError> {
        let unit = self
            .store
            .locate(day)?
            .ok_or_else(|| QueryError::DayNotFound(day.cloned()))?;

        let ids = if selector == ALL_TABLES {
            self.registry.ids()
        } else if self.registry.contains(selector) {
            vec![selector.to_string()]
        } else {
            return Err(QueryError::UnknownScreener(selector.to_string()));
        };

        debug!("Reading {} table(s) from {:?}", ids.len(), unit);
        Ok(self.store.read_tables(&unit, &ids)?)
    }

    /// Composite report over the fixed report sections. A missing day is not
    /// an error here: the document says no data is available.
    pub fn get_report(&self, day: Option<&DayKey>, as_of: NaiveDate) -> Result<ReportDocument, QueryError> {
        let tables = match self.store.locate(day)? {
            Some(unit) => Some(self.store.read_tables(&unit, &report::report_section_ids())?),
            None => None,
        };
        Ok(compose_report(as_of, tables.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::models::{placeholder_set, StockRecord};
    use tempfile::TempDir;

    fn abc() -> StockRecord {
        StockRecord {
            stock_name: "ABC".into(),
            price: 10.0,
            change: 3.0,
            volume: 5000,
            symbol: "ABC".into(),
        }
    }

    fn service(dir: &TempDir) -> QueryService {
        let store = SnapshotStore::open(&StorageConfig {
            daily_dir: dir.path().join("daily"),
            index_path: dir.path().join("index.duckdb"),
        })
        .unwrap();

        let mut tables = ScreenerTables::new();
        tables.insert("bms".into(), vec![abc()]);
        tables.insert("lowest_pe".into(), placeholder_set());
        store.persist(&"2024_05_01".parse().unwrap(), &tables).unwrap();

        QueryService::new(store, Arc::new(Registry::builtin()))
    }

    #[test]
    fn test_get_all_returns_stored_tables_unchanged() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let day: DayKey = "2024_05_01".parse().unwrap();

        let all = svc.get_table(Some(&day), ALL_TABLES).unwrap();
        assert_eq!(all.len(), Registry::builtin().len());
        assert_eq!(all["bms"], vec![abc()]);
        assert_eq!(all["lowest_pe"], placeholder_set());
        assert!(all["sales_jump"].is_empty());
    }

    #[test]
    fn test_missing_day_is_not_found() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let day: DayKey = "2024_05_02".parse().unwrap();

        let err = svc.get_table(Some(&day), "bms").unwrap_err();
        assert!(matches!(err, QueryError::DayNotFound(Some(ref d)) if *d == day));
    }

    #[test]
    fn test_unknown_screener_rejected() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let err = svc.get_table(None, "not_a_screener").unwrap_err();
        assert!(matches!(err, QueryError::UnknownScreener(_)));
    }

    #[test]
    fn test_latest_single_table() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let one = svc.get_table(None, "bms").unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one["bms"], vec![abc()]);
    }

    #[test]
    fn test_report_filters_stored_rows() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let doc = svc
            .get_report(None, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .unwrap();
        assert_eq!(doc.sections.len(), 7);
        assert_eq!(doc.sections[0].rows, vec![abc()]);
        assert!(doc.sections[1].rows.is_empty());
    }
}
