use crate::domain::models::{DailyTotal, StoredInterval};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_database;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only store of recorded focus intervals.
pub trait ProductivityRepository: Send + Sync {
    /// Returns `false` when the same user already stored the identical interval.
    fn insert_interval(&self, record: &StoredInterval) -> Result<bool, InfraError>;
    fn daily_totals(&self, user_id: &str) -> Result<Vec<DailyTotal>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteProductivityRepository {
    db_path: PathBuf,
}

impl SqliteProductivityRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_database(&self.db_path)
    }
}

impl ProductivityRepository for SqliteProductivityRepository {
    fn insert_interval(&self, record: &StoredInterval) -> Result<bool, InfraError> {
        let connection = self.connect()?;
        let changed = connection.execute(
            "INSERT INTO productivity_timer (
               user_id, started_at_ms, ended_at_ms, duration_seconds, date, created_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, started_at_ms, ended_at_ms) DO NOTHING",
            params![
                record.user_id,
                record.interval.start_ms(),
                record.interval.end_ms(),
                record.duration_seconds as i64,
                record.date,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn daily_totals(&self, user_id: &str) -> Result<Vec<DailyTotal>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT date, COALESCE(SUM(duration_seconds), 0)
             FROM productivity_timer
             WHERE user_id = ?1
             GROUP BY date
             ORDER BY date",
        )?;
        let rows = statement.query_map(params![user_id], |row| {
            Ok(DailyTotal {
                date: row.get(0)?,
                total_duration: row.get::<_, i64>(1)?.max(0) as u64,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(InfraError::from)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProductivityRepository {
    records: Mutex<Vec<StoredInterval>>,
}

impl InMemoryProductivityRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredInterval>>, InfraError> {
        self.records
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("productivity records: {error}")))
    }
}

impl ProductivityRepository for InMemoryProductivityRepository {
    fn insert_interval(&self, record: &StoredInterval) -> Result<bool, InfraError> {
        let mut records = self.lock()?;
        let exists = records
            .iter()
            .any(|existing| existing.user_id == record.user_id && existing.interval == record.interval);
        if exists {
            return Ok(false);
        }
        records.push(record.clone());
        Ok(true)
    }

    fn daily_totals(&self, user_id: &str) -> Result<Vec<DailyTotal>, InfraError> {
        let records = self.lock()?;
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();
        for record in records.iter().filter(|record| record.user_id == user_id) {
            *totals.entry(record.date.clone()).or_default() += record.duration_seconds;
        }
        Ok(totals
            .into_iter()
            .map(|(date, total_duration)| DailyTotal {
                date,
                total_duration,
            })
            .collect())
    }
}
