use crate::domain::models::{PersistedAccumulators, TimerPhase};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_database;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Mirror of the committed timer accumulators, read back after a reload.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedAccumulators>, InfraError>;
    fn save(&self, accumulators: &PersistedAccumulators) -> Result<(), InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    db_path: PathBuf,
}

impl SqliteSessionStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_database(&self.db_path)
    }
}

fn non_negative(value: i64) -> u64 {
    value.max(0) as u64
}

impl SessionStore for SqliteSessionStore {
    fn load(&self) -> Result<Option<PersistedAccumulators>, InfraError> {
        let connection = self.connect()?;
        let row: Option<(String, i64, i64, i64, f64)> = connection
            .query_row(
                "SELECT phase, work_time_accum_seconds, break_time_accum_seconds,
                        session_total_work_seconds, session_iterations
                 FROM session_state WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        let Some((phase_raw, work, rest, session_work, iterations)) = row else {
            return Ok(None);
        };

        let phase = TimerPhase::parse(&phase_raw).ok_or_else(|| {
            InfraError::InvalidConfig(format!("invalid session_state.phase '{phase_raw}'"))
        })?;

        Ok(Some(PersistedAccumulators {
            phase,
            work_time_accum_seconds: non_negative(work),
            break_time_accum_seconds: non_negative(rest),
            session_total_work_seconds: non_negative(session_work),
            session_iterations: iterations,
        }))
    }

    fn save(&self, accumulators: &PersistedAccumulators) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO session_state (
               id, phase, work_time_accum_seconds, break_time_accum_seconds,
               session_total_work_seconds, session_iterations, updated_at
             )
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               phase = excluded.phase,
               work_time_accum_seconds = excluded.work_time_accum_seconds,
               break_time_accum_seconds = excluded.break_time_accum_seconds,
               session_total_work_seconds = excluded.session_total_work_seconds,
               session_iterations = excluded.session_iterations,
               updated_at = excluded.updated_at",
            params![
                accumulators.phase.as_str(),
                accumulators.work_time_accum_seconds as i64,
                accumulators.break_time_accum_seconds as i64,
                accumulators.session_total_work_seconds as i64,
                accumulators.session_iterations,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM session_state WHERE id = 1", [])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    state: Mutex<Option<PersistedAccumulators>>,
}

impl InMemorySessionStore {
    pub fn with_state(accumulators: PersistedAccumulators) -> Self {
        Self {
            state: Mutex::new(Some(accumulators)),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self) -> Result<Option<PersistedAccumulators>, InfraError> {
        let state = self
            .state
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("session store: {error}")))?;
        Ok(state.clone())
    }

    fn save(&self, accumulators: &PersistedAccumulators) -> Result<(), InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("session store: {error}")))?;
        *state = Some(accumulators.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let mut state = self
            .state
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("session store: {error}")))?;
        *state = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::initialize_database;

    fn temp_db(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "taskai-session-store-{}-{name}.sqlite",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        initialize_database(&path).expect("initialize database");
        path
    }

    fn sample() -> PersistedAccumulators {
        PersistedAccumulators {
            phase: TimerPhase::Break,
            work_time_accum_seconds: 0,
            break_time_accum_seconds: 42,
            session_total_work_seconds: 1800,
            session_iterations: 0.5,
        }
    }

    #[test]
    fn sqlite_store_round_trips_and_overwrites() {
        let path = temp_db("roundtrip");
        let store = SqliteSessionStore::new(&path);
        assert_eq!(store.load().expect("load empty"), None);

        store.save(&sample()).expect("save");
        assert_eq!(store.load().expect("load"), Some(sample()));

        let mut next = sample();
        next.break_time_accum_seconds = 60;
        next.session_iterations = 1.0;
        store.save(&next).expect("overwrite");
        assert_eq!(store.load().expect("reload"), Some(next));

        store.clear().expect("clear");
        assert_eq!(store.load().expect("load cleared"), None);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn sqlite_store_rejects_unknown_phase() {
        let path = temp_db("bad-phase");
        let store = SqliteSessionStore::new(&path);
        store.save(&sample()).expect("save");
        open_database(&path)
            .expect("open")
            .execute("UPDATE session_state SET phase = 'nap' WHERE id = 1", [])
            .expect("corrupt row");

        assert!(matches!(store.load(), Err(InfraError::InvalidConfig(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn in_memory_store_round_trips() {
        let store = InMemorySessionStore::default();
        store.save(&sample()).expect("save");
        assert_eq!(store.load().expect("load"), Some(sample()));
        store.clear().expect("clear");
        assert_eq!(store.load().expect("load"), None);
    }
}
