//! Record persistence using SQLite.
//!
//! One flattened row per classified record. Rowid assignment gives every
//! record a monotonically increasing id; the `Mutex<Connection>` linearizes
//! concurrent creates so ids never collide.
//!
//! # Schema
//! ```sql
//! CREATE TABLE processed_agent_data (
//!     id         INTEGER PRIMARY KEY,
//!     road_state TEXT NOT NULL,
//!     user_id    INTEGER NOT NULL,
//!     x          INTEGER NOT NULL,
//!     y          INTEGER NOT NULL,
//!     z          INTEGER NOT NULL,
//!     latitude   REAL NOT NULL,
//!     longitude  REAL NOT NULL,
//!     timestamp  TEXT NOT NULL      -- RFC 3339
//! );
//! ```

use crate::domain::{PersistedRecord, ProcessedAgentData, RoadState};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Persistence errors
#[derive(Debug)]
pub enum StoreError {
    /// No record under the requested id.
    NotFound,
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "record not found"),
            StoreError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Persists classified records in SQLite.
pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    /// Opens (or creates) the database and ensures the table exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn create_table(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS processed_agent_data (
                id         INTEGER PRIMARY KEY,
                road_state TEXT NOT NULL,
                user_id    INTEGER NOT NULL,
                x          INTEGER NOT NULL,
                y          INTEGER NOT NULL,
                z          INTEGER NOT NULL,
                latitude   REAL NOT NULL,
                longitude  REAL NOT NULL,
                timestamp  TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Inserts one record and returns it with its assigned id.
    pub fn create(&self, data: &ProcessedAgentData) -> Result<PersistedRecord, StoreError> {
        self.create_with(data, |_| {})
    }

    /// Inserts one record and invokes `after_commit` with the persisted row
    /// before the connection lock is released.
    ///
    /// Callers that fan the record out to subscribers use this so that
    /// publish order always matches id assignment order: two concurrent
    /// creates for the same user cannot publish out of order, because the
    /// lock serializes insert+publish as one step. The callback must not
    /// block.
    pub fn create_with<F>(
        &self,
        data: &ProcessedAgentData,
        after_commit: F,
    ) -> Result<PersistedRecord, StoreError>
    where
        F: FnOnce(&PersistedRecord),
    {
        let conn = self.conn.lock().unwrap();
        let agent = &data.agent_data;
        conn.execute(
            "INSERT INTO processed_agent_data
                (road_state, user_id, x, y, z, latitude, longitude, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                data.road_state.as_str(),
                agent.user_id,
                agent.accelerometer.x,
                agent.accelerometer.y,
                agent.accelerometer.z,
                agent.gps.latitude,
                agent.gps.longitude,
                agent.timestamp.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, user_id = agent.user_id, "record persisted");
        let record = PersistedRecord::flatten(id, data);
        after_commit(&record);
        Ok(record)
    }

    /// Returns the record under `id`, or `NotFound`.
    pub fn get(&self, id: i64) -> Result<PersistedRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, road_state, user_id, x, y, z, latitude, longitude, timestamp
             FROM processed_agent_data WHERE id = ?1",
            params![id],
            map_record,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }

    /// Returns every record, oldest first. Unbounded: grows with ingestion
    /// volume, there is no pagination.
    pub fn list(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, road_state, user_id, x, y, z, latitude, longitude, timestamp
             FROM processed_agent_data ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], map_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Replaces every field of the record under `id`, or `NotFound`.
    pub fn update(
        &self,
        id: i64,
        data: &ProcessedAgentData,
    ) -> Result<PersistedRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        let agent = &data.agent_data;
        let changed = conn.execute(
            "UPDATE processed_agent_data
             SET road_state = ?1, user_id = ?2, x = ?3, y = ?4, z = ?5,
                 latitude = ?6, longitude = ?7, timestamp = ?8
             WHERE id = ?9",
            params![
                data.road_state.as_str(),
                agent.user_id,
                agent.accelerometer.x,
                agent.accelerometer.y,
                agent.accelerometer.z,
                agent.gps.latitude,
                agent.gps.longitude,
                agent.timestamp.to_rfc3339(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(PersistedRecord::flatten(id, data))
    }

    /// Removes the record under `id` and returns its prior state, or
    /// `NotFound`. Lookup and delete run under one lock acquisition.
    pub fn delete(&self, id: i64) -> Result<PersistedRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT id, road_state, user_id, x, y, z, latitude, longitude, timestamp
                 FROM processed_agent_data WHERE id = ?1",
                params![id],
                map_record,
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;
        conn.execute(
            "DELETE FROM processed_agent_data WHERE id = ?1",
            params![id],
        )?;
        Ok(record)
    }
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<PersistedRecord> {
    let road_state_raw: String = row.get(1)?;
    let road_state = parse_road_state(&road_state_raw)
        .map_err(|e| column_error(1, e))?;
    let timestamp_raw: String = row.get(8)?;
    let timestamp: DateTime<Utc> = timestamp_raw
        .parse()
        .map_err(|e: chrono::ParseError| column_error(8, Box::new(e)))?;

    Ok(PersistedRecord {
        id: row.get(0)?,
        road_state,
        user_id: row.get(2)?,
        x: row.get(3)?,
        y: row.get(4)?,
        z: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        timestamp,
    })
}

fn parse_road_state(
    raw: &str,
) -> Result<RoadState, Box<dyn std::error::Error + Send + Sync + 'static>> {
    match raw {
        "normal" => Ok(RoadState::Normal),
        "small_pits" => Ok(RoadState::SmallPits),
        "large_pits" => Ok(RoadState::LargePits),
        other => Err(format!("unknown road_state '{}'", other).into()),
    }
}

fn column_error(
    index: usize,
    e: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccelerometerSample, AggregatedData, GpsSample, ParkingSample};
    use chrono::TimeZone;

    fn in_memory_store() -> RecordStore {
        RecordStore::in_memory().expect("in-memory store failed")
    }

    fn sample_data(user_id: i64, z: i32) -> ProcessedAgentData {
        ProcessedAgentData {
            road_state: RoadState::Normal,
            agent_data: AggregatedData {
                user_id,
                accelerometer: AccelerometerSample { x: 1, y: 2, z },
                gps: GpsSample {
                    latitude: 50.45,
                    longitude: 30.52,
                },
                parking: ParkingSample::default(),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 14, 9, 26, 53).unwrap(),
            },
        }
    }

    #[test]
    fn test_create_then_read() {
        let store = in_memory_store();
        let created = store.create(&sample_data(1, 15000)).expect("create failed");

        let fetched = store.get(created.id).expect("get failed");
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_create_with_sees_persisted_row_before_returning() {
        let store = in_memory_store();
        let mut observed = None;

        let created = store
            .create_with(&sample_data(1, 15000), |record| {
                observed = Some(record.clone());
            })
            .unwrap();

        assert_eq!(observed, Some(created));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let store = in_memory_store();
        let a = store.create(&sample_data(1, 15000)).unwrap();
        let b = store.create(&sample_data(1, 15000)).unwrap();
        let c = store.create(&sample_data(2, 15000)).unwrap();
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = in_memory_store();
        assert!(matches!(store.get(999), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_list_is_idempotent() {
        let store = in_memory_store();
        store.create(&sample_data(1, 15000)).unwrap();
        store.create(&sample_data(2, 13000)).unwrap();

        let first = store.list().unwrap();
        let second = store.list().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_update_replaces_all_fields() {
        let store = in_memory_store();
        let created = store.create(&sample_data(1, 15000)).unwrap();

        let mut replacement = sample_data(9, 21000);
        replacement.road_state = RoadState::LargePits;
        let updated = store.update(created.id, &replacement).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.road_state, RoadState::LargePits);
        assert_eq!(updated.user_id, 9);
        assert_eq!(updated.z, 21000);

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched, updated);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = in_memory_store();
        let result = store.update(42, &sample_data(1, 15000));
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[test]
    fn test_delete_returns_prior_state_then_not_found() {
        let store = in_memory_store();
        let created = store.create(&sample_data(1, 15000)).unwrap();

        let deleted = store.delete(created.id).unwrap();
        assert_eq!(deleted, created);

        assert!(matches!(store.get(created.id), Err(StoreError::NotFound)));
        assert!(matches!(store.delete(created.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        let created = {
            let store = RecordStore::new(&path).unwrap();
            store.create(&sample_data(1, 15000)).unwrap()
        };

        let store = RecordStore::new(&path).unwrap();
        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched, created);
    }
}
