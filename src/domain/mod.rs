use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::{validate_record, ValidationError};

/// One accelerometer reading, raw integer axis values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccelerometerSample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// One GPS fix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    pub latitude: f64,
    pub longitude: f64,
}

/// One parking-sensor reading: free spot count at a position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParkingSample {
    pub empty_count: i32,
    pub gps: GpsSample,
}

/// All sensor readings from a single sampling tick, stamped at aggregation
/// time and tagged with the originating device's user id.
///
/// The parking sample stays agent-side; the ingestion wire format carries
/// only accelerometer and GPS, so it is skipped during serialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedData {
    pub user_id: i64,
    pub accelerometer: AccelerometerSample,
    pub gps: GpsSample,
    #[serde(skip)]
    pub parking: ParkingSample,
    pub timestamp: DateTime<Utc>,
}

/// Road-surface condition derived from accelerometer data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadState {
    Normal,
    SmallPits,
    LargePits,
}

impl RoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoadState::Normal => "normal",
            RoadState::SmallPits => "small_pits",
            RoadState::LargePits => "large_pits",
        }
    }
}

/// A classified record, the unit transmitted upstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedAgentData {
    pub road_state: RoadState,
    pub agent_data: AggregatedData,
}

/// A classified record as persisted by the store: the agent fields flattened
/// into one row plus the store-assigned id. The id is the durable identity
/// used by CRUD lookups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: i64,
    pub road_state: RoadState,
    pub user_id: i64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl PersistedRecord {
    /// Flatten a classified record into its row form under the given id.
    pub fn flatten(id: i64, data: &ProcessedAgentData) -> Self {
        Self {
            id,
            road_state: data.road_state,
            user_id: data.agent_data.user_id,
            x: data.agent_data.accelerometer.x,
            y: data.agent_data.accelerometer.y,
            z: data.agent_data.accelerometer.z,
            latitude: data.agent_data.gps.latitude,
            longitude: data.agent_data.gps.longitude,
            timestamp: data.agent_data.timestamp,
        }
    }
}
