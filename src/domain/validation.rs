use super::ProcessedAgentData;
use std::fmt;

/// Validation errors for inbound records
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidLatitude(f64),
    InvalidLongitude(f64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidLatitude(lat) => {
                write!(f, "latitude {} outside [-90, 90]", lat)
            }
            ValidationError::InvalidLongitude(lon) => {
                write!(f, "longitude {} outside [-180, 180]", lon)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a record before persistence.
///
/// Timestamp format and field presence are already enforced by
/// deserialization; this checks the coordinate ranges deserialization
/// cannot: latitude within [-90, 90], longitude within [-180, 180]. Any
/// integer is a valid user_id.
pub fn validate_record(record: &ProcessedAgentData) -> Result<(), ValidationError> {
    let agent = &record.agent_data;

    if !(-90.0..=90.0).contains(&agent.gps.latitude) {
        return Err(ValidationError::InvalidLatitude(agent.gps.latitude));
    }

    if !(-180.0..=180.0).contains(&agent.gps.longitude) {
        return Err(ValidationError::InvalidLongitude(agent.gps.longitude));
    }

    Ok(())
}
