use crate::domain::{AggregatedData, RoadState};

// Acceleration bands on the vertical axis, half-open. A value at a shared
// boundary belongs to the band listed first.
const NORMAL: (i32, i32) = (14_000, 18_000);
const SMALL_PITS_LOW: (i32, i32) = (12_000, 14_000);
const SMALL_PITS_HIGH: (i32, i32) = (18_000, 20_000);

/// Classifies road-surface condition from one aggregated record.
///
/// Pure and total: every z value maps to exactly one `RoadState`. Readings
/// outside all named bands indicate severe vertical shock and fall to
/// `LargePits`.
pub fn classify(data: &AggregatedData) -> RoadState {
    let z = data.accelerometer.z;

    if in_band(z, NORMAL) {
        RoadState::Normal
    } else if in_band(z, SMALL_PITS_LOW) || in_band(z, SMALL_PITS_HIGH) {
        RoadState::SmallPits
    } else {
        RoadState::LargePits
    }
}

fn in_band(z: i32, (start, end): (i32, i32)) -> bool {
    start <= z && z < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccelerometerSample, GpsSample, ParkingSample};
    use chrono::Utc;

    fn data_with_z(z: i32) -> AggregatedData {
        AggregatedData {
            user_id: 1,
            accelerometer: AccelerometerSample { x: 0, y: 0, z },
            gps: GpsSample::default(),
            parking: ParkingSample::default(),
            timestamp: Utc::now(),
        }
    }

    fn classify_z(z: i32) -> RoadState {
        classify(&data_with_z(z))
    }

    #[test]
    fn test_normal_band() {
        assert_eq!(classify_z(14_000), RoadState::Normal);
        assert_eq!(classify_z(16_000), RoadState::Normal);
        assert_eq!(classify_z(17_999), RoadState::Normal);
    }

    #[test]
    fn test_small_pits_bands() {
        assert_eq!(classify_z(12_000), RoadState::SmallPits);
        assert_eq!(classify_z(13_999), RoadState::SmallPits);
        assert_eq!(classify_z(18_000), RoadState::SmallPits);
        assert_eq!(classify_z(19_999), RoadState::SmallPits);
    }

    #[test]
    fn test_large_pits_everywhere_else() {
        assert_eq!(classify_z(11_999), RoadState::LargePits);
        assert_eq!(classify_z(20_000), RoadState::LargePits);
        assert_eq!(classify_z(21_000), RoadState::LargePits);
        assert_eq!(classify_z(0), RoadState::LargePits);
        assert_eq!(classify_z(-5_000), RoadState::LargePits);
        assert_eq!(classify_z(i32::MAX), RoadState::LargePits);
        assert_eq!(classify_z(i32::MIN), RoadState::LargePits);
    }

    #[test]
    fn test_shared_boundaries_belong_to_lower_band() {
        // 14000 is both the end of the lower small-pits band and the start
        // of normal; normal wins per the stated ordering.
        assert_eq!(classify_z(14_000), RoadState::Normal);
        // 18000 ends normal and starts the upper small-pits band.
        assert_eq!(classify_z(18_000), RoadState::SmallPits);
    }
}
