use crate::domain::{AccelerometerSample, AggregatedData, GpsSample, ParkingSample};
use chrono::Utc;
use tracing::warn;

/// Merges the three sensor streams into one record per tick, pairing samples
/// strictly by position.
///
/// Output length is the minimum of the three input lengths. Trailing samples
/// from longer sources are discarded; a mismatch is logged because it means
/// part of the capture is silently lost. Timestamps are the wall-clock time
/// of aggregation, not of capture.
pub fn aggregate(
    accelerometer: &[AccelerometerSample],
    gps: &[GpsSample],
    parking: &[ParkingSample],
    user_id: i64,
) -> Vec<AggregatedData> {
    let len = accelerometer
        .len()
        .min(gps.len())
        .min(parking.len());

    if accelerometer.len() != len || gps.len() != len || parking.len() != len {
        warn!(
            accelerometer = accelerometer.len(),
            gps = gps.len(),
            parking = parking.len(),
            kept = len,
            "sensor sources have mismatched lengths; truncating to shortest"
        );
    }

    let now = Utc::now();
    (0..len)
        .map(|i| AggregatedData {
            user_id,
            accelerometer: accelerometer[i],
            gps: gps[i],
            parking: parking[i],
            timestamp: now,
        })
        .collect()
}
