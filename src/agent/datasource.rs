//! File-backed sensor source.
//!
//! Reads the three header-bearing CSV captures (accelerometer, GPS, parking)
//! that stand in for live sensors. Rows are consumed positionally: row i of
//! each file belongs to sampling tick i.

use crate::domain::{AccelerometerSample, GpsSample, ParkingSample};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// All samples read from one capture set.
#[derive(Debug, Clone)]
pub struct SensorReadings {
    pub accelerometer: Vec<AccelerometerSample>,
    pub gps: Vec<GpsSample>,
    pub parking: Vec<ParkingSample>,
}

/// Reads synchronized sensor captures from CSV files.
pub struct FileDatasource {
    accelerometer_path: PathBuf,
    gps_path: PathBuf,
    parking_path: PathBuf,
}

impl FileDatasource {
    pub fn new<P: AsRef<Path>>(accelerometer: P, gps: P, parking: P) -> Self {
        Self {
            accelerometer_path: accelerometer.as_ref().to_path_buf(),
            gps_path: gps.as_ref().to_path_buf(),
            parking_path: parking.as_ref().to_path_buf(),
        }
    }

    /// Reads all three captures. A malformed row is an error, not a skip:
    /// dropping a row would shift every later tick's pairing.
    pub fn read(&self) -> Result<SensorReadings> {
        Ok(SensorReadings {
            accelerometer: self.read_accelerometer()?,
            gps: self.read_gps()?,
            parking: self.read_parking()?,
        })
    }

    /// Accelerometer capture: x,y,z integer columns.
    fn read_accelerometer(&self) -> Result<Vec<AccelerometerSample>> {
        read_rows(&self.accelerometer_path, 3)?
            .into_iter()
            .map(|fields| {
                Ok(AccelerometerSample {
                    x: parse_field(&fields[0], "x")?,
                    y: parse_field(&fields[1], "y")?,
                    z: parse_field(&fields[2], "z")?,
                })
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in {}", self.accelerometer_path.display()))
    }

    /// GPS capture: longitude,latitude float columns (in that order).
    fn read_gps(&self) -> Result<Vec<GpsSample>> {
        read_rows(&self.gps_path, 2)?
            .into_iter()
            .map(|fields| {
                Ok(GpsSample {
                    longitude: parse_field(&fields[0], "longitude")?,
                    latitude: parse_field(&fields[1], "latitude")?,
                })
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in {}", self.gps_path.display()))
    }

    /// Parking capture: count,latitude,longitude columns.
    fn read_parking(&self) -> Result<Vec<ParkingSample>> {
        read_rows(&self.parking_path, 3)?
            .into_iter()
            .map(|fields| {
                Ok(ParkingSample {
                    empty_count: parse_field(&fields[0], "count")?,
                    gps: GpsSample {
                        latitude: parse_field(&fields[1], "latitude")?,
                        longitude: parse_field(&fields[2], "longitude")?,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("in {}", self.parking_path.display()))
    }
}

/// Reads a CSV file, skipping the header row, and splits each non-empty line
/// into exactly `columns` trimmed fields.
fn read_rows(path: &Path, columns: usize) -> Result<Vec<Vec<String>>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sensor file {}", path.display()))?;

    let mut rows = Vec::new();
    for (lineno, line) in contents.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
        if fields.len() != columns {
            return Err(anyhow!(
                "{}:{}: expected {} columns, got {}",
                path.display(),
                lineno + 1,
                columns,
                fields.len()
            ));
        }
        rows.push(fields);
    }
    Ok(rows)
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("invalid {} value '{}'", name, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn sample_files() -> (NamedTempFile, NamedTempFile, NamedTempFile) {
        let accel = write_file("x,y,z\n1,2,16000\n-3,4,12500\n");
        let gps = write_file("longitude,latitude\n30.52,50.45\n30.53,50.46\n");
        let parking = write_file("empty_count,latitude,longitude\n10,50.45,30.52\n");
        (accel, gps, parking)
    }

    #[test]
    fn test_read_all_sources() {
        let (accel, gps, parking) = sample_files();
        let source = FileDatasource::new(accel.path(), gps.path(), parking.path());

        let readings = source.read().unwrap();
        assert_eq!(readings.accelerometer.len(), 2);
        assert_eq!(readings.gps.len(), 2);
        assert_eq!(readings.parking.len(), 1);

        assert_eq!(readings.accelerometer[0].z, 16000);
        // GPS columns are longitude-first
        assert_eq!(readings.gps[0].longitude, 30.52);
        assert_eq!(readings.gps[0].latitude, 50.45);
        assert_eq!(readings.parking[0].empty_count, 10);
        assert_eq!(readings.parking[0].gps.latitude, 50.45);
    }

    #[test]
    fn test_header_row_is_skipped() {
        let accel = write_file("x,y,z\n1,1,1\n");
        let gps = write_file("longitude,latitude\n0.0,0.0\n");
        let parking = write_file("empty_count,latitude,longitude\n1,0.0,0.0\n");
        let source = FileDatasource::new(accel.path(), gps.path(), parking.path());

        let readings = source.read().unwrap();
        assert_eq!(readings.accelerometer.len(), 1);
    }

    #[test]
    fn test_malformed_row_is_an_error() {
        let accel = write_file("x,y,z\n1,2,not-a-number\n");
        let gps = write_file("longitude,latitude\n0.0,0.0\n");
        let parking = write_file("empty_count,latitude,longitude\n1,0.0,0.0\n");
        let source = FileDatasource::new(accel.path(), gps.path(), parking.path());

        assert!(source.read().is_err());
    }

    #[test]
    fn test_wrong_column_count_is_an_error() {
        let accel = write_file("x,y,z\n1,2\n");
        let gps = write_file("longitude,latitude\n0.0,0.0\n");
        let parking = write_file("empty_count,latitude,longitude\n1,0.0,0.0\n");
        let source = FileDatasource::new(accel.path(), gps.path(), parking.path());

        assert!(source.read().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let source = FileDatasource::new("/nonexistent/a.csv", "/nonexistent/b.csv", "/nonexistent/c.csv");
        assert!(source.read().is_err());
    }
}
