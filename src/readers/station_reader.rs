use crate::error::Result;
use crate::models::StationMetadata;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use validator::Validate;

/// Reads the station/grid-cell registry from a CSV list with the header
/// `code,name,latitude,longitude,elevation`.
pub struct StationReader {
    skip_invalid: bool,
}

impl StationReader {
    pub fn new() -> Self {
        Self { skip_invalid: true }
    }

    /// When `false`, the first record failing validation aborts the read
    pub fn with_skip_invalid(skip_invalid: bool) -> Self {
        Self { skip_invalid }
    }

    pub fn read_stations(&self, path: &Path) -> Result<Vec<StationMetadata>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_path(path)?;

        let mut stations = Vec::new();

        for result in reader.deserialize::<StationMetadata>() {
            let station = result?;
            match station.validate() {
                Ok(()) => stations.push(station),
                Err(e) if self.skip_invalid => {
                    warn!("Skipping invalid station '{}': {}", station.code, e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!("Read {} stations from {}", stations.len(), path.display());
        Ok(stations)
    }

    /// Stations keyed by code; later duplicates replace earlier ones
    pub fn read_stations_map(&self, path: &Path) -> Result<HashMap<String, StationMetadata>> {
        let stations = self.read_stations(path)?;
        let mut map = HashMap::with_capacity(stations.len());

        for station in stations {
            map.insert(station.code.clone(), station);
        }

        Ok(map)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn station_file(lines: &[&str]) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "code,name,latitude,longitude,elevation")?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_read_stations_file() -> Result<()> {
        let file = station_file(&[
            "# Emilia-Romagna network",
            "00123, Bologna Urbana , 44.50, 11.35, 54",
            "S1,Test station,45.0,10.0,",
        ])?;

        let stations = StationReader::new().read_stations(file.path())?;

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].code, "00123");
        assert_eq!(stations[0].name, "Bologna Urbana");
        assert_eq!(stations[0].elevation, Some(54.0));
        assert_eq!(stations[1].code, "S1");
        assert_eq!(stations[1].elevation, None);
        Ok(())
    }

    #[test]
    fn test_invalid_station_handling() -> Result<()> {
        let file = station_file(&["BAD,Nowhere,95.0,10.0,", "S1,Good,45.0,10.0,"])?;

        let stations = StationReader::new().read_stations(file.path())?;
        assert_eq!(stations.len(), 1);

        let strict = StationReader::with_skip_invalid(false).read_stations(file.path());
        assert!(matches!(strict, Err(ProcessingError::Validation(_))));
        Ok(())
    }

    #[test]
    fn test_read_stations_map() -> Result<()> {
        let file = station_file(&["S1,One,45.0,10.0,", "S2,Two,46.0,11.0,100"])?;

        let map = StationReader::new().read_stations_map(file.path())?;
        assert_eq!(map.len(), 2);
        assert_eq!(map["S2"].name, "Two");
        Ok(())
    }
}
