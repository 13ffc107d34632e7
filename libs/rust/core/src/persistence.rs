//! On-disk shapes: initial position groups (JSON) and per-iteration series reports (CSV).

use crate::error::{CoverageError, Result};
use crate::geometry::Vec2;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionGroup {
    pub points: Vec<Vec2>,
}

/// One group of station positions per particle of the initial population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPositions {
    pub position_groups: Vec<PositionGroup>,
}

impl InitialPositions {
    pub fn from_layouts<'a, I>(layouts: I) -> Self
    where I: IntoIterator<Item = &'a [Vec2]> {
        Self { position_groups: layouts.into_iter().map(|l| PositionGroup { points: l.to_vec() }).collect() }
    }

    pub fn group_count(&self) -> usize { self.position_groups.len() }

    /// First `population` groups, each cut to `station_count` points. Fails instead of reading
    /// past the end when the data is too small.
    pub fn layouts(&self, population: usize, station_count: usize) -> Result<Vec<Vec<Vec2>>> {
        if self.position_groups.len() < population {
            return Err(CoverageError::InsufficientPositions { needed: population, found: self.position_groups.len() });
        }
        self.position_groups
            .iter()
            .take(population)
            .enumerate()
            .map(|(group, g)| {
                if g.points.len() < station_count {
                    Err(CoverageError::GroupTooShort { group, needed: station_count, found: g.points.len() })
                } else {
                    Ok(g.points[..station_count].to_vec())
                }
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string_pretty(self)?) }

    pub fn from_json(text: &str) -> Result<Self> { Ok(serde_json::from_str(text)?) }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> { Self::from_json(&std::fs::read_to_string(path)?) }
}

/// Named numeric series reported side by side, one row per iteration.
#[derive(Debug, Clone, Default)]
pub struct SeriesReport {
    series: Vec<(String, Vec<f64>)>,
}

impl SeriesReport {
    pub fn new() -> Self { Self::default() }

    pub fn push_series(&mut self, name: impl Into<String>, values: Vec<f64>) { self.series.push((name.into(), values)); }

    pub fn is_empty(&self) -> bool { self.series.is_empty() }

    /// Header `Iteration,<names>`, then 1-based rows with `{:.4}` values; a series shorter than
    /// the longest leaves empty cells.
    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(std::iter::once("Iteration").chain(self.series.iter().map(|(name, _)| name.as_str())))?;

        let rows = self.series.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        for row in 0..rows {
            let cells = self.series.iter().map(|(_, values)| values.get(row).map(|v| format!("{v:.4}")).unwrap_or_default());
            wtr.write_record(std::iter::once((row + 1).to_string()).chain(cells))?;
        }

        let data = wtr.into_inner().map_err(|e| CoverageError::Io(e.into_error()))?;
        String::from_utf8(data).map_err(|e| CoverageError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        std::fs::write(path, self.to_csv()?)?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_matches_group_layout() {
        let ip = InitialPositions::from_layouts([&[Vec2::new(1.0, -2.5)][..]]);
        let json = ip.to_json().unwrap();
        assert!(json.contains("positionGroups"));
        assert!(json.contains("\"points\""));
        assert_eq!(InitialPositions::from_json(&json).unwrap(), ip);
    }

    #[test]
    fn layouts_reject_short_data() {
        let ip = InitialPositions::from_layouts([&[Vec2::ZERO, Vec2::ZERO][..], &[Vec2::ZERO][..]]);
        assert!(matches!(ip.layouts(3, 1), Err(CoverageError::InsufficientPositions { needed: 3, found: 2 })));
        assert!(matches!(ip.layouts(2, 2), Err(CoverageError::GroupTooShort { group: 1, .. })));
        assert_eq!(ip.layouts(2, 1).unwrap().len(), 2);
    }

    #[test]
    fn csv_pads_short_series() {
        let mut r = SeriesReport::new();
        r.push_series("PSO", vec![10.0, 12.5]);
        r.push_series("GA", vec![11.0]);
        assert_eq!(r.to_csv().unwrap(), "Iteration,PSO,GA\n1,10.0000,11.0000\n2,12.5000,\n");
    }

    #[test]
    fn empty_report_is_header_only() {
        assert_eq!(SeriesReport::new().to_csv().unwrap(), "Iteration\n");
    }

    #[test]
    fn json_round_trip_is_bit_exact() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(99);
        let layouts: Vec<Vec<Vec2>> = (0..2000)
            .map(|_| (0..50).map(|_| Vec2::new(rng.gen_range(-25.0..25.0), rng.gen_range(-25.0..25.0))).collect())
            .collect();
        let ip = InitialPositions::from_layouts(layouts.iter().map(Vec::as_slice));
        let back = InitialPositions::from_json(&ip.to_json().unwrap()).unwrap();
        let mismatches = ip
            .position_groups
            .iter()
            .zip(&back.position_groups)
            .flat_map(|(a, b)| a.points.iter().zip(&b.points))
            .filter(|(a, b)| a.x.to_bits() != b.x.to_bits() || a.y.to_bits() != b.y.to_bits())
            .count();
        assert_eq!(mismatches, 0);
        assert_eq!(back.group_count(), 2000);
    }
}
