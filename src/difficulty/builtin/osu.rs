//! osu! performance calculator using rosu-pp.

use crate::difficulty::{CalcError, PerformanceCalculator, PerformanceResult, ScoreParams};
use std::path::Path;
use std::str::FromStr;

/// osu! performance calculator using rosu-pp.
pub struct RosuCalculator {
    map: rosu_pp::Beatmap,
    version: String,
}

impl std::fmt::Debug for RosuCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosuCalculator")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl RosuCalculator {
    /// Parses the beatmap file a second time with rosu-pp's own decoder.
    pub fn from_path(path: &Path) -> Result<Self, CalcError> {
        let map = rosu_pp::Beatmap::from_path(path)
            .map_err(|e| CalcError::InvalidBeatmap(format!("{:?}: {}", path, e)))?;
        Ok(Self::with_map(map))
    }

    /// Converts an already decoded rosu-map beatmap.
    pub fn from_beatmap(map: &rosu_map::Beatmap) -> Result<Self, CalcError> {
        let map_str = map
            .clone()
            .encode_to_string()
            .map_err(|e| CalcError::InvalidBeatmap(e.to_string()))?;

        let map = rosu_pp::Beatmap::from_str(&map_str)
            .map_err(|e| CalcError::InvalidBeatmap(e.to_string()))?;

        Ok(Self::with_map(map))
    }

    fn with_map(map: rosu_pp::Beatmap) -> Self {
        Self {
            map,
            version: "v1.0".to_string(),
        }
    }
}

impl PerformanceCalculator for RosuCalculator {
    fn id(&self) -> &str {
        "osu"
    }

    fn display_name(&self) -> &str {
        "osu! (rosu-pp)"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn calculate(&self, params: &ScoreParams) -> PerformanceResult {
        let mut performance = rosu_pp::Performance::new(&self.map)
            .mods(params.mods.bits())
            .combo(params.max_combo)
            .accuracy(params.accuracy)
            .misses(params.misses);

        if params.passed_objects > 0 {
            performance = performance.passed_objects(params.passed_objects);
        }

        let attrs = performance.calculate();

        PerformanceResult {
            pp: attrs.pp(),
            stars: attrs.stars(),
        }
    }
}
