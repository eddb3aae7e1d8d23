use crate::difficulty::{PerformanceCalculator, PerformanceResult, ScoreParams};

/// Calculator that always rates zero. Used when no beatmap file is available
/// or rating is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCalculator;

impl PerformanceCalculator for NullCalculator {
    fn id(&self) -> &str {
        "none"
    }

    fn display_name(&self) -> &str {
        "Disabled"
    }

    fn calculate(&self, _params: &ScoreParams) -> PerformanceResult {
        PerformanceResult::default()
    }
}
