//! Built-in performance calculators.

mod null;
mod osu;

pub use null::NullCalculator;
pub use osu::RosuCalculator;
