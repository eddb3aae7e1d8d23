pub mod beatmap;
pub mod difficulty;
pub mod hit_object;
pub mod hit_window;
pub mod input;

pub use beatmap::Beatmap;
pub use difficulty::{BaseDifficulty, DifficultyContext, difficulty_range};
pub use hit_object::{HitObjectKind, HitObjectSpec, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH, Vec2};
pub use hit_window::HitWindow;
pub use input::CursorSample;
