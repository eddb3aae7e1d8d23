use thiserror::Error;

/// Errors raised while building a ruleset session or its inputs.
///
/// Once a session is constructed nothing in the engine fails; every timing
/// edge case degrades to a defined result instead.
#[derive(Debug, Error)]
pub enum RulesetError {
    #[error("Beatmap has no hit objects")]
    EmptyBeatmap,

    #[error("No players were given")]
    NoPlayers,

    #[error("Player {0:?} was registered twice")]
    DuplicatePlayer(String),

    #[error("Invalid hit object #{index}: {reason}")]
    InvalidObject { index: usize, reason: String },

    #[error("Failed to load beatmap: {0}")]
    Beatmap(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RulesetError>;
