//! Data types shared by the engine, the processors and the listeners.

pub mod engine;
pub mod mods;
pub mod score;
pub mod settings;
pub mod stats;
