pub mod catalog;
pub mod config;
pub mod cycles;
pub mod dates;
pub mod pipeline;

pub use pipeline::{MoodError, MoodProfile, build_mood_profile};

/// Application name for XDG paths
pub const APP_NAME: &str = "moodswing";
