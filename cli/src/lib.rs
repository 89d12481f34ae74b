//! Command-line wiring for the slideshow core.

pub mod cli;
pub mod config;

pub use cli::Args;
pub use config::SlideshowConfig;
