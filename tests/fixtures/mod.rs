//! Test Fixtures Module
//!
//! Shared helpers for the integration tests:
//! - Audio fixtures (programmatically generated MP3 frames)
//! - A recording audio output that stands in for a sound card

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

pub mod audio_fixtures;
pub mod mock_output;

pub use audio_fixtures::*;
pub use mock_output::*;
