pub mod speak_error;

pub use speak_error::{SpeakError, SpeakResult};
