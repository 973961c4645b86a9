// Step view models
//
// Each view owns its local input, validates it, and hands exactly one
// completion value to the workflow controller:
// - Upload: picks and validates the video file
// - Language: fixes the source sentinel and picks a target language
// - Download: presents the result and fetches the artifact

pub mod upload;
pub mod language;
pub mod download;

pub use upload::*;
pub use language::*;
pub use download::*;
