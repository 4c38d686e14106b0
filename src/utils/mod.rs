//! Identifier parsing and file naming helpers

pub mod filename;
pub mod url;

pub use self::filename::{output_file_name, sanitize_title};
pub use self::url::{parse_video_id, watch_url};
