pub mod file_format;
pub mod log_setup;
pub mod parallel;
pub mod test_utils;

pub use file_format::{
    deserialize, deserialize_file, get_file_extension, FileFormat, FileFormatError,
    FileFormatResult,
};
