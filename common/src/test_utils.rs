//! Scratch files for tests, kept under `<workspace>/test_output`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const OUTPUT_DIR: &str = "test_output";

/// Creates the output directory on first use and returns it.
pub fn test_output_dir() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        let dir = manifest_dir
            .parent()
            .unwrap_or(manifest_dir)
            .join(OUTPUT_DIR);
        std::fs::create_dir_all(&dir)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", dir.display(), e));
        dir
    })
}

pub fn test_output_path(name: &str) -> PathBuf {
    test_output_dir().join(name)
}

/// Writes `contents` to a scratch file and returns its path.
pub fn write_test_file(name: &str, contents: &str) -> PathBuf {
    let path = test_output_path(name);
    std::fs::write(&path, contents)
        .unwrap_or_else(|e| panic!("Failed to write {}: {}", path.display(), e));
    path
}
