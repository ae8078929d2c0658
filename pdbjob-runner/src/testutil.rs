//! Helpers for tests that need real files and programs on disk

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Creates a fresh directory under the system temp dir
pub fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pdbjob-{}-{}", label, Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a file, creating parent directories
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Writes a `#!/bin/sh` script and marks it executable
pub fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    write_file(&path, &format!("#!/bin/sh\n{}\n", body));
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
