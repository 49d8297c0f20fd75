//! Locations of the running executable, its siblings, and the shared
//! temporary folder used for Unix sockets.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`tmp_folder`].
pub const TMP_ENV: &str = "STREAMGATE_TMP";

/// Directory containing the running executable.
pub fn executable_dir() -> io::Result<PathBuf> {
    let exe = env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "executable path has no parent directory",
        )
    })
}

/// File names in [`executable_dir`] starting with `prefix`, sorted.
pub fn sibling_executables(prefix: &str) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(executable_dir()?)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(prefix) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Folder for connector sockets: `$STREAMGATE_TMP`, or `streamgate` under
/// the system temp dir. Created if missing.
pub fn tmp_folder() -> io::Result<PathBuf> {
    let dir = env::var_os(TMP_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("streamgate"));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
