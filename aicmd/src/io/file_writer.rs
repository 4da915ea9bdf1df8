//! Materializes `WriteFile` directives on disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::types::ExecutionResult;

/// Write `content` to `path`, creating missing parent directories.
///
/// Overwrites unconditionally. I/O failures are reported as a failed
/// [`ExecutionResult`] and never returned as errors.
#[instrument(skip(content), fields(bytes = content.len()))]
pub fn write_file(path: &str, content: &str) -> ExecutionResult {
    match try_write(Path::new(path), content) {
        Ok(()) => {
            info!("file written");
            ExecutionResult::success(format!("file written: {path}"))
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "file write failed");
            ExecutionResult::failure(format!("file write failed: {err:#}"))
        }
    }
}

fn try_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, content.as_bytes()).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a/b/c/notes.txt");
        let content = "first line\n\n  indented 第二行\ttab\n";

        let result = write_file(path.to_str().expect("utf-8 path"), content);
        assert!(result.succeeded, "{}", result.output);
        assert_eq!(fs::read_to_string(&path).expect("read"), content);
    }

    #[test]
    fn overwrites_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("out.txt");
        fs::write(&path, "old contents that are longer").expect("seed");

        let result = write_file(path.to_str().expect("utf-8 path"), "new");
        assert!(result.succeeded);
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
    }

    #[test]
    fn existing_parent_is_fine() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("x.txt");
        assert!(write_file(path.to_str().expect("utf-8 path"), "1").succeeded);
        assert!(write_file(path.to_str().expect("utf-8 path"), "2").succeeded);
    }

    #[test]
    fn failure_is_reported_not_raised() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a dir").expect("seed");
        let path = blocker.join("child.txt");

        let result = write_file(path.to_str().expect("utf-8 path"), "x");
        assert!(!result.succeeded);
        assert!(result.output.starts_with("file write failed"));
        assert_eq!(result.exit_code, None);
    }
}
