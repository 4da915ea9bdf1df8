//! API key lookup and persistence.
//!
//! Lookup order: the `AICMD_API_KEY` environment variable, then the key file
//! (`~/.aicmd_api_key`), then an interactive prompt whose answer is saved to
//! the key file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "AICMD_API_KEY";
pub const KEY_FILE_NAME: &str = ".aicmd_api_key";

pub fn default_key_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(KEY_FILE_NAME))
}

/// Read the stored key. Missing or blank files yield `None`.
pub fn load_api_key(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(non_blank(&raw))
}

/// Store `key` (trimmed), readable only by the owner on Unix.
pub fn save_api_key(path: &Path, key: &str) -> Result<()> {
    super::write_atomic(path, key.trim())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("restrict permissions on {}", path.display()))?;
    }
    info!(path = %path.display(), "api key saved");
    Ok(())
}

/// Resolve the API key, prompting as a last resort.
///
/// `prompt` is called only when neither `env_value` nor the key file provide a
/// key; a non-blank answer is written to `path`. Returns `None` when every
/// source came up empty.
pub fn resolve_api_key<P>(
    env_value: Option<String>,
    path: &Path,
    prompt: P,
) -> Result<Option<String>>
where
    P: FnOnce() -> Option<String>,
{
    if let Some(key) = env_value.as_deref().and_then(non_blank) {
        debug!("api key taken from environment");
        return Ok(Some(key));
    }
    if let Some(key) = load_api_key(path)? {
        debug!(path = %path.display(), "api key taken from key file");
        return Ok(Some(key));
    }
    let Some(key) = prompt().as_deref().and_then(non_blank) else {
        return Ok(None);
    };
    save_api_key(path, &key)?;
    Ok(Some(key))
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_wins_without_touching_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(KEY_FILE_NAME);
        fs::write(&path, "from-file").expect("seed");

        let key = resolve_api_key(Some(" from-env \n".to_string()), &path, || {
            panic!("prompt must not be called")
        })
        .expect("resolve");
        assert_eq!(key.as_deref(), Some("from-env"));
    }

    #[test]
    fn key_file_is_trimmed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(KEY_FILE_NAME);
        fs::write(&path, "sk-123\n").expect("seed");

        let key = resolve_api_key(Some("   ".to_string()), &path, || None).expect("resolve");
        assert_eq!(key.as_deref(), Some("sk-123"));
    }

    #[test]
    fn prompted_key_is_saved() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(KEY_FILE_NAME);

        let key = resolve_api_key(None, &path, || Some("sk-typed ".to_string())).expect("resolve");
        assert_eq!(key.as_deref(), Some("sk-typed"));
        assert_eq!(load_api_key(&path).expect("load").as_deref(), Some("sk-typed"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn blank_everywhere_is_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(KEY_FILE_NAME);

        let key = resolve_api_key(None, &path, || Some(String::new())).expect("resolve");
        assert_eq!(key, None);
        assert!(!path.exists());
    }
}
