use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{IoError, IoResult};

/// Write `value` as pretty JSON, creating parent directories as needed.
pub fn save_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> IoResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|e| IoError::io(path, e))?;
    debug!(path = %path.display(), "saved artifact");
    Ok(())
}

/// Read a JSON artifact. An absent file is [`IoError::NotFound`].
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> IoResult<T> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    let value = serde_json::from_str(&json).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded artifact");
    Ok(value)
}
