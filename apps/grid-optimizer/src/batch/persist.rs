//! Durable JSON file helpers.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::PersistenceError;

/// Write `value` to `path` atomically.
///
/// The document goes to a sibling temp file which is synced and then
/// renamed over the target, so readers see either the old or new file.
pub(crate) fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
    }

    let bytes = serde_json::to_vec_pretty(value).map_err(|e| PersistenceError::json(path, e))?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp).map_err(|e| PersistenceError::io(&tmp, e))?;
        file.write_all(&bytes)
            .map_err(|e| PersistenceError::io(&tmp, e))?;
        file.sync_all().map_err(|e| PersistenceError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| PersistenceError::io(path, e))?;
    Ok(())
}

/// Read a JSON document, `None` if the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PersistenceError::json(path, e))
}
