use super::{COMMENT_KEY, IdentityError, IdentityStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Returns the identifier stored under `key` in the JSON object at `path`,
/// creating it when missing.
///
/// - Missing or unparsable file: a new object holding the comment (newlines
///   flattened to spaces) and a fresh UUID is written over `path`.
/// - Object already holding a non-empty string under `key`: returned as is,
///   the file is not touched.
/// - Object without `key`: a fresh UUID is merged in and the file rewritten
///   with every other field kept in place.
pub async fn get_or_create_identifier(
    path: &Path,
    key: &str,
    comment: Option<&str>,
) -> Result<String, IdentityError> {
    let mut object = match read_object(path).await {
        Some(object) => {
            if let Some(Value::String(existing)) = object.get(key) {
                if !existing.is_empty() {
                    return Ok(existing.clone());
                }
            }
            object
        }
        None => {
            let mut object = Map::new();
            if let Some(comment) = comment {
                object.insert(
                    COMMENT_KEY.to_string(),
                    Value::String(comment.replace('\n', " ")),
                );
            }
            object
        }
    };

    let identifier = Uuid::new_v4().to_string();
    object.insert(key.to_string(), Value::String(identifier.clone()));
    write_object(path, &object).await?;

    debug!(path = %path.display(), key, "created anonymous identifier");
    Ok(identifier)
}

async fn read_object(path: &Path) -> Option<Map<String, Value>> {
    let contents = fs::read(path).await.ok()?;
    match serde_json::from_slice(&contents) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

async fn write_object(path: &Path, object: &Map<String, Value>) -> Result<(), IdentityError> {
    let io_error = |source| IdentityError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut contents = serde_json::to_string_pretty(object)?;
    contents.push('\n');
    fs::write(path, contents).await.map_err(io_error)
}

/// Identity store bound to a single JSON file.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn get_or_create(
        &self,
        key: &str,
        comment: Option<&str>,
    ) -> Result<String, IdentityError> {
        get_or_create_identifier(&self.path, key, comment).await
    }
}
