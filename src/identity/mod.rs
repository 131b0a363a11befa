//! Identity store: stable anonymous identifiers persisted as small JSON files.
//!
//! Two scopes exist. The project identifier lives in `<project>/cdktf.json`
//! under `projectId`, next to whatever else the project keeps there. The user
//! identifier lives in `<home>/.cdktf/config.json` under `userId` and carries
//! an explanatory comment under the `"//"` field. Identifiers are never
//! rotated; deleting the file is the only way to get a new one.
//!
//! Reads and writes are not locked. Two processes racing on the same file may
//! both write, and the last writer wins.

pub mod file;
pub mod memory;

pub use file::{FileIdentityStore, get_or_create_identifier};
pub use memory::MemoryIdentityStore;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Field that holds the human-readable comment in a freshly created file.
pub const COMMENT_KEY: &str = "//";

pub const PROJECT_CONFIG_FILE: &str = "cdktf.json";
pub const PROJECT_ID_KEY: &str = "projectId";

pub const USER_CONFIG_DIR: &str = ".cdktf";
pub const USER_CONFIG_FILE: &str = "config.json";
pub const USER_ID_KEY: &str = "userId";

pub const USER_ID_COMMENT: &str = "This signature is a randomly generated UUID used to anonymously \
differentiate users in telemetry data order to inform product direction.\n\
This signature is random, it is not based on any personally identifiable information.\n\
To create a new signature, you can simply delete this file at any time.\n\
See https://github.com/hashicorp/terraform-cdk/blob/main/CHECKPOINT.md for more \
information on how to opt-out.";

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Get-or-create storage for anonymous identifiers.
///
/// Implementations return the stored value for `key` when one exists, and
/// otherwise generate a random v4 UUID, store it and return it.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_or_create(&self, key: &str, comment: Option<&str>)
    -> Result<String, IdentityError>;
}

/// Store backing the project-scoped identifier.
pub fn project_identity_store(project_dir: impl AsRef<Path>) -> FileIdentityStore {
    FileIdentityStore::new(project_dir.as_ref().join(PROJECT_CONFIG_FILE))
}

/// Store backing the user-scoped identifier.
pub fn user_identity_store(home_dir: impl AsRef<Path>) -> FileIdentityStore {
    FileIdentityStore::new(
        home_dir
            .as_ref()
            .join(USER_CONFIG_DIR)
            .join(USER_CONFIG_FILE),
    )
}

/// Resolves the current user's home directory from `HOME`, then `USERPROFILE`.
pub fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|name| std::env::var_os(name))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}
