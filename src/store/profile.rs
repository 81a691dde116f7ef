//! User profile store.
//!
//! Persists a single `UserProfile` document. Avatars supplied as inline
//! `data:<mime>;base64,<payload>` URIs are decoded into the avatars directory
//! and the profile keeps only the file path.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DataPaths, Document, JsonFileDocument, StoreError};
use crate::task::task::deserialize_present;

const DEFAULT_PROFILE_NAME: &str = "User";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    /// Path of the stored avatar image (or an external reference).
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub data_directory: String,
}

impl UserProfile {
    pub fn with_data_directory(data_directory: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            avatar: None,
            location: None,
            data_directory: data_directory.into(),
        }
    }
}

/// Partial profile update. `avatar` and `location` accept explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<String>,
}

/// An inline image parsed from a `data:` URI.
#[derive(Debug, PartialEq, Eq)]
struct InlineImage {
    extension: String,
    bytes: Vec<u8>,
}

/// Parse `data:<mime>;base64,<payload>`.
///
/// Returns `Ok(None)` for values that are not data URIs at all.
fn parse_data_uri(value: &str) -> Result<Option<InlineImage>, StoreError> {
    let Some(rest) = value.strip_prefix("data:") else {
        return Ok(None);
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StoreError::Validation("Malformed data URI: missing payload".to_string()))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(StoreError::Validation(
            "Avatar data URI must be base64-encoded".to_string(),
        ));
    }

    let subtype = mime
        .split_once('/')
        .map(|(_, sub)| sub)
        .ok_or_else(|| StoreError::Validation(format!("Invalid avatar mime type: {}", mime)))?;
    let extension: String = subtype
        .split('+')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if extension.is_empty() {
        return Err(StoreError::Validation(format!(
            "Invalid avatar mime type: {}",
            mime
        )));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| StoreError::Validation(format!("Invalid avatar payload: {}", e)))?;

    Ok(Some(InlineImage { extension, bytes }))
}

/// Owner of the profile document and the avatars directory.
pub struct ProfileStore {
    document: Arc<dyn Document<UserProfile>>,
    avatars_dir: PathBuf,
    default_data_directory: String,
    persist_lock: Mutex<()>,
}

impl ProfileStore {
    /// Open the JSON-backed profile under the given data directory.
    pub async fn open(paths: &DataPaths) -> Result<Self, StoreError> {
        paths.ensure().await?;
        let document: Arc<dyn Document<UserProfile>> =
            Arc::new(JsonFileDocument::new(paths.profile_file()));
        Self::with_document(
            document,
            paths.avatars_dir(),
            paths.root.to_string_lossy().to_string(),
        )
        .await
    }

    pub async fn with_document(
        document: Arc<dyn Document<UserProfile>>,
        avatars_dir: PathBuf,
        default_data_directory: String,
    ) -> Result<Self, StoreError> {
        tracing::info!(
            persistent = document.is_persistent(),
            "Opened profile store"
        );
        let store = Self {
            document,
            avatars_dir,
            default_data_directory,
            persist_lock: Mutex::new(()),
        };
        {
            let _guard = store.persist_lock.lock().await;
            store.load_or_init().await?;
        }
        Ok(store)
    }

    async fn load_or_init(&self) -> Result<UserProfile, StoreError> {
        if let Some(profile) = self.document.load().await? {
            return Ok(profile);
        }
        let profile = UserProfile::with_data_directory(self.default_data_directory.clone());
        self.document.save(&profile).await?;
        tracing::info!("Initialized default user profile");
        Ok(profile)
    }

    /// Current profile, initialized to defaults on first access.
    pub async fn get(&self) -> Result<UserProfile, StoreError> {
        let _guard = self.persist_lock.lock().await;
        self.load_or_init().await
    }

    /// Apply a partial update, storing inline avatar images as files.
    pub async fn update(&self, update: ProfileUpdate) -> Result<UserProfile, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let mut profile = self.load_or_init().await?;

        if let Some(name) = update.name {
            profile.name = name;
        }
        let mut written_avatar = None;
        if let Some(avatar) = update.avatar {
            profile.avatar = match avatar.filter(|a| !a.is_empty()) {
                Some(value) => {
                    let (stored, written) = self.resolve_avatar(&value).await?;
                    written_avatar = written;
                    Some(stored)
                }
                None => None,
            };
        }
        if let Some(location) = update.location {
            profile.location = location;
        }
        if let Some(data_directory) = update.data_directory {
            profile.data_directory = data_directory;
        }

        if let Err(e) = self.document.save(&profile).await {
            if let Some(path) = written_avatar {
                if let Err(remove) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("Failed to clean up avatar {}: {}", path.display(), remove);
                }
            }
            return Err(e);
        }
        Ok(profile)
    }

    /// Turn an avatar value into what gets stored: data URIs become a file
    /// path, anything else is kept verbatim. Also returns the file written.
    async fn resolve_avatar(&self, value: &str) -> Result<(String, Option<PathBuf>), StoreError> {
        let Some(image) = parse_data_uri(value)? else {
            return Ok((value.to_string(), None));
        };

        super::create_dir_all(&self.avatars_dir).await?;
        let short_id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let file_name = format!("avatar_{}.{}", short_id, image.extension);
        let path = self.avatars_dir.join(&file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .map_err(|e| StoreError::io(format!("Failed to write avatar {}", path.display()), e))?;

        tracing::info!("Stored avatar {} ({} bytes)", path.display(), image.bytes.len());
        Ok((path.to_string_lossy().to_string(), Some(path)))
    }

    /// Resolve a served avatar file name inside the avatars directory.
    ///
    /// Names with path separators or parent references are rejected.
    pub fn avatar_path(&self, file_name: &str) -> Result<PathBuf, StoreError> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.contains("..")
        {
            return Err(StoreError::Validation(format!(
                "Invalid avatar file name: {}",
                file_name
            )));
        }
        let path = self.avatars_dir.join(file_name);
        if !path.is_file() {
            return Err(StoreError::NotFound(format!("Avatar {}", file_name)));
        }
        Ok(path)
    }
}
