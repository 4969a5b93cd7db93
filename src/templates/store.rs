//! Template persistence port and its implementations.
//!
//! - `InMemoryTemplateStore` - process-local maps, used by tests and
//!   ephemeral deployments
//! - `FsTemplateStore` - one directory tree on disk, system blobs cached
//!
//! Seeding is an explicit startup step (`seed_system_templates`), never a
//! side effect of opening a store.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use super::models::{SystemTemplate, SystemTemplateType, UserTemplate, UserTemplateInfo};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt template index: {0}")]
    Index(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Resolution of template ids and slots to binary blobs.
#[async_trait::async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list_user_templates(&self) -> Result<Vec<UserTemplateInfo>, StoreError>;

    async fn get_user_template(&self, id: Uuid) -> Result<Option<UserTemplate>, StoreError>;

    async fn save_user_template(&self, template: UserTemplate) -> Result<(), StoreError>;

    async fn get_system_template(
        &self,
        file_type: SystemTemplateType,
    ) -> Result<Option<SystemTemplate>, StoreError>;

    async fn put_system_template(&self, template: SystemTemplate) -> Result<(), StoreError>;

    /// Slots that currently hold a template.
    async fn configured_system_templates(&self) -> Result<Vec<SystemTemplateType>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryTemplateStore {
    user: RwLock<Vec<UserTemplate>>,
    system: RwLock<HashMap<SystemTemplateType, SystemTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn list_user_templates(&self) -> Result<Vec<UserTemplateInfo>, StoreError> {
        Ok(self.user.read().iter().map(|t| t.info.clone()).collect())
    }

    async fn get_user_template(&self, id: Uuid) -> Result<Option<UserTemplate>, StoreError> {
        Ok(self.user.read().iter().find(|t| t.info.id == id).cloned())
    }

    async fn save_user_template(&self, template: UserTemplate) -> Result<(), StoreError> {
        let mut user = self.user.write();
        match user.iter_mut().find(|t| t.info.id == template.info.id) {
            Some(existing) => *existing = template,
            None => user.push(template),
        }
        Ok(())
    }

    async fn get_system_template(
        &self,
        file_type: SystemTemplateType,
    ) -> Result<Option<SystemTemplate>, StoreError> {
        Ok(self.system.read().get(&file_type).cloned())
    }

    async fn put_system_template(&self, template: SystemTemplate) -> Result<(), StoreError> {
        self.system.write().insert(template.file_type, template);
        Ok(())
    }

    async fn configured_system_templates(&self) -> Result<Vec<SystemTemplateType>, StoreError> {
        let mut types: Vec<_> = self.system.read().keys().copied().collect();
        types.sort();
        Ok(types)
    }
}

const USER_DIR: &str = "user";
const SYSTEM_DIR: &str = "system";
const INDEX_FILE: &str = "index.json";

/// Templates stored as files below a base directory:
/// `user/<id>.docx`, `user/index.json` and `system/<file_type>.docx`.
pub struct FsTemplateStore {
    base_dir: PathBuf,
    system_cache: Cache<SystemTemplateType, SystemTemplate>,
    index_lock: tokio::sync::Mutex<()>,
}

impl FsTemplateStore {
    /// Open (and create if needed) the directory tree.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        for dir in [base_dir.join(USER_DIR), base_dir.join(SYSTEM_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StoreError::io(&dir, e))?;
        }

        let system_cache = Cache::builder()
            .time_to_live(Duration::from_secs(10 * 60))
            .max_capacity(SystemTemplateType::ALL.len() as u64)
            .build();

        log::info!("Template store opened at {}", base_dir.display());
        Ok(Self {
            base_dir,
            system_cache,
            index_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn index_path(&self) -> PathBuf {
        self.base_dir.join(USER_DIR).join(INDEX_FILE)
    }

    fn user_path(&self, id: Uuid) -> PathBuf {
        self.base_dir.join(USER_DIR).join(format!("{}.docx", id))
    }

    fn system_path(&self, file_type: SystemTemplateType) -> PathBuf {
        self.base_dir
            .join(SYSTEM_DIR)
            .join(format!("{}.docx", file_type.as_str()))
    }

    async fn read_index(&self) -> Result<Vec<UserTemplateInfo>, StoreError> {
        let path = self.index_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Index(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn write_index(&self, index: &[UserTemplateInfo]) -> Result<(), StoreError> {
        let path = self.index_path();
        let json = serde_json::to_vec_pretty(index).map_err(|e| StoreError::Index(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }

    async fn load_system(
        &self,
        file_type: SystemTemplateType,
    ) -> Result<Option<SystemTemplate>, StoreError> {
        let path = self.system_path(file_type);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let updated_at = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(Some(SystemTemplate {
            file_type,
            data,
            updated_at,
        }))
    }
}

#[async_trait::async_trait]
impl TemplateStore for FsTemplateStore {
    async fn list_user_templates(&self) -> Result<Vec<UserTemplateInfo>, StoreError> {
        self.read_index().await
    }

    async fn get_user_template(&self, id: Uuid) -> Result<Option<UserTemplate>, StoreError> {
        let Some(info) = self.read_index().await?.into_iter().find(|t| t.id == id) else {
            return Ok(None);
        };
        let path = self.user_path(id);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(UserTemplate { info, data })),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("User template {} is indexed but its file is missing", id);
                Ok(None)
            }
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn save_user_template(&self, template: UserTemplate) -> Result<(), StoreError> {
        let _guard = self.index_lock.lock().await;
        let path = self.user_path(template.info.id);
        tokio::fs::write(&path, &template.data)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        let mut index = self.read_index().await?;
        index.retain(|t| t.id != template.info.id);
        index.push(template.info.clone());
        self.write_index(&index).await?;
        log::info!(
            "Saved user template {} ({}, {} bytes)",
            template.info.id,
            template.info.name,
            template.info.size
        );
        Ok(())
    }

    async fn get_system_template(
        &self,
        file_type: SystemTemplateType,
    ) -> Result<Option<SystemTemplate>, StoreError> {
        if let Some(cached) = self.system_cache.get(&file_type).await {
            log::debug!("System template {} served from cache", file_type);
            return Ok(Some(cached));
        }
        let loaded = self.load_system(file_type).await?;
        if let Some(template) = &loaded {
            self.system_cache.insert(file_type, template.clone()).await;
        }
        Ok(loaded)
    }

    async fn put_system_template(&self, template: SystemTemplate) -> Result<(), StoreError> {
        let path = self.system_path(template.file_type);
        tokio::fs::write(&path, &template.data)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        log::info!(
            "Stored system template {} ({} bytes)",
            template.file_type,
            template.data.len()
        );
        self.system_cache.insert(template.file_type, template).await;
        Ok(())
    }

    async fn configured_system_templates(&self) -> Result<Vec<SystemTemplateType>, StoreError> {
        let mut types = Vec::new();
        for file_type in SystemTemplateType::ALL {
            if tokio::fs::try_exists(self.system_path(file_type))
                .await
                .unwrap_or(false)
            {
                types.push(file_type);
            }
        }
        Ok(types)
    }
}

/// Copy `<seed_dir>/<file_type>.docx` into every empty system slot.
///
/// Slots that already hold a template are left alone, so running it on
/// every start is harmless. Returns the number of slots filled.
pub async fn seed_system_templates(
    store: &dyn TemplateStore,
    seed_dir: &Path,
) -> Result<usize, StoreError> {
    let mut seeded = 0;
    for file_type in SystemTemplateType::ALL {
        if store.get_system_template(file_type).await?.is_some() {
            continue;
        }
        let path = seed_dir.join(format!("{}.docx", file_type.as_str()));
        match tokio::fs::read(&path).await {
            Ok(data) => {
                store
                    .put_system_template(SystemTemplate::new(file_type, data))
                    .await?;
                seeded += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No seed for system template {}", file_type);
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        }
    }
    log::info!("Seeded {} system templates from {}", seeded, seed_dir.display());
    Ok(seeded)
}
