//! Static assets used by the programmatic builders: header logo, trainer
//! signature and the stamps selected by the training body's location.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::course::CourseData;

/// Asset key of the header logo.
pub const LOGO_ASSET: &str = "logo.png";
/// Asset key of the trainer signature used when no data URL is supplied.
pub const SIGNATURE_ASSET: &str = "firma_trainer.png";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset {0} not found")]
    NotFound(String),
    #[error("invalid asset key {0}")]
    InvalidKey(String),
    #[error("failed to read asset {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid stamp table: {0}")]
    StampTable(String),
}

/// Read-only source of binary assets.
#[async_trait::async_trait]
pub trait AssetSource: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u8>, AssetError>;
}

/// Assets stored below a base directory.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    base_dir: PathBuf,
}

impl FsAssetSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(key);
        if key.trim().is_empty()
            || relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(AssetError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(relative))
    }
}

#[async_trait::async_trait]
impl AssetSource for FsAssetSource {
    async fn load(&self, key: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(key.to_string()))
            }
            Err(source) => Err(AssetError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// One row of the stamp table: a location key and the stamp asset to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StampEntry {
    /// Town or address fragment, compared case-insensitively.
    pub location: String,
    pub asset: String,
}

/// Explicit mapping from the training body's location to a stamp image.
///
/// Lookup tries an exact match on the accredited town first, then a
/// substring match on the full address. No match means no stamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StampTable {
    entries: Vec<StampEntry>,
}

impl StampTable {
    pub fn new(entries: Vec<StampEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        serde_json::from_str(json).map_err(|e| AssetError::StampTable(e.to_string()))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|source| AssetError::Io {
            key: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn entries(&self) -> &[StampEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stamp asset for a course's training body, if any.
    pub fn stamp_for(&self, course: &CourseData) -> Option<&str> {
        let town = course.ente.accreditato.comune.trim().to_lowercase();
        if !town.is_empty() {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|e| e.location.trim().to_lowercase() == town)
            {
                return Some(&entry.asset);
            }
        }

        let address = [
            course.ente.accreditato.indirizzo_completo(),
            course.ente.indirizzo.clone(),
            course.sede.indirizzo.clone(),
            course.sede.citta.clone(),
        ]
        .join(" ")
        .to_lowercase();
        self.entries
            .iter()
            .filter(|e| !e.location.trim().is_empty())
            .find(|e| address.contains(&e.location.trim().to_lowercase()))
            .map(|e| e.asset.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Ente, SedeAccreditata};

    fn course_in(comune: &str, via: &str) -> CourseData {
        CourseData {
            ente: Ente {
                accreditato: SedeAccreditata {
                    comune: comune.to_string(),
                    via: via.to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn table() -> StampTable {
        StampTable::from_json(
            r#"[{"location":"Roma","asset":"timbri/roma.png"},{"location":"milano","asset":"timbri/milano.png"}]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_stamp_exact_town_match() {
        assert_eq!(table().stamp_for(&course_in("ROMA", "")), Some("timbri/roma.png"));
    }

    #[test]
    fn test_stamp_address_substring_match() {
        let course = course_in("", "Viale Monza 12, Milano");
        assert_eq!(table().stamp_for(&course), Some("timbri/milano.png"));
    }

    #[test]
    fn test_stamp_no_match_is_none() {
        assert_eq!(table().stamp_for(&course_in("Napoli", "Via Toledo 1")), None);
        assert_eq!(StampTable::default().stamp_for(&course_in("Roma", "")), None);
    }

    #[tokio::test]
    async fn test_fs_asset_source() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("logo.png"), b"png").await.unwrap();
        let source = FsAssetSource::new(dir.path());

        assert_eq!(source.load("logo.png").await.unwrap(), b"png");
        assert!(matches!(source.load("missing.png").await, Err(AssetError::NotFound(_))));
        assert!(matches!(source.load("../etc/passwd").await, Err(AssetError::InvalidKey(_))));
    }
}
