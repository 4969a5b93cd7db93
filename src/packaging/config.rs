use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::documents::common::sanitize_filename;

/// Per-run packaging options, built fresh from the request and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ZipConfig {
    /// Registro didattico, verbali di ammissione, scrutinio e finale.
    pub include_root_documents: bool,
    pub include_excel: bool,
    /// Modello A and one Modello B per FAD session.
    pub include_fad_registries: bool,
    pub include_certificates: bool,
    pub include_modulo5: bool,
    pub include_modulo7: bool,
    pub include_modulo8: bool,
    pub include_registro_cartaceo: bool,
    /// Write `LEGGIMI.txt` and `metadata.json` into the archive.
    pub include_readme: bool,
    /// Build the FAD registries, the final minutes and the beneficiary
    /// notices with the programmatic builders instead of system templates.
    pub use_programmatic_generation: bool,
    /// Only render the selected user templates; every system-template
    /// category is suppressed.
    pub user_templates_only: bool,
    pub folders: FolderNames,
}

impl Default for ZipConfig {
    fn default() -> Self {
        Self {
            include_root_documents: true,
            include_excel: true,
            include_fad_registries: true,
            include_certificates: true,
            include_modulo5: true,
            include_modulo7: true,
            include_modulo8: true,
            include_registro_cartaceo: true,
            include_readme: false,
            use_programmatic_generation: false,
            user_templates_only: false,
            folders: FolderNames::default(),
        }
    }
}

impl ZipConfig {
    /// Everything off; tests and callers switch on what they need.
    pub fn none() -> Self {
        Self {
            include_root_documents: false,
            include_excel: false,
            include_fad_registries: false,
            include_certificates: false,
            include_modulo5: false,
            include_modulo7: false,
            include_modulo8: false,
            include_registro_cartaceo: false,
            ..Self::default()
        }
    }

    /// Whether a system-template category flag is effective.
    pub(crate) fn system(&self, flag: bool) -> bool {
        flag && !self.user_templates_only
    }
}

/// Folder names inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FolderNames {
    pub excel: String,
    pub fad_registries: String,
    pub certificates: String,
    pub modulo5: String,
    pub modulo7: String,
    pub modulo8: String,
    pub shared: String,
}

impl Default for FolderNames {
    fn default() -> Self {
        Self {
            excel: "Excel".to_string(),
            fad_registries: "Registri_FAD".to_string(),
            certificates: "Certificati".to_string(),
            modulo5: "modulo 5".to_string(),
            modulo7: "modulo 7".to_string(),
            modulo8: "modulo 8".to_string(),
            shared: "Condivisi".to_string(),
        }
    }
}

impl FolderNames {
    /// Folder names with unsafe characters removed. Spaces are kept so the
    /// conventional `modulo 5` style names survive.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let clean = |value: &str, fallback: &str| {
            let cleaned = value
                .split_whitespace()
                .map(|word| sanitize_filename(word, ""))
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if cleaned.is_empty() {
                fallback.to_string()
            } else {
                cleaned
            }
        };
        Self {
            excel: clean(&self.excel, &defaults.excel),
            fad_registries: clean(&self.fad_registries, &defaults.fad_registries),
            certificates: clean(&self.certificates, &defaults.certificates),
            modulo5: clean(&self.modulo5, &defaults.modulo5),
            modulo7: clean(&self.modulo7, &defaults.modulo7),
            modulo8: clean(&self.modulo8, &defaults.modulo8),
            shared: clean(&self.shared, &defaults.shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_templates_only_suppresses_system_flags() {
        let mut config = ZipConfig::default();
        assert!(config.system(config.include_certificates));
        config.user_templates_only = true;
        assert!(!config.system(config.include_certificates));
    }

    #[test]
    fn test_folder_names_are_sanitized() {
        let folders = FolderNames {
            excel: "Fogli/../Excel".to_string(),
            modulo5: "  modulo   5 ".to_string(),
            shared: "<>".to_string(),
            ..Default::default()
        };
        let clean = folders.sanitized();
        assert_eq!(clean.excel, "Fogli..Excel");
        assert_eq!(clean.modulo5, "modulo 5");
        assert_eq!(clean.shared, "Condivisi");
    }
}
