use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The fixed document slots a system template can fill. At most one
/// template is stored per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SystemTemplateType {
    ModelloAFad,
    ModelloBFad,
    Certificato,
    CalendarioCondizionalita,
    VerbaleAmmissione,
    RegistroPresenza,
    VerbaleFinale,
    ComunicazioneEvento,
    RegistroGiornaliero,
    RegistroDidattico,
    VerbaleScrutinio,
}

impl SystemTemplateType {
    pub const ALL: [SystemTemplateType; 11] = [
        Self::ModelloAFad,
        Self::ModelloBFad,
        Self::Certificato,
        Self::CalendarioCondizionalita,
        Self::VerbaleAmmissione,
        Self::RegistroPresenza,
        Self::VerbaleFinale,
        Self::ComunicazioneEvento,
        Self::RegistroGiornaliero,
        Self::RegistroDidattico,
        Self::VerbaleScrutinio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelloAFad => "modello_a_fad",
            Self::ModelloBFad => "modello_b_fad",
            Self::Certificato => "certificato",
            Self::CalendarioCondizionalita => "calendario_condizionalita",
            Self::VerbaleAmmissione => "verbale_ammissione",
            Self::RegistroPresenza => "registro_presenza",
            Self::VerbaleFinale => "verbale_finale",
            Self::ComunicazioneEvento => "comunicazione_evento",
            Self::RegistroGiornaliero => "registro_giornaliero",
            Self::RegistroDidattico => "registro_didattico",
            Self::VerbaleScrutinio => "verbale_scrutinio",
        }
    }

    /// Human-readable label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ModelloAFad => "Modello A FAD",
            Self::ModelloBFad => "Modello B FAD",
            Self::Certificato => "Certificato",
            Self::CalendarioCondizionalita => "Calendario condizionalità (Modulo 5)",
            Self::VerbaleAmmissione => "Verbale di ammissione",
            Self::RegistroPresenza => "Registro presenza cartaceo",
            Self::VerbaleFinale => "Verbale finale",
            Self::ComunicazioneEvento => "Comunicazione evento (Modulo 7)",
            Self::RegistroGiornaliero => "Registro giornaliero (Modulo 8)",
            Self::RegistroDidattico => "Registro didattico",
            Self::VerbaleScrutinio => "Verbale di scrutinio",
        }
    }
}

impl fmt::Display for SystemTemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTemplateType(pub String);

impl fmt::Display for UnknownTemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown system template type '{}'", self.0)
    }
}

impl std::error::Error for UnknownTemplateType {}

impl FromStr for SystemTemplateType {
    type Err = UnknownTemplateType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| UnknownTemplateType(wanted.to_string()))
    }
}

/// Metadata of a template uploaded by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserTemplateInfo {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub filename: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

/// A user template with its `.docx` content.
#[derive(Debug, Clone, PartialEq)]
pub struct UserTemplate {
    pub info: UserTemplateInfo,
    pub data: Vec<u8>,
}

impl UserTemplate {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        filename: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            info: UserTemplateInfo {
                id: Uuid::new_v4(),
                name: name.into(),
                category: category.into(),
                filename: filename.into(),
                size: data.len(),
                created_at: Utc::now(),
            },
            data,
        }
    }
}

/// The template configured for one system slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemTemplate {
    pub file_type: SystemTemplateType,
    pub data: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

impl SystemTemplate {
    pub fn new(file_type: SystemTemplateType, data: Vec<u8>) -> Self {
        Self {
            file_type,
            data,
            updated_at: Utc::now(),
        }
    }
}

/// Listing returned by `GET /api/templates`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateCatalog {
    pub user_templates: Vec<UserTemplateInfo>,
    /// System slots that currently hold a template.
    pub system_templates: Vec<SystemTemplateType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_type_round_trip() {
        for t in SystemTemplateType::ALL {
            assert_eq!(t.as_str().parse::<SystemTemplateType>().unwrap(), t);
            assert_eq!(
                serde_json::to_string(&t).unwrap(),
                format!("\"{}\"", t.as_str())
            );
        }
        assert!("modello_c".parse::<SystemTemplateType>().is_err());
    }
}
