//! Initialization of `CourseData` from the structured object returned by
//! the extraction service.
//!
//! The extraction output is loose: any field may be missing, numbers may
//! arrive as strings and vice versa. Everything here is total; bad input
//! degrades to empty values instead of failing.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::model::{
    CourseData, Corso, Ente, FadSettings, Modulo, Partecipante, Persona, Sede, SedeAccreditata,
    Sessione, TipoCorso,
};
use super::normalize;

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "si" | "sì" | "yes" | "1"),
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    })
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct RawCorso {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Section id as read from the course header, if any.
    #[serde(deserialize_with = "lenient_string")]
    pub id_sezione: String,
    #[serde(deserialize_with = "lenient_string")]
    pub titolo: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tipo: String,
    #[serde(deserialize_with = "lenient_string")]
    pub data_inizio: String,
    #[serde(deserialize_with = "lenient_string")]
    pub data_fine: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ore_totali: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ore_rendicontabili: String,
    #[serde(deserialize_with = "lenient_string")]
    pub capienza: String,
    #[serde(deserialize_with = "lenient_string")]
    pub stato: String,
    #[serde(deserialize_with = "lenient_string")]
    pub anno: String,
    #[serde(deserialize_with = "lenient_string")]
    pub offerta_codice: String,
    #[serde(deserialize_with = "lenient_string")]
    pub offerta_nome: String,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct RawSessione {
    #[serde(deserialize_with = "lenient_string", alias = "data_completa")]
    pub data: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ora_inizio: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ora_fine: String,
    #[serde(deserialize_with = "lenient_string")]
    pub sede: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tipo_sede: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_fad: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub argomento: String,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct RawModulo {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub id_sezione: String,
    #[serde(deserialize_with = "lenient_string")]
    pub titolo: String,
    pub argomenti: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub data_inizio: String,
    #[serde(deserialize_with = "lenient_string")]
    pub data_fine: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ore_totali: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ore_rendicontabili: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tipo_sede: String,
    pub sessioni: Vec<RawSessione>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct RawPartecipante {
    #[serde(deserialize_with = "lenient_string")]
    pub nome: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cognome: String,
    #[serde(deserialize_with = "lenient_string")]
    pub codice_fiscale: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub telefono: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub benefits: bool,
}

/// Structured object produced by the extraction service.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RawExtraction {
    pub corso: RawCorso,
    pub moduli: Vec<RawModulo>,
    pub sede: Sede,
    pub ente: Ente,
    pub trainer: Persona,
    pub tutor: Persona,
    pub direttore: Persona,
    pub supervisore: Persona,
    pub responsabile_certificazione: Persona,
    pub partecipanti: Vec<RawPartecipante>,
    pub fad_settings: FadSettings,
}

fn parse_tipo(value: &str) -> TipoCorso {
    match value.trim().to_lowercase().as_str() {
        "fad" | "online" | "e-learning" => TipoCorso::Fad,
        "presenza" | "in presenza" | "aula" => TipoCorso::Presenza,
        "misto" | "blended" => TipoCorso::Misto,
        _ => TipoCorso::NonSpecificato,
    }
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<RawSessione> for Sessione {
    fn from(raw: RawSessione) -> Self {
        Sessione {
            data_completa: raw.data,
            ora_inizio: raw.ora_inizio,
            ora_fine: raw.ora_fine,
            sede: raw.sede,
            tipo_sede: raw.tipo_sede,
            is_fad: raw.is_fad,
            argomento: optional(raw.argomento),
            ..Default::default()
        }
    }
}

impl From<RawModulo> for Modulo {
    fn from(raw: RawModulo) -> Self {
        Modulo {
            id: raw.id,
            id_sezione: raw.id_sezione,
            titolo: raw.titolo,
            argomenti: raw
                .argomenti
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            data_inizio: raw.data_inizio,
            data_fine: raw.data_fine,
            ore_totali: raw.ore_totali,
            ore_rendicontabili: raw.ore_rendicontabili,
            tipo_sede: raw.tipo_sede,
            sessioni: raw.sessioni.into_iter().map(Sessione::from).collect(),
            sessioni_presenza: Vec::new(),
        }
    }
}

impl From<RawPartecipante> for Partecipante {
    fn from(raw: RawPartecipante) -> Self {
        Partecipante {
            id: String::new(),
            nome: raw.nome,
            cognome: raw.cognome,
            codice_fiscale: raw.codice_fiscale.to_uppercase(),
            email: optional(raw.email),
            telefono: optional(raw.telefono),
            benefits: raw.benefits,
        }
    }
}

impl CourseData {
    /// Build a normalized course from an extraction result.
    pub fn from_extraction(raw: RawExtraction) -> CourseData {
        let RawExtraction {
            corso,
            moduli,
            sede,
            mut ente,
            trainer,
            tutor,
            direttore,
            supervisore,
            responsabile_certificazione,
            partecipanti,
            fad_settings,
        } = raw;

        let mut moduli: Vec<Modulo> = moduli.into_iter().map(Modulo::from).collect();
        adopt_course_section_id(&corso.id_sezione, &mut moduli);

        if ente.accreditato == SedeAccreditata::default() && !ente.indirizzo.is_empty() {
            ente.accreditato.nome = ente.nome.clone();
            ente.accreditato.via = ente.indirizzo.clone();
        }

        let mut course = CourseData {
            corso: Corso {
                id: corso.id,
                titolo: corso.titolo,
                tipo: parse_tipo(&corso.tipo),
                data_inizio: corso.data_inizio,
                data_fine: corso.data_fine,
                ore_totali: corso.ore_totali,
                ore_rendicontabili: corso.ore_rendicontabili,
                capienza: corso.capienza,
                capienza_numero: 0,
                capienza_totale: 0,
                stato: corso.stato,
                anno: corso.anno,
                offerta_codice: corso.offerta_codice,
                offerta_nome: corso.offerta_nome,
            },
            moduli,
            sede,
            ente,
            trainer,
            tutor,
            direttore,
            supervisore,
            responsabile_certificazione,
            partecipanti: partecipanti.into_iter().map(Partecipante::from).collect(),
            fad_settings,
        };
        normalize(&mut course);
        course
    }

    /// Parse and normalize a JSON extraction result.
    pub fn from_extraction_json(value: Value) -> Result<CourseData, serde_json::Error> {
        let raw: RawExtraction = serde_json::from_value(value)?;
        Ok(CourseData::from_extraction(raw))
    }
}

/// A section id read from the course header only fills a single module
/// that has none. When it disagrees with the module table it is ignored.
fn adopt_course_section_id(course_section_id: &str, moduli: &mut [Modulo]) {
    let candidate = course_section_id.trim();
    if candidate.is_empty() {
        return;
    }
    if moduli.iter().any(|m| !m.id_sezione.trim().is_empty()) {
        if !moduli.iter().any(|m| m.id_sezione.trim() == candidate) {
            log::warn!(
                "Ignoring course-level section id {} not present in the module table",
                candidate
            );
        }
        return;
    }
    if let [only] = moduli {
        only.id_sezione = candidate.to_string();
    }
}
