//! Non-blocking checks on course data.
//!
//! Every finding is a warning shown to the operator; generation always
//! proceeds with whatever data is available.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use super::model::CourseData;
use crate::documents::common::{parse_italian_date, parse_time};

/// A single data-quality finding.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ValidationWarning {
    /// The field the warning refers to, e.g. `partecipanti[2].codice_fiscale`
    pub field: String,
    /// Human-readable message in Italian
    pub message: String,
    /// How to fix the data
    pub suggestion: Option<String>,
}

impl ValidationWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} mancante", label))
            .with_suggestion(format!("Compilare il campo {}", label.to_lowercase()))
    }

    pub fn invalid_codice_fiscale(field: &str, value: &str) -> Self {
        Self::new(field, format!("Codice fiscale '{}' non valido", value))
            .with_suggestion("Il codice fiscale deve contenere 16 caratteri alfanumerici")
    }

    pub fn invalid_time(field: &str, value: &str) -> Self {
        Self::new(field, format!("Orario '{}' non valido", value))
            .with_suggestion("Usare il formato HH:MM, ad esempio 09:00")
    }

    pub fn invalid_date(field: &str, value: &str) -> Self {
        Self::new(field, format!("Data '{}' non valida", value))
            .with_suggestion("Usare il formato GG/MM/AAAA, ad esempio 10/03/2025")
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

/// Collection of warnings.
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct ValidationWarnings {
    warnings: Vec<ValidationWarning>,
}

impl ValidationWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationWarning> {
        self.warnings.iter()
    }

    /// One formatted line per warning.
    pub fn into_messages(self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }
}

pub fn validate_required(value: &str, field: &str, label: &str, warnings: &mut ValidationWarnings) {
    if value.trim().is_empty() {
        warnings.add(ValidationWarning::empty_field(field, label));
    }
}

/// Fiscal code shape: 16 ASCII alphanumerics. Empty values are reported as
/// missing.
pub fn validate_codice_fiscale(value: &str, field: &str, warnings: &mut ValidationWarnings) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        warnings.add(ValidationWarning::empty_field(field, "Codice fiscale"));
        return;
    }
    if trimmed.len() != 16 || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        warnings.add(ValidationWarning::invalid_codice_fiscale(field, trimmed));
    }
}

pub fn validate_time(value: &str, field: &str, warnings: &mut ValidationWarnings) {
    if parse_time(value).is_none() {
        warnings.add(ValidationWarning::invalid_time(field, value.trim()));
    }
}

pub fn validate_date(value: &str, field: &str, warnings: &mut ValidationWarnings) {
    if parse_italian_date(value).is_none() {
        warnings.add(ValidationWarning::invalid_date(field, value.trim()));
    }
}

/// Run every data-quality check on a course.
pub fn validate_course(course: &CourseData) -> ValidationWarnings {
    let mut warnings = ValidationWarnings::new();

    validate_required(&course.corso.id, "corso.id", "ID corso", &mut warnings);
    validate_required(&course.corso.titolo, "corso.titolo", "Titolo del corso", &mut warnings);

    for (m_idx, modulo) in course.moduli.iter().enumerate() {
        for (s_idx, session) in modulo.sessioni.iter().enumerate() {
            let base = format!("moduli[{}].sessioni[{}]", m_idx, s_idx);
            validate_date(&session.data_completa, &format!("{}.data_completa", base), &mut warnings);
            validate_time(&session.ora_inizio, &format!("{}.ora_inizio", base), &mut warnings);
            validate_time(&session.ora_fine, &format!("{}.ora_fine", base), &mut warnings);
            if let (Some(start), Some(end)) = (parse_time(&session.ora_inizio), parse_time(&session.ora_fine)) {
                if end <= start {
                    warnings.add(
                        ValidationWarning::new(
                            base.clone(),
                            format!(
                                "La sessione del {} termina prima di iniziare",
                                session.data_completa
                            ),
                        )
                        .with_suggestion("Verificare gli orari di inizio e fine"),
                    );
                }
            }
        }
    }

    for (idx, partecipante) in course.partecipanti.iter().enumerate() {
        validate_codice_fiscale(
            &partecipante.codice_fiscale,
            &format!("partecipanti[{}].codice_fiscale", idx),
            &mut warnings,
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Modulo, Partecipante, Sessione};

    #[test]
    fn test_codice_fiscale_shape() {
        let mut warnings = ValidationWarnings::new();
        validate_codice_fiscale("RSSMRA80A01H501U", "cf", &mut warnings);
        assert!(warnings.is_empty());

        validate_codice_fiscale("RSSMRA80", "cf", &mut warnings);
        validate_codice_fiscale("", "cf", &mut warnings);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_validate_course_reports_bad_sessions() {
        let course = CourseData {
            moduli: vec![Modulo {
                sessioni: vec![Sessione {
                    data_completa: "31/02/2025".to_string(),
                    ora_inizio: "18:00".to_string(),
                    ora_fine: "09:00".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            partecipanti: vec![Partecipante {
                nome: "Mario".to_string(),
                codice_fiscale: "RSSMRA80A01H501U".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let messages = validate_course(&course).into_messages();
        assert!(messages.iter().any(|m| m.contains("ID corso mancante")));
        assert!(messages.iter().any(|m| m.contains("Data '31/02/2025' non valida")));
        assert!(messages.iter().any(|m| m.contains("termina prima di iniziare")));
        assert!(!messages.iter().any(|m| m.contains("partecipanti[0]")));
    }
}
