//! Programmatic builders for the documents whose layout does not fit a
//! placeholder template: banner boxes, highlighted manual fields, split
//! schedule rows and derived calendars.
//!
//! Every builder takes a normalized [`CourseData`] plus the optional
//! [`BuilderAssets`]; a missing asset never fails a build.

pub mod convocazione;
pub mod modello_a;
pub mod modello_b;
pub mod modulo7;
pub mod verbale;

pub use convocazione::build_summons;
pub use modello_a::build_general_registry;
pub use modello_b::{build_daily_registries, build_daily_registry};
pub use modulo7::build_event_notice;
pub use verbale::build_final_minutes;

use super::assets::{AssetError, AssetSource, StampTable, LOGO_ASSET, SIGNATURE_ASSET};
use super::common::CalendarDay;
use super::ooxml::docx::{ImageRef, PORTRAIT_TEXT_WIDTH};
use super::ooxml::{Align, Cell, DocxBuilder, ImageData, Paragraph, Row, Run, Table};
use crate::course::{CourseData, Partecipante};

/// Highlight used for fields that must be completed by hand.
pub(crate) const MANUAL_HIGHLIGHT: &str = "yellow";
pub(crate) const MANUAL_PLACEHOLDER: &str = "Da compilare";

const BANNER_FILL: &str = "DEEAF6";
const LABEL_FILL: &str = "F2F2F2";
const LOGO_SIZE_CM: (f64, f64) = (4.0, 1.5);
pub(crate) const SIGNATURE_SIZE_CM: (f64, f64) = (4.5, 1.8);
pub(crate) const STAMP_SIZE_CM: (f64, f64) = (3.5, 3.5);

const CONTACT_EMAIL_DOMAIN: &str = "akgitalia.it";

/// Optional images available to a build.
#[derive(Debug, Clone, Default)]
pub struct BuilderAssets {
    pub logo: Option<ImageData>,
    pub stamp: Option<ImageData>,
    pub signature: Option<ImageData>,
}

impl BuilderAssets {
    pub fn none() -> Self {
        Self::default()
    }

    /// Load the logo, the stamp matching the course's training body and the
    /// trainer signature.
    ///
    /// The signature comes from the data URL when one is given, otherwise
    /// from the signature asset. Every failure is logged and leaves the
    /// corresponding image empty.
    pub async fn load(
        source: &dyn AssetSource,
        stamps: &StampTable,
        course: &CourseData,
        signature: Option<&str>,
    ) -> Self {
        let logo = load_image(source, LOGO_ASSET).await;

        let stamp = match stamps.stamp_for(course) {
            Some(key) => load_image(source, key).await,
            None => {
                log::debug!(
                    "No stamp configured for training body location {:?}",
                    course.ente.accreditato.comune
                );
                None
            }
        };

        let signature = match signature.map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => match ImageData::from_data_url(url) {
                Ok(image) => Some(image),
                Err(e) => {
                    log::warn!("Ignoring trainer signature: {}", e);
                    None
                }
            },
            None => load_image(source, SIGNATURE_ASSET).await,
        };

        Self {
            logo,
            stamp,
            signature,
        }
    }
}

async fn load_image(source: &dyn AssetSource, key: &str) -> Option<ImageData> {
    match source.load(key).await {
        Ok(bytes) => match ImageData::from_bytes(bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Asset {} is not a usable image: {}", key, e);
                None
            }
        },
        Err(AssetError::NotFound(_)) => {
            log::debug!("Asset {} not found", key);
            None
        }
        Err(e) => {
            log::warn!("Failed to load asset {}: {}", key, e);
            None
        }
    }
}

/// A label/value row of an identification block.
#[derive(Debug, Clone)]
pub(crate) struct Field {
    label: &'static str,
    value: String,
    manual: bool,
}

impl Field {
    pub(crate) fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            manual: false,
        }
    }

    /// A row always completed by hand; its value cell is highlighted.
    pub(crate) fn manual(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            manual: true,
        }
    }
}

/// Header logo (or the training body's name) and a page-numbered footer.
pub(crate) fn letterhead(doc: &mut DocxBuilder, course: &CourseData, assets: &BuilderAssets) {
    match &assets.logo {
        Some(logo) => {
            let logo = doc.add_header_image(logo.clone());
            doc.header_paragraph(
                Paragraph::new()
                    .run(logo.run(LOGO_SIZE_CM.0, LOGO_SIZE_CM.1))
                    .align(Align::Center),
            );
        }
        None => {
            let name = non_empty_or(&course.ente.nome, "Ente di formazione");
            doc.header_paragraph(Paragraph::new().run(Run::bold(name).size(12)).align(Align::Center));
        }
    }

    let mut footer = course.ente.nome.trim().to_string();
    if !course.corso.id.trim().is_empty() {
        if !footer.is_empty() {
            footer.push_str(" - ");
        }
        footer.push_str(&format!("Corso {}", course.corso.id.trim()));
    }
    doc.footer_paragraph(
        Paragraph::new()
            .runs([
                Run::text(format!("{}    Pag. ", footer)).size(8),
                Run::page_number().size(8),
            ])
            .align(Align::Right),
    );
}

/// Boxed, shaded title block.
pub(crate) fn banner(title: &str, subtitle: Option<&str>) -> Paragraph {
    let mut paragraph = Paragraph::new().run(Run::bold(title).size(14));
    if let Some(subtitle) = subtitle {
        paragraph = paragraph.runs([Run::line_break(), Run::text(subtitle).italic()]);
    }
    paragraph
        .align(Align::Center)
        .shading(BANNER_FILL)
        .boxed()
        .spacing_after(12)
}

pub(crate) fn section_title(text: &str) -> Paragraph {
    Paragraph::new()
        .run(Run::bold(text).size(11))
        .keep_with_next()
        .spacing_after(4)
}

/// Highlighted "to be completed" marker.
pub(crate) fn manual_run() -> Run {
    Run::text(MANUAL_PLACEHOLDER)
        .italic()
        .highlight(MANUAL_HIGHLIGHT)
}

/// A paragraph with the given text, or the manual marker when it is empty.
pub(crate) fn text_or_manual(text: &str) -> Paragraph {
    if text.trim().is_empty() {
        Paragraph::new().run(manual_run())
    } else {
        Paragraph::text(text.trim()).align(Align::Justify)
    }
}

/// Two-column identification block.
pub(crate) fn field_table(fields: &[Field]) -> Table {
    let label_width = PORTRAIT_TEXT_WIDTH * 2 / 5;
    let mut table = Table::new([label_width, PORTRAIT_TEXT_WIDTH - label_width]);
    for field in fields {
        let value = if field.manual || field.value.trim().is_empty() {
            Cell::new(Paragraph::new().run(manual_run()))
        } else {
            Cell::text(field.value.trim())
        };
        table.push(Row::new([Cell::bold(field.label).shading(LABEL_FILL), value]));
    }
    table
}

/// Participant roster padded with blank rows up to `min_rows`.
pub(crate) fn roster_table(partecipanti: &[Partecipante], last_column: &str, min_rows: usize) -> Table {
    let mut table = Table::new([600, 2300, 2300, 2600, 1838])
        .row(Row::header(["N.", "Cognome", "Nome", "Codice fiscale", last_column]));
    for (idx, p) in partecipanti.iter().enumerate() {
        table.push(Row::new([
            Cell::text((idx + 1).to_string()),
            Cell::text(p.cognome.trim()),
            Cell::text(p.nome.trim()),
            Cell::text(p.codice_fiscale.trim()),
            Cell::empty(),
        ]));
    }
    for idx in partecipanti.len()..min_rows {
        table.push(Row::new([
            Cell::text((idx + 1).to_string()),
            Cell::empty(),
            Cell::empty(),
            Cell::empty(),
            Cell::empty(),
        ]));
    }
    table
}

/// Calendar of a beneficiary: one row per day plus a total.
pub(crate) fn calendar_table(days: &[CalendarDay]) -> Table {
    let mut table = Table::new([1600, 1800, 2300, 2300, 1638])
        .row(Row::header(["Data", "Giorno", "Mattina", "Pomeriggio", "Ore"]));
    for day in days {
        table.push(Row::texts([
            day.data.clone(),
            day.giorno_settimana.clone(),
            day.mattina_label(),
            day.pomeriggio_label(),
            day.ore.to_string(),
        ]));
    }
    let total: u32 = days.iter().map(|d| d.ore).sum();
    table.push(Row::new([
        Cell::bold("Totale ore").span(4),
        Cell::bold(total.to_string()),
    ]));
    table
}

/// A signature cell: role, optional image or a blank line, and the name.
pub(crate) fn signature_cell(role: &str, name: &str, image: Option<ImageRef>) -> Cell {
    let mark = match image {
        Some(image) => Paragraph::new()
            .run(image.run(SIGNATURE_SIZE_CM.0, SIGNATURE_SIZE_CM.1))
            .align(Align::Center),
        None => Paragraph::text("______________________________").align(Align::Center),
    };
    Cell::new(Paragraph::bold(role).align(Align::Center))
        .paragraph(mark)
        .paragraph(Paragraph::text(name.trim()).align(Align::Center))
}

/// Contact address of the supervisor: the explicit email when present,
/// otherwise `nome.cognome@akgitalia.it` lower-cased without spaces.
pub fn supervisor_email(course: &CourseData) -> String {
    let explicit = course.supervisore.email.trim();
    if !explicit.is_empty() {
        return explicit.to_string();
    }
    let (nome, cognome) = course.supervisore.name_parts();
    let strip = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };
    let (nome, cognome) = (strip(&nome), strip(&cognome));
    match (nome.is_empty(), cognome.is_empty()) {
        (true, true) => String::new(),
        (false, true) => format!("{}@{}", nome, CONTACT_EMAIL_DOMAIN),
        (true, false) => format!("{}@{}", cognome, CONTACT_EMAIL_DOMAIN),
        (false, false) => format!("{}.{}@{}", nome, cognome, CONTACT_EMAIL_DOMAIN),
    }
}

pub(crate) fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::course::{CourseData, Modulo, Partecipante, Persona, Sessione};

    pub(crate) fn session(date: &str, start: &str, end: &str, fad: bool) -> Sessione {
        Sessione {
            data_completa: date.to_string(),
            ora_inizio: start.to_string(),
            ora_fine: end.to_string(),
            tipo_sede: if fad { "FAD" } else { "Aula" }.to_string(),
            is_fad: fad,
            argomento: Some("Sicurezza".to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn participant(nome: &str, cognome: &str, benefits: bool) -> Partecipante {
        Partecipante {
            nome: nome.to_string(),
            cognome: cognome.to_string(),
            codice_fiscale: format!("{}XXXXXXXXXXXXX", &cognome[..3].to_uppercase()),
            benefits,
            ..Default::default()
        }
    }

    pub(crate) fn course(sessions: Vec<Sessione>) -> CourseData {
        let mut course = CourseData {
            moduli: vec![Modulo {
                id: "M1".to_string(),
                titolo: "Modulo base".to_string(),
                argomenti: vec!["Normativa".to_string(), "Primo soccorso".to_string()],
                sessioni: sessions,
                ..Default::default()
            }],
            trainer: Persona {
                nome: "Paolo".to_string(),
                cognome: "Bianchi".to_string(),
                ..Default::default()
            },
            supervisore: Persona {
                nome: "Anna Maria".to_string(),
                cognome: "De Luca".to_string(),
                ..Default::default()
            },
            partecipanti: vec![
                participant("Mario", "Rossi", true),
                participant("Lucia", "Verdi", false),
            ],
            ..Default::default()
        };
        course.corso.id = "C-100".to_string();
        course.corso.titolo = "Sicurezza sul lavoro".to_string();
        course.ente.nome = "Ente Formazione".to_string();
        course.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervisor_email_derived_from_name() {
        let course = fixtures::course(vec![]);
        assert_eq!(supervisor_email(&course), "annamaria.deluca@akgitalia.it");
    }

    #[test]
    fn test_supervisor_email_explicit_wins() {
        let mut course = fixtures::course(vec![]);
        course.supervisore.email = " tutor@ente.it ".to_string();
        assert_eq!(supervisor_email(&course), "tutor@ente.it");

        course.supervisore = Default::default();
        assert_eq!(supervisor_email(&course), "");
    }

    #[test]
    fn test_roster_is_padded() {
        let course = fixtures::course(vec![]);
        let table = roster_table(&course.partecipanti, "Firma", 15);
        assert_eq!(table.len(), 16);
        let short = roster_table(&course.partecipanti, "Firma", 0);
        assert_eq!(short.len(), 3);
    }

    #[test]
    fn test_field_table_highlights_missing_values() {
        let mut doc = DocxBuilder::new("t");
        doc.table(field_table(&[
            Field::new("Titolo", "Corso"),
            Field::new("Sede", " "),
            Field::manual("Numero registro"),
        ]));
        let text = doc.plain_text();
        assert_eq!(text.matches(MANUAL_PLACEHOLDER).count(), 2);
        assert!(text.contains("Corso"));
    }

    struct MissingAssets;

    #[async_trait::async_trait]
    impl AssetSource for MissingAssets {
        async fn load(&self, key: &str) -> Result<Vec<u8>, AssetError> {
            Err(AssetError::NotFound(key.to_string()))
        }
    }

    #[tokio::test]
    async fn test_load_assets_degrades_to_none() {
        let course = fixtures::course(vec![]);
        let assets = BuilderAssets::load(
            &MissingAssets,
            &StampTable::default(),
            &course,
            Some("data:image/png;base64,@@@"),
        )
        .await;
        assert!(assets.logo.is_none());
        assert!(assets.stamp.is_none());
        assert!(assets.signature.is_none());
    }
}
