//! Daily registry of a distance-learning session ("Modello B").

use super::{banner, letterhead, non_empty_or, signature_cell, BuilderAssets};
use crate::course::{CourseData, Sessione};
use crate::documents::common::{schedule_range, split_across_break};
use crate::documents::ooxml::docx::{ImageRef, LANDSCAPE_TEXT_WIDTH};
use crate::documents::ooxml::{Align, Cell, DocxBuilder, PageSetup, Paragraph, Row, Run, Table};
use crate::documents::DocumentError;

/// Registry of a single FAD session.
pub fn build_daily_registry(
    course: &CourseData,
    session: &Sessione,
    assets: &BuilderAssets,
) -> Result<Vec<u8>, DocumentError> {
    build_daily_registries(course, std::slice::from_ref(session), assets)
}

/// One landscape section per session.
pub fn build_daily_registries(
    course: &CourseData,
    sessions: &[Sessione],
    assets: &BuilderAssets,
) -> Result<Vec<u8>, DocumentError> {
    if sessions.is_empty() {
        return Err(DocumentError::Build("no FAD session to register".to_string()));
    }
    compose(course, sessions, assets).build()
}

pub(crate) fn compose(course: &CourseData, sessions: &[Sessione], assets: &BuilderAssets) -> DocxBuilder {
    let mut doc = DocxBuilder::new(format!("Registro FAD - {}", course.corso.titolo));
    letterhead(&mut doc, course, assets);

    let signature = match (&assets.signature, course.fad_settings.include_firma) {
        (Some(image), true) => Some(doc.add_image(image.clone())),
        _ => None,
    };

    for (idx, session) in sessions.iter().enumerate() {
        if idx > 0 {
            doc.end_section(PageSetup::landscape());
        }
        session_section(&mut doc, course, session, signature);
    }
    doc.page_setup(PageSetup::landscape());
    doc
}

fn session_section(
    doc: &mut DocxBuilder,
    course: &CourseData,
    session: &Sessione,
    signature: Option<ImageRef>,
) {
    doc.paragraph(banner(
        "REGISTRO GIORNALIERO DELLE ATTIVITÀ FORMATIVE A DISTANZA",
        Some("Modello B"),
    ));

    let column = LANDSCAPE_TEXT_WIDTH / 6;
    let date_cell = |label: &str, value: &str| {
        Cell::new(
            Paragraph::new()
                .runs([Run::bold(format!("{}: ", label)), Run::text(value)])
                .align(Align::Center),
        )
    };
    doc.table(
        Table::new([column * 2, column, column, column, LANDSCAPE_TEXT_WIDTH - column * 5])
            .row(Row::new([
                Cell::new(Paragraph::new().runs([
                    Run::bold("Corso: "),
                    Run::text(format!("{} ({})", course.corso.titolo.trim(), course.corso.id.trim())),
                ])),
                date_cell("Giorno", &session.giorno),
                date_cell("Mese", &session.mese),
                date_cell("Anno", &session.anno),
                date_cell("Orario", &schedule_range(session)),
            ]))
            .row(Row::new([
                Cell::new(Paragraph::new().runs([
                    Run::bold("Piattaforma: "),
                    Run::text(non_empty_or(&course.fad_settings.piattaforma, "-")),
                ]))
                .span(2),
                Cell::new(Paragraph::new().runs([
                    Run::bold("Sessione n. "),
                    Run::text(session.numero.to_string()),
                    Run::text(format!("  {}", session.giorno_settimana)),
                ]))
                .span(3),
            ])),
    );
    doc.paragraph(Paragraph::new().spacing_after(6));

    doc.table(attendance_table(course, session));

    let argomento = session.argomento.as_deref().unwrap_or("").trim();
    doc.paragraph(
        Paragraph::new()
            .runs([Run::bold("Argomenti trattati: "), Run::text(argomento)])
            .spacing_after(12),
    );

    doc.table(
        Table::new([LANDSCAPE_TEXT_WIDTH / 2, LANDSCAPE_TEXT_WIDTH / 2]).row(Row::new([
            signature_cell("Il Tutor", &course.tutor.display_name(), None),
            signature_cell("Il Docente", &course.trainer.display_name(), signature),
        ])),
    );
}

/// One row per participant; connection and disconnection follow the
/// session's own parts around the lunch break.
fn attendance_table(course: &CourseData, session: &Sessione) -> Table {
    let parts = split_across_break(session);
    let connect = parts
        .iter()
        .map(|p| p.ora_inizio.as_str())
        .collect::<Vec<_>>()
        .join(" / ");
    let disconnect = parts
        .iter()
        .map(|p| p.ora_fine.as_str())
        .collect::<Vec<_>>()
        .join(" / ");
    let range = schedule_range(session);

    let mut table = Table::new([600, 3600, 2800, 1800, 1800, 3970]).row(Row::header([
        "N.",
        "Cognome e nome",
        "Codice fiscale",
        "Ora connessione",
        "Ora disconnessione",
        "Orario",
    ]));
    for (idx, p) in course.partecipanti.iter().enumerate() {
        table.push(Row::texts([
            (idx + 1).to_string(),
            format!("{} {}", p.cognome.trim(), p.nome.trim()).trim().to_string(),
            p.codice_fiscale.trim().to_string(),
            connect.clone(),
            disconnect.clone(),
            range.clone(),
        ]));
    }
    table
}
