//! Beneficiary summons with the personal course calendar ("Modulo 5").

use super::{
    banner, calendar_table, letterhead, non_empty_or, section_title, signature_cell,
    supervisor_email, BuilderAssets,
};
use crate::course::{CourseData, Partecipante};
use crate::documents::common::{calendar_days, today_italian};
use crate::documents::ooxml::docx::PORTRAIT_TEXT_WIDTH;
use crate::documents::ooxml::{Align, DocxBuilder, Paragraph, Row, Run, Table};
use crate::documents::DocumentError;

pub fn build_summons(
    course: &CourseData,
    partecipante: &Partecipante,
    assets: &BuilderAssets,
) -> Result<Vec<u8>, DocumentError> {
    compose(course, partecipante, assets).build()
}

pub(crate) fn compose(course: &CourseData, partecipante: &Partecipante, assets: &BuilderAssets) -> DocxBuilder {
    let mut doc = DocxBuilder::new(format!("Convocazione - {}", partecipante.nome_completo()));
    letterhead(&mut doc, course, assets);

    let place = non_empty_or(&course.ente.accreditato.comune, &course.sede.citta);
    let dated = if place.is_empty() {
        today_italian()
    } else {
        format!("{}, {}", place, today_italian())
    };
    doc.paragraph(Paragraph::text(dated).align(Align::Right));
    doc.paragraph(
        Paragraph::new()
            .runs([
                Run::text("Alla c.a. di "),
                Run::bold(partecipante.nome_completo()),
                Run::line_break(),
                Run::text(format!("Codice fiscale: {}", partecipante.codice_fiscale.trim())),
            ])
            .align(Align::Right)
            .spacing_after(12),
    );

    doc.paragraph(banner(
        "CONVOCAZIONE AL PERCORSO FORMATIVO",
        Some("Calendario delle attività - Modulo 5"),
    ));

    doc.paragraph(
        Paragraph::text(format!(
            "Con la presente si comunica che il percorso formativo \"{}\" (ID {}) erogato da {} \
             si svolgerà presso {} secondo il calendario riportato di seguito. \
             La partecipazione alle attività costituisce condizione per il mantenimento \
             dei benefici previsti dal programma.",
            course.corso.titolo.trim(),
            non_empty_or(&course.corso.id, "-"),
            non_empty_or(&course.ente.nome, "l'ente di formazione"),
            venue(course),
        ))
        .align(Align::Justify)
        .spacing_after(8),
    );

    doc.paragraph(section_title("Calendario"));
    let days = calendar_days(course.all_sessions());
    doc.table(calendar_table(&days));

    doc.paragraph(Paragraph::new().spacing_after(6));
    let email = supervisor_email(course);
    let supervisore = course.supervisore.display_name();
    if !supervisore.is_empty() || !email.is_empty() {
        let mut runs = vec![Run::text("Per informazioni è possibile contattare ")];
        if !supervisore.is_empty() {
            runs.push(Run::bold(supervisore.clone()));
        }
        if !email.is_empty() {
            runs.push(Run::text(format!(" all'indirizzo {}", email)));
        }
        let telefono = course.supervisore.telefono.trim();
        if !telefono.is_empty() {
            runs.push(Run::text(format!(" o al numero {}", telefono)));
        }
        runs.push(Run::text("."));
        doc.paragraph(Paragraph::new().runs(runs).spacing_after(12));
    }

    doc.table(
        Table::new([PORTRAIT_TEXT_WIDTH / 2, PORTRAIT_TEXT_WIDTH / 2]).row(Row::new([
            signature_cell("Per l'ente", &supervisore, None),
            signature_cell("Per presa visione", &partecipante.nome_completo(), None),
        ])),
    );

    doc
}

pub(crate) fn venue(course: &CourseData) -> String {
    let parts: Vec<&str> = [
        course.sede.nome.trim(),
        course.sede.indirizzo.trim(),
        course.sede.citta.trim(),
    ]
    .into_iter()
    .filter(|p| !p.is_empty())
    .collect();
    if parts.is_empty() {
        let address = course.ente.accreditato.indirizzo_completo();
        if address.is_empty() {
            "la sede indicata dall'ente".to_string()
        } else {
            address
        }
    } else {
        parts.join(", ")
    }
}
