//! End-of-course minutes ("Verbale finale").

use super::{
    banner, letterhead, non_empty_or, roster_table, section_title, signature_cell, BuilderAssets,
    STAMP_SIZE_CM,
};
use crate::course::{CourseData, Persona};
use crate::documents::common::{format_italian_date, today_italian};
use crate::documents::ooxml::docx::PORTRAIT_TEXT_WIDTH;
use crate::documents::ooxml::{Align, DocxBuilder, Paragraph, Row, Run, Table};
use crate::documents::DocumentError;

pub fn build_final_minutes(course: &CourseData, assets: &BuilderAssets) -> Result<Vec<u8>, DocumentError> {
    compose(course, assets, &today_italian()).build()
}

pub(crate) fn compose(course: &CourseData, assets: &BuilderAssets, date: &str) -> DocxBuilder {
    let mut doc = DocxBuilder::new(format!("Verbale finale - {}", course.corso.titolo));
    letterhead(&mut doc, course, assets);

    doc.paragraph(banner("VERBALE DI CONCLUSIONE DEL CORSO", None));

    let place = non_empty_or(&course.ente.accreditato.comune, &course.sede.citta);
    let responsabile = course.responsabile_certificazione.display_name();
    doc.paragraph(
        Paragraph::new()
            .runs([
                Run::text(format!("In data {}", format_italian_date(date))),
                Run::text(if place.is_empty() {
                    String::new()
                } else {
                    format!(", presso la sede di {}", place)
                }),
                Run::text(", il/la sottoscritto/a "),
                Run::bold(non_empty_or(&responsabile, "__________________")),
                Run::text(format!(
                    ", in qualità di Responsabile della certificazione delle competenze dell'ente {}, ",
                    non_empty_or(&course.ente.nome, "__________________")
                )),
                Run::text("dichiara che il corso "),
                Run::bold(format!("\"{}\"", course.corso.titolo.trim())),
                Run::text(format!(
                    " (ID {}) si è svolto dal {} al {} per una durata complessiva di {} ore.",
                    non_empty_or(&course.corso.id, "-"),
                    non_empty_or(course.data_inizio(), "-"),
                    non_empty_or(course.data_fine(), "-"),
                    non_empty_or(&course.corso.ore_totali, "-"),
                )),
            ])
            .align(Align::Justify)
            .spacing_after(8),
    );

    doc.paragraph(section_title("Figure coinvolte"));
    for (role, persona) in [
        ("docente del corso", &course.trainer),
        ("tutor", &course.tutor),
        ("supervisore", &course.supervisore),
        ("direttore del corso", &course.direttore),
    ] {
        if let Some(line) = role_line(role, persona) {
            doc.paragraph(Paragraph::text(line).indent(360));
        }
    }

    doc.paragraph(section_title("Elenco dei partecipanti"));
    doc.table(roster_table(&course.partecipanti, "Esito", 0));

    doc.paragraph(
        Paragraph::text(
            "Il presente verbale viene letto, approvato e sottoscritto dai presenti.",
        )
        .spacing_after(12),
    );

    doc.table(
        Table::new([PORTRAIT_TEXT_WIDTH / 3, PORTRAIT_TEXT_WIDTH / 3, PORTRAIT_TEXT_WIDTH / 3]).row(
            Row::new([
                signature_cell("Il Responsabile della certificazione", &responsabile, None),
                signature_cell("Il Docente", &course.trainer.display_name(), None),
                signature_cell("Il Supervisore", &course.supervisore.display_name(), None),
            ]),
        ),
    );

    if let Some(stamp) = &assets.stamp {
        let stamp = doc.add_image(stamp.clone());
        doc.paragraph(Paragraph::text("Timbro dell'ente").align(Align::Right));
        doc.paragraph(
            Paragraph::new()
                .run(stamp.run(STAMP_SIZE_CM.0, STAMP_SIZE_CM.1))
                .align(Align::Right),
        );
    }

    doc
}

fn role_line(role: &str, persona: &Persona) -> Option<String> {
    let name = persona.display_name();
    if name.is_empty() {
        return None;
    }
    let mut line = format!("{}, in qualità di {}", name, role);
    if !persona.qualifica.trim().is_empty() {
        line.push_str(&format!(" ({})", persona.qualifica.trim()));
    }
    Some(line)
}
