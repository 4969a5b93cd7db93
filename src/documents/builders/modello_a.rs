//! General registry of distance-learning activities ("Modello A").

use super::{
    banner, field_table, letterhead, roster_table, section_title, signature_cell, text_or_manual,
    BuilderAssets, Field,
};
use crate::course::CourseData;
use crate::documents::common::split_across_break;
use crate::documents::ooxml::docx::PORTRAIT_TEXT_WIDTH;
use crate::documents::ooxml::{Align, Cell, DocxBuilder, Paragraph, Row, Run, Table};
use crate::documents::DocumentError;

/// Minimum roster length, so the printed registry has room for late
/// enrolments.
pub const MIN_ROSTER_ROWS: usize = 15;

pub fn build_general_registry(
    course: &CourseData,
    assets: &BuilderAssets,
) -> Result<Vec<u8>, DocumentError> {
    compose(course, assets).build()
}

pub(crate) fn compose(course: &CourseData, assets: &BuilderAssets) -> DocxBuilder {
    let mut doc = DocxBuilder::new(format!("Registro generale FAD - {}", course.corso.titolo));
    letterhead(&mut doc, course, assets);

    doc.paragraph(banner(
        "REGISTRO GENERALE DELLE ATTIVITÀ FORMATIVE A DISTANZA",
        Some("Modello A - Formazione a distanza (FAD)"),
    ));

    doc.paragraph(section_title("1. Dati identificativi del corso"));
    doc.table(field_table(&identification(course)));

    doc.paragraph(section_title("2. Strumenti e modalità di gestione"));
    doc.paragraph(text_or_manual(&course.fad_settings.modalita_gestione));
    let fad = &course.fad_settings;
    if !fad.id_riunione.trim().is_empty() || !fad.passcode.trim().is_empty() {
        doc.paragraph(Paragraph::text(format!(
            "ID riunione: {}    Passcode: {}",
            fad.id_riunione.trim(),
            fad.passcode.trim()
        )));
    }
    if !fad.link.trim().is_empty() {
        doc.paragraph(Paragraph::text(format!("Link di accesso: {}", fad.link.trim())));
    }

    doc.paragraph(section_title("3. Argomenti trattati"));
    let topics: Vec<&str> = course
        .moduli
        .iter()
        .flat_map(|m| m.argomenti.iter())
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if topics.is_empty() {
        doc.paragraph(text_or_manual(""));
    }
    for topic in topics {
        doc.paragraph(Paragraph::text(format!("• {}", topic)).indent(360));
    }
    if !fad.obiettivi_didattici.trim().is_empty() {
        doc.paragraph(Paragraph::bold("Obiettivi didattici"));
        doc.paragraph(text_or_manual(&fad.obiettivi_didattici));
    }

    doc.paragraph(section_title("4. Modalità di verifica e valutazione"));
    doc.paragraph(text_or_manual(&fad.modalita_valutazione));

    doc.paragraph(section_title("5. Calendario delle sessioni FAD"));
    doc.table(sessions_table(course));

    doc.page_break();
    doc.paragraph(section_title("6. Elenco dei partecipanti"));
    doc.table(roster_table(&course.partecipanti, "Firma", MIN_ROSTER_ROWS));

    let signature = match (&assets.signature, fad.include_firma) {
        (Some(image), true) => Some(doc.add_image(image.clone())),
        _ => None,
    };
    doc.paragraph(Paragraph::new().spacing_after(12));
    doc.table(Table::new([PORTRAIT_TEXT_WIDTH / 2, PORTRAIT_TEXT_WIDTH / 2]).row(Row::new([
        signature_cell("Il Direttore del corso", &course.direttore.display_name(), None),
        signature_cell("Il Docente", &course.trainer.display_name(), signature),
    ])));

    doc
}

fn identification(course: &CourseData) -> Vec<Field> {
    let modulo = course
        .moduli
        .first()
        .map(|m| {
            [m.identifier(), m.titolo.trim()]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" - ")
        })
        .unwrap_or_default();

    let (inizio, fine) = (course.data_inizio(), course.data_fine());
    let periodo = if inizio.is_empty() || fine.is_empty() {
        String::new()
    } else {
        format!("dal {} al {}", inizio, fine)
    };

    let ore_fad: u32 = course
        .all_sessions()
        .filter(|s| s.is_fad)
        .map(|s| s.durata_ore())
        .sum();

    let sede_accreditata = {
        let address = course.ente.accreditato.indirizzo_completo();
        if address.is_empty() {
            course.ente.indirizzo.trim().to_string()
        } else {
            address
        }
    };

    vec![
        Field::new("Ente di formazione", course.ente.nome.as_str()),
        Field::new("Sede accreditata", sede_accreditata),
        Field::new("Titolo del corso", course.corso.titolo.as_str()),
        Field::new("ID corso", course.corso.id.as_str()),
        Field::new("Modulo", modulo),
        Field::new("Periodo di svolgimento", periodo),
        Field::new("Ore in FAD", if ore_fad > 0 { ore_fad.to_string() } else { String::new() }),
        Field::new("Piattaforma", course.fad_settings.piattaforma.as_str()),
        Field::new("Docente", course.trainer.display_name()),
        Field::new("Tutor", course.tutor.display_name()),
        Field::new("Direttore del corso", course.direttore.display_name()),
        Field::manual("Numero di registro"),
        Field::manual("Data di vidimazione"),
    ]
}

/// One row per sub-interval of every FAD session.
fn sessions_table(course: &CourseData) -> Table {
    let mut table = Table::new([600, 1400, 1500, 1000, 1000, 800, 3338]).row(Row::header([
        "N.", "Data", "Giorno", "Dalle", "Alle", "Ore", "Argomento",
    ]));

    let mut total = 0;
    for session in course.all_sessions().filter(|s| s.is_fad) {
        for part in split_across_break(session) {
            let hours = part.durata_ore();
            total += hours;
            table.push(Row::texts([
                session.numero.to_string(),
                part.data_completa.clone(),
                part.giorno_settimana.clone(),
                part.ora_inizio.clone(),
                part.ora_fine.clone(),
                hours.to_string(),
                part.argomento.clone().unwrap_or_default(),
            ]));
        }
    }

    if table.len() == 1 {
        table.push(Row::new([Cell::new(
            Paragraph::new()
                .run(Run::text("Nessuna sessione FAD programmata").italic())
                .align(Align::Center),
        )
        .span(7)]));
    } else {
        table.push(Row::new([
            Cell::bold("Totale ore").span(5),
            Cell::bold(total.to_string()),
            Cell::empty(),
        ]));
    }
    table
}
