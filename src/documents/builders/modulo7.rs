//! Event communication for one beneficiary and one lesson day ("Modulo 7").

use super::convocazione::venue;
use super::{
    banner, calendar_table, field_table, letterhead, non_empty_or, section_title, signature_cell,
    supervisor_email, BuilderAssets, Field,
};
use crate::course::{CourseData, Partecipante, Sessione};
use crate::documents::common::{calendar_days, format_italian_date};
use crate::documents::ooxml::docx::PORTRAIT_TEXT_WIDTH;
use crate::documents::ooxml::{Align, DocxBuilder, Paragraph, Row, Table};
use crate::documents::DocumentError;

pub fn build_event_notice(
    course: &CourseData,
    session: &Sessione,
    partecipante: &Partecipante,
    assets: &BuilderAssets,
) -> Result<Vec<u8>, DocumentError> {
    compose(course, session, partecipante, assets).build()
}

pub(crate) fn compose(
    course: &CourseData,
    session: &Sessione,
    partecipante: &Partecipante,
    assets: &BuilderAssets,
) -> DocxBuilder {
    let mut doc = DocxBuilder::new(format!(
        "Comunicazione evento {} - {}",
        session.data_completa,
        partecipante.nome_completo()
    ));
    letterhead(&mut doc, course, assets);

    doc.paragraph(banner(
        "COMUNICAZIONE DI EVENTO FORMATIVO",
        Some("Modulo 7 - Programma GOL"),
    ));

    doc.paragraph(section_title("Dati del beneficiario"));
    doc.table(field_table(&[
        Field::new("Cognome", partecipante.cognome.trim()),
        Field::new("Nome", partecipante.nome.trim()),
        Field::new("Codice fiscale", partecipante.codice_fiscale.trim()),
        Field::new("Email", partecipante.email.as_deref().unwrap_or("").trim()),
        Field::new("Telefono", partecipante.telefono.as_deref().unwrap_or("").trim()),
    ]));

    doc.paragraph(section_title("Dati dell'evento"));
    doc.table(field_table(&[
        Field::new("Percorso", course.corso.titolo.trim()),
        Field::new("ID corso", course.corso.id.trim()),
        Field::new("Ente erogatore", course.ente.nome.trim()),
        Field::new("Data", format_italian_date(&session.data_completa)),
        Field::new("Luogo di svolgimento", event_place(course, session)),
        Field::new("Modalità", if session.is_fad { "A distanza (FAD)" } else { "In presenza" }),
        Field::new("Argomento", session.argomento.as_deref().unwrap_or("").trim()),
    ]));

    doc.paragraph(section_title("Orario della giornata"));
    let same_day = course
        .all_sessions()
        .filter(|s| s.data_completa.trim() == session.data_completa.trim());
    doc.table(calendar_table(&calendar_days(same_day)));

    let email = supervisor_email(course);
    doc.paragraph(
        Paragraph::text(format!(
            "Per comunicare eventuali assenze o impedimenti contattare {}{}.",
            non_empty_or(&course.supervisore.display_name(), "la segreteria dell'ente"),
            if email.is_empty() {
                String::new()
            } else {
                format!(" ({})", email)
            }
        ))
        .align(Align::Justify)
        .spacing_after(12),
    );

    doc.table(
        Table::new([PORTRAIT_TEXT_WIDTH / 2, PORTRAIT_TEXT_WIDTH / 2]).row(Row::new([
            signature_cell("Per l'ente", &course.supervisore.display_name(), None),
            signature_cell("Il beneficiario", &partecipante.nome_completo(), None),
        ])),
    );

    doc
}

fn event_place(course: &CourseData, session: &Sessione) -> String {
    if session.is_fad {
        let platform = course.fad_settings.piattaforma.trim();
        return if platform.is_empty() {
            "Online".to_string()
        } else {
            format!("Online - {}", platform)
        };
    }
    if !session.sede.trim().is_empty() {
        return session.sede.trim().to_string();
    }
    venue(course)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;

    #[test]
    fn test_notice_restricted_to_session_day() {
        let mut course = fixtures::course(vec![
            fixtures::session("03/03/2025", "09:00", "18:00", false),
            fixtures::session("04/03/2025", "09:00", "12:00", false),
        ]);
        course.sede.nome = "Aula Magna".to_string();
        let session = course.moduli[0].sessioni[0].clone();
        let beneficiary = course.partecipanti[0].clone();
        let doc = compose(&course, &session, &beneficiary, &BuilderAssets::none());

        let calendar = doc.tables().nth(2).unwrap();
        // header + 1 day + total
        assert_eq!(calendar.len(), 3);

        let text = doc.plain_text();
        assert!(text.contains("09:00 - 13:00"));
        assert!(text.contains("14:00 - 18:00"));
        assert!(text.contains("Aula Magna"));
        assert!(text.contains("In presenza"));
        assert!(text.contains("lunedì 3 marzo 2025"));
        assert!(!text.contains("04/03/2025"));
        assert!(build_event_notice(&course, &session, &beneficiary, &BuilderAssets::none()).is_ok());
    }

    #[test]
    fn test_fad_session_place_is_online() {
        let mut course = fixtures::course(vec![fixtures::session("03/03/2025", "09:00", "12:00", true)]);
        course.fad_settings.piattaforma = "Teams".to_string();
        let session = course.moduli[0].sessioni[0].clone();
        assert_eq!(event_place(&course, &session), "Online - Teams");
    }
}
