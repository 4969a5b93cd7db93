//! Excel workbooks built directly from course data: attendance grid,
//! participant list, lesson calendar and the multi-sheet full report.

use super::common::schedule_range;
use super::ooxml::xlsx::cell_ref;
use super::ooxml::{CellValue, Sheet, WorkbookBuilder};
use super::DocumentError;
use crate::course::{CourseData, Modulo, Sessione};

/// Which sessions a workbook covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    /// One module, by 0-based index.
    Module(usize),
    /// Every module, in order; used for the shared cross-module report.
    AllModules,
}

impl Default for SessionScope {
    fn default() -> Self {
        Self::Module(0)
    }
}

fn scoped_sessions(
    course: &CourseData,
    scope: SessionScope,
) -> Result<Vec<(&Modulo, &Sessione)>, DocumentError> {
    match scope {
        SessionScope::AllModules => Ok(course
            .moduli
            .iter()
            .flat_map(|m| m.sessioni.iter().map(move |s| (m, s)))
            .collect()),
        SessionScope::Module(_) if course.moduli.is_empty() => Ok(Vec::new()),
        SessionScope::Module(idx) => {
            let modulo = course.modulo(idx).ok_or_else(|| {
                DocumentError::Build(format!(
                    "module index {} out of range ({} modules)",
                    idx,
                    course.moduli.len()
                ))
            })?;
            Ok(modulo.sessioni.iter().map(|s| (modulo, s)).collect())
        }
    }
}

/// Participants by session date; a `SUM` per participant row, per session
/// column and a grand total.
pub fn attendance_workbook(course: &CourseData, scope: SessionScope) -> Result<Vec<u8>, DocumentError> {
    let sessions = scoped_sessions(course, scope)?;
    let mut workbook = WorkbookBuilder::new(format!("Registro presenze - {}", course.corso.titolo));
    workbook.add_sheet(attendance_sheet(course, &sessions));
    workbook.build()
}

pub fn participant_list_workbook(course: &CourseData) -> Result<Vec<u8>, DocumentError> {
    let mut workbook = WorkbookBuilder::new(format!("Partecipanti - {}", course.corso.titolo));
    workbook.add_sheet(participants_sheet(course));
    workbook.build()
}

pub fn calendar_workbook(course: &CourseData, scope: SessionScope) -> Result<Vec<u8>, DocumentError> {
    let sessions = scoped_sessions(course, scope)?;
    let mut workbook = WorkbookBuilder::new(format!("Calendario - {}", course.corso.titolo));
    workbook.add_sheet(calendar_sheet(&sessions));
    workbook.build()
}

/// Summary, participants and sessions on three sheets.
pub fn full_report_workbook(course: &CourseData, scope: SessionScope) -> Result<Vec<u8>, DocumentError> {
    let sessions = scoped_sessions(course, scope)?;
    let mut workbook = WorkbookBuilder::new(format!("Report - {}", course.corso.titolo));
    workbook
        .add_sheet(summary_sheet(course, &sessions))
        .add_sheet(participants_sheet(course))
        .add_sheet(calendar_sheet(&sessions));
    workbook.build()
}

const ATTENDANCE_FIXED_COLUMNS: usize = 4;

fn attendance_sheet(course: &CourseData, sessions: &[(&Modulo, &Sessione)]) -> Sheet {
    let mut sheet = Sheet::new("Presenze");
    let mut header = vec![
        CellValue::header("N."),
        CellValue::header("Cognome"),
        CellValue::header("Nome"),
        CellValue::header("Codice fiscale"),
    ];
    header.extend(
        sessions
            .iter()
            .map(|(_, s)| CellValue::header(format!("{} ({})", s.data_completa, schedule_range(s)))),
    );
    header.push(CellValue::header("Totale ore"));
    sheet.push_row(header);

    let first_col = ATTENDANCE_FIXED_COLUMNS;
    let last_col = first_col + sessions.len();
    let total_col = last_col;
    let first_row = sheet.next_row();

    for (idx, p) in course.partecipanti.iter().enumerate() {
        let row = sheet.next_row();
        let mut cells = vec![
            CellValue::from((idx + 1) as u32),
            CellValue::text(p.cognome.trim()),
            CellValue::text(p.nome.trim()),
            CellValue::text(p.codice_fiscale.trim()),
        ];
        cells.extend(sessions.iter().map(|_| CellValue::Empty));
        cells.push(sum_or_zero(sessions.is_empty(), || {
            format!("SUM({}:{})", cell_ref(first_col, row), cell_ref(last_col - 1, row))
        }));
        sheet.push_row(cells);
    }

    let last_row = sheet.next_row() - 1;
    let no_rows = course.partecipanti.is_empty();
    let mut totals = vec![
        CellValue::Empty,
        CellValue::header("Totale"),
        CellValue::Empty,
        CellValue::Empty,
    ];
    totals.extend((first_col..last_col).map(|col| {
        sum_or_zero(no_rows, || {
            format!("SUM({}:{})", cell_ref(col, first_row), cell_ref(col, last_row))
        })
    }));
    totals.push(sum_or_zero(no_rows, || {
        format!(
            "SUM({}:{})",
            cell_ref(total_col, first_row),
            cell_ref(total_col, last_row)
        )
    }));
    sheet.push_row(totals);

    let mut widths = vec![5.0, 20.0, 20.0, 20.0];
    widths.extend(sessions.iter().map(|_| 16.0));
    widths.push(12.0);
    sheet.column_widths(widths);
    sheet
}

/// A `SUM` formula, or a literal zero when the range would be empty.
fn sum_or_zero(empty: bool, formula: impl FnOnce() -> String) -> CellValue {
    if empty {
        CellValue::Number(0.0)
    } else {
        CellValue::formula(formula())
    }
}

fn participants_sheet(course: &CourseData) -> Sheet {
    let mut sheet = Sheet::new("Partecipanti");
    sheet.push_row(
        ["N.", "Cognome", "Nome", "Codice fiscale", "Email", "Telefono", "Beneficiario"]
            .into_iter()
            .map(CellValue::header)
            .collect(),
    );
    for (idx, p) in course.partecipanti.iter().enumerate() {
        sheet.push_row(vec![
            CellValue::from((idx + 1) as u32),
            CellValue::text(p.cognome.trim()),
            CellValue::text(p.nome.trim()),
            CellValue::text(p.codice_fiscale.trim()),
            CellValue::text(p.email.as_deref().unwrap_or("").trim()),
            CellValue::text(p.telefono.as_deref().unwrap_or("").trim()),
            CellValue::from(if p.benefits { "Sì" } else { "No" }),
        ]);
    }
    sheet.column_widths([5.0, 20.0, 20.0, 20.0, 28.0, 16.0, 12.0]);
    sheet
}

fn calendar_sheet(sessions: &[(&Modulo, &Sessione)]) -> Sheet {
    let mut sheet = Sheet::new("Calendario");
    sheet.push_row(
        ["N.", "Modulo", "Data", "Giorno", "Orario", "Durata (ore)", "Modalità", "Sede", "Argomento"]
            .into_iter()
            .map(CellValue::header)
            .collect(),
    );
    let first_row = sheet.next_row();
    for (idx, (modulo, session)) in sessions.iter().enumerate() {
        sheet.push_row(vec![
            CellValue::from((idx + 1) as u32),
            CellValue::text(modulo.identifier()),
            CellValue::text(session.data_completa.trim()),
            CellValue::text(session.giorno_settimana.trim()),
            CellValue::text(schedule_range(session)),
            CellValue::from(session.durata_ore()),
            CellValue::from(if session.is_fad { "FAD" } else { "Presenza" }),
            CellValue::text(session.sede.trim()),
            CellValue::text(session.argomento.as_deref().unwrap_or("").trim()),
        ]);
    }
    let last_row = sheet.next_row() - 1;
    let duration_col = 5;
    sheet.push_row(vec![
        CellValue::Empty,
        CellValue::Empty,
        CellValue::Empty,
        CellValue::Empty,
        CellValue::header("Totale ore"),
        sum_or_zero(sessions.is_empty(), || {
            format!(
                "SUM({}:{})",
                cell_ref(duration_col, first_row),
                cell_ref(duration_col, last_row)
            )
        }),
    ]);
    sheet.column_widths([5.0, 14.0, 12.0, 12.0, 26.0, 12.0, 10.0, 20.0, 40.0]);
    sheet
}

fn summary_sheet(course: &CourseData, sessions: &[(&Modulo, &Sessione)]) -> Sheet {
    let ore_fad: u32 = sessions.iter().filter(|(_, s)| s.is_fad).map(|(_, s)| s.durata_ore()).sum();
    let ore_presenza: u32 = sessions.iter().filter(|(_, s)| !s.is_fad).map(|(_, s)| s.durata_ore()).sum();
    let periodo = match (course.data_inizio(), course.data_fine()) {
        ("", _) | (_, "") => String::new(),
        (inizio, fine) => format!("{} - {}", inizio, fine),
    };

    let mut sheet = Sheet::new("Riepilogo");
    sheet.push_row(vec![CellValue::header("Voce"), CellValue::header("Valore")]);
    let rows: Vec<(&str, CellValue)> = vec![
        ("ID corso", course.corso.id.trim().into()),
        ("Titolo", course.corso.titolo.trim().into()),
        ("Tipo", course.corso.tipo.as_str().into()),
        ("Ente", course.ente.nome.trim().into()),
        ("Periodo", periodo.into()),
        ("Ore totali", course.corso.ore_totali.trim().into()),
        ("Moduli", (course.moduli.len() as u32).into()),
        ("Sessioni", (sessions.len() as u32).into()),
        (
            "Sessioni FAD",
            (sessions.iter().filter(|(_, s)| s.is_fad).count() as u32).into(),
        ),
        ("Ore FAD", ore_fad.into()),
        ("Ore in presenza", ore_presenza.into()),
        ("Partecipanti", (course.partecipanti.len() as u32).into()),
        ("Beneficiari", (course.beneficiari().count() as u32).into()),
        ("Docente", course.trainer.display_name().into()),
        ("Tutor", course.tutor.display_name().into()),
    ];
    for (label, value) in rows {
        sheet.push_row(vec![CellValue::text(label), value]);
    }
    sheet.column_widths([22.0, 50.0]);
    sheet
}
