//! Archive and file names.
//!
//! Every generated file carries the course id. Per-session names add the
//! session date as `DD-MM-YYYY`, per-participant names add surname then
//! given name. Every stem goes through [`sanitize_filename`].

use crate::course::{CourseData, Modulo, Partecipante, Sessione};
use crate::documents::common::{date_for_filename, sanitize_filename};
use crate::templates::UserTemplateInfo;

pub const DOCX: &str = "docx";
pub const XLSX: &str = "xlsx";

/// Join non-empty parts with `_`, sanitize and add the extension.
pub fn file_name(parts: &[&str], ext: &str) -> String {
    let stem = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    format!("{}.{}", sanitize_filename(&stem, "documento"), ext)
}

fn course_id(course: &CourseData) -> &str {
    course.corso.id.trim()
}

fn participant_parts(p: &Partecipante) -> [&str; 2] {
    [p.cognome.trim(), p.nome.trim()]
}

pub fn archive_name(course: &CourseData) -> String {
    let suffix = if course.is_multi_module() { "MultiModulo" } else { "" };
    file_name(
        &["Corso", course_id(course), &course.corso.titolo, suffix],
        "zip",
    )
}

pub fn excel_archive_name(course: &CourseData) -> String {
    file_name(
        &["Corso", course_id(course), &course.corso.titolo, "Excel"],
        "zip",
    )
}

/// `<NN>_<module identifier>_<module title>`, numbered from 1.
pub fn module_folder(index: usize, modulo: &Modulo) -> String {
    let number = format!("{:02}", index + 1);
    let stem = [number.as_str(), modulo.identifier(), modulo.titolo.trim()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    sanitize_filename(&stem, &number)
}

/// User template output such as `Attestato_<id>.docx`. Two templates with
/// the same name are told apart by the archive bundle.
pub fn user_template(info: &UserTemplateInfo, course: &CourseData) -> String {
    file_name(&[&info.name, course_id(course)], DOCX)
}

/// Course-level document such as `Registro_Didattico_<id>.docx`.
pub fn course_document(prefix: &str, course: &CourseData, ext: &str) -> String {
    file_name(&[prefix, course_id(course)], ext)
}

/// Per-session document such as `Registro_FAD_<id>_<DD-MM-YYYY>.docx`.
pub fn session_document(prefix: &str, course: &CourseData, session: &Sessione) -> String {
    let date = date_for_filename(&session.data_completa);
    file_name(&[prefix, course_id(course), &date], DOCX)
}

/// Per-participant document such as `Certificato_<id>_<Cognome>_<Nome>.docx`.
pub fn participant_document(prefix: &str, course: &CourseData, p: &Partecipante) -> String {
    let [cognome, nome] = participant_parts(p);
    file_name(&[prefix, course_id(course), cognome, nome], DOCX)
}

/// `Modulo7_<id>_<DD-MM-YYYY>_<Cognome>_<Nome>.docx`.
pub fn session_participant_document(
    prefix: &str,
    course: &CourseData,
    session: &Sessione,
    p: &Partecipante,
) -> String {
    let date = date_for_filename(&session.data_completa);
    let [cognome, nome] = participant_parts(p);
    file_name(&[prefix, course_id(course), &date, cognome, nome], DOCX)
}

/// Per-day folder inside `modulo 7`.
pub fn date_folder(session: &Sessione) -> String {
    date_for_filename(&session.data_completa)
}
