#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use corso_docs::course::{CourseData, Modulo, Partecipante, Persona, Sessione};
use corso_docs::documents::assets::{FsAssetSource, StampTable};
use corso_docs::documents::ooxml::{DocxBuilder, Paragraph};
use corso_docs::packaging::Packager;
use corso_docs::templates::InMemoryTemplateStore;
use corso_docs::AppState;

pub const MAX_UPLOAD: usize = 1024 * 1024;

/// A one-paragraph `.docx` usable as a template.
pub fn docx(text: &str) -> Vec<u8> {
    let mut doc = DocxBuilder::new("Modello");
    doc.paragraph(Paragraph::text(text));
    doc.build().expect("docx fixture")
}

pub fn session(date: &str, start: &str, end: &str, fad: bool) -> Sessione {
    Sessione {
        data_completa: date.to_string(),
        ora_inizio: start.to_string(),
        ora_fine: end.to_string(),
        tipo_sede: if fad { "FAD" } else { "Aula" }.to_string(),
        is_fad: fad,
        ..Default::default()
    }
}

pub fn participant(nome: &str, cognome: &str, benefits: bool) -> Partecipante {
    Partecipante {
        nome: nome.to_string(),
        cognome: cognome.to_string(),
        codice_fiscale: format!("{}XXXXXXXXXXXXX", cognome[..3].to_uppercase()),
        benefits,
        ..Default::default()
    }
}

pub fn module(id: &str, titolo: &str, sessioni: Vec<Sessione>) -> Modulo {
    Modulo {
        id: id.to_string(),
        titolo: titolo.to_string(),
        sessioni,
        ..Default::default()
    }
}

/// One module, two FAD sessions on the same day, three participants of
/// whom one is a beneficiary.
pub fn fad_course() -> CourseData {
    course(
        vec![module(
            "M1",
            "Modulo base",
            vec![
                session("10/03/2025", "10:00", "13:00", true),
                session("10/03/2025", "14:00", "17:00", true),
            ],
        )],
        vec![
            participant("Mario", "Rossi", true),
            participant("Lucia", "Verdi", false),
            participant("Anna", "Bruni", false),
        ],
    )
}

pub fn course(moduli: Vec<Modulo>, partecipanti: Vec<Partecipante>) -> CourseData {
    let mut course = CourseData {
        moduli,
        partecipanti,
        trainer: Persona {
            nome: "Paolo".to_string(),
            cognome: "Bianchi".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    course.corso.id = "C-200".to_string();
    course.corso.titolo = "Sicurezza sul lavoro".to_string();
    course.ente.nome = "Ente Formazione".to_string();
    course.normalized()
}

pub fn packager(store: Arc<InMemoryTemplateStore>, assets_dir: &Path) -> Packager {
    Packager::new(
        store,
        Arc::new(FsAssetSource::new(assets_dir)),
        Arc::new(StampTable::default()),
    )
}

pub fn app_state(store: Arc<InMemoryTemplateStore>, assets_dir: &Path) -> AppState {
    AppState::new(
        store,
        Arc::new(FsAssetSource::new(assets_dir)),
        StampTable::default(),
        MAX_UPLOAD,
    )
}

pub fn archive_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
    archive.file_names().map(String::from).collect()
}

/// `word/document.xml` of a `.docx` stored inside an archive.
pub fn document_xml(archive: &[u8], entry: &str) -> String {
    let mut outer = zip::ZipArchive::new(Cursor::new(archive)).expect("zip archive");
    let mut docx = Vec::new();
    outer
        .by_name(entry)
        .expect("archive entry")
        .read_to_end(&mut docx)
        .expect("read entry");
    docx_xml(&docx)
}

pub fn docx_xml(docx: &[u8]) -> String {
    let mut inner = zip::ZipArchive::new(Cursor::new(docx)).expect("docx archive");
    let mut xml = String::new();
    inner
        .by_name("word/document.xml")
        .expect("document part")
        .read_to_string(&mut xml)
        .expect("read document part");
    xml
}
