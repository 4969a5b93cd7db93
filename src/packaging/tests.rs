use std::io::Cursor;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::course::CourseData;
use crate::documents::assets::{FsAssetSource, StampTable};
use crate::documents::builders::fixtures::{course, participant, session};
use crate::documents::ooxml::{DocxBuilder, Paragraph};
use crate::templates::{InMemoryTemplateStore, SystemTemplate, SystemTemplateType, TemplateStore, UserTemplate};

fn docx(text: &str) -> Vec<u8> {
    let mut doc = DocxBuilder::new("Modello");
    doc.paragraph(Paragraph::text(text));
    doc.build().unwrap()
}

fn mixed_course() -> CourseData {
    let mut c = course(vec![
        session("03/03/2025", "09:00", "13:00", true),
        session("04/03/2025", "09:00", "18:00", true),
        session("05/03/2025", "09:00", "12:00", false),
    ]);
    c.partecipanti.push(participant("Giulia", "Neri", true));
    c.normalized()
}

fn packager(store: Arc<InMemoryTemplateStore>, assets_dir: &std::path::Path) -> Packager {
    Packager::new(
        store,
        Arc::new(FsAssetSource::new(assets_dir)),
        Arc::new(StampTable::default()),
    )
}

fn request(course: CourseData, config: ZipConfig) -> PackageRequest {
    PackageRequest {
        course,
        config,
        ..Default::default()
    }
}

fn archive_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(String::from).collect()
}

#[tokio::test]
async fn test_unconfigured_slots_are_skipped_not_failed() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let output = packager(store, assets.path())
        .build_package(&request(mixed_course(), ZipConfig::default()), &CancellationToken::new())
        .await
        .unwrap();

    let report = &output.report;
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert!(report.is_skipped("Registro didattico"));
    assert!(report.is_skipped("Certificati"));
    assert!(report.is_skipped("Registri FAD"));
    assert!(report.is_skipped("Modulo 5"));
    assert!(report.is_skipped("Modulo 8"));

    let names = archive_names(&output.data);
    assert_eq!(names.len(), 4);
    assert!(names.iter().all(|n| n.starts_with("Excel/")));
    assert_eq!(output.filename, "Corso_C-100_Sicurezza_sul_lavoro.zip");
}

#[tokio::test]
async fn test_template_engine_fills_every_category() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    for slot in SystemTemplateType::ALL {
        store
            .put_system_template(SystemTemplate::new(slot, docx("{CORSO_TITOLO} {SESSIONE_DATA}")))
            .await
            .unwrap();
    }

    let output = packager(store, assets.path())
        .build_package(&request(mixed_course(), ZipConfig::default()), &CancellationToken::new())
        .await
        .unwrap();
    assert!(output.report.failures.is_empty(), "{:?}", output.report.failures);
    assert!(output.report.skipped.is_empty(), "{:?}", output.report.skipped);

    let names = archive_names(&output.data);
    let expected = [
        "Registro_Didattico_C-100.docx",
        "Verbale_Ammissione_C-100.docx",
        "Verbale_Scrutinio_C-100.docx",
        "Verbale_Finale_C-100.docx",
        "Registro_Generale_FAD_C-100.docx",
        "Excel/Registro_Presenze_C-100.xlsx",
        "Registri_FAD/Registro_FAD_C-100_03-03-2025.docx",
        "Registri_FAD/Registro_FAD_C-100_04-03-2025.docx",
        "Certificati/Certificato_C-100_Rossi_Mario.docx",
        "Certificati/Certificato_C-100_Verdi_Lucia.docx",
        "Certificati/Certificato_C-100_Neri_Giulia.docx",
        "modulo 5/Modulo5_C-100_Rossi_Mario.docx",
        "modulo 5/Modulo5_C-100_Neri_Giulia.docx",
        "modulo 7/05-03-2025/Modulo7_C-100_05-03-2025_Neri_Giulia.docx",
        "modulo 8/Modulo8_C-100_05-03-2025.docx",
        "modulo 8/Registro_Cartaceo_C-100.docx",
    ];
    for name in expected {
        assert!(names.iter().any(|n| n == name), "missing {}", name);
    }
    assert!(!names.iter().any(|n| n.starts_with("modulo 5/Modulo5_C-100_Verdi")));
    // 3 sessions x 2 beneficiaries
    assert_eq!(names.iter().filter(|n| n.starts_with("modulo 7/")).count(), 6);
    assert_eq!(names.iter().filter(|n| n.starts_with("modulo 8/Modulo8")).count(), 1);
}

#[tokio::test]
async fn test_programmatic_engine_needs_no_templates() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let mut config = ZipConfig::none();
    config.include_fad_registries = true;
    config.include_modulo5 = true;
    config.include_modulo7 = true;
    config.use_programmatic_generation = true;

    let output = packager(store, assets.path())
        .build_package(&request(mixed_course(), config), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.report.engine, "programmatic");
    assert!(output.report.failures.is_empty(), "{:?}", output.report.failures);
    let names = archive_names(&output.data);
    assert!(names.contains(&"Registro_Generale_FAD_C-100.docx".to_string()));
    assert_eq!(names.iter().filter(|n| n.starts_with("Registri_FAD/")).count(), 2);
    assert_eq!(names.iter().filter(|n| n.starts_with("modulo 5/")).count(), 2);
    assert_eq!(names.iter().filter(|n| n.starts_with("modulo 7/")).count(), 6);
}

#[tokio::test]
async fn test_user_templates_only_suppresses_system_categories() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    store
        .put_system_template(SystemTemplate::new(SystemTemplateType::Certificato, docx("{NOME}")))
        .await
        .unwrap();
    let template = UserTemplate::new("Foglio firme", "", "firme.docx", docx("{#STUDENTI}{NOME}{/STUDENTI}"));
    let id = template.info.id;
    store.save_user_template(template).await.unwrap();

    let mut config = ZipConfig::default();
    config.include_excel = false;
    config.user_templates_only = true;
    let mut req = request(mixed_course(), config);
    req.selected_templates = vec![id, uuid::Uuid::new_v4()];

    let output = packager(store, assets.path())
        .build_package(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(archive_names(&output.data), vec!["Foglio_firme_C-100.docx".to_string()]);
    assert_eq!(output.report.failures.len(), 1);
    assert_eq!(output.report.failures[0].category, "Template utente");
}

#[tokio::test]
async fn test_cancelled_run_produces_no_archive() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = packager(store, assets.path())
        .build_package(&request(mixed_course(), ZipConfig::default()), &cancel)
        .await;
    assert!(matches!(result, Err(PackagingError::Cancelled)));
}

#[tokio::test]
async fn test_readme_and_metadata_written_on_request() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let mut config = ZipConfig::none();
    config.include_excel = true;
    config.include_readme = true;

    let output = packager(store, assets.path())
        .build_package(&request(mixed_course(), config), &CancellationToken::new())
        .await
        .unwrap();
    let names = archive_names(&output.data);
    assert!(names.contains(&report::README_FILE.to_string()));
    assert!(names.contains(&report::METADATA_FILE.to_string()));
    assert_eq!(output.report.generated.len(), 4);
}

#[tokio::test]
async fn test_render_single_documents() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let template = UserTemplate::new("Attestato", "", "attestato.docx", docx("{CORSO_TITOLO}"));
    let id = template.info.id;
    store.save_user_template(template).await.unwrap();
    let packager = packager(store.clone(), assets.path());
    let cancel = CancellationToken::new();

    let user = DocumentRequest {
        course: mixed_course(),
        template: TemplateRef::User { id },
        module_index: 0,
        signature: None,
    };
    let document = packager.render_single(&user, &cancel).await.unwrap();
    assert_eq!(document.filename, "Attestato_C-100.docx");

    let system = DocumentRequest {
        template: TemplateRef::System {
            file_type: SystemTemplateType::VerbaleFinale,
        },
        ..user.clone()
    };
    assert!(matches!(
        packager.render_single(&system, &cancel).await,
        Err(PackagingError::Engine(EngineError::NotConfigured(SystemTemplateType::VerbaleFinale)))
    ));

    let missing_module = DocumentRequest {
        module_index: 3,
        ..user.clone()
    };
    assert!(matches!(
        packager.render_single(&missing_module, &cancel).await,
        Err(PackagingError::ModuleNotFound(3))
    ));

    let unknown = DocumentRequest {
        template: TemplateRef::User {
            id: uuid::Uuid::new_v4(),
        },
        ..user
    };
    assert!(matches!(
        packager.render_single(&unknown, &cancel).await,
        Err(PackagingError::TemplateNotFound(_))
    ));
}

#[tokio::test]
async fn test_excel_only_archive() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let output = packager(store, assets.path())
        .build_excel_only(&mixed_course(), &CancellationToken::new())
        .await
        .unwrap();

    let mut names = archive_names(&output.data);
    names.sort();
    assert_eq!(
        names,
        vec![
            "Calendario_Lezioni_C-100.xlsx",
            "Lista_Partecipanti_C-100.xlsx",
            "Registro_Presenze_C-100.xlsx",
            "Report_Completo_C-100.xlsx",
        ]
    );
    assert_eq!(output.filename, "Corso_C-100_Sicurezza_sul_lavoro_Excel.zip");
}

#[tokio::test]
async fn test_multi_module_entry_point_accepts_single_module() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let mut config = ZipConfig::none();
    config.include_excel = true;

    let output = packager(store, assets.path())
        .build_multi_module_package(&request(mixed_course(), config), &CancellationToken::new())
        .await
        .unwrap();

    let names = archive_names(&output.data);
    assert_eq!(names.iter().filter(|n| n.starts_with("01_M1_Modulo_base/Excel/")).count(), 4);
    assert_eq!(names.iter().filter(|n| n.starts_with("Condivisi/")).count(), 2);
    assert_eq!(output.filename, "Corso_C-100_Sicurezza_sul_lavoro.zip");
}

#[tokio::test]
async fn test_user_templates_carry_course_id() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let mut selected = Vec::new();
    for text in ["{CORSO_TITOLO}", "{CORSO_ID}"] {
        let template = UserTemplate::new("Attestato", "", "attestato.docx", docx(text));
        selected.push(template.info.id);
        store.save_user_template(template).await.unwrap();
    }

    let mut req = request(mixed_course(), ZipConfig::none());
    req.selected_templates = selected;
    let output = packager(store, assets.path())
        .build_package(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert!(output.report.failures.is_empty(), "{:?}", output.report.failures);
    assert_eq!(
        archive_names(&output.data),
        vec!["Attestato_C-100.docx", "Attestato_C-100_2.docx"]
    );
}

#[tokio::test]
async fn test_missing_course_data_surfaces_in_report_warnings() {
    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    let mut course = mixed_course();
    course.corso.titolo = String::new();
    course.ente.nome = "  ".to_string();
    let mut config = ZipConfig::none();
    config.include_excel = true;

    let output = packager(store, assets.path())
        .build_package(&request(course, config), &CancellationToken::new())
        .await
        .unwrap();

    let warnings = &output.report.warnings;
    let mentions = |text: &str| warnings.iter().filter(|w| w.contains(text)).count();
    assert_eq!(mentions("Nome dell'ente mancante"), 1, "{:?}", warnings);
    assert_eq!(mentions("Titolo del corso mancante"), 1, "{:?}", warnings);
    assert!(warnings.iter().any(|w| w.starts_with("[corso.titolo]")));
    assert_eq!(archive_names(&output.data).len(), 4);
}

#[tokio::test]
async fn test_modulo8_follows_in_person_numbering() {
    use std::io::Read;

    let assets = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryTemplateStore::new());
    store
        .put_system_template(SystemTemplate::new(
            SystemTemplateType::RegistroGiornaliero,
            docx("Lezione {SESSIONE_NUMERO} del {SESSIONE_DATA}"),
        ))
        .await
        .unwrap();
    let mut config = ZipConfig::none();
    config.include_modulo8 = true;

    let output = packager(store, assets.path())
        .build_package(&request(mixed_course(), config), &CancellationToken::new())
        .await
        .unwrap();

    let entry = "modulo 8/Modulo8_C-100_05-03-2025.docx";
    assert_eq!(archive_names(&output.data), vec![entry]);
    let mut archive = zip::ZipArchive::new(Cursor::new(output.data.as_slice())).unwrap();
    let mut doc = Vec::new();
    archive.by_name(entry).unwrap().read_to_end(&mut doc).unwrap();
    let mut inner = zip::ZipArchive::new(Cursor::new(doc)).unwrap();
    let mut xml = String::new();
    inner.by_name("word/document.xml").unwrap().read_to_string(&mut xml).unwrap();
    // Third session of the module, first one held in person.
    assert!(xml.contains("Lezione 1 del 05/03/2025"), "{}", xml);
}
