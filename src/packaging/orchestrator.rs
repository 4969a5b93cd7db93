//! Packaging runs.
//!
//! A run is a best-effort batch: every document is generated on its own,
//! a failure is logged and recorded in the [`PackageReport`], and the
//! archive is produced with whatever succeeded. Only cancellation and
//! archive serialization abort a run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

use super::bundle::{join, ArchiveBundle};
use super::config::{FolderNames, ZipConfig};
use super::engine::{
    render_system, DocumentEngine, EngineError, EngineInput, ProgrammaticEngine, TemplateEngine,
};
use super::naming::{self, DOCX, XLSX};
use super::report::PackageReport;
use super::PackagingError;
use crate::course::{validate_course, CourseData, Sessione};
use crate::documents::assets::{AssetSource, StampTable};
use crate::documents::workbook::{self, SessionScope};
use crate::documents::{
    map_to_placeholders, render_template, validate_placeholders, DocumentError, GeneratedDocument,
    PlaceholderMap,
};
use crate::templates::{SystemTemplate, SystemTemplateType, TemplateStore};

const USER_TEMPLATES: &str = "Template utente";
const EXCEL: &str = "Excel";
const FAD_REGISTRIES: &str = "Registri FAD";
const CERTIFICATES: &str = "Certificati";
const MODULO5: &str = "Modulo 5";
const MODULO7: &str = "Modulo 7";
const MODULO8: &str = "Modulo 8";
const PAPER_REGISTRY: &str = "Registro cartaceo";
const SHARED: &str = "Condivisi";

/// Body of a packaging request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PackageRequest {
    pub course: CourseData,
    /// User templates to render at the archive root, in order.
    pub selected_templates: Vec<Uuid>,
    pub config: ZipConfig,
    /// Trainer signature as a `data:image/png;base64,...` URL.
    pub signature: Option<String>,
}

/// Which template a single-document request renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateRef {
    User { id: Uuid },
    System { file_type: SystemTemplateType },
}

/// Body of a single-document request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentRequest {
    #[serde(default)]
    pub course: CourseData,
    pub template: TemplateRef,
    #[serde(default)]
    pub module_index: usize,
    #[serde(default)]
    pub signature: Option<String>,
}

/// A finished archive.
#[derive(Debug)]
pub struct PackageOutput {
    pub filename: String,
    pub data: Vec<u8>,
    pub report: PackageReport,
}

pub struct Packager {
    store: Arc<dyn TemplateStore + Send + Sync>,
    template_engine: Arc<dyn DocumentEngine>,
    programmatic_engine: Arc<dyn DocumentEngine>,
}

impl Packager {
    pub fn new(
        store: Arc<dyn TemplateStore + Send + Sync>,
        assets: Arc<dyn AssetSource + Send + Sync>,
        stamps: Arc<StampTable>,
    ) -> Self {
        let template_engine = Arc::new(TemplateEngine::new(store.clone()));
        let programmatic_engine = Arc::new(ProgrammaticEngine::new(assets, stamps));
        Self::with_engines(store, template_engine, programmatic_engine)
    }

    pub fn with_engines(
        store: Arc<dyn TemplateStore + Send + Sync>,
        template_engine: Arc<dyn DocumentEngine>,
        programmatic_engine: Arc<dyn DocumentEngine>,
    ) -> Self {
        Self {
            store,
            template_engine,
            programmatic_engine,
        }
    }

    fn engine(&self, config: &ZipConfig) -> &dyn DocumentEngine {
        if config.use_programmatic_generation {
            self.programmatic_engine.as_ref()
        } else {
            self.template_engine.as_ref()
        }
    }

    /// Build the archive for a course, switching to the per-module layout
    /// when the course has more than one module.
    pub async fn build_package(
        &self,
        request: &PackageRequest,
        cancel: &CancellationToken,
    ) -> Result<PackageOutput, PackagingError> {
        let course = request.course.clone().normalized();
        if course.is_multi_module() {
            return self.build_multi_module(&course, request, cancel).await;
        }

        log::info!(
            "Packaging course {} ({} engine)",
            course.corso.id,
            self.engine(&request.config).name()
        );
        let folders = request.config.folders.sanitized();
        let (mut bundle, mut report) = self
            .module_run(&course, request, &folders, cancel)
            .run(&request.selected_templates)
            .await?;

        record_data_warnings(&mut report, &course);
        self.finish(&course, naming::archive_name(&course), &request.config, &mut bundle, report)
    }

    /// Per-module folders holding independent single-module runs, plus a
    /// shared folder with the participant list and full report computed
    /// across all modules.
    pub async fn build_multi_module_package(
        &self,
        request: &PackageRequest,
        cancel: &CancellationToken,
    ) -> Result<PackageOutput, PackagingError> {
        let course = request.course.clone().normalized();
        self.build_multi_module(&course, request, cancel).await
    }

    async fn build_multi_module(
        &self,
        course: &CourseData,
        request: &PackageRequest,
        cancel: &CancellationToken,
    ) -> Result<PackageOutput, PackagingError> {
        log::info!(
            "Packaging course {} with {} modules ({} engine)",
            course.corso.id,
            course.moduli.len(),
            self.engine(&request.config).name()
        );
        let folders = request.config.folders.sanitized();
        let mut bundle = ArchiveBundle::new();
        let mut report = self.new_report(course, &request.config);

        for (index, modulo) in course.moduli.iter().enumerate() {
            let Some(scoped) = course.scoped_to_module(index) else {
                continue;
            };
            let folder = naming::module_folder(index, modulo);
            let (module_bundle, module_report) = self
                .module_run(&scoped, request, &folders, cancel)
                .run(&request.selected_templates)
                .await?;
            bundle.nest(&folder, module_bundle);
            report.merge(&folder, module_report);
        }

        if request.config.include_excel {
            let shared: [(&str, &dyn Fn() -> Result<Vec<u8>, DocumentError>); 2] = [
                ("Lista_Partecipanti", &|| workbook::participant_list_workbook(course)),
                ("Report_Completo", &|| {
                    workbook::full_report_workbook(course, SessionScope::AllModules)
                }),
            ];
            for (prefix, build) in shared {
                checkpoint(cancel)?;
                let path = join(&folders.shared, &naming::course_document(prefix, course, XLSX));
                match build() {
                    Ok(data) => {
                        let stored = bundle.add(path, data);
                        report.generated(stored);
                    }
                    Err(e) => report.fail(SHARED, prefix, e),
                }
            }
        } else {
            report.skip(SHARED, "fogli Excel non richiesti");
        }

        record_data_warnings(&mut report, course);
        self.finish(course, naming::archive_name(course), &request.config, &mut bundle, report)
    }

    /// Archive with only the four workbooks at its root.
    pub async fn build_excel_only(
        &self,
        course: &CourseData,
        cancel: &CancellationToken,
    ) -> Result<PackageOutput, PackagingError> {
        let course = course.clone().normalized();
        let mut bundle = ArchiveBundle::new();
        let mut report = PackageReport::new(&course.corso.id, &course.corso.titolo, "excel");
        excel_workbooks(&course, SessionScope::AllModules, "", cancel, &mut bundle, &mut report)?;
        record_data_warnings(&mut report, &course);

        let data = bundle.to_zip()?;
        Ok(PackageOutput {
            filename: naming::excel_archive_name(&course),
            data,
            report,
        })
    }

    /// Render one user or system template for one module, without packaging.
    pub async fn render_single(
        &self,
        request: &DocumentRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument, PackagingError> {
        checkpoint(cancel)?;
        let course = request.course.clone().normalized();
        let scoped = if course.moduli.is_empty() {
            course
        } else {
            course
                .scoped_to_module(request.module_index)
                .ok_or(PackagingError::ModuleNotFound(request.module_index))?
        };
        let map = EngineInput::new(&scoped, request.signature.as_deref()).placeholders();

        match &request.template {
            TemplateRef::User { id } => {
                let template = self
                    .store
                    .get_user_template(*id)
                    .await
                    .map_err(EngineError::from)?
                    .ok_or(PackagingError::TemplateNotFound(*id))?;
                let data = render_template(&template.data, &map).map_err(EngineError::from)?;
                Ok(GeneratedDocument::docx(naming::user_template(&template.info, &scoped), data))
            }
            TemplateRef::System { file_type } => {
                let data = render_system(self.store.as_ref(), *file_type, &map).await?;
                Ok(GeneratedDocument::docx(
                    naming::course_document(file_type.as_str(), &scoped, DOCX),
                    data,
                ))
            }
        }
    }

    fn new_report(&self, course: &CourseData, config: &ZipConfig) -> PackageReport {
        PackageReport::new(
            &course.corso.id,
            &course.corso.titolo,
            self.engine(config).name(),
        )
    }

    fn module_run<'a>(
        &'a self,
        course: &'a CourseData,
        request: &'a PackageRequest,
        folders: &'a FolderNames,
        cancel: &'a CancellationToken,
    ) -> ModuleRun<'a> {
        ModuleRun {
            course,
            config: &request.config,
            folders,
            signature: request.signature.as_deref(),
            cancel,
            store: self.store.as_ref(),
            engine: self.engine(&request.config),
            base_map: EngineInput::new(course, request.signature.as_deref()).placeholders(),
            bundle: ArchiveBundle::new(),
            report: self.new_report(course, &request.config),
        }
    }

    fn finish(
        &self,
        course: &CourseData,
        filename: String,
        config: &ZipConfig,
        bundle: &mut ArchiveBundle,
        report: PackageReport,
    ) -> Result<PackageOutput, PackagingError> {
        if config.include_readme {
            report.write_into(bundle)?;
        }
        let data = bundle.to_zip()?;
        log::info!(
            "Course {} packaged: {} documents, {} skipped categories, {} failures",
            course.corso.id,
            report.generated.len(),
            report.skipped.len(),
            report.failures.len()
        );
        Ok(PackageOutput {
            filename,
            data,
            report,
        })
    }
}

/// Course validation plus the warnings of every placeholder map the run
/// builds, one module at a time when there are several.
fn record_data_warnings(report: &mut PackageReport, course: &CourseData) {
    for warning in validate_course(course).into_messages() {
        report.warn("", &warning);
    }
    if !course.is_multi_module() {
        for warning in validate_placeholders(&map_to_placeholders(course, 0)) {
            report.warn("", &warning);
        }
        return;
    }
    for (index, modulo) in course.moduli.iter().enumerate() {
        let Some(scoped) = course.scoped_to_module(index) else {
            continue;
        };
        let folder = naming::module_folder(index, modulo);
        for warning in validate_placeholders(&map_to_placeholders(&scoped, 0)) {
            report.warn(&folder, &warning);
        }
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), PackagingError> {
    if cancel.is_cancelled() {
        log::info!("Packaging run cancelled");
        return Err(PackagingError::Cancelled);
    }
    Ok(())
}

/// Attendance, participant list, calendar and full report under `folder`.
fn excel_workbooks(
    course: &CourseData,
    scope: SessionScope,
    folder: &str,
    cancel: &CancellationToken,
    bundle: &mut ArchiveBundle,
    report: &mut PackageReport,
) -> Result<(), PackagingError> {
    let books: [(&str, &dyn Fn() -> Result<Vec<u8>, DocumentError>); 4] = [
        ("Registro_Presenze", &|| workbook::attendance_workbook(course, scope)),
        ("Lista_Partecipanti", &|| workbook::participant_list_workbook(course)),
        ("Calendario_Lezioni", &|| workbook::calendar_workbook(course, scope)),
        ("Report_Completo", &|| workbook::full_report_workbook(course, scope)),
    ];
    for (prefix, build) in books {
        checkpoint(cancel)?;
        let path = join(folder, &naming::course_document(prefix, course, XLSX));
        match build() {
            Ok(data) => {
                let stored = bundle.add(path, data);
                report.generated(stored);
            }
            Err(e) => report.fail(EXCEL, prefix, e),
        }
    }
    Ok(())
}

/// One single-module pass over every enabled category.
struct ModuleRun<'a> {
    course: &'a CourseData,
    config: &'a ZipConfig,
    folders: &'a FolderNames,
    signature: Option<&'a str>,
    cancel: &'a CancellationToken,
    store: &'a dyn TemplateStore,
    engine: &'a dyn DocumentEngine,
    base_map: PlaceholderMap,
    bundle: ArchiveBundle,
    report: PackageReport,
}

impl<'a> ModuleRun<'a> {
    async fn run(
        mut self,
        selected: &[Uuid],
    ) -> Result<(ArchiveBundle, PackageReport), PackagingError> {
        let config = self.config;

        self.user_templates(selected).await?;
        if config.system(config.include_root_documents) {
            self.root_documents().await?;
        }
        if config.include_excel {
            excel_workbooks(
                self.course,
                SessionScope::Module(0),
                &self.folders.excel,
                self.cancel,
                &mut self.bundle,
                &mut self.report,
            )?;
        }
        if config.system(config.include_fad_registries) {
            self.fad_registries().await?;
        }
        if config.system(config.include_certificates) {
            self.certificates().await?;
        }
        if config.system(config.include_modulo5) {
            self.modulo5().await?;
        }
        if config.system(config.include_modulo7) {
            self.modulo7().await?;
        }
        if config.system(config.include_modulo8) || config.system(config.include_registro_cartaceo) {
            self.modulo8().await?;
        }

        Ok((self.bundle, self.report))
    }

    fn input(&self) -> EngineInput<'a> {
        EngineInput::new(self.course, self.signature)
    }

    fn checkpoint(&self) -> Result<(), PackagingError> {
        checkpoint(self.cancel)
    }

    /// Store a generated document or record why it is missing. Returns
    /// `false` when the category's template slot is empty and the rest of
    /// the category must be skipped.
    fn record(
        &mut self,
        category: &str,
        key: &str,
        path: String,
        result: Result<Vec<u8>, EngineError>,
    ) -> bool {
        match result {
            Ok(data) => {
                let stored = self.bundle.add(path, data);
                self.report.generated(stored);
                true
            }
            Err(EngineError::NotConfigured(slot)) => {
                self.report.skip(category, not_configured(slot));
                false
            }
            Err(e) => {
                self.report.fail(category, key, e);
                true
            }
        }
    }

    async fn load_slot(&mut self, category: &str, slot: SystemTemplateType) -> Option<SystemTemplate> {
        match self.store.get_system_template(slot).await {
            Ok(Some(template)) => Some(template),
            Ok(None) => {
                self.report.skip(category, not_configured(slot));
                None
            }
            Err(e) => {
                self.report.fail(category, slot.as_str(), e);
                None
            }
        }
    }

    fn render_slot(
        &mut self,
        template: &[u8],
        map: &PlaceholderMap,
        category: &str,
        key: &str,
        path: String,
    ) {
        let result = render_template(template, map).map_err(EngineError::from);
        self.record(category, key, path, result);
    }

    async fn user_templates(&mut self, selected: &[Uuid]) -> Result<(), PackagingError> {
        for id in selected {
            self.checkpoint()?;
            let key = id.to_string();
            match self.store.get_user_template(*id).await {
                Ok(Some(template)) => {
                    let path = naming::user_template(&template.info, self.course);
                    let map = self.base_map.clone();
                    self.render_slot(&template.data, &map, USER_TEMPLATES, &key, path);
                }
                Ok(None) => self.report.fail(USER_TEMPLATES, &key, "template non trovato"),
                Err(e) => self.report.fail(USER_TEMPLATES, &key, e),
            }
        }
        Ok(())
    }

    async fn root_documents(&mut self) -> Result<(), PackagingError> {
        let course = self.course;
        let slots = [
            (SystemTemplateType::RegistroDidattico, "Registro_Didattico"),
            (SystemTemplateType::VerbaleAmmissione, "Verbale_Ammissione"),
            (SystemTemplateType::VerbaleScrutinio, "Verbale_Scrutinio"),
        ];
        for (slot, prefix) in slots {
            self.checkpoint()?;
            if let Some(template) = self.load_slot(slot.label(), slot).await {
                let map = self.base_map.clone();
                let path = naming::course_document(prefix, course, DOCX);
                self.render_slot(&template.data, &map, slot.label(), prefix, path);
            }
        }

        self.checkpoint()?;
        let result = self.engine.final_minutes(self.input()).await;
        let path = naming::course_document("Verbale_Finale", course, DOCX);
        self.record(SystemTemplateType::VerbaleFinale.label(), "Verbale_Finale", path, result);
        Ok(())
    }

    async fn fad_registries(&mut self) -> Result<(), PackagingError> {
        let course = self.course;
        let sessions: Vec<&Sessione> = course.all_sessions().filter(|s| s.is_fad).collect();
        if sessions.is_empty() {
            self.report.skip(FAD_REGISTRIES, "nessuna sessione FAD");
            return Ok(());
        }

        self.checkpoint()?;
        let result = self.engine.general_registry(self.input()).await;
        let path = naming::course_document("Registro_Generale_FAD", course, DOCX);
        self.record(SystemTemplateType::ModelloAFad.label(), "Modello A", path, result);

        let folder = self.folders.fad_registries.clone();
        for session in sessions {
            self.checkpoint()?;
            let result = self.engine.daily_registry(self.input(), session).await;
            let path = join(&folder, &naming::session_document("Registro_FAD", course, session));
            if !self.record(FAD_REGISTRIES, &session.data_completa, path, result) {
                break;
            }
        }
        Ok(())
    }

    async fn certificates(&mut self) -> Result<(), PackagingError> {
        let course = self.course;
        if course.partecipanti.is_empty() {
            self.report.skip(CERTIFICATES, "nessun partecipante");
            return Ok(());
        }
        let Some(template) = self.load_slot(CERTIFICATES, SystemTemplateType::Certificato).await else {
            return Ok(());
        };

        let folder = self.folders.certificates.clone();
        for partecipante in &course.partecipanti {
            self.checkpoint()?;
            let map = self.base_map.clone().with_participant(partecipante);
            let path = join(
                &folder,
                &naming::participant_document("Certificato", course, partecipante),
            );
            self.render_slot(
                &template.data,
                &map,
                CERTIFICATES,
                &partecipante.nome_completo(),
                path,
            );
        }
        Ok(())
    }

    async fn modulo5(&mut self) -> Result<(), PackagingError> {
        let course = self.course;
        if !course.has_beneficiari() {
            self.report.skip(MODULO5, "nessun beneficiario");
            return Ok(());
        }

        let folder = self.folders.modulo5.clone();
        for partecipante in course.beneficiari() {
            self.checkpoint()?;
            let result = self.engine.summons(self.input(), partecipante).await;
            let path = join(&folder, &naming::participant_document("Modulo5", course, partecipante));
            if !self.record(MODULO5, &partecipante.nome_completo(), path, result) {
                break;
            }
        }
        Ok(())
    }

    async fn modulo7(&mut self) -> Result<(), PackagingError> {
        let course = self.course;
        if !course.has_beneficiari() {
            self.report.skip(MODULO7, "nessun beneficiario");
            return Ok(());
        }
        if course.all_sessions().next().is_none() {
            self.report.skip(MODULO7, "nessuna sessione");
            return Ok(());
        }

        let folder = self.folders.modulo7.clone();
        'sessions: for session in course.all_sessions() {
            let day_folder = join(&folder, &naming::date_folder(session));
            for partecipante in course.beneficiari() {
                self.checkpoint()?;
                let result = self
                    .engine
                    .event_notice(self.input(), session, partecipante)
                    .await;
                let path = join(
                    &day_folder,
                    &naming::session_participant_document("Modulo7", course, session, partecipante),
                );
                let key = format!("{} {}", session.data_completa, partecipante.nome_completo());
                if !self.record(MODULO7, &key, path, result) {
                    break 'sessions;
                }
            }
        }
        Ok(())
    }

    async fn modulo8(&mut self) -> Result<(), PackagingError> {
        let course = self.course;
        let config = self.config;
        let sessions: Vec<&Sessione> = course
            .moduli
            .iter()
            .flat_map(|m| m.sessioni_presenza.iter())
            .collect();
        if sessions.is_empty() {
            self.report.skip(MODULO8, "nessuna sessione in presenza");
            return Ok(());
        }

        let folder = self.folders.modulo8.clone();
        if config.system(config.include_modulo8) {
            if let Some(template) = self
                .load_slot(MODULO8, SystemTemplateType::RegistroGiornaliero)
                .await
            {
                for session in &sessions {
                    self.checkpoint()?;
                    let map = self.base_map.clone().with_session(session);
                    let path = join(&folder, &naming::session_document("Modulo8", course, session));
                    self.render_slot(&template.data, &map, MODULO8, &session.data_completa, path);
                }
            }
        }

        if config.system(config.include_registro_cartaceo) {
            self.checkpoint()?;
            if let Some(template) = self
                .load_slot(PAPER_REGISTRY, SystemTemplateType::RegistroPresenza)
                .await
            {
                let map = self.base_map.clone();
                let path = join(&folder, &naming::course_document("Registro_Cartaceo", course, DOCX));
                self.render_slot(&template.data, &map, PAPER_REGISTRY, "Registro_Cartaceo", path);
            }
        }
        Ok(())
    }
}

fn not_configured(slot: SystemTemplateType) -> String {
    format!("template di sistema {} non configurato", slot)
}
