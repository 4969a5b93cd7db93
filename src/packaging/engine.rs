//! Two interchangeable ways of producing the layout-heavy documents.
//!
//! [`TemplateEngine`] fills the configured system templates,
//! [`ProgrammaticEngine`] builds the same documents from code. The
//! orchestrator only sees [`DocumentEngine`], so both land under the same
//! folders and names.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::course::{CourseData, Partecipante, Sessione};
use crate::documents::assets::{AssetSource, StampTable};
use crate::documents::builders::{self, BuilderAssets};
use crate::documents::{map_to_placeholders, render_template, DocumentError, PlaceholderMap};
use crate::templates::{StoreError, SystemTemplateType, TemplateStore};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("system template {0} is not configured")]
    NotConfigured(SystemTemplateType),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// What every engine call works on.
#[derive(Debug, Clone, Copy)]
pub struct EngineInput<'a> {
    pub course: &'a CourseData,
    /// Trainer signature as a data URL.
    pub signature: Option<&'a str>,
}

impl<'a> EngineInput<'a> {
    pub fn new(course: &'a CourseData, signature: Option<&'a str>) -> Self {
        Self { course, signature }
    }

    /// Signature to embed, honouring the course's `include_firma` switch.
    fn effective_signature(&self) -> Option<&'a str> {
        if self.course.fad_settings.include_firma {
            self.signature
        } else {
            None
        }
    }

    /// Placeholder map of the first module with the signature applied.
    pub fn placeholders(&self) -> PlaceholderMap {
        map_to_placeholders(self.course, 0).with_signature(self.effective_signature())
    }
}

#[async_trait]
pub trait DocumentEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Modello A.
    async fn general_registry(&self, input: EngineInput<'_>) -> Result<Vec<u8>, EngineError>;

    /// Modello B for one FAD session.
    async fn daily_registry(
        &self,
        input: EngineInput<'_>,
        session: &Sessione,
    ) -> Result<Vec<u8>, EngineError>;

    async fn final_minutes(&self, input: EngineInput<'_>) -> Result<Vec<u8>, EngineError>;

    /// Modulo 5: conditionality calendar for one beneficiary.
    async fn summons(
        &self,
        input: EngineInput<'_>,
        partecipante: &Partecipante,
    ) -> Result<Vec<u8>, EngineError>;

    /// Modulo 7: event communication for one session and beneficiary.
    async fn event_notice(
        &self,
        input: EngineInput<'_>,
        session: &Sessione,
        partecipante: &Partecipante,
    ) -> Result<Vec<u8>, EngineError>;
}

/// Render a system template slot with a prepared placeholder map.
pub(crate) async fn render_system(
    store: &dyn TemplateStore,
    file_type: SystemTemplateType,
    map: &PlaceholderMap,
) -> Result<Vec<u8>, EngineError> {
    let template = store
        .get_system_template(file_type)
        .await?
        .ok_or(EngineError::NotConfigured(file_type))?;
    Ok(render_template(&template.data, map)?)
}

/// Fills the system templates configured in the store.
pub struct TemplateEngine {
    store: Arc<dyn TemplateStore + Send + Sync>,
}

impl TemplateEngine {
    pub fn new(store: Arc<dyn TemplateStore + Send + Sync>) -> Self {
        Self { store }
    }

    async fn render(
        &self,
        file_type: SystemTemplateType,
        map: PlaceholderMap,
    ) -> Result<Vec<u8>, EngineError> {
        render_system(self.store.as_ref(), file_type, &map).await
    }
}

#[async_trait]
impl DocumentEngine for TemplateEngine {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn general_registry(&self, input: EngineInput<'_>) -> Result<Vec<u8>, EngineError> {
        self.render(SystemTemplateType::ModelloAFad, input.placeholders()).await
    }

    async fn daily_registry(
        &self,
        input: EngineInput<'_>,
        session: &Sessione,
    ) -> Result<Vec<u8>, EngineError> {
        let map = input.placeholders().with_session(session);
        self.render(SystemTemplateType::ModelloBFad, map).await
    }

    async fn final_minutes(&self, input: EngineInput<'_>) -> Result<Vec<u8>, EngineError> {
        self.render(SystemTemplateType::VerbaleFinale, input.placeholders()).await
    }

    async fn summons(
        &self,
        input: EngineInput<'_>,
        partecipante: &Partecipante,
    ) -> Result<Vec<u8>, EngineError> {
        let map = input.placeholders().with_participant(partecipante);
        self.render(SystemTemplateType::CalendarioCondizionalita, map).await
    }

    async fn event_notice(
        &self,
        input: EngineInput<'_>,
        session: &Sessione,
        partecipante: &Partecipante,
    ) -> Result<Vec<u8>, EngineError> {
        let map = input
            .placeholders()
            .with_session(session)
            .with_participant(partecipante);
        self.render(SystemTemplateType::ComunicazioneEvento, map).await
    }
}

/// Builds the documents from code, loading logo, stamp and signature for
/// every call.
pub struct ProgrammaticEngine {
    assets: Arc<dyn AssetSource + Send + Sync>,
    stamps: Arc<StampTable>,
}

impl ProgrammaticEngine {
    pub fn new(assets: Arc<dyn AssetSource + Send + Sync>, stamps: Arc<StampTable>) -> Self {
        Self { assets, stamps }
    }

    async fn assets(&self, input: &EngineInput<'_>) -> BuilderAssets {
        BuilderAssets::load(
            self.assets.as_ref(),
            &self.stamps,
            input.course,
            input.signature,
        )
        .await
    }
}

#[async_trait]
impl DocumentEngine for ProgrammaticEngine {
    fn name(&self) -> &'static str {
        "programmatic"
    }

    async fn general_registry(&self, input: EngineInput<'_>) -> Result<Vec<u8>, EngineError> {
        let assets = self.assets(&input).await;
        Ok(builders::build_general_registry(input.course, &assets)?)
    }

    async fn daily_registry(
        &self,
        input: EngineInput<'_>,
        session: &Sessione,
    ) -> Result<Vec<u8>, EngineError> {
        let assets = self.assets(&input).await;
        Ok(builders::build_daily_registry(input.course, session, &assets)?)
    }

    async fn final_minutes(&self, input: EngineInput<'_>) -> Result<Vec<u8>, EngineError> {
        let assets = self.assets(&input).await;
        Ok(builders::build_final_minutes(input.course, &assets)?)
    }

    async fn summons(
        &self,
        input: EngineInput<'_>,
        partecipante: &Partecipante,
    ) -> Result<Vec<u8>, EngineError> {
        let assets = self.assets(&input).await;
        Ok(builders::build_summons(input.course, partecipante, &assets)?)
    }

    async fn event_notice(
        &self,
        input: EngineInput<'_>,
        session: &Sessione,
        partecipante: &Partecipante,
    ) -> Result<Vec<u8>, EngineError> {
        let assets = self.assets(&input).await;
        Ok(builders::build_event_notice(
            input.course,
            session,
            partecipante,
            &assets,
        )?)
    }
}
