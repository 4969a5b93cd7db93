//! Shared application state handed to every handler.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::documents::assets::{AssetSource, FsAssetSource, StampTable};
use crate::packaging::Packager;
use crate::templates::{seed_system_templates, FsTemplateStore, TemplateStore};

#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<dyn TemplateStore + Send + Sync>,
    pub assets: Arc<dyn AssetSource + Send + Sync>,
    pub stamps: Arc<StampTable>,
    pub packager: Arc<Packager>,
    pub max_upload_bytes: usize,
    /// Cancelled on shutdown; every packaging run works on a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        templates: Arc<dyn TemplateStore + Send + Sync>,
        assets: Arc<dyn AssetSource + Send + Sync>,
        stamps: StampTable,
        max_upload_bytes: usize,
    ) -> Self {
        let stamps = Arc::new(stamps);
        let packager = Arc::new(Packager::new(
            templates.clone(),
            assets.clone(),
            stamps.clone(),
        ));
        Self {
            templates,
            assets,
            stamps,
            packager,
            max_upload_bytes,
            shutdown: CancellationToken::new(),
        }
    }

    /// Open the template store, seed empty system slots and load the stamp
    /// table.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store = FsTemplateStore::open(&config.template_dir)
            .await
            .with_context(|| format!("opening template store at {}", config.template_dir.display()))?;

        if let Some(seed_dir) = &config.seed_dir {
            let seeded = seed_system_templates(&store, seed_dir)
                .await
                .with_context(|| format!("seeding system templates from {}", seed_dir.display()))?;
            log::info!("Seeded {} system templates from {}", seeded, seed_dir.display());
        }

        let stamps = match &config.stamp_table {
            Some(path) => StampTable::from_file(path)
                .await
                .with_context(|| format!("loading stamp table {}", path.display()))?,
            None => {
                log::info!("No stamp table configured; documents will carry no stamp");
                StampTable::default()
            }
        };

        Ok(Self::new(
            Arc::new(store),
            Arc::new(FsAssetSource::new(&config.asset_dir)),
            stamps,
            config.max_upload_bytes,
        ))
    }
}
