use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod course;
pub mod documents;
pub mod packaging;
pub mod state;
pub mod templates;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

/// Course payloads carry signature data URLs, well above actix's 32 KiB
/// default JSON limit.
const JSON_LIMIT_BYTES: usize = 8 * 1024 * 1024;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn unprocessable(message: &str) -> Self {
        Self::new("UnprocessableEntity", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::templates::handlers::list_templates,
        crate::templates::handlers::upload_template,
        crate::templates::handlers::put_system_template,
        crate::packaging::handlers::build_package,
        crate::packaging::handlers::build_excel_package,
        crate::packaging::handlers::render_document,
        crate::course::handlers::normalize_course,
        crate::course::handlers::extract_course
    ),
    components(
        schemas(
            templates::models::SystemTemplateType,
            templates::models::UserTemplateInfo,
            templates::models::TemplateCatalog,
            templates::handlers::UploadTemplateRequest,
            packaging::ZipConfig,
            packaging::FolderNames,
            packaging::PackageRequest,
            packaging::DocumentRequest,
            packaging::TemplateRef,
            packaging::PackageReport,
            packaging::ReportSummary,
            packaging::SkippedCategory,
            packaging::DocumentFailure,
            course::handlers::NormalizedCourse,
            course::ValidationWarning,
            course::CourseData,
            course::RawExtraction,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Templates", description = "User and system template management."),
        (name = "Packages", description = "Course document archives and single documents."),
        (name = "Courses", description = "Course data normalization and extraction.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Local server")
    )
)]
pub struct ApiDoc;

/// Register every `/api` route.
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.configure(templates::handlers::config)
        .configure(packaging::handlers::config)
        .configure(course::handlers::config);
}

pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("reading configuration")?;
    let state = AppState::from_config(&config).await?;
    let shutdown = state.shutdown.clone();
    let app_state = web::Data::new(state);

    let prometheus = PrometheusMetricsBuilder::new("corso_docs")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create Prometheus metrics middleware: {}", e))?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested, cancelling running packaging jobs");
            shutdown.cancel();
        }
    });

    log::info!(
        "Starting server at http://{}:{}",
        config.bind_address,
        config.port
    );

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![
                header::CONTENT_DISPOSITION,
                header::HeaderName::from_static("x-package-report"),
            ])
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .app_data(web::JsonConfig::default().limit(JSON_LIMIT_BYTES))
            .service(web::scope("/api").configure(api_config))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
