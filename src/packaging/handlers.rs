use actix_web::{http::header::ContentDisposition, web, HttpResponse, Responder};
use log::{error, info, warn};

use super::orchestrator::{DocumentRequest, PackageOutput, PackageRequest};
use super::PackagingError;
use crate::course::CourseData;
use crate::{AppState, ErrorResponse};

/// Header carrying the JSON [`super::ReportSummary`] of a run. The full
/// report is the archive's `metadata.json` when requested.
pub const REPORT_HEADER: &str = "X-Package-Report";

fn packaging_error_response(e: PackagingError) -> HttpResponse {
    match e {
        PackagingError::TemplateNotFound(_) | PackagingError::ModuleNotFound(_) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&e.to_string()))
        }
        PackagingError::Engine(super::EngineError::NotConfigured(_)) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&e.to_string()))
        }
        PackagingError::Engine(super::EngineError::Document(_)) => {
            warn!("Document rendering failed: {}", e);
            HttpResponse::UnprocessableEntity().json(ErrorResponse::unprocessable(&e.to_string()))
        }
        PackagingError::Cancelled => HttpResponse::ServiceUnavailable()
            .json(ErrorResponse::new("Cancelled", "The server is shutting down")),
        _ => {
            error!("Packaging failed: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to build the archive"))
        }
    }
}

fn zip_response(output: PackageOutput) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    response
        .content_type("application/zip")
        .insert_header(ContentDisposition::attachment(output.filename));
    match output.report.header_value() {
        Ok(report) => {
            response.insert_header((REPORT_HEADER, report));
        }
        Err(e) => warn!("Could not attach package report: {}", e),
    }
    response.body(output.data)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Packages",
    post,
    path = "/packages",
    request_body(content = PackageRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "ZIP archive; the run summary is in the X-Package-Report header", content_type = "application/zip"),
        (status = 503, description = "Run cancelled", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn build_package(
    data: web::Data<AppState>,
    request: web::Json<PackageRequest>,
) -> impl Responder {
    info!(
        "Executing build_package handler for course {}",
        request.course.corso.id
    );
    let cancel = data.shutdown.child_token();
    match data.packager.build_package(&request, &cancel).await {
        Ok(output) => zip_response(output),
        Err(e) => packaging_error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Packages",
    post,
    path = "/packages/excel",
    request_body(content = CourseData, content_type = "application/json"),
    responses(
        (status = 200, description = "ZIP archive with the four workbooks", content_type = "application/zip"),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn build_excel_package(
    data: web::Data<AppState>,
    course: web::Json<CourseData>,
) -> impl Responder {
    info!(
        "Executing build_excel_package handler for course {}",
        course.corso.id
    );
    let cancel = data.shutdown.child_token();
    match data.packager.build_excel_only(&course, &cancel).await {
        Ok(output) => zip_response(output),
        Err(e) => packaging_error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Packages",
    post,
    path = "/documents",
    request_body(content = DocumentRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Rendered Word document", content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 404, description = "Template, slot or module not found", body = ErrorResponse),
        (status = 422, description = "Template could not be rendered", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn render_document(
    data: web::Data<AppState>,
    request: web::Json<DocumentRequest>,
) -> impl Responder {
    info!("Executing render_document handler");
    let cancel = data.shutdown.child_token();
    match data.packager.render_single(&request, &cancel).await {
        Ok(document) => HttpResponse::Ok()
            .content_type(document.mime_type)
            .insert_header(ContentDisposition::attachment(document.filename))
            .body(document.data),
        Err(e) => packaging_error_response(e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/packages").route(web::post().to(build_package)))
        .service(web::resource("/packages/excel").route(web::post().to(build_excel_package)))
        .service(web::resource("/documents").route(web::post().to(render_document)));
}
