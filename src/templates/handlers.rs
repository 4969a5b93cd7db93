use actix_multipart::Multipart;
use actix_web::{
    web::{self, Path},
    HttpResponse, Responder,
};
use log::{error, info, warn};
use serde::Deserialize;
use utoipa::ToSchema;

use super::models::{SystemTemplateType, TemplateCatalog, UserTemplateInfo};
use super::multipart_parser::MultipartParser;
use super::service::{upload_system_template, upload_user_template, UploadError};
use crate::{AppState, ErrorResponse};

#[derive(Deserialize, ToSchema)]
pub struct UploadTemplateRequest {
    #[allow(unused)]
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    #[allow(unused)]
    pub name: Option<String>,
    #[allow(unused)]
    pub category: Option<String>,
}

fn upload_error_response(e: UploadError) -> HttpResponse {
    match e {
        UploadError::Store(store) => {
            error!("Failed to persist template: {}", store);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to save template"))
        }
        UploadError::TooLarge { .. } => {
            HttpResponse::PayloadTooLarge().json(ErrorResponse::bad_request(&e.to_string()))
        }
        UploadError::Invalid(_) => {
            HttpResponse::UnprocessableEntity().json(ErrorResponse::unprocessable(&e.to_string()))
        }
        UploadError::Empty | UploadError::NotDocx(_) => {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    get,
    path = "/templates",
    responses(
        (status = 200, description = "User templates and configured system slots", body = TemplateCatalog),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_templates(data: web::Data<AppState>) -> impl Responder {
    info!("Executing list_templates handler");
    let user_templates = match data.templates.list_user_templates().await {
        Ok(list) => list,
        Err(e) => {
            error!("Failed to list user templates: {}", e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to list templates"));
        }
    };
    let system_templates = match data.templates.configured_system_templates().await {
        Ok(list) => list,
        Err(e) => {
            error!("Failed to list system templates: {}", e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to list templates"));
        }
    };
    HttpResponse::Ok().json(TemplateCatalog {
        user_templates,
        system_templates,
    })
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    post,
    path = "/templates",
    request_body(content = inline(UploadTemplateRequest), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Template validated and stored", body = UserTemplateInfo),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 413, description = "Template too large", body = ErrorResponse),
        (status = 422, description = "Template failed validation", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn upload_template(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    info!("Executing upload_template handler");
    let form = match MultipartParser::parse_template_upload(payload, data.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected template upload: {}", e);
            return HttpResponse::from(e);
        }
    };

    match upload_user_template(
        data.templates.as_ref(),
        &form.name,
        &form.category,
        &form.filename,
        form.data,
        data.max_upload_bytes,
    )
    .await
    {
        Ok(info) => {
            info!("User template {} stored as {}", info.name, info.id);
            HttpResponse::Created().json(info)
        }
        Err(e) => upload_error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Templates",
    put,
    path = "/templates/system/{file_type}",
    request_body(content = inline(UploadTemplateRequest), content_type = "multipart/form-data"),
    params(
        ("file_type" = SystemTemplateType, Path, description = "System template slot")
    ),
    responses(
        (status = 204, description = "System template replaced"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Unknown system template slot", body = ErrorResponse),
        (status = 422, description = "Template failed validation", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn put_system_template(
    path: Path<String>,
    payload: Multipart,
    data: web::Data<AppState>,
) -> impl Responder {
    let file_type = match path.into_inner().parse::<SystemTemplateType>() {
        Ok(t) => t,
        Err(e) => return HttpResponse::NotFound().json(ErrorResponse::not_found(&e.to_string())),
    };
    info!("Executing put_system_template handler for {}", file_type);

    let form = match MultipartParser::parse_template_upload(payload, data.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected system template upload: {}", e);
            return HttpResponse::from(e);
        }
    };

    match upload_system_template(
        data.templates.as_ref(),
        file_type,
        &form.filename,
        form.data,
        data.max_upload_bytes,
    )
    .await
    {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => upload_error_response(e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/templates")
            .route(web::get().to(list_templates))
            .route(web::post().to(upload_template)),
    )
    .service(
        web::resource("/templates/system/{file_type}").route(web::put().to(put_system_template)),
    );
}
