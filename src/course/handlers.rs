use actix_web::{web, HttpResponse, Responder};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::extraction::RawExtraction;
use super::model::CourseData;
use super::validation::{validate_course, ValidationWarning};
use crate::ErrorResponse;

/// A normalized course plus the data problems found in it.
#[derive(Debug, Serialize, ToSchema)]
pub struct NormalizedCourse {
    pub course: CourseData,
    pub warnings: Vec<ValidationWarning>,
}

impl NormalizedCourse {
    fn from_course(course: CourseData) -> Self {
        let warnings = validate_course(&course).iter().cloned().collect::<Vec<_>>();
        if !warnings.is_empty() {
            info!(
                "Course {} has {} data warnings",
                course.corso.id,
                warnings.len()
            );
        }
        Self { course, warnings }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Courses",
    post,
    path = "/courses/normalize",
    request_body(content = CourseData, content_type = "application/json"),
    responses(
        (status = 200, description = "Course with derived fields filled in", body = NormalizedCourse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
pub async fn normalize_course(course: web::Json<CourseData>) -> impl Responder {
    info!("Executing normalize_course handler");
    let course = course.into_inner().normalized();
    HttpResponse::Ok().json(NormalizedCourse::from_course(course))
}

#[utoipa::path(
    context_path = "/api",
    tag = "Courses",
    post,
    path = "/courses/extract",
    request_body(content = RawExtraction, content_type = "application/json"),
    responses(
        (status = 200, description = "Course initialized from a raw extraction", body = NormalizedCourse),
        (status = 400, description = "Extraction could not be read", body = ErrorResponse)
    )
)]
pub async fn extract_course(raw: web::Json<Value>) -> impl Responder {
    info!("Executing extract_course handler");
    match CourseData::from_extraction_json(raw.into_inner()) {
        Ok(course) => HttpResponse::Ok().json(NormalizedCourse::from_course(course)),
        Err(e) => {
            warn!("Rejected extraction payload: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&format!(
                "Invalid extraction payload: {}",
                e
            )))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/courses/normalize").route(web::post().to(normalize_course)))
        .service(web::resource("/courses/extract").route(web::post().to(extract_course)));
}
