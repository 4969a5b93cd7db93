mod common;

use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use corso_docs::packaging::handlers::REPORT_HEADER;
use corso_docs::packaging::{ReportSummary, ZipConfig, REPORT_HEADER_LIMIT};
use corso_docs::templates::{InMemoryTemplateStore, TemplateCatalog, UserTemplateInfo};
use serde_json::{json, Value};

use common::*;

#[cfg(test)]
mod api_tests {
    use super::*;

    const BOUNDARY: &str = "corso-docs-boundary";

    fn multipart_body(filename: &str, data: &[u8], name: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n\
                 --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                b = BOUNDARY,
                name = name,
                filename = filename,
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_upload_then_list_templates() {
        let assets = tempfile::tempdir().unwrap();
        let state = web::Data::new(app_state(Arc::new(InMemoryTemplateStore::new()), assets.path()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(corso_docs::api_config),
        )
        .await;

        let body = multipart_body("attestato.docx", &docx("Attestato {CORSO_TITOLO}"), "Attestato");
        let req = multipart_request("/templates", body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let info: UserTemplateInfo = test::read_body_json(resp).await;
        assert_eq!(info.name, "Attestato");

        let req = test::TestRequest::get().uri("/templates").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let catalog: TemplateCatalog = test::read_body_json(resp).await;
        assert_eq!(catalog.user_templates.len(), 1);
        assert_eq!(catalog.user_templates[0].id, info.id);
        assert!(catalog.system_templates.is_empty());
    }

    #[actix_web::test]
    async fn test_upload_rejects_unknown_tags() {
        let assets = tempfile::tempdir().unwrap();
        let state = web::Data::new(app_state(Arc::new(InMemoryTemplateStore::new()), assets.path()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(corso_docs::api_config),
        )
        .await;

        let body = multipart_body("rotto.docx", &docx("{CAMPO_INESISTENTE}"), "Rotto");
        let resp = test::call_service(&app, multipart_request("/templates", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let error: Value = test::read_body_json(resp).await;
        assert!(error["message"].as_str().unwrap().contains("CAMPO_INESISTENTE"));

        let body = multipart_body("note.txt", b"plain text", "Note");
        let resp = test::call_service(&app, multipart_request("/templates", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_system_slot_upload() {
        let assets = tempfile::tempdir().unwrap();
        let state = web::Data::new(app_state(Arc::new(InMemoryTemplateStore::new()), assets.path()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(corso_docs::api_config),
        )
        .await;

        let body = multipart_body("verbale.docx", &docx("Verbale {CORSO_TITOLO}"), "Verbale");
        let req = multipart_request("/templates/system/verbale_finale", body)
            .method(actix_web::http::Method::PUT)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let body = multipart_body("verbale.docx", &docx("Verbale"), "Verbale");
        let req = multipart_request("/templates/system/non_esiste", body)
            .method(actix_web::http::Method::PUT)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/templates").to_request();
        let catalog: TemplateCatalog = test::call_and_read_body_json(&app, req).await;
        assert_eq!(catalog.system_templates.len(), 1);
    }

    #[actix_web::test]
    async fn test_package_endpoint_returns_zip_and_report() {
        let assets = tempfile::tempdir().unwrap();
        let state = web::Data::new(app_state(Arc::new(InMemoryTemplateStore::new()), assets.path()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(corso_docs::api_config),
        )
        .await;

        let mut config = ZipConfig::none();
        config.include_excel = true;
        config.include_certificates = true;
        let req = test::TestRequest::post()
            .uri("/packages")
            .set_json(json!({ "course": fad_course(), "config": config }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("Corso_C-200_Sicurezza_sul_lavoro.zip"));

        let header = resp.headers().get(REPORT_HEADER).unwrap().to_str().unwrap().to_string();
        assert!(header.len() <= REPORT_HEADER_LIMIT);
        let summary: ReportSummary = serde_json::from_str(&header).unwrap();
        assert_eq!(summary.generated, 4);
        assert!(summary.is_skipped("Certificati"));
        assert!(!summary.truncated);

        let body = test::read_body(resp).await;
        assert_eq!(archive_names(&body).len(), 4);
    }

    #[actix_web::test]
    async fn test_excel_package_and_missing_document_template() {
        let assets = tempfile::tempdir().unwrap();
        let state = web::Data::new(app_state(Arc::new(InMemoryTemplateStore::new()), assets.path()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(corso_docs::api_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/packages/excel")
            .set_json(fad_course())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        assert_eq!(archive_names(&body).len(), 4);

        let req = test::TestRequest::post()
            .uri("/documents")
            .set_json(json!({
                "course": fad_course(),
                "template": { "kind": "system", "file_type": "certificato" }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_course_normalize_and_extract() {
        let assets = tempfile::tempdir().unwrap();
        let state = web::Data::new(app_state(Arc::new(InMemoryTemplateStore::new()), assets.path()));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(corso_docs::api_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/courses/normalize")
            .set_json(json!({
                "corso": { "id": "C-1", "titolo": "Base", "capienza": "12/20" },
                "moduli": [{
                    "id": "M1",
                    "sessioni": [{ "data_completa": "03/03/2025", "ora_inizio": "09:00", "ora_fine": "18:00", "tipo_sede": "Online" }]
                }],
                "partecipanti": [{ "nome": "Mario", "cognome": "Rossi", "codice_fiscale": "RSSMRA" }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["course"]["corso"]["capienza_numero"], 12);
        assert_eq!(body["course"]["corso"]["tipo"], "FAD");
        let session = &body["course"]["moduli"][0]["sessioni"][0];
        assert_eq!(session["is_fad"], true);
        assert_eq!(session["giorno_settimana"], "lunedì");
        assert!(body["warnings"]
            .as_array()
            .unwrap()
            .iter()
            .any(|w| w["field"].as_str().unwrap().contains("codice_fiscale")));

        let req = test::TestRequest::post()
            .uri("/courses/extract")
            .set_json(json!("not an object"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
