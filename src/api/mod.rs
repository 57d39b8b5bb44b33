pub mod admin;
pub mod analytics;
pub mod auth;
pub mod drafts;
pub mod forms;
pub mod health;
pub mod metrics;
pub mod soap;
pub mod submissions;
pub mod swagger;

use actix_web::web;

use crate::{middleware::AuthMiddleware, utils::AppError};

/// Extractor limits and error bodies: malformed JSON, query strings and
/// path segments answer with the usual `{success:false, message}` body.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg
        // payload JSON limitado (formulários são pequenos)
        .app_data(
            web::JsonConfig::default()
                .limit(256 * 1024)
                .error_handler(|err, _req| AppError::InvalidRequest(format!("Invalid JSON body: {}", err)).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| AppError::InvalidRequest(format!("Invalid query string: {}", err)).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|err, _req| AppError::InvalidRequest(format!("Invalid path: {}", err)).into()),
        );
}

/// Registers every route of the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Metrics
        .route("/metrics", web::get().to(metrics::get_metrics))
        // ==================== PUBLIC FORMS ====================
        .service(
            web::scope("/api/forms/{form_type}")
                .route("/steps", web::get().to(forms::get_steps))
                .route("/validate-step", web::post().to(forms::validate_step))
                .route("/visible-fields", web::post().to(forms::visible_fields))
                .route("/advance", web::post().to(forms::advance))
        )
        .route("/api/submit-form", web::post().to(forms::submit_form))
        .service(
            web::resource("/api/drafts/{draft_id}")
                .route(web::put().to(drafts::save_draft))
                .route(web::get().to(drafts::get_draft))
                .route(web::delete().to(drafts::delete_draft))
        )
        // ==================== AUTH ====================
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .route("/verify", web::get().to(auth::verify_token))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware::authenticated())
                        .route(web::get().to(auth::get_me))
                )
        )
        // ==================== DASHBOARD (JWT) ====================
        .service(
            web::scope("/api/analytics")
                .wrap(AuthMiddleware::authenticated())
                .route("/summary", web::get().to(analytics::get_summary))
                .route("/trends", web::get().to(analytics::get_trends))
                .route("/charts", web::get().to(analytics::get_charts))
                .route("/submissions", web::get().to(analytics::get_submissions))
        )
        .service(
            web::scope("/api/soap")
                .wrap(AuthMiddleware::authenticated())
                .route("/generate", web::post().to(soap::generate))
                .route("/export", web::post().to(soap::export))
        )
        .service(
            web::scope("/api/submissions")
                .wrap(AuthMiddleware::authenticated())
                .route("/{filename}/pdf", web::get().to(submissions::download_pdf))
        )
        // ==================== ADMIN (JWT + role admin) ====================
        .service(
            web::scope("/api/admin")
                .wrap(AuthMiddleware::admin())
                .route("/users", web::get().to(admin::list_users))
                .route("/users/{user_id}/approve", web::post().to(admin::approve_user))
                .route("/users/{user_id}/reject", web::post().to(admin::reject_user))
                .route("/users/{user_id}", web::delete().to(admin::delete_user))
                .route("/update-data", web::post().to(admin::update_data))
                .route("/analytics/refresh", web::post().to(admin::refresh_analytics))
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        database::FileStore,
        middleware::SecurityHeaders,
        services::submission_service::test_support::{feedback_payload, intake_payload},
        state::AppState,
    };
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    async fn state() -> (TempDir, web::Data<AppState>) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let config = AppConfig::for_tests(dir.path());
        (dir, web::Data::new(AppState::new(config, store)))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .wrap(SecurityHeaders)
                    .configure(extractor_config)
                    .configure(configure),
            )
            .await
        };
    }

    macro_rules! register_and_login {
        ($app:expr, $email:expr) => {{
            let creds = json!({ "email": $email, "password": "correct-horse" });
            let req = test::TestRequest::post().uri("/api/auth/register").set_json(&creds).to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);

            let req = test::TestRequest::post().uri("/api/auth/login").set_json(&creds).to_request();
            let body: Value = test::call_and_read_body_json(&$app, req).await;
            body["token"].as_str().unwrap().to_string()
        }};
    }

    #[actix_web::test]
    async fn health_and_security_headers() {
        let (_dir, state) = state().await;
        let app = app!(state);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/forms/intake/steps").to_request()).await;
        assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");
    }

    #[actix_web::test]
    async fn wizard_endpoints() {
        let (_dir, state) = state().await;
        let app = app!(state);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/forms/feedback/steps").to_request(),
        )
        .await;
        assert_eq!(body["steps"].as_array().unwrap().len(), 3);

        let req = test::TestRequest::post()
            .uri("/api/forms/intake/validate-step")
            .set_json(json!({ "step": 1, "data": { "full_name": "Ana" } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valid"], json!(false));

        let req = test::TestRequest::post()
            .uri("/api/forms/intake/advance")
            .set_json(json!({ "step": 1, "data": {} }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["errors"].as_array().unwrap().len(), 4);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/forms/unknown/steps").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn draft_lifecycle() {
        let (_dir, state) = state().await;
        let app = app!(state);

        let req = test::TestRequest::put()
            .uri("/api/drafts/draft-1234")
            .set_json(json!({ "form_type": "intake", "current_step": 2, "data": { "full_name": "Ana" } }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/drafts/draft-1234").to_request()).await;
        assert_eq!(body["current_step"], json!(2));

        let req = test::TestRequest::delete().uri("/api/drafts/draft-1234").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::get().uri("/api/drafts/draft-1234").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn dashboard_requires_token() {
        let (_dir, state) = state().await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/analytics/summary").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/analytics/summary")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn submit_then_read_analytics_and_soap() {
        let (_dir, state) = state().await;
        let app = app!(state);
        let token = register_and_login!(app, "owner@clinic.com");
        let auth = ("Authorization", format!("Bearer {}", token));

        let req = test::TestRequest::post()
            .uri("/api/submit-form")
            .set_json(json!({ "form_type": "intake", "data": intake_payload() }))
            .to_request();
        let intake: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(intake["success"], json!(true));
        let intake_file = intake["filename"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/submit-form")
            .set_json(json!({ "form_type": "feedback", "data": feedback_payload() }))
            .to_request();
        let feedback: Value = test::call_and_read_body_json(&app, req).await;
        let feedback_file = feedback["filename"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/analytics/summary")
            .insert_header(auth.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["summary"]["total_intakes"], json!(1));
        assert_eq!(body["summary"]["total_feedback"], json!(1));
        assert_eq!(body["summary"]["unique_clients"], json!(1));

        let req = test::TestRequest::get()
            .uri("/api/analytics/submissions?form_type=feedback")
            .insert_header(auth.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], json!(1));

        let req = test::TestRequest::post()
            .uri("/api/soap/generate")
            .insert_header(auth.clone())
            .set_json(json!({
                "intake_filename": intake_file,
                "feedback_filename": feedback_file,
                "techniques": ["swedish"]
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["note"]["client_name"], json!("Ana Souza"));

        let req = test::TestRequest::post()
            .uri("/api/soap/export")
            .insert_header(auth.clone())
            .set_json(&body["note"])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "application/pdf");

        let req = test::TestRequest::get()
            .uri(&format!("/api/submissions/{}/pdf", intake_file))
            .insert_header(auth)
            .to_request();
        let bytes = test::call_and_read_body(&app, req).await;
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[actix_web::test]
    async fn admin_routes_need_admin_role() {
        let (_dir, state) = state().await;
        let app = app!(state);
        let admin_token = register_and_login!(app, "owner@clinic.com");
        let admin_auth = ("Authorization", format!("Bearer {}", admin_token));

        // second account waits for approval
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "email": "staff@clinic.com", "password": "correct-horse" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["status"], json!("pending"));
        let staff_id = body["user"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "staff@clinic.com", "password": "correct-horse" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/admin/users?status=pending")
            .insert_header(admin_auth.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], json!(1));

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/users/{}/approve", staff_id))
            .insert_header(admin_auth.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "staff@clinic.com", "password": "correct-horse" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let staff_auth = ("Authorization", format!("Bearer {}", body["token"].as_str().unwrap()));

        let req = test::TestRequest::post()
            .uri("/api/admin/update-data")
            .insert_header(staff_auth.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(staff_auth)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["email"], json!("staff@clinic.com"));

        let req = test::TestRequest::post()
            .uri("/api/admin/update-data")
            .insert_header(admin_auth)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["report"]["intake_count"], json!(0));
    }

    #[actix_web::test]
    async fn auth_rejection_carries_headers_and_json_body() {
        let (_dir, state) = state().await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/analytics/summary").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(resp.headers().get("referrer-policy").unwrap(), "no-referrer");
        assert_eq!(resp.headers().get("cache-control").unwrap(), "no-store");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
    }

    #[actix_web::test]
    async fn bad_query_and_body_answer_with_json() {
        let (_dir, state) = state().await;
        let app = app!(state);
        let token = register_and_login!(app, "owner@clinic.com");
        let auth = ("Authorization", format!("Bearer {}", token));

        for uri in [
            "/api/analytics/trends?period=year",
            "/api/analytics/submissions?limit=abc",
            "/api/admin/users?status=unknown",
        ] {
            let req = test::TestRequest::get().uri(uri).insert_header(auth.clone()).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], json!(false), "{}", uri);
            assert!(body["message"].as_str().unwrap().contains("query"), "{}", uri);
        }

        let req = test::TestRequest::post()
            .uri("/api/forms/intake/validate-step")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], json!(false));
    }

    #[actix_web::test]
    async fn visible_fields_follow_answers() {
        let (_dir, state) = state().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/forms/intake/visible-fields")
            .set_json(json!({ "data": { "has_allergies": "yes" } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let fields = body["visible_fields"].as_array().unwrap();
        assert!(fields.contains(&json!("allergies")));
        assert!(!fields.contains(&json!("medical_conditions")));
    }
}
