use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use attendance_payroll::config::Config;
use attendance_payroll::database::models::UserProfile;
use attendance_payroll::middleware::{CORRELATION_HEADER, RequestIdMiddleware};
use attendance_payroll::services::FileStorage;
use attendance_payroll::{AppState, Repositories, routes};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;

use common::{TestContext, date};

// A second AppState over the same store, so the HTTP layer and the test see the same data
fn app_data(ctx: &TestContext) -> (web::Data<AppState>, web::Data<Config>) {
    let storage: Arc<dyn FileStorage> = ctx.storage.clone();
    let state = AppState::new(
        Repositories::in_memory(ctx.store.clone()),
        storage,
        &ctx.config,
    );
    (web::Data::new(state), web::Data::new(ctx.config.clone()))
}

macro_rules! init_app {
    ($ctx:expr) => {{
        let (state, config) = app_data(&$ctx);
        test::init_service(
            App::new()
                .app_data(state)
                .app_data(config)
                .wrap(RequestIdMiddleware)
                .configure(routes::configure),
        )
        .await
    }};
}

fn bearer(ctx: &TestContext, user: &UserProfile) -> (&'static str, String) {
    let token = ctx.state.auth_service.generate_token(user).unwrap();
    ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_requests_without_a_valid_token_are_unauthorized() {
    let ctx = TestContext::new().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/api/v1/violations").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/violations")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Signed correctly, but unknown to the directory
    let stranger = UserProfile {
        id: uuid::Uuid::new_v4(),
        full_name: "Nobody".to_string(),
        email: "nobody@example.com".to_string(),
        department: None,
        role: Default::default(),
        eligible_for_shift_work: false,
    };
    let req = test::TestRequest::get()
        .uri("/api/v1/violations")
        .insert_header(bearer(&ctx, &stranger))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_correlation_id_is_echoed() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/v1/violations/dashboard")
        .insert_header(bearer(&ctx, &employee))
        .insert_header((CORRELATION_HEADER, "trace-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(CORRELATION_HEADER).unwrap(),
        "trace-123"
    );
}

#[actix_web::test]
async fn test_clock_in_and_out() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(bearer(&ctx, &employee))
        .set_json(json!({ "at": "2024-03-04T08:02:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["userId"], employee.id.to_string());
    assert_eq!(body["data"]["logDate"], "2024-03-04");

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(bearer(&ctx, &employee))
        .set_json(json!({ "at": "2024-03-04T09:00:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-out")
        .insert_header(bearer(&ctx, &employee))
        .set_json(json!({ "at": "2024-03-04T17:05:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["checkOut"], "2024-03-04T17:05:00");
}

#[actix_web::test]
async fn test_detection_is_manager_only() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let shift = ctx.shift("08:00", "17:00").await;
    ctx.assign(&employee, &shift, date(2024, 3, 4)).await;
    ctx.attendance(&employee, date(2024, 3, 4), Some("08:50"), Some("17:00"))
        .await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/v1/detection/run?date=2024-03-04")
        .insert_header(bearer(&ctx, &employee))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    let req = test::TestRequest::post()
        .uri("/api/v1/detection/run?date=2024-03-04")
        .insert_header(bearer(&ctx, &manager))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["lateArrivals"], 1);
    assert_eq!(body["data"]["totalViolationsDetected"], 1);
}

#[actix_web::test]
async fn test_submit_explanation_with_inline_evidence() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;
    let app = init_app!(ctx);
    let uri = format!("/api/v1/violations/{}/explanations", violation.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(bearer(&ctx, &employee))
        .set_json(json!({
            "explanationText": "My train was cancelled this morning",
            "files": [{
                "fileName": "notice.pdf",
                "contentType": "application/pdf",
                "contentBase64": "%%%"
            }]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(bearer(&ctx, &employee))
        .set_json(json!({
            "explanationText": "My train was cancelled this morning",
            "files": [{
                "fileName": "notice.pdf",
                "contentType": "application/pdf",
                "contentBase64": STANDARD.encode(b"%PDF-1.4 cancelled service notice")
            }]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["explanation"]["status"], "submitted");
    assert_eq!(body["data"]["evidence"][0]["originalFilename"], "notice.pdf");
    assert_eq!(body["data"]["evidence"][0]["kind"], "document");
    assert_eq!(ctx.storage.file_count().await, 1);
}

#[actix_web::test]
async fn test_payroll_endpoints() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    ctx.salary_structure(&employee, "10000000", date(2024, 1, 1), &manager)
        .await;
    let app = init_app!(ctx);

    let payload = json!({ "userId": employee.id, "year": 2024, "month": 3 });
    let req = test::TestRequest::post()
        .uri("/api/v1/payrolls/calculate")
        .insert_header(bearer(&ctx, &employee))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/v1/payrolls/calculate")
        .insert_header(bearer(&ctx, &manager))
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "calculated");
    assert_eq!(body["data"]["totalWorkingDays"], 21);

    let req = test::TestRequest::get()
        .uri("/api/v1/payrolls/trends?year=2024&month=3&months=30")
        .insert_header(bearer(&ctx, &manager))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/v1/payrolls/statistics?year=2024&month=13")
        .insert_header(bearer(&ctx, &manager))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
