//! API router.
//!
//! Returns a composable `Router` with all endpoints nested under `/api/`.
//! CORS is permissive — the service fronts a local analyst UI.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router from a pre-constructed context.
pub fn build_router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/health/llm", get(endpoints::health::llm_probe))
        .route("/programs", get(endpoints::programs::list).post(endpoints::programs::create))
        .route(
            "/programs/:id",
            get(endpoints::programs::detail)
                .patch(endpoints::programs::update)
                .delete(endpoints::programs::remove),
        )
        .route("/inputs/program/:id", get(endpoints::inputs::list_for_program))
        .route("/inputs/program/:id/upload", post(endpoints::inputs::upload))
        .route("/inputs/program/:id/manual", post(endpoints::inputs::create_manual))
        .route("/inputs/:id", get(endpoints::inputs::detail).delete(endpoints::inputs::remove))
        .route("/signals", get(endpoints::signals::list))
        .route("/signals/:id", get(endpoints::signals::detail))
        .route("/signals/analyze/input/:id", post(endpoints::signals::analyze_input))
        .route("/signals/analyze/program/:id", post(endpoints::signals::analyze_program))
        .route("/costs/summary", get(endpoints::costs::summary))
        .route("/costs/recent", get(endpoints::costs::recent))
        .route("/overrides", get(endpoints::overrides::list_all))
        .route(
            "/overrides/signal/:id",
            post(endpoints::overrides::create).get(endpoints::overrides::list_for_signal),
        )
        .route("/samples", get(endpoints::samples::list))
        .route("/samples/:program/:file", get(endpoints::samples::content))
        .route("/rag/status", get(endpoints::rag::status))
        .route("/rag/reindex/:program_id", post(endpoints::rag::reindex))
        .route("/rag/clear/:program_id", delete(endpoints::rag::clear))
        .with_state(ctx);

    Router::new().nest("/api", api).layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::db::sqlite::open_memory_database;

    fn test_router() -> Router {
        let conn = open_memory_database().unwrap();
        let ctx = ApiContext::new(Settings::for_tests(), crate::db::shared(conn));
        build_router(ctx)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send_json(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let request = match body {
            Some(value) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => Request::builder().method(method).uri(uri).body(Body::empty()).unwrap(),
        };
        router.clone().oneshot(request).await.unwrap()
    }

    async fn create_program(router: &Router, name: &str) -> String {
        let response = send_json(
            router,
            "POST",
            "/api/programs",
            Some(json!({"name": name, "description": "test program"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    async fn create_manual_input(router: &Router, program_id: &str, content: &str) -> String {
        let response = send_json(
            router,
            "POST",
            &format!("/api/inputs/program/{program_id}/manual"),
            Some(json!({"content": content})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_demo_mode() {
        let response = send_json(&test_router(), "GET", "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llm_mode"], "fallback-demo");
    }

    #[tokio::test]
    async fn llm_probe_reports_not_configured() {
        let response = send_json(&test_router(), "GET", "/api/health/llm", None).await;
        let body = json_body(response).await;
        assert_eq!(body["connected"], false);
        assert_eq!(body["status"], "not-configured");
    }

    #[tokio::test]
    async fn program_crud_round_trip() {
        let router = test_router();
        let id = create_program(&router, "Apollo").await;

        let response = send_json(&router, "GET", &format!("/api/programs/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["name"], "Apollo");
        assert_eq!(body["input_count"], 0);

        let response = send_json(
            &router,
            "PATCH",
            &format!("/api/programs/{id}"),
            Some(json!({"status": "archived"})),
        )
        .await;
        assert_eq!(json_body(response).await["status"], "archived");

        let response = send_json(&router, "DELETE", &format!("/api/programs/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send_json(&router, "GET", &format!("/api/programs/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn manual_input_is_normalized_on_ingestion() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;
        let input_id =
            create_manual_input(&router, &program_id, "Analyst observation: spend is stable").await;

        let response = send_json(&router, "GET", &format!("/api/inputs/{input_id}"), None).await;
        let body = json_body(response).await;
        assert_eq!(body["format"], "manual");
        assert_eq!(body["status"], "processed");
        assert_eq!(body["metadata"]["content_type"], "analyst_input");
    }

    #[tokio::test]
    async fn analyze_input_produces_signal_and_cost() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;
        let input_id = create_manual_input(
            &router,
            &program_id,
            "CRITICAL: major schedule delay, blocked on vendor approval",
        )
        .await;

        let response = send_json(
            &router,
            "POST",
            &format!("/api/signals/analyze/input/{input_id}"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["signals_generated"], 1);
        let signal = &body["signals"][0];
        assert_eq!(signal["signal_type"], "delivery_risk");
        assert_eq!(signal["signal_value"], "HIGH");
        assert_eq!(signal["status"], "active");
        // Fallback generations cost nothing
        assert_eq!(body["total_cost_usd"], 0.0);
        assert_eq!(signal["cost_metric"]["model_name"], "fallback-rule-based");
    }

    #[tokio::test]
    async fn analyze_missing_input_is_404() {
        let router = test_router();
        let response = send_json(
            &router,
            "POST",
            &format!("/api/signals/analyze/input/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analyze_program_covers_all_inputs() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;
        create_manual_input(&router, &program_id, "delay on milestone one").await;
        create_manual_input(&router, &program_id, "all quiet this week").await;

        let response = send_json(
            &router,
            "POST",
            &format!("/api/signals/analyze/program/{program_id}"),
            None,
        )
        .await;
        let body = json_body(response).await;
        assert_eq!(body["signals_generated"], 2);

        let response = send_json(
            &router,
            "GET",
            &format!("/api/signals?program_id={program_id}"),
            None,
        )
        .await;
        assert_eq!(json_body(response).await["total"], 2);
    }

    #[tokio::test]
    async fn override_flow_enforces_justification_and_flips_status() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;
        let input_id = create_manual_input(&router, &program_id, "minor delay reported").await;

        let response = send_json(
            &router,
            "POST",
            &format!("/api/signals/analyze/input/{input_id}"),
            None,
        )
        .await;
        let signal_id = json_body(response).await["signals"][0]["id"]
            .as_str()
            .unwrap()
            .to_string();

        // Too-short justification is rejected
        let response = send_json(
            &router,
            "POST",
            &format!("/api/overrides/signal/{signal_id}"),
            Some(json!({"override_value": "LOW", "justification": "short", "analyst_name": "J. Okafor"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send_json(
            &router,
            "POST",
            &format!("/api/overrides/signal/{signal_id}"),
            Some(json!({
                "override_value": "LOW",
                "justification": "Vendor blocker resolved during the review call.",
                "analyst_name": "J. Okafor"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response =
            send_json(&router, "GET", &format!("/api/signals/{signal_id}"), None).await;
        let body = json_body(response).await;
        assert_eq!(body["status"], "overridden");
        assert_eq!(body["current_override"]["override_value"], "LOW");
    }

    #[tokio::test]
    async fn cost_summary_reflects_generated_signals() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;
        let input_id = create_manual_input(&router, &program_id, "watching two risks").await;
        send_json(&router, "POST", &format!("/api/signals/analyze/input/{input_id}"), None).await;

        let response = send_json(&router, "GET", "/api/costs/summary", None).await;
        let body = json_body(response).await;
        assert_eq!(body["total_signals"], 1);
        assert_eq!(body["total_cost_usd"], 0.0);
        assert!(body["model_breakdown"]
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m["model_name"] == "fallback-rule-based"));
    }

    #[tokio::test]
    async fn rag_status_and_reindex() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;
        create_manual_input(
            &router,
            &program_id,
            "The vendor delay is blocking milestone three and schedule risk is rising.",
        )
        .await;

        let response = send_json(&router, "GET", "/api/rag/status", None).await;
        let body = json_body(response).await;
        assert_eq!(body["status"], "available");
        // Ingestion indexed the input
        assert!(body["total_chunks"].as_i64().unwrap() >= 1);

        let response = send_json(
            &router,
            "POST",
            &format!("/api/rag/reindex/{program_id}"),
            None,
        )
        .await;
        let body = json_body(response).await;
        assert_eq!(body["inputs_processed"], 1);

        let response = send_json(
            &router,
            "DELETE",
            &format!("/api/rag/clear/{program_id}"),
            None,
        )
        .await;
        assert!(json_body(response).await["chunks_removed"].as_i64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn unsupported_upload_extension_is_rejected() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;

        let boundary = "X-SEMAPHORE-TEST";
        let multipart_body = format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"report.docx\"\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/inputs/program/{program_id}/upload"))
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(multipart_body))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn csv_upload_is_classified_and_analyzable() {
        let router = test_router();
        let program_id = create_program(&router, "Apollo").await;

        let csv = "risk,owner,severity\nvendor delay,PMO,high\nscope change,CO,medium";
        let boundary = "X-SEMAPHORE-TEST";
        let multipart_body = format!(
            "--{boundary}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"risk_register.csv\"\r\n\r\n{csv}\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/inputs/program/{program_id}/upload"))
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(multipart_body))
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["format"], "csv");
        assert_eq!(body["metadata"]["content_type"], "risk_register");
        assert!(body["normalized_content"]
            .as_str()
            .unwrap()
            .starts_with("Row 1: risk: vendor delay"));
    }
}
