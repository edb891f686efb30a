pub mod auth;
pub mod config;
pub mod routes;
pub mod services;

use axum::middleware::from_fn;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cheheom_shared::clients::kv::KvStore;
use cheheom_shared::middleware::metrics_middleware;

use config::AppConfig;
use routes::{applications, auth as auth_routes, favorites, health, notifications, products, reviews};

pub struct AppState {
    pub config: AppConfig,
    pub store: KvStore,
    /// Absent when another recorder already owns the process (tests).
    pub metrics_handle: Option<PrometheusHandle>,
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/signup", post(auth_routes::signup))
        .route("/signin", post(auth_routes::signin))
        .route("/profile", get(auth_routes::profile))
        .route("/products", post(products::create_product).get(products::list_products))
        .route(
            "/applications",
            post(applications::create_application).get(applications::list_applications),
        )
        .route(
            "/applications/:id",
            put(applications::update_application).delete(applications::delete_application),
        )
        .route("/business/applications", get(applications::list_business_applications))
        .route("/favorites", post(favorites::update_favorite).get(favorites::list_favorites))
        .route("/reviews", post(reviews::create_review).get(reviews::list_reviews))
        .route("/reviews/:id", put(reviews::update_review))
        .route(
            "/notifications",
            post(notifications::create_notification).get(notifications::list_notifications),
        )
        .route("/notifications/:id", put(notifications::mark_notification_read))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let base = state.config.normalized_base_path();
    let api = api_routes();

    let mut app = Router::new();
    if base.is_empty() {
        app = app.merge(api);
    } else {
        app = app.nest(&base, api.clone());
        if state.config.serve_legacy_prefix {
            app = app.nest(&format!("{base}{base}"), api);
        }
    }

    app.route("/metrics", get(health::metrics))
        .layer(from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(config: AppConfig) -> Router {
        build_router(Arc::new(AppState {
            config,
            store: KvStore::memory(),
            metrics_handle: None,
        }))
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn signup_body(email: &str, user_type: &str) -> Value {
        json!({
            "email": email,
            "password": "secret1",
            "name": "테스터",
            "phone": "010-0000-0000",
            "userType": user_type,
        })
    }

    async fn signed_in(app: &Router, email: &str, user_type: &str) -> String {
        let (status, _) = send(app, "POST", "/api/signup", None, Some(signup_body(email, user_type))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(
            app,
            "POST",
            "/api/signin",
            None,
            Some(json!({"email": email, "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["accessToken"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_mounted_under_base_path() {
        let app = app(AppConfig::default());
        let (status, body) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, _) = send(&app, "GET", "/api/api/health", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn legacy_prefix_is_served_when_enabled() {
        let app = app(AppConfig { serve_legacy_prefix: true, ..AppConfig::default() });
        let (status, _) = send(&app, "GET", "/api/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn signup_rejects_missing_fields_and_duplicates() {
        let app = app(AppConfig::default());
        let (status, body) = send(&app, "POST", "/api/signup", None, Some(json!({"email": "a@b.com"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = send(&app, "POST", "/api/signup", None, Some(signup_body("a@b.com", "reviewer"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "a@b.com");

        let (status, body) = send(&app, "POST", "/api/signup", None, Some(signup_body("a@b.com", "reviewer"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "E1002");
    }

    #[tokio::test]
    async fn signin_and_profile() {
        let app = app(AppConfig::default());
        let token = signed_in(&app, "a@b.com", "reviewer").await;

        let (status, body) = send(&app, "GET", "/api/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["userType"], "reviewer");

        let (status, _) = send(&app, "GET", "/api/profile", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            "POST",
            "/api/signin",
            None,
            Some(json!({"email": "a@b.com", "password": "wrong-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid email or password");
    }

    #[tokio::test]
    async fn application_flow_updates_product_counters() {
        let app = app(AppConfig::default());
        let business = signed_in(&app, "owner@b.com", "business").await;
        let reviewer = signed_in(&app, "reviewer@b.com", "reviewer").await;

        let product = json!({
            "id": "p1",
            "name": "김치찌개",
            "seller": "동네식당",
            "category": "한식",
            "location": "서울",
            "image": "https://example.com/a.jpg",
            "description": "맛집",
            "applicationDeadline": "12.20(금) - 12.25(수)",
            "requiredReviewers": 5
        });
        let (status, _) = send(&app, "POST", "/api/products", Some(&reviewer), Some(product.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, "POST", "/api/products", Some(&business), Some(product)).await;
        assert_eq!(status, StatusCode::OK);

        let application = json!({
            "id": "a1",
            "productId": "p1",
            "productName": "김치찌개",
            "productImage": "https://example.com/a.jpg",
            "userId": "whoever",
            "userName": "김리뷰",
            "userEmail": "reviewer@b.com",
            "userPhone": "010-0000-0000",
            "userLevel": 1,
            "status": "pending",
            "appliedAt": "2024-12-01T10:00:00Z"
        });
        let (status, _) = send(&app, "POST", "/api/applications", Some(&reviewer), Some(application)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/api/products", Some(&business), None).await;
        assert_eq!(body["products"][0]["currentApplicants"], 1);

        let (_, body) = send(&app, "GET", "/api/business/applications?productId=p1", Some(&business), None).await;
        assert_eq!(body["applications"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "PUT",
            "/api/applications/a1",
            Some(&business),
            Some(json!({"status": "accepted"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["application"]["status"], "accepted");

        let (status, body) = send(&app, "DELETE", "/api/applications/a1", Some(&reviewer), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "E3002");
    }

    #[tokio::test]
    async fn notifications_reach_the_target_user() {
        let app = app(AppConfig::default());
        let business = signed_in(&app, "owner@b.com", "business").await;
        let reviewer = signed_in(&app, "reviewer@b.com", "reviewer").await;

        let (_, profile) = send(&app, "GET", "/api/profile", Some(&reviewer), None).await;
        let reviewer_id = profile["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            "/api/notifications",
            Some(&business),
            Some(json!({
                "id": "n1",
                "type": "selection",
                "title": "체험단에 선정되었습니다!",
                "message": "축하합니다",
                "createdAt": "2024-12-01T10:00:00Z",
                "read": false,
                "targetUserId": reviewer_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/api/notifications", Some(&reviewer), None).await;
        assert_eq!(body["notifications"][0]["id"], "n1");

        let (status, body) = send(&app, "PUT", "/api/notifications/n1", Some(&reviewer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notification"]["read"], true);

        let (status, _) = send(&app, "PUT", "/api/notifications/n1", Some(&business), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn favorites_round_trip() {
        let app = app(AppConfig::default());
        let reviewer = signed_in(&app, "reviewer@b.com", "reviewer").await;

        send(&app, "POST", "/api/favorites", Some(&reviewer), Some(json!({"productId": "p1", "action": "add"}))).await;
        let (_, body) = send(
            &app,
            "POST",
            "/api/favorites",
            Some(&reviewer),
            Some(json!({"productId": "p2", "action": "add"})),
        )
        .await;
        assert_eq!(body["favorites"], json!(["p1", "p2"]));

        send(&app, "POST", "/api/favorites", Some(&reviewer), Some(json!({"productId": "p1", "action": "remove"}))).await;
        let (_, body) = send(&app, "GET", "/api/favorites", Some(&reviewer), None).await;
        assert_eq!(body["favorites"], json!(["p2"]));
    }
}
