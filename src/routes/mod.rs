use axum::{
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::auth_layer;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            code: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Global catalog
        .route(
            "/catalog",
            get(handlers::catalog::list_catalog).post(handlers::catalog::contribute),
        )
        .route("/catalog/reconcile", post(handlers::catalog::reconcile_catalog))
        .route(
            "/catalog/:id",
            get(handlers::catalog::get_catalog_entry).delete(handlers::catalog::delete_catalog_entry),
        )
        .route("/catalog/:id/add", post(handlers::catalog::add_to_company))
        .route("/catalog/:id/impact", get(handlers::catalog::deletion_impact))
        // Companies
        .route(
            "/companies",
            get(handlers::company::list_companies).post(handlers::company::add_company),
        )
        .route(
            "/companies/:id",
            put(handlers::company::update_company).delete(handlers::company::delete_company),
        )
        // Tenant group records
        .route(
            "/groups",
            get(handlers::group::list_groups).post(handlers::group::add_group),
        )
        .route(
            "/groups/:id",
            get(handlers::group::get_group)
                .put(handlers::group::update_group)
                .delete(handlers::group::delete_group),
        )
        .route("/groups/:id/cadence", post(handlers::group::refresh_cadence))
        // Posts
        .route(
            "/posts",
            get(handlers::post::list_posts).post(handlers::post::add_post),
        )
        .route("/posts/:id", axum::routing::delete(handlers::post::delete_post))
        .route("/posts/:id/status", put(handlers::post::update_post_status))
        // Audit log
        .route("/oplog", get(handlers::audit::query_oplog));

    Router::new()
        .nest("/api", api_routes)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fallback handler for 404
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::middleware::auth::tests::{valid_token, SECRET};

    async fn app() -> Router {
        let db = crate::db::connect_in_memory().await.unwrap();
        let mut config = Config::default();
        config.auth.jwt_secret = SECRET.to_string();
        create_router(AppState::new(db, config))
    }

    async fn call(app: &Router, method: Method, uri: &str, tenant: Option<i64>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tenant) = tenant {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", valid_token(tenant)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_public_and_api_requires_token() {
        let app = app().await;

        let (status, body) = call(&app, Method::GET, "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");

        let (status, body) = call(&app, Method::GET, "/api/catalog", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);
        assert_eq!(body["details"], "missing bearer token");

        let (status, _) = call(&app, Method::GET, "/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn contribute_add_and_delete_through_the_api() {
        let app = app().await;

        let (status, company) = call(
            &app,
            Method::POST,
            "/api/companies",
            Some(1),
            Some(json!({"name": "Lubbock Motors", "industry": "auto"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let company_id = company["data"]["id"].as_i64().unwrap();

        let (status, entry) = call(
            &app,
            Method::POST,
            "/api/catalog",
            Some(1),
            Some(json!({
                "name": "West Texas Trucks",
                "category": "automotive",
                "location": {"city": "Lubbock", "state": "TX"},
                "member_count": 5400
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entry_id = entry["data"]["id"].as_i64().unwrap();

        let add_uri = format!("/api/catalog/{}/add", entry_id);
        let (status, group) = call(&app, Method::POST, &add_uri, Some(1), Some(json!({"company_id": company_id}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(group["data"]["source"], "global_database");
        assert_eq!(group["data"]["global_group_id"], entry_id);

        let (status, _) = call(&app, Method::POST, &add_uri, Some(1), Some(json!({"company_id": company_id}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, impact) = call(&app, Method::GET, &format!("/api/catalog/{}/impact", entry_id), Some(2), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(impact["data"]["organizationsUsing"], 1);
        assert_eq!(impact["data"]["isContributor"], false);

        let entry_uri = format!("/api/catalog/{}", entry_id);
        let (status, _) = call(&app, Method::DELETE, &entry_uri, Some(2), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, outcome) = call(&app, Method::DELETE, &entry_uri, Some(1), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["data"]["affected"]["organizations"], 1);

        let (_, groups) = call(&app, Method::GET, "/api/groups", Some(1), None).await;
        assert_eq!(groups["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn manual_group_holds_catalog_entry_of_the_same_name() {
        let app = app().await;

        let (_, company) = call(&app, Method::POST, "/api/companies", Some(3), Some(json!({"name": "Plains Realty"}))).await;
        let company_id = company["data"]["id"].as_i64().unwrap();
        let (_, entry) = call(
            &app,
            Method::POST,
            "/api/catalog",
            Some(4),
            Some(json!({"name": "Amarillo Homes", "category": "real estate", "location": {"city": "Amarillo", "state": "TX"}})),
        )
        .await;
        let entry_uri = format!("/api/catalog/{}", entry["data"]["id"].as_i64().unwrap());

        let (status, group) = call(
            &app,
            Method::POST,
            "/api/groups",
            Some(3),
            Some(json!({"name": "Amarillo Homes", "category": "real estate", "company_id": company_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(group["data"]["source"], "manual");
        assert_eq!(group["data"]["global_group_id"], entry["data"]["id"]);

        let (_, fetched) = call(&app, Method::GET, &entry_uri, Some(3), None).await;
        assert_eq!(fetched["data"]["added_by_count"], 1);

        let group_uri = format!("/api/groups/{}", group["data"]["id"].as_i64().unwrap());
        let (status, _) = call(&app, Method::DELETE, &group_uri, Some(3), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, fetched) = call(&app, Method::GET, &entry_uri, Some(3), None).await;
        assert_eq!(fetched["data"]["added_by_count"], 0);
    }

    #[tokio::test]
    async fn renamed_group_keeps_its_posts_when_old_name_is_deleted_from_catalog() {
        let app = app().await;

        let (_, company) = call(&app, Method::POST, "/api/companies", Some(5), Some(json!({"name": "Canyon Feed"}))).await;
        let company_id = company["data"]["id"].as_i64().unwrap();
        let (_, group) = call(
            &app,
            Method::POST,
            "/api/groups",
            Some(5),
            Some(json!({"name": "Foo", "category": "farm", "company_id": company_id})),
        )
        .await;
        let group_id = group["data"]["id"].as_i64().unwrap();
        let (_, post) = call(
            &app,
            Method::POST,
            "/api/posts",
            Some(5),
            Some(json!({"group_id": group_id, "content": "Hay for sale", "status": "scheduled"})),
        )
        .await;
        let post_id = post["data"]["id"].as_i64().unwrap();

        let (status, renamed) = call(&app, Method::PUT, &format!("/api/groups/{}", group_id), Some(5), Some(json!({"name": "Bar"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["data"]["name"], "Bar");

        let (_, posts) = call(&app, Method::GET, &format!("/api/posts?group_id={}", group_id), Some(5), None).await;
        assert_eq!(posts["data"][0]["group_name"], "Bar");

        let (status, entry) = call(
            &app,
            Method::POST,
            "/api/catalog",
            Some(6),
            Some(json!({"name": "Foo", "category": "farm", "location": {"city": "Canyon", "state": "TX"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entry["data"]["added_by_count"], 0);
        let entry_uri = format!("/api/catalog/{}", entry["data"]["id"].as_i64().unwrap());

        let (_, impact) = call(&app, Method::GET, &format!("{}/impact", entry_uri), Some(6), None).await;
        assert_eq!(impact["data"]["scheduledPosts"], 0);

        let (status, outcome) = call(&app, Method::DELETE, &entry_uri, Some(6), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["data"]["affected"]["posts"], 0);

        let (_, posts) = call(&app, Method::GET, "/api/posts", Some(5), None).await;
        assert_eq!(posts["data"][0]["id"], post_id);
    }

    #[tokio::test]
    async fn failed_contribution_is_written_to_the_oplog() {
        use crate::entity::op_log;
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        // The only test that starts the audit writer
        let db = crate::db::connect_in_memory().await.unwrap();
        crate::handlers::audit::service::init(db.clone());
        let mut config = Config::default();
        config.auth.jwt_secret = SECRET.to_string();
        let app = create_router(AppState::new(db.clone(), config));

        let (status, _) = call(&app, Method::POST, "/api/catalog", Some(77), Some(json!({"name": "Half Filled"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut rows = Vec::new();
        for _ in 0..100 {
            rows = op_log::Entity::find()
                .filter(op_log::Column::TenantId.eq(77))
                .all(&db)
                .await
                .unwrap();
            if !rows.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].op_type, "contribute_catalog_group");
        assert_eq!(rows[0].result, "failed");
        assert!(rows[0].op_desc.contains("category"));
    }

    #[tokio::test]
    async fn posting_updates_group_cadence() {
        let app = app().await;

        let (_, company) = call(&app, Method::POST, "/api/companies", Some(1), Some(json!({"name": "Acme"}))).await;
        let company_id = company["data"]["id"].as_i64().unwrap();

        let (status, group) = call(
            &app,
            Method::POST,
            "/api/groups",
            Some(1),
            Some(json!({"name": "Acme Fans", "category": "retail", "company_id": company_id, "quality_rating": 4})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(group["data"]["quality_rating"], 4);
        assert_eq!(group["data"]["qa_status"], "pending");
        let group_id = group["data"]["id"].as_i64().unwrap();

        let (status, post) = call(
            &app,
            Method::POST,
            "/api/posts",
            Some(1),
            Some(json!({"group_id": group_id, "content": "Spring sale", "status": "scheduled"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["data"]["group_name"], "Acme Fans");
        let post_id = post["data"]["id"].as_i64().unwrap();

        let (status, posted) = call(
            &app,
            Method::PUT,
            &format!("/api/posts/{}/status", post_id),
            Some(1),
            Some(json!({"status": "posted"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(posted["data"]["posted_at"].is_i64());

        let (_, group) = call(&app, Method::GET, &format!("/api/groups/{}", group_id), Some(1), None).await;
        assert_eq!(group["data"]["posts_this_week"], 1);
        assert_eq!(group["data"]["posts_this_month"], 1);

        // Another tenant cannot see the group
        let (status, _) = call(&app, Method::GET, &format!("/api/groups/{}", group_id), Some(2), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/companies/{}", company_id), Some(1), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
