//! API handlers module

pub mod docs;
pub mod health;
pub mod treasures;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{create_router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use hoard_common::{config::AppConfig, db::DbPool};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Router backed by a fresh in-memory SQLite database
    pub async fn test_app() -> Router {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config.database.min_connections = 1;

        let db = DbPool::new(&config.database).await.unwrap();
        db.create_schema().await.unwrap();

        create_router(
            AppState {
                config: Arc::new(config),
                db,
            },
            None,
        )
    }

    pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Send a raw body, optionally without a content type
    pub async fn send_raw(app: &Router, method: Method, uri: &str, body: &str, content_type: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }

        let response = app
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Create a user and return its IRI
    pub async fn create_owner(app: &Router, username: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/users",
            Some(serde_json::json!({
                "username": username,
                "email": format!("{username}@hoard.test"),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        format!("/api/users/{}", body["id"])
    }
}
