//! User handlers

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use validator::Validate;

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use hoard_common::{
    db::Repository,
    errors::{AppError, Result},
    metrics,
    resource::{ApiResource, CollectionQuery, CollectionView, OperationKind, ReadView, User, WriteView},
};

/// List users with their treasures
pub async fn list_users(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    ApiQuery(pairs): ApiQuery<Vec<(String, String)>>,
) -> Result<Json<CollectionView>> {
    let meta = User::metadata();
    let query = CollectionQuery::parse::<User>(&pairs)?;

    let repo = Repository::new(state.db.clone());
    let (users, total) = repo.list_users(query.page_index(), meta.items_per_page).await?;

    let groups = meta.read_groups(OperationKind::GetCollection);
    let member = users.iter().map(|u| ReadView::project(u, groups, None)).collect();

    Ok(Json(CollectionView::new(
        meta.path,
        raw_query.as_deref(),
        member,
        total,
        query.page,
        meta.items_per_page,
    )))
}

/// Get a user by id
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<ReadView>> {
    let repo = Repository::new(state.db.clone());
    let user = repo
        .find_user(id)
        .await?
        .ok_or(AppError::UserNotFound { id })?;

    let groups = User::metadata().read_groups(OperationKind::Get);
    Ok(Json(ReadView::project(&user, groups, None)))
}

/// Create a user
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<(StatusCode, Json<ReadView>)> {
    let meta = User::metadata();

    let mut user = User::new();
    WriteView::<User>::parse(&payload, meta.denormalization_groups)?.apply(&mut user)?;

    if let Err(errors) = user.validate() {
        let err = AppError::from(errors);
        if let AppError::ConstraintViolation { ref violations } = err {
            metrics::record_violations(meta.short_name, violations.len());
        }
        return Err(err);
    }

    let repo = Repository::new(state.db.clone());
    let saved = repo.create_user(&user).await?;
    metrics::record_write(meta.short_name, OperationKind::Post.method());

    tracing::info!(user_id = ?saved.id(), "User created");

    let groups = meta.read_groups(OperationKind::Post);
    Ok((StatusCode::CREATED, Json(ReadView::project(&saved, groups, None))))
}
