//! Treasure handlers

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
    resource::{
        ApiResource, CollectionQuery, CollectionView, FieldValue, OperationKind, PropertySelection,
        ReadView, Treasure, TreasureProperty, WriteView,
    },
};

type QueryPairs = ApiQuery<Vec<(String, String)>>;

/// List treasures, filtered and paginated
pub async fn list_treasures(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    ApiQuery(pairs): QueryPairs,
) -> Result<Json<CollectionView>> {
    let meta = Treasure::metadata();
    let query = CollectionQuery::parse::<Treasure>(&pairs)?;

    let repo = Repository::new(state.db.clone());
    let (treasures, total) = repo.list_treasures(&query, meta.items_per_page).await?;

    let groups = meta.read_groups(OperationKind::GetCollection);
    let member = treasures
        .iter()
        .map(|t| ReadView::project(t, groups, query.properties.as_ref()))
        .collect();

    Ok(Json(CollectionView::new(
        meta.path,
        raw_query.as_deref(),
        member,
        total,
        query.page,
        meta.items_per_page,
    )))
}

/// Get a treasure by id
pub async fn get_treasure(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiQuery(pairs): QueryPairs,
) -> Result<Json<ReadView>> {
    let repo = Repository::new(state.db.clone());
    let treasure = repo
        .find_treasure(id)
        .await?
        .ok_or(AppError::TreasureNotFound { id })?;

    let selection = Treasure::metadata()
        .property_filter
        .then(|| PropertySelection::from_query(&pairs))
        .flatten();

    Ok(Json(render(&treasure, OperationKind::Get, selection.as_ref())))
}

/// Create a treasure
pub async fn create_treasure(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<(StatusCode, Json<ReadView>)> {
    let repo = Repository::new(state.db.clone());

    let mut treasure = Treasure::new();
    let saved = write(&repo, &mut treasure, &payload, OperationKind::Post).await?;

    tracing::info!(treasure_id = ?saved.id(), "Treasure created");

    Ok((StatusCode::CREATED, Json(render(&saved, OperationKind::Post, None))))
}

/// Replace a treasure (PUT)
pub async fn replace_treasure(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<ReadView>> {
    update(state, id, payload, OperationKind::Put).await
}

/// Partially update a treasure (PATCH)
pub async fn update_treasure(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<ReadView>> {
    update(state, id, payload, OperationKind::Patch).await
}

async fn update(state: AppState, id: i32, payload: Value, kind: OperationKind) -> Result<Json<ReadView>> {
    let repo = Repository::new(state.db.clone());
    let mut treasure = repo
        .find_treasure(id)
        .await?
        .ok_or(AppError::TreasureNotFound { id })?;

    let saved = write(&repo, &mut treasure, &payload, kind).await?;

    tracing::info!(treasure_id = id, method = kind.method(), "Treasure updated");

    Ok(Json(render(&saved, kind, None)))
}

/// Merge the payload into `treasure`, validate the result and persist it
async fn write(
    repo: &Repository,
    treasure: &mut Treasure,
    payload: &Value,
    kind: OperationKind,
) -> Result<Treasure> {
    let meta = Treasure::metadata();
    let changes = WriteView::<Treasure>::parse(payload, meta.denormalization_groups)?;

    // the owner IRI has to resolve before anything is validated
    if let Some(FieldValue::Reference(Some(owner_id))) = changes.get(TreasureProperty::Owner) {
        if !repo.user_exists(*owner_id).await? {
            return Err(AppError::Validation {
                message: format!("Item not found for \"{}\".", hoard_common::User::metadata().item_iri(*owner_id)),
                field: Some("owner".to_string()),
            });
        }
    }

    changes.apply(treasure)?;

    if let Err(errors) = treasure.validate() {
        let err = AppError::from(errors);
        if let AppError::ConstraintViolation { ref violations } = err {
            metrics::record_violations(meta.short_name, violations.len());
        }
        return Err(err);
    }

    let saved = repo.save_treasure(treasure).await?;
    metrics::record_write(meta.short_name, kind.method());

    Ok(saved)
}

fn render(treasure: &Treasure, kind: OperationKind, selection: Option<&PropertySelection>) -> ReadView {
    ReadView::project(treasure, Treasure::metadata().read_groups(kind), selection)
}
