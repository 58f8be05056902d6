//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations,
//! converting between SeaORM models and the API resources.

use std::collections::HashMap;

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::resource::{
    CollectionQuery, FilterCondition, RangeBound, Treasure as TreasureResource, TreasureProperty,
    User as UserResource,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Treasure Operations
    // ========================================================================

    /// Find treasure by ID
    pub async fn find_treasure(&self, id: i32) -> Result<Option<TreasureResource>> {
        let treasure = TreasureEntity::find_by_id(id)
            .one(self.read_conn())
            .await?;

        Ok(treasure.map(Into::into))
    }

    /// List treasures matching the query's filters, one page at a time
    pub async fn list_treasures(
        &self,
        query: &CollectionQuery<TreasureProperty>,
        per_page: u64,
    ) -> Result<(Vec<TreasureResource>, u64)> {
        let paginator = TreasureEntity::find()
            .filter(treasure_condition(&query.filters))
            .order_by_asc(TreasureColumn::Id)
            .paginate(self.read_conn(), per_page);

        let total = paginator.num_items().await?;
        let treasures = paginator.fetch_page(query.page_index()).await?;

        Ok((treasures.into_iter().map(Into::into).collect(), total))
    }

    /// Insert a new treasure or update an existing one
    pub async fn save_treasure(&self, treasure: &TreasureResource) -> Result<TreasureResource> {
        let model = treasure_active_model(treasure)?;

        let saved = if treasure.id().is_some() {
            model.update(self.write_conn()).await?
        } else {
            model.insert(self.write_conn()).await?
        };

        Ok(saved.into())
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Check that a user exists
    pub async fn user_exists(&self, id: i32) -> Result<bool> {
        let count = UserEntity::find_by_id(id)
            .count(self.read_conn())
            .await?;

        Ok(count > 0)
    }

    /// Find user by ID, with their treasures
    pub async fn find_user(&self, id: i32) -> Result<Option<UserResource>> {
        let Some(user) = UserEntity::find_by_id(id).one(self.read_conn()).await? else {
            return Ok(None);
        };

        let treasures = TreasureEntity::find()
            .filter(TreasureColumn::OwnerId.eq(id))
            .order_by_asc(TreasureColumn::Id)
            .all(self.read_conn())
            .await?;

        Ok(Some(
            UserResource::from(user).with_treasures(treasures.into_iter().map(Into::into).collect()),
        ))
    }

    /// List users with pagination, each with their treasures
    pub async fn list_users(&self, page_index: u64, per_page: u64) -> Result<(Vec<UserResource>, u64)> {
        let paginator = UserEntity::find()
            .order_by_asc(UserColumn::Id)
            .paginate(self.read_conn(), per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page_index).await?;

        let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
        let mut by_owner: HashMap<i32, Vec<TreasureResource>> = HashMap::new();
        if !ids.is_empty() {
            let treasures = TreasureEntity::find()
                .filter(TreasureColumn::OwnerId.is_in(ids))
                .order_by_asc(TreasureColumn::Id)
                .all(self.read_conn())
                .await?;
            for treasure in treasures {
                by_owner.entry(treasure.owner_id).or_default().push(treasure.into());
            }
        }

        let users = users
            .into_iter()
            .map(|user| {
                let treasures = by_owner.remove(&user.id).unwrap_or_default();
                UserResource::from(user).with_treasures(treasures)
            })
            .collect();

        Ok((users, total))
    }

    /// Create a new user; username and email must be unique
    pub async fn create_user(&self, user: &UserResource) -> Result<UserResource> {
        let username = required(user.username(), "username")?;
        let email = required(user.email(), "email")?;

        let existing = UserEntity::find()
            .filter(
                Condition::any()
                    .add(UserColumn::Username.eq(username))
                    .add(UserColumn::Email.eq(email)),
            )
            .one(self.read_conn())
            .await?;

        if existing.is_some() {
            return Err(AppError::Duplicate {
                message: format!("a user named \"{}\" or with email \"{}\" already exists", username, email),
            });
        }

        let model = UserActiveModel {
            id: NotSet,
            username: Set(username.to_string()),
            email: Set(email.to_string()),
        };

        let saved = model.insert(self.write_conn()).await?;
        Ok(saved.into())
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AppError::MissingField {
        field: field.to_string(),
    })
}

fn treasure_active_model(treasure: &TreasureResource) -> Result<TreasureActiveModel> {
    Ok(TreasureActiveModel {
        id: match treasure.id() {
            Some(id) => Set(id),
            None => NotSet,
        },
        name: Set(required(treasure.name(), "name")?.to_string()),
        description: Set(required(treasure.description(), "description")?.to_string()),
        value: Set(required(treasure.value(), "value")?),
        cool_factor: Set(required(treasure.cool_factor(), "coolFactor")?),
        plundered_at: Set(required(treasure.plundered_at(), "plunderedAt")?.into()),
        is_published: Set(treasure.is_published().unwrap_or(false)),
        owner_id: Set(required(treasure.owner(), "owner")?),
    })
}

/// Column backing a filterable property; derived fields have none
fn treasure_column(property: TreasureProperty) -> Option<TreasureColumn> {
    match property {
        TreasureProperty::Id => Some(TreasureColumn::Id),
        TreasureProperty::Name => Some(TreasureColumn::Name),
        TreasureProperty::Description | TreasureProperty::TextDescription => {
            Some(TreasureColumn::Description)
        }
        TreasureProperty::Value => Some(TreasureColumn::Value),
        TreasureProperty::CoolFactor => Some(TreasureColumn::CoolFactor),
        TreasureProperty::PlunderedAt => Some(TreasureColumn::PlunderedAt),
        TreasureProperty::IsPublished => Some(TreasureColumn::IsPublished),
        TreasureProperty::Owner => Some(TreasureColumn::OwnerId),
        TreasureProperty::ShortDescription | TreasureProperty::PlunderedAtAgo => None,
    }
}

fn treasure_condition(filters: &[FilterCondition<TreasureProperty>]) -> Condition {
    filters.iter().fold(Condition::all(), |condition, filter| {
        let expr = match filter {
            FilterCondition::Partial { property, term } => {
                treasure_column(*property).map(|c| c.contains(term.as_str()))
            }
            FilterCondition::Range { property, bound } => {
                treasure_column(*property).map(|c| match *bound {
                    RangeBound::Gt(v) => c.gt(v),
                    RangeBound::Gte(v) => c.gte(v),
                    RangeBound::Lt(v) => c.lt(v),
                    RangeBound::Lte(v) => c.lte(v),
                    RangeBound::Between(low, high) => c.between(low, high),
                })
            }
            FilterCondition::Boolean { property, value } => {
                treasure_column(*property).map(|c| c.eq(*value))
            }
        };

        match expr {
            Some(expr) => condition.add(expr),
            None => condition,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::resource::Treasure;
    use chrono::{Duration, Utc};
    use tokio_test::assert_ok;

    async fn test_repository() -> Repository {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            read_url: None,
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 300,
            auto_migrate: true,
        };
        let pool = DbPool::new(&config).await.unwrap();
        pool.create_schema().await.unwrap();
        Repository::new(pool)
    }

    async fn owner(repo: &Repository, username: &str) -> i32 {
        let mut user = UserResource::new();
        user.set_username(username).set_email(format!("{username}@hoard.test"));
        repo.create_user(&user).await.unwrap().id().unwrap()
    }

    fn treasure(name: &str, value: i32, owner: i32) -> Treasure {
        let mut treasure = Treasure::new();
        treasure
            .set_name(name)
            .set_text_description(&format!("{name}\nfrom the hoard"))
            .set_value(value)
            .set_cool_factor(5)
            .set_owner(Some(owner));
        treasure
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_round_trips() {
        let repo = test_repository().await;
        let owner_id = owner(&repo, "smaug").await;

        let saved = repo.save_treasure(&treasure("Golden Chalice", 500, owner_id)).await.unwrap();
        let id = saved.id().expect("id assigned on insert");

        let found = repo.find_treasure(id).await.unwrap().unwrap();
        assert_eq!(found.name(), Some("Golden Chalice"));
        assert_eq!(found.description(), Some("Golden Chalice<br />\nfrom the hoard"));
        assert_eq!(found.is_published(), Some(false));
        assert_eq!(found.owner(), Some(owner_id));
        assert_eq!(found.plundered_at_ago(), "a few seconds ago");
    }

    #[tokio::test]
    async fn test_update_keeps_id() {
        let repo = test_repository().await;
        let owner_id = owner(&repo, "smaug").await;

        let mut saved = repo.save_treasure(&treasure("Golden Chalice", 500, owner_id)).await.unwrap();
        let id = saved.id();
        saved.set_value(750).set_plundered_at(Some(Utc::now() - Duration::days(2)));

        let updated = repo.save_treasure(&saved).await.unwrap();
        assert_eq!(updated.id(), id);
        assert_eq!(updated.value(), Some(750));
        assert_eq!(updated.plundered_at_ago(), "2 days ago");
    }

    #[tokio::test]
    async fn test_save_incomplete_treasure_fails() {
        let repo = test_repository().await;
        let err = repo.save_treasure(&Treasure::new()).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_list_treasures_filters_and_pages() {
        let repo = test_repository().await;
        let owner_id = owner(&repo, "smaug").await;

        for i in 0..12 {
            let mut t = treasure(&format!("Gold coin {i}"), i * 100, owner_id);
            t.set_is_published(i % 2 == 0);
            repo.save_treasure(&t).await.unwrap();
        }
        repo.save_treasure(&treasure("Silver goblet", 50, owner_id)).await.unwrap();

        let (first, total) = repo.list_treasures(&CollectionQuery::default(), 10).await.unwrap();
        assert_eq!(total, 13);
        assert_eq!(first.len(), 10);

        let query = CollectionQuery {
            page: 2,
            ..CollectionQuery::default()
        };
        let (second, _) = repo.list_treasures(&query, 10).await.unwrap();
        assert_eq!(second.len(), 3);

        let query = CollectionQuery {
            filters: vec![
                FilterCondition::Partial { property: TreasureProperty::Name, term: "coin".into() },
                FilterCondition::Range {
                    property: TreasureProperty::Value,
                    bound: RangeBound::Between(200, 600),
                },
                FilterCondition::Boolean { property: TreasureProperty::IsPublished, value: true },
            ],
            ..CollectionQuery::default()
        };
        let (matching, total) = repo.list_treasures(&query, 10).await.unwrap();
        let values: Vec<i32> = matching.iter().filter_map(|t| t.value()).collect();
        assert_eq!(total, 3);
        assert_eq!(values, vec![200, 400, 600]);
    }

    #[tokio::test]
    async fn test_users_with_treasures() {
        let repo = test_repository().await;
        let smaug = owner(&repo, "smaug").await;
        let glaurung = owner(&repo, "glaurung").await;

        repo.save_treasure(&treasure("Arkenstone", 1_000_000, smaug)).await.unwrap();
        repo.save_treasure(&treasure("Nauglamír", 90_000, glaurung)).await.unwrap();

        assert!(assert_ok!(repo.user_exists(smaug).await));
        assert!(!assert_ok!(repo.user_exists(999).await));

        let user = repo.find_user(smaug).await.unwrap().unwrap();
        assert_eq!(user.username(), Some("smaug"));
        assert_eq!(user.treasures().len(), 1);
        assert_eq!(user.treasures()[0].name(), Some("Arkenstone"));

        let (users, total) = repo.list_users(0, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(users[1].treasures()[0].name(), Some("Nauglamír"));

        assert!(repo.find_user(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let repo = test_repository().await;
        owner(&repo, "smaug").await;

        let mut again = UserResource::new();
        again.set_username("smaug").set_email("other@hoard.test");
        let err = repo.create_user(&again).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
    }
}
