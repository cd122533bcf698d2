//! MongoDB implementation of UserRepository

use async_trait::async_trait;
use axum_helpers::PageQuery;
use chrono::{SecondsFormat, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Bson, Document, doc},
    options::{FindOptions, IndexOptions},
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{Role, User, UserFilter, UserStats};
use crate::repository::UserRepository;

pub const COLLECTION: &str = "users";

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<User>(COLLECTION),
        }
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<User>(collection_name),
        }
    }

    pub async fn init_indexes(&self) -> UserResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_username_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_email_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "role": 1 })
                .options(IndexOptions::builder().name("idx_role".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "isActive": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_is_active".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("User indexes created successfully");
        Ok(())
    }

    pub fn collection(&self) -> &Collection<User> {
        &self.collection
    }

    fn build_filter(filter: &UserFilter) -> Document {
        let mut doc = doc! {};

        if let Some(role) = filter.role {
            doc.insert("role", role.to_string());
        }

        if let Some(is_active) = filter.is_active {
            doc.insert("isActive", is_active);
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = regex::escape(search);
            doc.insert(
                "$or",
                ["username", "email", "firstName", "lastName"]
                    .iter()
                    .map(|field| {
                        let mut clause = Document::new();
                        clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
                        clause
                    })
                    .collect::<Vec<_>>(),
            );
        }

        doc
    }
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

/// Same textual form chrono's serde impl produces for stored timestamps
fn now() -> Bson {
    Bson::String(Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create(&self, user: User) -> UserResult<User> {
        self.collection.insert_one(&user).await?;

        tracing::info!(user_id = %user.id, "User created successfully");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_login(&self, login: &str) -> UserResult<Option<User>> {
        let filter = doc! {
            "$or": [
                { "email": login.to_lowercase() },
                { "username": login },
            ]
        };
        Ok(self.collection.find_one(filter).await?)
    }

    #[instrument(skip(self))]
    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool> {
        let mut filter = doc! {
            "$or": [
                { "username": username },
                { "email": email.to_lowercase() },
            ]
        };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id.to_string() });
        }

        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &UserFilter, page: PageQuery) -> UserResult<(Vec<User>, u64)> {
        let mongo_filter = Self::build_filter(filter);

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(page.skip())
            .limit(page.limit as i64)
            .build();

        let cursor = self
            .collection
            .find(mongo_filter.clone())
            .with_options(options)
            .await?;
        let users: Vec<User> = cursor.try_collect().await?;
        let total = self.collection.count_documents(mongo_filter).await?;

        Ok((users, total))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update(&self, user: User) -> UserResult<User> {
        let result = self.collection.replace_one(id_filter(user.id), &user).await?;

        if result.matched_count == 0 {
            return Err(UserError::NotFound(user.id));
        }

        tracing::info!(user_id = %user.id, "User updated successfully");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;

        if result.deleted_count > 0 {
            tracing::info!(user_id = %id, "User deleted successfully");
        }
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn record_login(&self, id: Uuid) -> UserResult<()> {
        self.collection
            .update_one(id_filter(id), doc! { "$set": { "lastLogin": now() } })
            .await?;
        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, id: Uuid, password_hash: String) -> UserResult<()> {
        let update = doc! {
            "$set": {
                "passwordHash": password_hash,
                "updatedBy": id.to_string(),
                "updatedAt": now(),
            }
        };
        let result = self.collection.update_one(id_filter(id), update).await?;

        if result.matched_count == 0 {
            return Err(UserError::NotFound(id));
        }

        tracing::info!(user_id = %id, "Password updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> UserResult<UserStats> {
        let total_users = self.collection.count_documents(doc! {}).await?;
        let active_users = self
            .collection
            .count_documents(doc! { "isActive": true })
            .await?;
        let admins = self
            .collection
            .count_documents(doc! { "role": Role::Admin.to_string() })
            .await?;

        Ok(UserStats {
            total_users,
            active_users,
            inactive_users: total_users - active_users,
            admins,
            coordinators: total_users - admins,
        })
    }

    #[instrument(skip(self))]
    async fn admin_exists(&self) -> UserResult<bool> {
        let count = self
            .collection
            .count_documents(doc! { "role": Role::Admin.to_string() })
            .await?;
        Ok(count > 0)
    }
}
