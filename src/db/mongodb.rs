use futures::StreamExt;
use log::{error, info};
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions},
    Client, Collection, IndexModel,
};

use super::{Entity, Store, StoreError};
use crate::models::{Tenant, User};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db_name: String,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = MongoDB {
            client,
            db_name: db_name.to_string(),
        };
        db.ping().await?;
        db.ensure_indexes().await?;
        Ok(db)
    }

    fn collection<E: Entity>(&self) -> Collection<E> {
        self.client.database(&self.db_name).collection(E::COLLECTION)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        info!("Connected to MongoDB database '{}'", self.db_name);
        Ok(())
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.ensure_unique::<User>().await?;
        self.ensure_unique::<Tenant>().await?;
        Ok(())
    }

    async fn ensure_unique<E: Entity>(&self) -> Result<(), StoreError> {
        let collection = self.collection::<E>();
        for field in E::UNIQUE_FIELDS {
            let mut keys = Document::new();
            keys.insert(*field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            collection.create_index(index, None).await?;
        }
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn map_write_error<E: Entity>(err: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::Duplicate(E::LABEL.to_string())
    } else {
        error!("Write to '{}' failed: {}", E::COLLECTION, err);
        StoreError::Mongo(err)
    }
}

fn id_filter(id: ObjectId) -> Document {
    doc! { "_id": id }
}

impl Store for MongoDB {
    async fn insert<E: Entity>(&self, mut entity: E) -> Result<E, StoreError> {
        let id = entity.id().unwrap_or_else(ObjectId::new);
        entity.set_id(id);

        self.collection::<E>()
            .insert_one(&entity, None)
            .await
            .map_err(map_write_error::<E>)?;
        Ok(entity)
    }

    async fn find_by_id<E: Entity>(&self, id: ObjectId) -> Result<Option<E>, StoreError> {
        Ok(self.collection::<E>().find_one(id_filter(id), None).await?)
    }

    async fn find_one<E: Entity>(&self, filter: Document) -> Result<Option<E>, StoreError> {
        Ok(self.collection::<E>().find_one(filter, None).await?)
    }

    async fn find_many<E: Entity>(&self, filter: Document) -> Result<Vec<E>, StoreError> {
        let find_options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let mut cursor = self.collection::<E>().find(filter, find_options).await?;

        let mut records = Vec::new();
        while let Some(result) = cursor.next().await {
            records.push(result?);
        }
        Ok(records)
    }

    async fn replace<E: Entity>(&self, entity: E) -> Result<Option<E>, StoreError> {
        let id = entity.id().ok_or(StoreError::MissingId(E::LABEL))?;
        let result = self
            .collection::<E>()
            .replace_one(id_filter(id), &entity, None)
            .await
            .map_err(map_write_error::<E>)?;

        Ok((result.matched_count > 0).then_some(entity))
    }

    async fn delete<E: Entity>(&self, id: ObjectId) -> Result<bool, StoreError> {
        let result = self
            .collection::<E>()
            .delete_one(id_filter(id), None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn count<E: Entity>(&self, filter: Document) -> Result<u64, StoreError> {
        Ok(self.collection::<E>().count_documents(filter, None).await?)
    }
}
