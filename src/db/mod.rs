//! Storage layer.
//!
//! Every persisted record implements [`Entity`]; a [`Store`] knows how to
//! insert, look up, replace and delete any entity by collection. Filters are
//! plain BSON documents of equality conditions so the same query works
//! against MongoDB and the in-memory store.

use std::future::Future;

use ::mongodb::bson::{oid::ObjectId, Document};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod memory;
pub mod mongodb;
pub mod seed;

pub use self::memory::MemoryStore;
pub use self::mongodb::MongoDB;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mongo(#[from] ::mongodb::error::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] ::mongodb::bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] ::mongodb::bson::de::Error),

    #[error("'{0}' is not a valid id")]
    InvalidId(String),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} record has no id")]
    MissingId(&'static str),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// A record persisted in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;
    /// Human readable name used in error messages.
    const LABEL: &'static str;
    /// Fields that must be unique across the collection.
    const UNIQUE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> Option<ObjectId>;
    fn set_id(&mut self, id: ObjectId);
}

/// Persistence operations shared by the MongoDB and in-memory backends.
///
/// `find_many` returns records in creation order.
pub trait Store: Clone + Send + Sync + 'static {
    /// Inserts the entity, assigning an id when it has none.
    fn insert<E: Entity>(&self, entity: E) -> impl Future<Output = Result<E, StoreError>> + Send;

    fn find_by_id<E: Entity>(
        &self,
        id: ObjectId,
    ) -> impl Future<Output = Result<Option<E>, StoreError>> + Send;

    fn find_one<E: Entity>(
        &self,
        filter: Document,
    ) -> impl Future<Output = Result<Option<E>, StoreError>> + Send;

    fn find_many<E: Entity>(
        &self,
        filter: Document,
    ) -> impl Future<Output = Result<Vec<E>, StoreError>> + Send;

    /// Replaces the stored record with the same id. Returns the entity, or
    /// `None` when no such record exists.
    fn replace<E: Entity>(
        &self,
        entity: E,
    ) -> impl Future<Output = Result<Option<E>, StoreError>> + Send;

    /// Returns whether a record was deleted.
    fn delete<E: Entity>(&self, id: ObjectId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn count<E: Entity>(&self, filter: Document) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

pub fn parse_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_hex_and_rejects_garbage() {
        let oid = ObjectId::new();
        assert_eq!(parse_id(&oid.to_hex()).unwrap(), oid);
        assert!(matches!(parse_id("not-an-id"), Err(StoreError::InvalidId(_))));
    }
}
