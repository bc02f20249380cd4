use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use mongodb::bson::{self, oid::ObjectId, Document};

use super::{Entity, Store, StoreError};

type Collections = HashMap<&'static str, BTreeMap<ObjectId, Document>>;

/// Process-local store keeping every collection as BSON documents.
///
/// Records are keyed by `ObjectId`, so iteration follows creation order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn select<E: Entity>(&self, filter: &Document) -> Result<Vec<E>, StoreError> {
        let collections = self.read()?;
        let Some(records) = collections.get(E::COLLECTION) else {
            return Ok(Vec::new());
        };

        records
            .values()
            .filter(|record| matches(record, filter))
            .map(|record| Ok(bson::from_document(record.clone())?))
            .collect()
    }
}

fn matches(record: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| record.get(key) == Some(expected))
}

fn check_unique<E: Entity>(
    records: &BTreeMap<ObjectId, Document>,
    id: ObjectId,
    candidate: &Document,
) -> Result<(), StoreError> {
    for field in E::UNIQUE_FIELDS {
        let Some(value) = candidate.get(*field) else {
            continue;
        };
        let taken = records
            .iter()
            .any(|(other_id, other)| *other_id != id && other.get(*field) == Some(value));
        if taken {
            return Err(StoreError::Duplicate(format!("{} {}", E::LABEL, field)));
        }
    }
    Ok(())
}

impl Store for MemoryStore {
    async fn insert<E: Entity>(&self, mut entity: E) -> Result<E, StoreError> {
        let id = entity.id().unwrap_or_else(ObjectId::new);
        entity.set_id(id);
        let document = bson::to_document(&entity)?;

        let mut collections = self.write()?;
        let records = collections.entry(E::COLLECTION).or_default();
        if records.contains_key(&id) {
            return Err(StoreError::Duplicate(format!("{} {}", E::LABEL, id)));
        }
        check_unique::<E>(records, id, &document)?;
        records.insert(id, document);
        Ok(entity)
    }

    async fn find_by_id<E: Entity>(&self, id: ObjectId) -> Result<Option<E>, StoreError> {
        let collections = self.read()?;
        match collections.get(E::COLLECTION).and_then(|records| records.get(&id)) {
            Some(record) => Ok(Some(bson::from_document(record.clone())?)),
            None => Ok(None),
        }
    }

    async fn find_one<E: Entity>(&self, filter: Document) -> Result<Option<E>, StoreError> {
        Ok(self.select::<E>(&filter)?.into_iter().next())
    }

    async fn find_many<E: Entity>(&self, filter: Document) -> Result<Vec<E>, StoreError> {
        self.select::<E>(&filter)
    }

    async fn replace<E: Entity>(&self, entity: E) -> Result<Option<E>, StoreError> {
        let id = entity.id().ok_or(StoreError::MissingId(E::LABEL))?;
        let document = bson::to_document(&entity)?;

        let mut collections = self.write()?;
        let Some(records) = collections.get_mut(E::COLLECTION) else {
            return Ok(None);
        };
        if !records.contains_key(&id) {
            return Ok(None);
        }
        check_unique::<E>(records, id, &document)?;
        records.insert(id, document);
        Ok(Some(entity))
    }

    async fn delete<E: Entity>(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut collections = self.write()?;
        Ok(collections
            .get_mut(E::COLLECTION)
            .map(|records| records.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn count<E: Entity>(&self, filter: Document) -> Result<u64, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(E::COLLECTION)
            .map(|records| records.values().filter(|r| matches(r, &filter)).count() as u64)
            .unwrap_or(0))
    }
}
