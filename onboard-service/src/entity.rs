//! CRUD over one entity collection.

use onboard_cache::CacheAside;
use onboard_model::{Entity, Validate};
use onboard_store::{Collection, Deadline};
use onboard_types::ObjectId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

/// Request handling for entities of type `T`.
///
/// Holds no per-request state. Every operation runs its store calls under
/// one deadline of `config.op_timeout`.
#[derive(Clone)]
pub struct EntityService<T: Entity> {
    collection: Collection<T>,
    cache: Option<CacheAside>,
    config: ServiceConfig,
}

impl<T: Entity> EntityService<T> {
    pub fn new(collection: Collection<T>, cache: Option<CacheAside>, config: ServiceConfig) -> Self {
        Self {
            collection,
            cache,
            config,
        }
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Validates and stores a new entity, returning it with its new id.
    ///
    /// Any id in the payload is ignored. Nothing is written when the payload
    /// fails to decode or validate.
    pub async fn create(&self, mut payload: Value) -> ServiceResult<T> {
        if let Value::Object(fields) = &mut payload {
            fields.remove("id");
        }
        let mut entity: T = decode_payload::<T, T>(payload)?;
        entity.validate()?;

        let id = self.collection.insert(&entity, &self.deadline()).await?;
        entity.set_id(id);
        info!("Created {} {}", T::NAME, id);
        Ok(entity)
    }

    pub async fn read(&self, id: &str) -> ServiceResult<T> {
        let id = ObjectId::parse(id)?;
        self.find(&id, &self.deadline()).await
    }

    /// Replaces the fields present in `payload` and returns the stored result.
    pub async fn update(&self, id: &str, payload: Value) -> ServiceResult<T> {
        let id = ObjectId::parse(id)?;
        let patch: T::Patch = decode_payload::<T, T::Patch>(payload)?;
        patch.validate()?;

        let deadline = self.deadline();
        let updated = self.collection.update_by_id(&id, &patch, &deadline).await?;
        if updated == 0 {
            return Err(not_found::<T>(&id));
        }
        info!("Updated {} {}", T::NAME, id);
        self.find(&id, &deadline).await
    }

    /// Deletes the entity after checking that it exists. Returns the count
    /// removed, which is always 1 on success.
    pub async fn delete(&self, id: &str) -> ServiceResult<u64> {
        let id = ObjectId::parse(id)?;
        let deadline = self.deadline();
        self.find(&id, &deadline).await?;

        let deleted = self.collection.delete_by_id(&id, &deadline).await?;
        if deleted == 0 {
            return Err(not_found::<T>(&id));
        }
        info!("Deleted {} {}", T::NAME, id);
        Ok(deleted)
    }

    pub async fn count(&self) -> ServiceResult<u64> {
        Ok(self.collection.count(&self.deadline()).await?)
    }

    /// Returns every entity, served from the cache when one is configured.
    ///
    /// Cached lists are not invalidated by writes and may lag behind them by
    /// up to `config.list_cache_ttl`.
    pub async fn list(&self) -> ServiceResult<Vec<T>> {
        let load = || async {
            let entities = self.collection.find_all(&self.deadline()).await?;
            debug!("Loaded {} {} from store", entities.len(), T::COLLECTION);
            Ok::<_, ServiceError>(entities)
        };
        match &self.cache {
            Some(cache) => cache.fetch(T::COLLECTION, self.config.list_cache_ttl, load).await,
            None => load().await,
        }
    }

    async fn find(&self, id: &ObjectId, deadline: &Deadline) -> ServiceResult<T> {
        self.collection
            .find_by_id(id, deadline)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    not_found::<T>(id)
                } else {
                    e.into()
                }
            })
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.config.op_timeout)
    }
}

fn decode_payload<T: Entity, P: DeserializeOwned>(payload: Value) -> ServiceResult<P> {
    serde_json::from_value(payload)
        .map_err(|e| ServiceError::InvalidArgument(format!("invalid {} payload: {e}", T::NAME)))
}

fn not_found<T: Entity>(id: &ObjectId) -> ServiceError {
    ServiceError::NotFound(format!("could not find {} with id {id}", T::NAME))
}
