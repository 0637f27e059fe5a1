use onboard_cache::CacheAside;
use onboard_model::Entity;
use onboard_store::Collection;

use crate::config::ServiceConfig;
use crate::entity::EntityService;
use crate::streaming::StreamingListService;

/// Both services for one entity type, sharing one collection handle.
#[derive(Clone)]
pub struct EntityServices<T: Entity> {
    pub crud: EntityService<T>,
    pub stream: StreamingListService<T>,
}

impl<T: Entity> EntityServices<T> {
    pub fn new(collection: Collection<T>, cache: Option<CacheAside>, config: ServiceConfig) -> Self {
        Self {
            crud: EntityService::new(collection.clone(), cache, config),
            stream: StreamingListService::new(collection, config),
        }
    }
}
