// ── Service registry ──
//
// One ModelService per entity type, all sharing one RestClient. Field
// conversion resolves linked-object targets through the registry, so the
// registry and its services form a reference cycle broken by Weak
// back-pointers from each service.

use std::collections::HashMap;
use std::sync::Arc;

use galleria_api::RestClient;

use crate::error::CoreError;
use crate::model::{EntityDescriptor, EntityKind};
use crate::store::ModelService;

/// The application's set of model services.
pub struct Registry {
    http: Arc<RestClient>,
    services: HashMap<EntityKind, Arc<ModelService>>,
}

impl Registry {
    /// Build a registry over the full set of application entities.
    pub fn new(http: RestClient) -> Arc<Self> {
        Self::with_entities(http, crate::entities::ALL)
    }

    /// Build a registry over an explicit set of entity descriptors.
    pub fn with_entities(http: RestClient, entities: &[&'static EntityDescriptor]) -> Arc<Self> {
        let http = Arc::new(http);
        Arc::new_cyclic(|weak| {
            let services = entities
                .iter()
                .copied()
                .map(|descriptor| {
                    let service =
                        ModelService::new(descriptor, Arc::clone(&http), weak.clone());
                    (descriptor.kind, service)
                })
                .collect();
            Self { http, services }
        })
    }

    /// Look up the service for an entity type.
    pub fn service(&self, kind: EntityKind) -> Result<Arc<ModelService>, CoreError> {
        self.services
            .get(&kind)
            .cloned()
            .ok_or(CoreError::UnknownEntity { kind })
    }

    pub fn http(&self) -> &Arc<RestClient> {
        &self.http
    }
}
