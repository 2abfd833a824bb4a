// ── Model services ──
//
// One ModelService per entity type holds the canonical cache of that
// type's instances and converts between wire dictionaries and Model
// instances. The cache invariant: at most one Model allocation per
// primary key, merged into in place so that references stay valid.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use galleria_api::{FormField, RestClient};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{
    ClientDict, EntityDescriptor, EntityKind, FieldKind, Model, Pk, Value, WireValue,
};
use crate::observer::{ObserverHandle, ObserverSet};
use crate::registry::Registry;

/// Cache and REST conversion for one entity type.
pub struct ModelService {
    descriptor: &'static EntityDescriptor,
    http: Arc<RestClient>,
    registry: Weak<Registry>,
    /// Canonical instances, in server order for listed endpoints.
    cache: RwLock<Vec<Model>>,
    /// Notified with the merged instance after every successful update.
    update_observers: ObserverSet<Model>,
    /// Notified with the cached instance after every successful create.
    create_observers: ObserverSet<Model>,
}

impl ModelService {
    pub(crate) fn new(
        descriptor: &'static EntityDescriptor,
        http: Arc<RestClient>,
        registry: Weak<Registry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            http,
            registry,
            cache: RwLock::new(Vec::new()),
            update_observers: ObserverSet::new(),
            create_observers: ObserverSet::new(),
        })
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    pub fn kind(&self) -> EntityKind {
        self.descriptor.kind
    }

    fn registry(&self) -> Result<Arc<Registry>, CoreError> {
        self.registry
            .upgrade()
            .ok_or_else(|| CoreError::Internal("service registry dropped".to_owned()))
    }

    // ── Conversion ───────────────────────────────────────────────────

    /// Convert a wire dictionary to client format, field by field. Wire
    /// keys no descriptor claims are dropped.
    pub fn to_client_dict(
        &self,
        wire: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ClientDict, CoreError> {
        let registry = self.registry()?;
        let mut dict = ClientDict::new();
        for field in self.descriptor.fields {
            if let Some(value) = field.to_client(wire.get(field.wire_name), &registry)? {
                dict.insert(field.client_name.to_owned(), value);
            }
        }
        Ok(dict)
    }

    /// Convert client data to wire fields, in descriptor order.
    ///
    /// Absent keys are omitted; read-only scalars are dropped silently;
    /// a linked-object list is a caller error.
    fn to_wire_fields(
        &self,
        data: &ClientDict,
    ) -> Result<Vec<(&'static str, WireValue)>, CoreError> {
        let mut fields = Vec::new();
        for field in self.descriptor.fields {
            let Some(value) = data.get(field.client_name) else {
                continue;
            };
            if !field.writable {
                if let FieldKind::LinkList { .. } = field.kind {
                    return Err(CoreError::UnwritableField {
                        field: field.client_name,
                    });
                }
                continue;
            }
            if let Some(wire) = field.to_wire(Some(value))? {
                fields.push((field.wire_name, wire));
            }
        }
        Ok(fields)
    }

    /// Build a local Model from a wire value: a bare pk becomes a stub,
    /// a dictionary becomes a full instance. Neither touches the cache.
    pub fn local_instance(
        self: &Arc<Self>,
        wire: &serde_json::Value,
    ) -> Result<Model, CoreError> {
        match wire {
            serde_json::Value::Object(map) => {
                let dict = self.to_client_dict(map)?;
                Ok(self.instance_from_dict(&dict))
            }
            other => match Pk::from_json(other) {
                Some(pk) => self.stub(pk),
                None => Err(CoreError::Conversion {
                    field: self.descriptor.primary_key.to_owned(),
                    message: format!("expected an object or primary key, got {other}"),
                }),
            },
        }
    }

    /// A pk-only placeholder instance with default values for every
    /// other field.
    fn stub(self: &Arc<Self>, pk: Pk) -> Result<Model, CoreError> {
        let registry = self.registry()?;
        let mut fields = HashMap::new();
        for field in self.descriptor.fields {
            if let Some(default) = field.to_client(None, &registry)? {
                fields.insert(field.client_name, default);
            }
        }

        let model = Model::new(self.descriptor, Some(Arc::downgrade(self)), fields, true);
        model.set_pk(pk);
        Ok(model)
    }

    fn instance_from_dict(self: &Arc<Self>, dict: &ClientDict) -> Model {
        let model = Model::new(
            self.descriptor,
            Some(Arc::downgrade(self)),
            HashMap::new(),
            false,
        );
        model.set_properties(dict);
        model
    }

    // ── Cache ────────────────────────────────────────────────────────

    /// The instance cached for `pk`, if any.
    pub fn from_cache(&self, pk: &Pk) -> Option<Model> {
        self.cache
            .read()
            .expect("cache lock poisoned")
            .iter()
            .find(|m| m.pk().as_ref() == Some(pk))
            .cloned()
    }

    /// A snapshot of the cache, in insertion (server) order.
    pub fn cached(&self) -> Vec<Model> {
        self.cache.read().expect("cache lock poisoned").clone()
    }

    fn cache_contains(&self, instance: &Model) -> bool {
        self.cache
            .read()
            .expect("cache lock poisoned")
            .iter()
            .any(|m| m.same_instance(instance))
    }

    fn append_to_cache(&self, instance: &Model) {
        self.cache
            .write()
            .expect("cache lock poisoned")
            .push(instance.clone());
    }

    pub(crate) fn remove_from_cache(&self, pk: &Pk) {
        self.cache
            .write()
            .expect("cache lock poisoned")
            .retain(|m| m.pk().as_ref() != Some(pk));
    }

    /// Merge an instance into the cache, returning the canonical instance
    /// for its primary key.
    ///
    /// - Already the cached allocation: returned as-is.
    /// - A stub: carries no data worth merging, so any cached instance
    ///   wins. An unknown stub is cached so the eventual full fetch
    ///   overwrites it in place, keeping references to the stub valid.
    /// - A full instance for a cached pk: merged into the cached
    ///   instance, which is returned. The incoming allocation is dropped.
    /// - Otherwise appended, and its linked objects cached in turn.
    pub fn update_cache(self: &Arc<Self>, instance: Model) -> Model {
        if self.cache_contains(&instance) {
            return instance;
        }

        let cached = instance.pk().and_then(|pk| self.from_cache(&pk));

        if instance.is_stub() {
            if let Some(existing) = cached {
                return existing;
            }
            self.append_to_cache(&instance);
            return instance;
        }

        if let Some(existing) = cached {
            existing.set_properties(&instance.to_dict());
            existing.mark_full();
            return existing;
        }

        self.append_to_cache(&instance);
        instance.cache_linked_objects();
        instance
    }

    /// Merge a client-format dictionary into the cache.
    pub fn update_cache_dict(self: &Arc<Self>, dict: &ClientDict) -> Result<Model, CoreError> {
        let pk = dict
            .get(self.descriptor.primary_key)
            .and_then(Value::as_pk);

        if let Some(existing) = pk.and_then(|pk| self.from_cache(&pk)) {
            existing.set_properties(dict);
            existing.mark_full();
            return Ok(existing);
        }

        let instance = self.instance_from_dict(dict);
        self.append_to_cache(&instance);
        instance.cache_linked_objects();
        Ok(instance)
    }

    // ── Server operations ────────────────────────────────────────────

    /// Fetch all instances, merging each into the cache. The returned
    /// vector preserves server order.
    pub async fn list(self: &Arc<Self>) -> Result<Vec<Model>, CoreError> {
        debug!(entity = %self.kind(), "listing");
        let rows: Vec<serde_json::Value> = self.http.get(self.descriptor.endpoint).await?;

        let mut instances = Vec::with_capacity(rows.len());
        for row in &rows {
            instances.push(self.update_cache(self.local_instance(row)?));
        }
        Ok(instances)
    }

    /// A cache snapshot if anything is cached, otherwise [`list`](Self::list).
    ///
    /// Stubs don't count: a cache holding only pk placeholders (created as
    /// link targets of another entity's fetch) still delegates to the
    /// server, which fills them in place.
    pub async fn lazy_list(self: &Arc<Self>) -> Result<Vec<Model>, CoreError> {
        let snapshot = self.cached();
        if snapshot.is_empty() || snapshot.iter().any(Model::is_stub) {
            self.list().await
        } else {
            Ok(snapshot)
        }
    }

    /// Fetch one instance by pk, merging it into the cache.
    pub async fn retrieve(self: &Arc<Self>, pk: &Pk) -> Result<Model, CoreError> {
        debug!(entity = %self.kind(), %pk, "retrieving");
        let row: serde_json::Value = self.http.get(&self.detail_path(pk)).await?;
        Ok(self.update_cache(self.local_instance(&row)?))
    }

    /// The cached instance if one is fully loaded, otherwise
    /// [`retrieve`](Self::retrieve). A cached stub does not count as a hit.
    pub async fn lazy_retrieve(self: &Arc<Self>, pk: &Pk) -> Result<Model, CoreError> {
        match self.from_cache(pk) {
            Some(instance) if !instance.is_stub() => Ok(instance),
            _ => self.retrieve(pk).await,
        }
    }

    /// Create an instance on the server and cache the response.
    ///
    /// Binary fields are not accepted here; upload them with a follow-up
    /// [`update`](Self::update).
    pub async fn create(self: &Arc<Self>, data: &ClientDict) -> Result<Model, CoreError> {
        debug!(entity = %self.kind(), "creating");
        let mut body = serde_json::Map::new();
        for (name, wire) in self.to_wire_fields(data)? {
            match wire {
                WireValue::Json(json) => {
                    body.insert(name.to_owned(), json);
                }
                WireValue::File(_) => {
                    return Err(CoreError::Conversion {
                        field: name.to_owned(),
                        message: "binary fields can only be written with update".to_owned(),
                    });
                }
            }
        }

        let row: serde_json::Value = self.http.post(self.descriptor.endpoint, &body).await?;
        let instance = self.update_cache(self.local_instance(&row)?);
        self.create_observers.emit(&instance);
        Ok(instance)
    }

    /// Send a partial update, merge the response into the cache, and
    /// return the response in client format.
    ///
    /// The body is JSON unless `data` contains a binary value, in which
    /// case the whole write travels as `multipart/form-data`.
    pub async fn update(self: &Arc<Self>, pk: &Pk, data: &ClientDict) -> Result<ClientDict, CoreError> {
        debug!(entity = %self.kind(), %pk, "updating");
        let wire_fields = self.to_wire_fields(data)?;
        let path = self.detail_path(pk);

        let has_file = wire_fields
            .iter()
            .any(|(_, wire)| matches!(wire, WireValue::File(_)));

        let row: serde_json::Value = if has_file {
            let form = wire_fields
                .into_iter()
                .map(|(name, wire)| (name.to_owned(), form_field(wire)))
                .collect();
            self.http.patch_form(&path, form).await?
        } else {
            let mut body = serde_json::Map::new();
            for (name, wire) in wire_fields {
                if let WireValue::Json(json) = wire {
                    body.insert(name.to_owned(), json);
                }
            }
            self.http.patch(&path, &body).await?
        };

        let serde_json::Value::Object(map) = row else {
            return Err(CoreError::Conversion {
                field: self.descriptor.primary_key.to_owned(),
                message: format!("expected an object in the update response, got {row}"),
            });
        };

        let dict = self.to_client_dict(&map)?;
        let merged = self.update_cache_dict(&dict)?;
        self.update_observers.emit(&merged);
        Ok(dict)
    }

    /// Delete an instance on the server and evict it from the cache.
    /// Reverse-link cleanup lives in [`Model::delete`], the usual entry
    /// point.
    pub(crate) async fn destroy(&self, pk: &Pk) -> Result<(), CoreError> {
        debug!(entity = %self.kind(), %pk, "deleting");
        self.http.delete(&self.detail_path(pk)).await?;
        self.remove_from_cache(pk);
        Ok(())
    }

    /// Persist a new display order as a single PUT of the full pk list.
    ///
    /// The response instances are returned uncached: the caller is
    /// expected to re-list if it wants the cache to follow the new order.
    pub async fn reorder(self: &Arc<Self>, order: &[Pk]) -> Result<Vec<Model>, CoreError> {
        if !self.descriptor.reorderable {
            return Err(CoreError::Unsupported {
                operation: "reorder",
                entity: self.kind(),
            });
        }

        debug!(entity = %self.kind(), count = order.len(), "reordering");
        let body = serde_json::json!({ "reorder": order });
        let rows: Vec<serde_json::Value> = self.http.put(self.descriptor.endpoint, &body).await?;
        rows.iter().map(|row| self.local_instance(row)).collect()
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Observe successful updates, called with the merged cached instance.
    pub fn observe_updates(
        &self,
        callback: impl Fn(&Model) + Send + Sync + 'static,
    ) -> ObserverHandle {
        self.update_observers.register(callback)
    }

    pub fn stop_observing(&self, handle: ObserverHandle) {
        self.update_observers.unregister(handle);
    }

    /// Observe successful creates, called with the cached new instance.
    pub fn observe_creations(
        &self,
        callback: impl Fn(&Model) + Send + Sync + 'static,
    ) -> ObserverHandle {
        self.create_observers.register(callback)
    }

    pub fn stop_observing_creations(&self, handle: ObserverHandle) {
        self.create_observers.unregister(handle);
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn detail_path(&self, pk: &Pk) -> String {
        format!("{}/{pk}", self.descriptor.endpoint)
    }
}

/// Stringify a wire value the way a browser form would: strings raw,
/// everything else as its JSON rendering (`null`, `7`, `"2013-07"`...).
fn form_field(wire: WireValue) -> FormField {
    match wire {
        WireValue::Json(serde_json::Value::String(s)) => FormField::Text(s),
        WireValue::Json(other) => FormField::Text(other.to_string()),
        WireValue::File(file) => FormField::File {
            file_name: file.file_name,
            content_type: file.content_type,
            bytes: file.bytes,
        },
    }
}
