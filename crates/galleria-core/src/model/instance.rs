// ── Model instances ──
//
// A Model is a cheaply-clonable shared handle to one entity instance.
// Identity is pointer identity: the cache-merge algorithm guarantees that
// everything holding "the piece with id 3" holds the same allocation, so
// an update in one view is an update in all of them.
//
// A Model can be a stub: only its primary key is populated, standing in
// for a full, not-yet-downloaded object linked to by another object.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use crate::error::CoreError;
use crate::model::entity::{EntityDescriptor, EntityKind};
use crate::model::fields::{FieldDescriptor, FieldKind};
use crate::model::value::{ClientDict, Pk, Value};
use crate::observer::{ObserverHandle, ObserverSet};
use crate::store::ModelService;

struct ModelState {
    /// Client-format values keyed by client field name. An absent key is
    /// an absent ("undefined") field, never overwritten by merges.
    fields: HashMap<&'static str, Value>,
    stub: bool,
    deleting: bool,
}

struct ModelShared {
    descriptor: &'static EntityDescriptor,
    /// Owning service. `None` for detached instances (mainly tests);
    /// a detached model caches as a no-op.
    service: Option<Weak<ModelService>>,
    state: RwLock<ModelState>,
    /// Refresh signal, raised by the descriptor's refresh hooks (e.g. a
    /// category's piece list or piece images changing). Views of the
    /// category menu observe this.
    refresh: ObserverSet<()>,
}

/// Shared handle to one entity instance.
#[derive(Clone)]
pub struct Model {
    shared: Arc<ModelShared>,
}

impl Model {
    pub(crate) fn new(
        descriptor: &'static EntityDescriptor,
        service: Option<Weak<ModelService>>,
        fields: HashMap<&'static str, Value>,
        stub: bool,
    ) -> Self {
        Self {
            shared: Arc::new(ModelShared {
                descriptor,
                service,
                state: RwLock::new(ModelState {
                    fields,
                    stub,
                    deleting: false,
                }),
                refresh: ObserverSet::new(),
            }),
        }
    }

    /// Build an instance with no owning service, from client-format
    /// values. Unknown field names are ignored.
    pub fn detached(descriptor: &'static EntityDescriptor, properties: &ClientDict) -> Self {
        let mut fields = HashMap::new();
        for field in descriptor.fields {
            if let Some(value) = properties.get(field.client_name) {
                fields.insert(field.client_name, value.clone());
            }
        }
        Self::new(descriptor, None, fields, false)
    }

    // ── Identity & metadata ──────────────────────────────────────────

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.shared.descriptor
    }

    pub fn kind(&self) -> EntityKind {
        self.shared.descriptor.kind
    }

    /// Reference identity: do two handles share one allocation?
    pub fn same_instance(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn pk(&self) -> Option<Pk> {
        self.get(self.shared.descriptor.primary_key)
            .and_then(|v| v.as_pk())
    }

    pub fn set_pk(&self, pk: Pk) {
        self.write_field(self.shared.descriptor.primary_key, Value::from(pk));
    }

    fn require_pk(&self) -> Result<Pk, CoreError> {
        self.pk().ok_or(CoreError::MissingPrimaryKey {
            entity: self.kind(),
        })
    }

    pub fn is_stub(&self) -> bool {
        self.read_state(|s| s.stub)
    }

    /// Promote a stub once full data has been merged onto it.
    pub(crate) fn mark_full(&self) {
        self.write_state(|s| s.stub = false);
    }

    /// True while a delete request is in flight.
    pub fn is_deleting(&self) -> bool {
        self.read_state(|s| s.deleting)
    }

    // ── Field access ─────────────────────────────────────────────────

    pub fn get(&self, field: &str) -> Option<Value> {
        self.read_state(|s| s.fields.get(field).cloned())
    }

    /// True if at least one of the named fields holds a truthy value.
    pub fn has_value_for_any_of(&self, field_names: &[&str]) -> bool {
        field_names
            .iter()
            .any(|name| self.get(name).is_some_and(|v| v.is_truthy()))
    }

    /// All fields' values, unaltered, in a dictionary. Shallow: linked
    /// model handles are cloned, not converted to dictionaries.
    pub fn to_dict(&self) -> ClientDict {
        self.read_state(|s| {
            s.fields
                .iter()
                .map(|(name, value)| ((*name).to_owned(), value.clone()))
                .collect()
        })
    }

    /// Apply a partial dictionary of client-format values.
    ///
    /// Absent keys are skipped — a defined value is never overwritten by
    /// an "undefined" one. For linked-object fields the old back-reference
    /// is removed, the new value cached, and the new back-reference added.
    pub fn set_properties(&self, properties: &ClientDict) {
        for field in self.shared.descriptor.fields {
            let Some(new_value) = properties.get(field.client_name) else {
                continue;
            };
            self.remove_reverse_link(field);
            self.write_field(field.client_name, new_value.clone());
            self.cache_field(field);
            self.add_reverse_link(field);
        }

        // Cascading refresh, e.g. a piece's updated image telling its
        // category that the menu thumbnails are out of date.
        for &(trigger, link_field) in self.shared.descriptor.refresh_linked_on {
            if properties.get(trigger).is_some_and(Value::is_truthy) {
                if let Some(Value::Link(linked)) = self.get(link_field) {
                    linked.signal_refresh();
                }
            }
        }
    }

    // ── Caching ──────────────────────────────────────────────────────

    /// Merge this instance into its owning service's cache, returning the
    /// instance the cache now holds for this primary key (which may be a
    /// pre-existing one). A detached model is returned unchanged; an
    /// uncached object isn't the end of the world.
    pub fn cache(&self) -> Model {
        match self.service() {
            Ok(service) => service.update_cache(self.clone()),
            Err(_) => self.clone(),
        }
    }

    /// Cache every directly-linked object (and, in turn, their
    /// as-yet-uncached linked objects), replacing each link in place with
    /// the canonical cached instance.
    pub fn cache_linked_objects(&self) {
        for field in self.shared.descriptor.fields {
            if field.is_linked() {
                self.cache_field(field);
            }
        }
    }

    fn cache_field(&self, field: &FieldDescriptor) {
        match self.get(field.client_name) {
            Some(Value::Link(linked)) => {
                let canonical = linked.cache();
                if !canonical.same_instance(&linked) {
                    self.write_field(field.client_name, Value::Link(canonical));
                }
            }
            Some(Value::LinkList(list)) => {
                let canonical: Vec<Model> = list.iter().map(Model::cache).collect();
                self.write_field(field.client_name, Value::LinkList(canonical));
            }
            _ => {}
        }
    }

    /// The instance currently cached for this pk, if any.
    pub fn cached_version(&self) -> Option<Model> {
        let service = self.service().ok()?;
        service.from_cache(&self.pk()?)
    }

    // ── Reverse links ────────────────────────────────────────────────

    fn remove_reverse_link(&self, field: &FieldDescriptor) {
        let Some(reverse) = field.reverse_name() else {
            return;
        };
        match self.get(field.client_name) {
            Some(Value::Link(linked)) => linked.remove_reference_to(self, reverse),
            Some(Value::LinkList(list)) => {
                for linked in &list {
                    linked.remove_reference_to(self, reverse);
                }
            }
            _ => {}
        }
    }

    fn add_reverse_link(&self, field: &FieldDescriptor) {
        let Some(reverse) = field.reverse_name() else {
            return;
        };
        match self.get(field.client_name) {
            Some(Value::Link(linked)) => linked.add_reference_to(self, reverse),
            Some(Value::LinkList(list)) => {
                for linked in &list {
                    linked.add_reference_to(self, reverse);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn remove_all_reverse_links(&self) {
        for field in self.shared.descriptor.fields {
            self.remove_reverse_link(field);
        }
    }

    /// Drop `target` from the named field: removed from a link list, or
    /// nulled out for a single link. E.g. dropping a deleted piece from
    /// `Category.pieces`.
    pub fn remove_reference_to(&self, target: &Model, property: &str) {
        let Some(field) = self.shared.descriptor.field(property) else {
            return;
        };

        if let FieldKind::LinkList { .. } = field.kind {
            self.write_state(|s| {
                if let Some(Value::LinkList(list)) = s.fields.get_mut(field.client_name) {
                    list.retain(|m| !m.same_instance(target));
                }
            });
        } else {
            self.write_field(field.client_name, Value::Null);
        }

        if self.membership_refreshes(property) {
            self.signal_refresh();
        }
    }

    /// Record `target` in the named field: appended to a link list if its
    /// pk isn't already present, or set as a single link.
    pub fn add_reference_to(&self, target: &Model, property: &str) {
        let Some(field) = self.shared.descriptor.field(property) else {
            return;
        };

        if let FieldKind::LinkList { .. } = field.kind {
            let mut list = match self.get(field.client_name) {
                Some(Value::LinkList(list)) => list,
                _ => Vec::new(),
            };
            let target_pk = target.pk();
            if !list.iter().any(|m| m.pk() == target_pk) {
                list.push(target.clone());
            }
            self.write_field(field.client_name, Value::LinkList(list));
        } else {
            self.write_field(field.client_name, Value::Link(target.clone()));
        }

        if self.membership_refreshes(property) {
            self.signal_refresh();
        }
    }

    /// Whether membership changes in the named field refresh this model.
    fn membership_refreshes(&self, property: &str) -> bool {
        self.shared
            .descriptor
            .refresh_on_membership
            .iter()
            .any(|name| *name == property)
    }

    // ── Refresh signal ───────────────────────────────────────────────

    /// Raise this model's refresh signal (synchronous fan-out).
    pub fn signal_refresh(&self) {
        self.shared.refresh.emit(&());
    }

    pub fn observe_refresh(&self, callback: impl Fn() + Send + Sync + 'static) -> ObserverHandle {
        self.shared.refresh.register(move |()| callback())
    }

    pub fn stop_observing_refresh(&self, handle: ObserverHandle) {
        self.shared.refresh.unregister(handle);
    }

    // ── Server operations ────────────────────────────────────────────

    /// Send a partial update for this instance. The service mutates the
    /// cached instance from the response; this method does not touch
    /// `self` directly.
    pub async fn update(&self, data: &ClientDict) -> Result<ClientDict, CoreError> {
        let service = self.service()?;
        let pk = self.require_pk()?;
        service.update(&pk, data).await
    }

    /// Delete this instance on the server.
    ///
    /// `deleting` is set synchronously before the request goes out and
    /// reset when it settles, success or failure. Reverse links are
    /// removed only on success.
    pub async fn delete(&self) -> Result<(), CoreError> {
        let service = self.service()?;
        let pk = self.require_pk()?;

        self.write_state(|s| s.deleting = true);
        let result = service.destroy(&pk).await;
        if result.is_ok() {
            self.remove_all_reverse_links();
        }
        self.write_state(|s| s.deleting = false);

        result
    }

    // ── Internal helpers ─────────────────────────────────────────────

    fn service(&self) -> Result<Arc<ModelService>, CoreError> {
        self.shared
            .service
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(CoreError::Detached)
    }

    fn read_state<R>(&self, f: impl FnOnce(&ModelState) -> R) -> R {
        f(&self.shared.state.read().expect("model lock poisoned"))
    }

    fn write_state<R>(&self, f: impl FnOnce(&mut ModelState) -> R) -> R {
        f(&mut self.shared.state.write().expect("model lock poisoned"))
    }

    fn write_field(&self, name: &'static str, value: Value) {
        self.write_state(|s| {
            s.fields.insert(name, value);
        });
    }
}

impl PartialEq for Model {
    /// Models compare by reference identity, mirroring the cache's
    /// one-instance-per-pk invariant.
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl fmt::Debug for Model {
    // Link graphs are cyclic; printing fields would recurse forever.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("kind", &self.kind())
            .field("pk", &self.pk())
            .field("stub", &self.is_stub())
            .finish()
    }
}
