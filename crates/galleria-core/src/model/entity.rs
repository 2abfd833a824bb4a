// ── Per-entity-type configuration ──
//
// The generic cache/conversion engine is driven entirely by these static
// descriptors: field list, endpoint, primary-key name, and the hooks that
// keep the category menu's images fresh. There is no subclass per entity.

use crate::model::fields::FieldDescriptor;

/// Closed set of entity types the application knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum EntityKind {
    Piece,
    Category,
    User,
    TableString,
}

/// Static configuration for one entity type.
pub struct EntityDescriptor {
    pub kind: EntityKind,
    /// Directory name used in URLs, e.g. `piece`, `category`.
    pub endpoint: &'static str,
    /// Client name of the primary-key field (`id` for most entities,
    /// `key` for table strings).
    pub primary_key: &'static str,
    pub fields: &'static [FieldDescriptor],
    /// Whether the endpoint accepts the bulk-reorder PUT operation.
    pub reorderable: bool,
    /// Link-list fields whose membership changes raise this model's
    /// refresh signal (e.g. `Category.pieces` feeding the category menu).
    pub refresh_on_membership: &'static [&'static str],
    /// `(trigger_field, link_field)` pairs: when `trigger_field` arrives
    /// truthy through `set_properties` and `link_field` holds a linked
    /// model, that model's refresh signal is raised (e.g. a piece's new
    /// image refreshing its category).
    pub refresh_linked_on: &'static [(&'static str, &'static str)],
}

impl EntityDescriptor {
    /// Look up a field by its client name.
    pub fn field(&self, client_name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.client_name == client_name)
    }
}

impl std::fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}
