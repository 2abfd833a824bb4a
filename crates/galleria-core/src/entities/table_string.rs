use crate::model::{EntityDescriptor, EntityKind, FieldDescriptor};

/// A piece of editable site copy (e.g. the biography text), keyed by a
/// symbolic string rather than a numeric id.
pub static TABLE_STRING: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::TableString,
    endpoint: "string",
    primary_key: "key",
    fields: &[
        FieldDescriptor::text("key").read_only(),
        FieldDescriptor::text("value"),
    ],
    reorderable: false,
    refresh_on_membership: &[],
    refresh_linked_on: &[],
};
