use crate::model::{EntityDescriptor, EntityKind, FieldDescriptor};

/// A grouping of pieces, shown as a menu entry with thumbnails of its
/// pieces. Membership changes in `pieces` raise the category's refresh
/// signal so the menu re-renders.
pub static CATEGORY: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Category,
    endpoint: "category",
    primary_key: "id",
    fields: &[
        FieldDescriptor::plain("id").read_only(),
        FieldDescriptor::text("name"),
        FieldDescriptor::text("description"),
        FieldDescriptor::link_list("pieces", EntityKind::Piece).reverse("category"),
    ],
    reorderable: true,
    refresh_on_membership: &["pieces"],
    refresh_linked_on: &[],
};
