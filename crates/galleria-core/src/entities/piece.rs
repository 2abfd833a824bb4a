use crate::model::{EntityDescriptor, EntityKind, FieldDescriptor, Model};

/// An artwork. Belongs to a category; `category.pieces` is kept in sync
/// automatically. A truthy `image` arriving through `set_properties`
/// refreshes the owning category, whose menu thumbnail may have changed.
pub static PIECE: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::Piece,
    endpoint: "piece",
    primary_key: "id",
    fields: &[
        FieldDescriptor::plain("id").read_only(),
        FieldDescriptor::text("name"),
        FieldDescriptor::text("description"),
        FieldDescriptor::price("price"),
        FieldDescriptor::year_month("date"),
        FieldDescriptor::plain("image"),
        FieldDescriptor::link("category", EntityKind::Category).reverse("pieces"),
    ],
    reorderable: true,
    refresh_on_membership: &[],
    refresh_linked_on: &[("image", "category")],
};

/// The piece's price formatted for display, e.g. `"150.00"`.
pub fn rendered_price(piece: &Model) -> Option<String> {
    let amount = piece.get("price")?.as_f64()?;
    Some(format!("{amount:.2}"))
}
