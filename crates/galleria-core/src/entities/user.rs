use crate::model::{EntityDescriptor, EntityKind, FieldDescriptor};

/// An account. The logged-in account is fetched as `user/self`.
pub static USER: EntityDescriptor = EntityDescriptor {
    kind: EntityKind::User,
    endpoint: "user",
    primary_key: "id",
    fields: &[
        FieldDescriptor::plain("id").read_only(),
        FieldDescriptor::text("firstName").wire("first_name"),
        FieldDescriptor::text("lastName").wire("last_name"),
        FieldDescriptor::text("email"),
        FieldDescriptor::plain("isStaff").wire("is_staff").read_only(),
    ],
    reorderable: false,
    refresh_on_membership: &[],
    refresh_linked_on: &[],
};
