//! Static entity configuration: one descriptor per entity type the
//! gallery application knows about.

pub mod category;
pub mod piece;
pub mod table_string;
pub mod user;

use crate::model::EntityDescriptor;

pub use category::CATEGORY;
pub use piece::PIECE;
pub use table_string::TABLE_STRING;
pub use user::USER;

/// Every entity descriptor, in registration order.
pub static ALL: &[&EntityDescriptor] = &[&PIECE, &CATEGORY, &USER, &TABLE_STRING];
