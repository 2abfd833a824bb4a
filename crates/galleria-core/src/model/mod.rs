//! The model layer: typed field descriptors, entity configuration and the
//! shared-handle [`Model`] instance type.

pub mod entity;
pub mod fields;
pub mod instance;
pub mod value;
pub mod year_month;

pub use entity::{EntityDescriptor, EntityKind};
pub use fields::{FieldDescriptor, FieldKind, WireValue};
pub use instance::Model;
pub use value::{ClientDict, FileUpload, Pk, Value};
pub use year_month::YearMonth;
