//! Application services layered over the generic model engine.

pub mod strings;
pub mod user;

pub use strings::{StringTable, string_table};
pub use user::UserSession;
