// ── Editable site copy ──
//
// Short pieces of text (the biography, the contact blurb) live in a
// string table on the server, keyed by a symbolic name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{EntityKind, Model, Value};
use crate::registry::Registry;

/// Site copy keyed by symbolic name.
pub type StringTable = HashMap<String, Model>;

/// Fetch the string table, served from the cache once loaded.
pub async fn string_table(registry: &Arc<Registry>) -> Result<StringTable, CoreError> {
    let service = registry.service(EntityKind::TableString)?;
    let strings = service.lazy_list().await?;

    let mut table = StringTable::with_capacity(strings.len());
    for model in strings {
        if let Some(Value::Text(key)) = model.get("key") {
            table.insert(key, model);
        }
    }
    Ok(table)
}

/// The text of one table entry, if present and non-null.
pub fn string_value(table: &StringTable, key: &str) -> Option<String> {
    table
        .get(key)?
        .get("value")
        .and_then(|v| v.as_str().map(str::to_owned))
}
