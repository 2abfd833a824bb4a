// ── Field descriptors ──
//
// A FieldDescriptor handles conversion between API wire data and the
// client format, one field at a time. `client_name` could be
// `lastUpdated` while `wire_name` is `last_updated`; the API follows
// Python naming conventions.
//
// Conversion strategies form a closed set (`FieldKind`), matched
// exhaustively. Linked-object variants resolve their target service
// through an explicit `Registry` argument.

use crate::error::CoreError;
use crate::model::entity::EntityKind;
use crate::model::value::{FileUpload, Value};
use crate::model::year_month::YearMonth;
use crate::registry::Registry;

/// Conversion strategy for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Verbatim passthrough in both directions.
    Plain,
    /// Verbatim on read; a null client value becomes an empty string on
    /// write, to satisfy the database.
    Text,
    /// Wire: decimal string. Client: number. Written with exactly two
    /// decimal digits.
    Price,
    /// Wire: `YYYY-MM` / `YYYY-null`. Client: [`YearMonth`].
    YearMonth,
    /// Reference to one instance of another entity (a foreign key).
    /// Wire: bare pk or nested dictionary. Client: `Model` (stub or full).
    Link {
        target: EntityKind,
        /// Client name of the field on the target that refers back to
        /// this object, kept consistent automatically.
        reverse: Option<&'static str>,
    },
    /// Reference to a list of instances of another entity. These
    /// one-to-many relationships are invariably managed from the "many"
    /// end, so this variant is never written back to the server.
    LinkList {
        target: EntityKind,
        reverse: Option<&'static str>,
    },
}

/// A value ready for the wire: either JSON, or a file part destined for a
/// multipart body.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Json(serde_json::Value),
    File(FileUpload),
}

/// Declarative conversion contract for one entity attribute.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub client_name: &'static str,
    pub wire_name: &'static str,
    /// Whether this field may be sent back to the server.
    pub writable: bool,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(client_name: &'static str, kind: FieldKind) -> Self {
        Self {
            client_name,
            wire_name: client_name,
            writable: true,
            kind,
        }
    }

    pub const fn plain(client_name: &'static str) -> Self {
        Self::new(client_name, FieldKind::Plain)
    }

    pub const fn text(client_name: &'static str) -> Self {
        Self::new(client_name, FieldKind::Text)
    }

    pub const fn price(client_name: &'static str) -> Self {
        Self::new(client_name, FieldKind::Price)
    }

    pub const fn year_month(client_name: &'static str) -> Self {
        Self::new(client_name, FieldKind::YearMonth)
    }

    pub const fn link(client_name: &'static str, target: EntityKind) -> Self {
        Self::new(
            client_name,
            FieldKind::Link {
                target,
                reverse: None,
            },
        )
    }

    pub const fn link_list(client_name: &'static str, target: EntityKind) -> Self {
        let mut descriptor = Self::new(
            client_name,
            FieldKind::LinkList {
                target,
                reverse: None,
            },
        );
        descriptor.writable = false;
        descriptor
    }

    /// Override the wire name (commonly snake_case).
    pub const fn wire(mut self, wire_name: &'static str) -> Self {
        self.wire_name = wire_name;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Declare the back-reference field on the link target.
    pub const fn reverse(mut self, reverse_name: &'static str) -> Self {
        self.kind = match self.kind {
            FieldKind::Link { target, .. } => FieldKind::Link {
                target,
                reverse: Some(reverse_name),
            },
            FieldKind::LinkList { target, .. } => FieldKind::LinkList {
                target,
                reverse: Some(reverse_name),
            },
            other => other,
        };
        self
    }

    /// The back-reference field name, for linked-object kinds.
    pub fn reverse_name(&self) -> Option<&'static str> {
        match self.kind {
            FieldKind::Link { reverse, .. } | FieldKind::LinkList { reverse, .. } => reverse,
            _ => None,
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Link { .. } | FieldKind::LinkList { .. }
        )
    }

    // ── Wire → client ────────────────────────────────────────────────

    /// Convert a wire value to client format. `None` means the key was
    /// absent from the wire dictionary; `Ok(None)` means the client field
    /// stays absent.
    pub fn to_client(
        &self,
        wire: Option<&serde_json::Value>,
        registry: &Registry,
    ) -> Result<Option<Value>, CoreError> {
        match self.kind {
            FieldKind::Plain | FieldKind::Text => Ok(wire.map(Value::from_json)),

            FieldKind::Price => match wire {
                None => Ok(None),
                Some(serde_json::Value::Null) => Ok(Some(Value::Null)),
                Some(serde_json::Value::String(s)) => {
                    let amount: f64 = s.parse().map_err(|_| self.conversion_error(
                        format!("expected a decimal string, got {s:?}"),
                    ))?;
                    Ok(Some(Value::Float(amount)))
                }
                Some(serde_json::Value::Number(n)) => {
                    Ok(Some(Value::Float(n.as_f64().unwrap_or(0.0))))
                }
                Some(other) => Err(self.conversion_error(format!("unexpected price {other}"))),
            },

            FieldKind::YearMonth => match wire {
                None | Some(serde_json::Value::Null) => Ok(Some(Value::Null)),
                Some(serde_json::Value::String(s)) if s.is_empty() => Ok(Some(Value::Null)),
                Some(serde_json::Value::String(s)) => YearMonth::decode(s)
                    .map(|ym| Some(Value::YearMonth(ym)))
                    .map_err(|e| self.conversion_error(e.detail())),
                Some(other) => {
                    Err(self.conversion_error(format!("unexpected year-month {other}")))
                }
            },

            FieldKind::Link { target, .. } => match wire {
                None => Ok(None),
                Some(serde_json::Value::Null) => Ok(Some(Value::Null)),
                Some(value) => {
                    let service = registry.service(target)?;
                    Ok(Some(Value::Link(service.local_instance(value)?)))
                }
            },

            // An absent list stays absent: merging it would wipe out a
            // reverse-maintained membership list on the cached instance.
            FieldKind::LinkList { target, .. } => match wire {
                None => Ok(None),
                Some(serde_json::Value::Null) => Ok(Some(Value::LinkList(Vec::new()))),
                Some(serde_json::Value::Array(items)) => {
                    let service = registry.service(target)?;
                    let linked = items
                        .iter()
                        .map(|item| service.local_instance(item))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some(Value::LinkList(linked)))
                }
                Some(other) => {
                    Err(self.conversion_error(format!("expected a pk array, got {other}")))
                }
            },
        }
    }

    // ── Client → wire ────────────────────────────────────────────────

    /// Convert a client value to wire format. `Ok(None)` means the key is
    /// omitted from the outgoing payload.
    ///
    /// Linked-object lists always fail: they are writable only from the
    /// owning ("many") side.
    pub fn to_wire(&self, client: Option<&Value>) -> Result<Option<WireValue>, CoreError> {
        if let FieldKind::LinkList { .. } = self.kind {
            return Err(CoreError::UnwritableField {
                field: self.client_name,
            });
        }

        let Some(value) = client else {
            return Ok(None);
        };

        let wire = match (self.kind, value) {
            (FieldKind::Plain, Value::File(file)) => WireValue::File(file.clone()),
            (FieldKind::Plain, other) => WireValue::Json(self.value_to_json(other)?),

            (FieldKind::Text, Value::Null) => WireValue::Json(serde_json::Value::from("")),
            (FieldKind::Text, other) => WireValue::Json(self.value_to_json(other)?),

            (FieldKind::Price, Value::Null) => WireValue::Json(serde_json::Value::Null),
            (FieldKind::Price, other) => {
                let amount = other.as_f64().ok_or_else(|| {
                    self.conversion_error(format!("expected a number, got {other:?}"))
                })?;
                WireValue::Json(serde_json::Value::from(format!("{amount:.2}")))
            }

            (FieldKind::YearMonth, Value::Null) => WireValue::Json(serde_json::Value::Null),
            (FieldKind::YearMonth, Value::YearMonth(ym)) => {
                WireValue::Json(serde_json::Value::from(ym.encode()))
            }
            (FieldKind::YearMonth, other) => {
                return Err(
                    self.conversion_error(format!("expected a year-month, got {other:?}"))
                );
            }

            (FieldKind::Link { .. }, Value::Null) => WireValue::Json(serde_json::Value::Null),
            // Only a pk is needed by the server for writing.
            (FieldKind::Link { .. }, Value::Link(model)) => {
                let pk = model.pk().ok_or_else(|| {
                    self.conversion_error("linked object has no primary key".to_owned())
                })?;
                WireValue::Json(pk.to_json())
            }
            (FieldKind::Link { .. }, other) => {
                return Err(
                    self.conversion_error(format!("expected a linked object, got {other:?}"))
                );
            }

            (FieldKind::LinkList { .. }, _) => unreachable!("rejected above"),
        };

        Ok(Some(wire))
    }

    /// Verbatim client-to-JSON mapping for passthrough kinds.
    fn value_to_json(&self, value: &Value) -> Result<serde_json::Value, CoreError> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| self.conversion_error("non-finite number".to_owned()))?,
            Value::Text(s) => serde_json::Value::from(s.clone()),
            Value::YearMonth(ym) => serde_json::Value::from(ym.encode()),
            Value::Json(v) => v.clone(),
            Value::Link(model) => match model.pk() {
                Some(pk) => pk.to_json(),
                None => serde_json::Value::Null,
            },
            Value::LinkList(_) | Value::File(_) => {
                return Err(self.conversion_error(
                    "value cannot be represented as JSON for this field".to_owned(),
                ));
            }
        })
    }

    fn conversion_error(&self, message: String) -> CoreError {
        CoreError::Conversion {
            field: self.client_name.to_owned(),
            message,
        }
    }
}
