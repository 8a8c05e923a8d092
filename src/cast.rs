//! Result caster: shapes raw store rows back onto declared attribute types.
//!
//! Coercion is deliberately forgiving: a string that fails to parse as the
//! declared array or date is returned untouched, never an error. The caster
//! only coerces; when a projection was requested, field trimming has already
//! happened during result shaping.

use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::trace;

use crate::model::{AttributeType, LogicalCollection, Schema};
use crate::query::filter::KEY_FIELD;
use crate::store::Document;

/// Caster over a connection's read-only schema.
#[derive(Clone, Copy, Debug)]
pub struct Caster<'a> {
    schema: &'a Schema,
}

impl<'a> Caster<'a> {
    /// Caster for the given schema.
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Casts every document in place.
    pub fn cast_all(&self, collection: &str, documents: &mut [Document]) {
        for doc in documents {
            self.cast(collection, doc);
        }
    }

    /// Normalizes the primary-key alias and coerces declared array/date
    /// attributes on one document.
    pub fn cast(&self, collection: &str, document: &mut Document) {
        let declared = self.schema.get(collection);

        if let Some(key) = document.get(KEY_FIELD).cloned() {
            let id_field = declared.map_or("id", LogicalCollection::id_field);
            document.insert(id_field.to_string(), key);
        }

        let Some(declared) = declared else {
            return;
        };
        let keys: Vec<String> = document.keys().cloned().collect();
        for key in keys {
            let Some((_, attr)) = declared.attribute_for_column(&key) else {
                continue;
            };
            let Some(value) = document.get(&key) else {
                continue;
            };
            let coerced = match attr.attr_type {
                AttributeType::Array => coerce_array(value),
                AttributeType::Date | AttributeType::DateTime => coerce_date(value),
                _ => None,
            };
            if let Some(coerced) = coerced {
                trace!(collection, field = %key, "cast value to declared type");
                document.insert(key, coerced);
            }
        }
    }
}

/// String-encoded arrays are re-parsed; anything else stays as stored.
fn coerce_array(value: &Value) -> Option<Value> {
    match value {
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(parsed @ Value::Array(_)) => Some(parsed),
            _ => None,
        },
        _ => None,
    }
}

/// Dates are normalized to RFC 3339 strings; epoch-millisecond numbers are
/// converted, parse failures leave the stored value untouched.
fn coerce_date(value: &Value) -> Option<Value> {
    match value {
        Value::String(raw) => {
            let ts = OffsetDateTime::parse(raw, &Rfc3339).ok()?;
            let formatted = ts.format(&Rfc3339).ok()?;
            (&formatted != raw).then_some(Value::String(formatted))
        }
        Value::Number(ms) => {
            let ms = ms.as_i64()?;
            let ts = OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()?;
            ts.format(&Rfc3339).ok().map(Value::String)
        }
        _ => None,
    }
}
