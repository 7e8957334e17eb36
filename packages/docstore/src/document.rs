use std::cmp::Ordering;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::WriteMode;

/// Raw document payload: a JSON object keyed by persisted field name.
pub type Document = serde_json::Map<String, Value>;

/// Length of store-generated document ids.
pub const GENERATED_ID_LEN: usize = 20;

/// Longest accepted document id, in bytes.
pub const MAX_ID_BYTES: usize = 1500;

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    id: String,
    data: Document,
    version: u64,
}

impl Snapshot {
    pub fn new(id: impl Into<String>, data: Document, version: u64) -> Self {
        Self {
            id: id.into(),
            data,
            version,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &Document {
        &self.data
    }

    /// Store-managed write stamp; changes on every committed write.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Value at a dotted field path, if present.
    pub fn field(&self, path: &str) -> Option<&Value> {
        field_value(&self.data, path)
    }

    /// Deserialize the payload into a typed value.
    pub fn into_entity<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.data))?)
    }
}

/// Serialize a value into a document payload.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::NotADocument(kind_name(&other))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve a dotted path (`"spec.cpu"`) inside a document.
pub fn field_value<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Merge `patch` into `target`: nested objects merge recursively, every other
/// value replaces, and fields absent from `patch` are left alone.
pub fn merge_into(target: &mut Document, patch: Document) {
    for (key, incoming) in patch {
        let Value::Object(nested) = incoming else {
            target.insert(key, incoming);
            continue;
        };
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            merge_into(existing, nested);
            continue;
        }
        target.insert(key, Value::Object(nested));
    }
}

/// Payload that results from applying a write to the current document.
pub(crate) fn resolve_write(
    existing: Option<Document>,
    data: Document,
    mode: WriteMode,
) -> Document {
    match (mode, existing) {
        (WriteMode::Merge, Some(mut current)) => {
            merge_into(&mut current, data);
            current
        }
        _ => data,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values used by filters, ordering and cursors.
///
/// Values of different types order by type rank
/// (null < bool < number < string < array < object); numbers compare numerically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(lv, rv)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Reject ids the store cannot address.
pub fn validate_document_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id == "." || id == ".." || id.contains('/') || id.len() > MAX_ID_BYTES {
        return Err(StoreError::InvalidDocumentId(id.to_string()));
    }
    Ok(())
}

/// Fresh random id for documents created without an explicit key.
pub fn generate_document_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(char::from)
        .collect()
}
