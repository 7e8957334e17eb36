use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Snapshot, compare_values};
use crate::error::StoreError;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::NotEq => ordering.is_ne(),
            Self::Lt => ordering.is_lt(),
            Self::Lte => ordering.is_le(),
            Self::Gt => ordering.is_gt(),
            Self::Gte => ordering.is_ge(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// A missing field never matches, whatever the operator.
    fn matches(&self, snapshot: &Snapshot) -> bool {
        snapshot
            .field(&self.field)
            .is_some_and(|actual| self.op.accepts(compare_values(actual, &self.value)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Opaque continuation token for paginated reads.
///
/// Captures the position of the last document of a page: its id and the
/// values of the fields the page was ordered by. Only the store can build
/// one; callers pass it back unchanged or round-trip it through
/// [`Cursor::encode`] / [`Cursor::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<Value>,
}

impl Cursor {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Serialize to a URL-safe token.
    pub fn encode(&self) -> String {
        // Serializing a struct of strings and JSON values cannot fail.
        hex::encode(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Parse a token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Result<Self, StoreError> {
        let bytes = hex::decode(token).map_err(|_| StoreError::InvalidCursor)?;
        serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidCursor)
    }
}

/// Query over one collection: filters, ordering, limit and a start-after cursor.
///
/// Without explicit ordering, results come back in document-id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    order: Vec<OrderBy>,
    limit: Option<usize>,
    start_after: Option<Cursor>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn filter(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.start_after.as_ref()
    }

    /// True when the query is a plain id-ordered scan (cursor and limit only).
    pub fn is_id_scan(&self) -> bool {
        self.filters.is_empty() && self.order.is_empty()
    }

    /// Cursor positioned at `snapshot` under this query's ordering.
    pub fn cursor_for(&self, snapshot: &Snapshot) -> Cursor {
        Cursor {
            id: snapshot.id().to_string(),
            values: self
                .order
                .iter()
                .map(|o| snapshot.field(&o.field).cloned().unwrap_or(Value::Null))
                .collect(),
        }
    }

    /// Whether `snapshot` passes the filters and carries every ordered field.
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        self.filters.iter().all(|f| f.matches(snapshot))
            && self.order.iter().all(|o| snapshot.field(&o.field).is_some())
    }

    fn compare_keys(&self, a: &[&Value], a_id: &str, b: &[&Value], b_id: &str) -> Ordering {
        self.order
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(order, (x, y))| {
                let ordering = compare_values(x, y);
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a_id.cmp(b_id))
    }

    fn sort_key<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a Value> {
        self.order
            .iter()
            .map(|o| snapshot.field(&o.field).unwrap_or(&Value::Null))
            .collect()
    }

    /// Rejects a cursor built under a different ordering.
    pub(crate) fn check_cursor(&self) -> Result<(), StoreError> {
        match &self.start_after {
            Some(cursor) if cursor.values.len() != self.order.len() => {
                Err(StoreError::InvalidCursor)
            }
            _ => Ok(()),
        }
    }

    /// Evaluate the query over every document of a collection.
    pub fn apply(
        &self,
        candidates: impl IntoIterator<Item = Snapshot>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.check_cursor()?;

        let mut rows: Vec<Snapshot> = candidates.into_iter().filter(|s| self.matches(s)).collect();
        rows.sort_by(|a, b| {
            self.compare_keys(&self.sort_key(a), a.id(), &self.sort_key(b), b.id())
        });

        if let Some(cursor) = &self.start_after {
            let cursor_key: Vec<&Value> = cursor.values.iter().collect();
            rows.retain(|s| {
                self.compare_keys(&self.sort_key(s), s.id(), &cursor_key, &cursor.id)
                    .is_gt()
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}
