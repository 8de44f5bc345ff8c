//! In-memory tabular datasets that can be bound into a query

use crate::error::{QueryError, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Prefix of every table alias
pub const TABLE_ALIAS_PREFIX: &str = "df_";

/// An Arrow dataset with a stable identity.
///
/// Every table gets a random identity token when it is constructed. Clones
/// share the token, so a table bound under several placeholders (or in
/// several nested queries) is registered once and always rendered under the
/// same alias. Two tables built separately from identical batches are
/// distinct datasets.
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

struct TableInner {
    id: Uuid,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Create a table from batches sharing `schema`
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        for (idx, batch) in batches.iter().enumerate() {
            if batch.schema() != schema {
                return Err(QueryError::InvalidTable(format!(
                    "batch {} schema does not match table schema",
                    idx
                )));
            }
        }

        Ok(Self {
            inner: Arc::new(TableInner {
                id: Uuid::new_v4(),
                schema,
                batches,
            }),
        })
    }

    /// Create a table holding a single batch
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            inner: Arc::new(TableInner {
                id: Uuid::new_v4(),
                schema: batch.schema(),
                batches: vec![batch],
            }),
        }
    }

    /// Create a table with no rows
    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            inner: Arc::new(TableInner {
                id: Uuid::new_v4(),
                schema,
                batches: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Name used both for engine registration and in rendered SQL
    pub fn alias(&self) -> String {
        format!("{}{}", TABLE_ALIAS_PREFIX, self.inner.id.simple())
    }

    pub fn schema(&self) -> SchemaRef {
        self.inner.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.inner.batches
    }

    pub fn num_rows(&self) -> usize {
        self.inner.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.inner.schema.fields().len()
    }

    /// Whether `other` is the same dataset (not merely equal contents)
    pub fn same_as(&self, other: &Table) -> bool {
        self.inner.id == other.inner.id
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Table {}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("alias", &self.alias())
            .field("columns", &self.num_columns())
            .field("rows", &self.num_rows())
            .finish()
    }
}

impl From<RecordBatch> for Table {
    fn from(batch: RecordBatch) -> Self {
        Table::from_batch(batch)
    }
}
