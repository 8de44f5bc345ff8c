use crate::error::Result;
use crate::table::Table;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, SchemaRef,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Field data types of a query result
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Null,
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    String,
    Bytes,
    Date,
    Time,
    Timestamp,
    Interval,
    List,
    Struct,
    Other,
}

impl FieldType {
    /// Map an Arrow type onto the coarse result type
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Null => FieldType::Null,
            DataType::Boolean => FieldType::Boolean,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::UInt8
            | DataType::UInt16 => FieldType::Int32,
            DataType::Int64 | DataType::UInt32 | DataType::UInt64 => FieldType::Int64,
            DataType::Float16 | DataType::Float32 => FieldType::Float32,
            DataType::Float64 => FieldType::Float64,
            DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => FieldType::Decimal,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => FieldType::String,
            DataType::Binary
            | DataType::LargeBinary
            | DataType::BinaryView
            | DataType::FixedSizeBinary(_) => FieldType::Bytes,
            DataType::Date32 | DataType::Date64 => FieldType::Date,
            DataType::Time32(_) | DataType::Time64(_) => FieldType::Time,
            DataType::Timestamp(_, _) => FieldType::Timestamp,
            DataType::Interval(_) | DataType::Duration(_) => FieldType::Interval,
            DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _) => {
                FieldType::List
            }
            DataType::Struct(_) | DataType::Map(_, _) => FieldType::Struct,
            _ => FieldType::Other,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Null => "null",
            FieldType::Boolean => "boolean",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Decimal => "decimal",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Timestamp => "timestamp",
            FieldType::Interval => "interval",
            FieldType::List => "list",
            FieldType::Struct => "struct",
            FieldType::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Definition of a single result column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

/// A row of data as column name to JSON value
pub type DataRow = HashMap<String, serde_json::Value>;

/// Statistics about query execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStats {
    /// Number of rows returned
    pub row_count: usize,
    /// Execution time in milliseconds, rendering excluded
    pub execution_ms: u64,
    /// When execution finished
    pub executed_at: DateTime<Utc>,
}

/// Materialized result of a statement that produces rows.
///
/// A statement that produces no result set is represented by `None` at the
/// call site, never by an empty `QueryResult`.
#[derive(Debug, Clone)]
pub struct QueryResult {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    stats: QueryStats,
}

impl QueryResult {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>, execution_ms: u64) -> Self {
        let row_count = batches.iter().map(|b| b.num_rows()).sum();
        Self {
            schema,
            batches,
            stats: QueryStats {
                row_count,
                execution_ms,
                executed_at: Utc::now(),
            },
        }
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    pub fn row_count(&self) -> usize {
        self.stats.row_count
    }

    /// True when the statement produced a result set with zero rows
    pub fn is_empty(&self) -> bool {
        self.stats.row_count == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    pub fn fields(&self) -> Vec<FieldDef> {
        self.schema
            .fields()
            .iter()
            .map(|f| FieldDef {
                name: f.name().to_string(),
                field_type: FieldType::from_arrow(f.data_type()),
                nullable: f.is_nullable(),
            })
            .collect()
    }

    /// Convert every row to a JSON map keyed by column name
    pub fn to_rows(&self) -> Result<Vec<DataRow>> {
        let names = self.column_names();
        let mut rows = Vec::with_capacity(self.stats.row_count);

        for batch in &self.batches {
            let columns = batch
                .columns()
                .iter()
                .map(column_values)
                .collect::<Result<Vec<_>>>()?;

            for row in 0..batch.num_rows() {
                let data_row: DataRow = names
                    .iter()
                    .zip(&columns)
                    .map(|(name, values)| (name.clone(), values[row].clone()))
                    .collect();
                rows.push(data_row);
            }
        }

        Ok(rows)
    }

    /// Render the result as an ASCII table
    pub fn pretty(&self) -> Result<String> {
        Ok(arrow::util::pretty::pretty_format_batches(&self.batches)?.to_string())
    }

    /// Turn the result into a dataset that can be bound into another query
    pub fn into_table(self) -> Result<Table> {
        Table::try_new(self.schema, self.batches)
    }
}

fn column_values(array: &ArrayRef) -> Result<Vec<serde_json::Value>> {
    use serde_json::Value;

    let len = array.len();
    let values = match array.data_type() {
        DataType::Boolean => {
            let arr = array.as_boolean();
            (0..len).map(|i| Value::Bool(arr.value(i))).collect()
        }
        DataType::Int8 => primitive::<Int8Type>(array),
        DataType::Int16 => primitive::<Int16Type>(array),
        DataType::Int32 => primitive::<Int32Type>(array),
        DataType::Int64 => primitive::<Int64Type>(array),
        DataType::UInt8 => primitive::<UInt8Type>(array),
        DataType::UInt16 => primitive::<UInt16Type>(array),
        DataType::UInt32 => primitive::<UInt32Type>(array),
        DataType::UInt64 => primitive::<UInt64Type>(array),
        DataType::Float32 => {
            let arr = array.as_primitive::<Float32Type>();
            (0..len).map(|i| float_value(arr.value(i) as f64)).collect()
        }
        DataType::Float64 => {
            let arr = array.as_primitive::<Float64Type>();
            (0..len).map(|i| float_value(arr.value(i))).collect()
        }
        DataType::Utf8 => {
            let arr = array.as_string::<i32>();
            (0..len).map(|i| Value::String(arr.value(i).to_string())).collect()
        }
        DataType::LargeUtf8 => {
            let arr = array.as_string::<i64>();
            (0..len).map(|i| Value::String(arr.value(i).to_string())).collect()
        }
        _ => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
            (0..len)
                .map(|i| Value::String(formatter.value(i).to_string()))
                .collect()
        }
    };

    // Nulls are applied last so the typed paths above can read every slot
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(i, v)| if array.is_null(i) { Value::Null } else { v })
        .collect())
}

fn primitive<T>(array: &ArrayRef) -> Vec<serde_json::Value>
where
    T: arrow::datatypes::ArrowPrimitiveType,
    T::Native: Into<serde_json::Number>,
{
    let arr = array.as_primitive::<T>();
    (0..arr.len())
        .map(|i| serde_json::Value::Number(arr.value(i).into()))
        .collect()
}

fn float_value(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
