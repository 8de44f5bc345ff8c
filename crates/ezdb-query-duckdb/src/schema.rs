//! Arrow to DuckDB column type mapping for registered tables

use ezdb_query::arrow::datatypes::{DataType, Schema, TimeUnit};
use ezdb_query::escape::quote_identifier;

/// DuckDB column type for an Arrow type, if the type can be registered
pub fn column_type(data_type: &DataType) -> Option<String> {
    let name = match data_type {
        DataType::Null => "INTEGER",
        DataType::Boolean => "BOOLEAN",
        DataType::Int8 => "TINYINT",
        DataType::Int16 => "SMALLINT",
        DataType::Int32 => "INTEGER",
        DataType::Int64 => "BIGINT",
        DataType::UInt8 => "UTINYINT",
        DataType::UInt16 => "USMALLINT",
        DataType::UInt32 => "UINTEGER",
        DataType::UInt64 => "UBIGINT",
        DataType::Float16 | DataType::Float32 => "FLOAT",
        DataType::Float64 => "DOUBLE",
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "VARCHAR",
        DataType::Binary
        | DataType::LargeBinary
        | DataType::BinaryView
        | DataType::FixedSizeBinary(_) => "BLOB",
        DataType::Date32 | DataType::Date64 => "DATE",
        DataType::Time32(_) | DataType::Time64(_) => "TIME",
        DataType::Timestamp(_, Some(_)) => "TIMESTAMPTZ",
        DataType::Timestamp(TimeUnit::Second, None) => "TIMESTAMP_S",
        DataType::Timestamp(TimeUnit::Millisecond, None) => "TIMESTAMP_MS",
        DataType::Timestamp(TimeUnit::Microsecond, None) => "TIMESTAMP",
        DataType::Timestamp(TimeUnit::Nanosecond, None) => "TIMESTAMP_NS",
        DataType::Interval(_) | DataType::Duration(_) => "INTERVAL",
        DataType::Decimal128(precision, scale) => {
            return Some(format!("DECIMAL({}, {})", precision, scale))
        }
        DataType::List(field) | DataType::LargeList(field) => {
            return column_type(field.data_type()).map(|inner| format!("{}[]", inner))
        }
        DataType::Struct(fields) => {
            let members = fields
                .iter()
                .map(|f| {
                    column_type(f.data_type())
                        .map(|ty| format!("{} {}", quote_identifier(f.name()), ty))
                })
                .collect::<Option<Vec<_>>>()?;
            return Some(format!("STRUCT({})", members.join(", ")));
        }
        _ => return None,
    };
    Some(name.to_string())
}

/// `CREATE TEMP TABLE` statement matching `schema`.
///
/// Returns the name of the first column whose type cannot be mapped as the error.
pub fn create_table_sql(name: &str, schema: &Schema) -> Result<String, String> {
    if schema.fields().is_empty() {
        return Err("table has no columns".to_string());
    }

    let columns = schema
        .fields()
        .iter()
        .map(|field| match column_type(field.data_type()) {
            Some(ty) => Ok(format!("{} {}", quote_identifier(field.name()), ty)),
            None => Err(format!(
                "column '{}' has unsupported type {}",
                field.name(),
                field.data_type()
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(format!(
        "CREATE TEMP TABLE {} ({})",
        quote_identifier(name),
        columns.join(", ")
    ))
}
