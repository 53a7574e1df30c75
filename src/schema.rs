//! Declarative record schema and the projection derived from it
//!
//! One explicit field table ([`FIELDS`]) drives both the provisioning DDL and
//! the batch-insert statement, so the column set and the binding order can
//! never drift apart. The projection is derived once at pipeline startup and
//! shared read-only for the life of the process.

use thiserror::Error;

/// Storage column type of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Second-precision timestamp
    DateTime,
    /// Variable-length string
    String,
    /// 8-bit unsigned (also the storage type for booleans)
    UInt8,
    /// 16-bit unsigned
    UInt16,
    /// 64-bit unsigned
    UInt64,
    /// 64-bit signed
    Int64,
    /// 64-bit float
    Float64,
}

impl ColumnType {
    /// Storage type name as it appears in DDL.
    pub fn ddl_name(self) -> &'static str {
        match self {
            ColumnType::DateTime => "DateTime",
            ColumnType::String => "String",
            ColumnType::UInt8 => "UInt8",
            ColumnType::UInt16 => "UInt16",
            ColumnType::UInt64 => "UInt64",
            ColumnType::Int64 => "Int64",
            ColumnType::Float64 => "Float64",
        }
    }
}

/// Declaration of one storable record field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Column name (equals the record's serialized field name)
    pub name: &'static str,
    /// Storage column type
    pub column: ColumnType,
    /// Whether the column is nullable in storage
    pub nullable: bool,
}

const fn field(name: &'static str, column: ColumnType) -> FieldDef {
    FieldDef {
        name,
        column,
        nullable: false,
    }
}

const fn nullable(name: &'static str, column: ColumnType) -> FieldDef {
    FieldDef {
        name,
        column,
        nullable: true,
    }
}

/// The full record schema, in [`crate::record::AccessRecord`] declaration
/// order. This order is the canonical column order for DDL and inserts.
pub const FIELDS: &[FieldDef] = &[
    field("time", ColumnType::DateTime),
    field("client_time", ColumnType::DateTime),
    field("region", ColumnType::String),
    field("location", ColumnType::String),
    field("host", ColumnType::String),
    field("method", ColumnType::String),
    field("request_uri", ColumnType::String),
    field("version", ColumnType::String),
    field("remote_addr", ColumnType::String),
    field("content_length", ColumnType::Int64),
    field("os", ColumnType::String),
    field("browser", ColumnType::String),
    field("country", ColumnType::String),
    field("city", ColumnType::String),
    field("latitude", ColumnType::Float64),
    field("longitude", ColumnType::Float64),
    field("eu_member", ColumnType::UInt8),
    field("duration_us", ColumnType::UInt64),
    field("db_duration_us", ColumnType::UInt64),
    field("user", ColumnType::String),
    field("user_agent", ColumnType::String),
    nullable("source", ColumnType::String),
    nullable("target", ColumnType::String),
    nullable("params", ColumnType::String),
    field("status", ColumnType::UInt16),
    nullable("response", ColumnType::String),
    field("response_length", ColumnType::UInt64),
    nullable("error", ColumnType::String),
];

/// Errors from schema derivation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Every declared field was excluded
    #[error("record schema has no storable fields")]
    EmptySchema,

    /// The same field name is declared twice
    #[error("duplicate field name in schema: {0}")]
    DuplicateField(&'static str),
}

/// The ordered set of storable field names, derived once at startup.
#[derive(Debug, Clone)]
pub struct SchemaProjection {
    fields: Vec<FieldDef>,
}

impl SchemaProjection {
    /// Derive the projection from the declared schema, dropping any field
    /// named in `exclude` (internal-only fields used for routing rather than
    /// storage).
    pub fn derive(exclude: &[&str]) -> Result<Self, SchemaError> {
        let fields: Vec<FieldDef> = FIELDS
            .iter()
            .filter(|f| !exclude.contains(&f.name))
            .copied()
            .collect();

        if fields.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        for (i, f) in fields.iter().enumerate() {
            if fields[..i].iter().any(|other| other.name == f.name) {
                return Err(SchemaError::DuplicateField(f.name));
            }
        }

        Ok(Self { fields })
    }

    /// Storable fields in projection order.
    pub fn columns(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Comma-joined column names, projection order.
    pub fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Idempotent provisioning DDL for the destination table.
    pub fn create_table_ddl(&self, table: &str) -> String {
        let mut ddl = format!("CREATE TABLE IF NOT EXISTS {table} (\n");
        for (i, f) in self.fields.iter().enumerate() {
            let column_type = if f.nullable {
                format!("Nullable({})", f.column.ddl_name())
            } else {
                f.column.ddl_name().to_string()
            };
            let sep = if i + 1 == self.fields.len() { "" } else { "," };
            ddl.push_str(&format!("    {} {}{}\n", f.name, column_type, sep));
        }
        ddl.push_str(") ENGINE = MergeTree() ORDER BY time PARTITION BY toYYYYMM(time)");
        ddl
    }

    /// Batch-insert statement template bound to `table`, projection order.
    pub fn insert_statement(&self, table: &str) -> InsertStatement {
        let columns: Vec<&'static str> = self.fields.iter().map(|f| f.name).collect();
        let sql = format!("INSERT INTO {table} ({})", self.column_list());
        InsertStatement {
            table: table.to_string(),
            columns,
            sql,
        }
    }
}

/// Prepared insert template: table, ordered column list, statement text.
///
/// Built once by the writer and handed to the store on every transaction;
/// drivers verify their native binding order against [`columns`] before
/// staging rows.
///
/// [`columns`]: InsertStatement::columns
#[derive(Debug, Clone)]
pub struct InsertStatement {
    table: String,
    columns: Vec<&'static str>,
    sql: String,
}

impl InsertStatement {
    /// Destination table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names in binding order.
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    /// Statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
