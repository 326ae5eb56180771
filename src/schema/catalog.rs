//! Schema catalogue consulted by type inference.
//!
//! A `TableDefs` maps a table name (case-sensitive, exactly as written once
//! quotes are stripped) to the ordered columns of that table. It can be built
//! programmatically or loaded from JSON:
//!
//! ```json
//! { "t": [ {"name": "geom", "type": "LINESTRING", "srid": 4326},
//!          {"name": "a", "type": "INT"} ] }
//! ```
use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::schema::column::ColumnType;

/// Ordered columns of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDef {
    columns: Vec<ColumnType>,
}

impl TableDef {
    pub fn new() -> Self {
        TableDef::default()
    }

    /// Builder-style append.
    pub fn column(mut self, column: ColumnType) -> Self {
        self.columns.push(column);
        self
    }

    pub fn push(&mut self, column: ColumnType) {
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[ColumnType] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column lookup is ASCII case-insensitive, like SQLite's.
    pub fn find(&self, name: &str) -> Option<&ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl From<Vec<ColumnType>> for TableDef {
    fn from(columns: Vec<ColumnType>) -> Self {
        TableDef { columns }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDefs {
    tables: BTreeMap<String, TableDef>,
}

impl TableDefs {
    pub fn new() -> Self {
        TableDefs::default()
    }

    pub fn insert(&mut self, name: &str, table: TableDef) {
        self.tables.insert(name.to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableDef)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse a JSON catalogue: an object whose keys are table names and whose
    /// values are arrays of `{"name", "type", "srid"?}` objects.
    pub fn from_json(text: &str) -> Result<Self> {
        let root: JsonValue = serde_json::from_str(text)
            .map_err(|e| Error::Schema(format!("invalid JSON: {}", e)))?;
        let obj = root
            .as_object()
            .ok_or_else(|| Error::Schema("catalogue must be a JSON object".into()))?;

        let mut defs = TableDefs::new();
        for (table_name, columns) in obj {
            let columns = columns.as_array().ok_or_else(|| {
                Error::Schema(format!("table '{}' must be an array of columns", table_name))
            })?;
            let mut table = TableDef::new();
            for column in columns {
                table.push(column_from_json(table_name, column)?);
            }
            defs.insert(table_name, table);
        }
        Ok(defs)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        TableDefs::from_json(&text)
    }
}

fn column_from_json(table_name: &str, column: &JsonValue) -> Result<ColumnType> {
    let name = column
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| Error::Schema(format!("column of '{}' without a name", table_name)))?;
    let declared = column
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| {
            Error::Schema(format!("column '{}.{}' without a type", table_name, name))
        })?;
    let srid = match column.get("srid") {
        None | Some(JsonValue::Null) => None,
        Some(v) => Some(v.as_i64().ok_or_else(|| {
            Error::Schema(format!("column '{}.{}': srid must be an integer", table_name, name))
        })?),
    };
    Ok(ColumnType::from_declared_type(name, declared, srid))
}
