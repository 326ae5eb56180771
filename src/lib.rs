//! vlayer-sql: static analysis of SQL queries backing virtual vector layers
//!
//! Given the SQL of a virtual layer and the schemas of its source tables:
//! - parse the query, with positioned bison-style syntax errors
//! - list the base tables it reads from
//! - infer the name, scalar/geometry type, SRID and constant value of every
//!   output column, without executing anything

pub mod error;
pub mod types;
pub mod schema;
pub mod sql;
pub mod definition;

pub use crate::definition::{LayerSchema, VirtualLayerDefinition};
pub use crate::error::{Error, Result, SyntaxError, TypeError};
pub use crate::schema::{ColumnKind, ColumnType, TableDef, TableDefs};
pub use crate::sql::infer::column_types;
pub use crate::sql::parser::parse_sql;
pub use crate::sql::tables::referenced_tables;
pub use crate::types::{ScalarType, Value, WkbType};
