pub mod catalog;
pub mod column;

pub use catalog::{TableDef, TableDefs};
pub use column::{ColumnKind, ColumnType};
