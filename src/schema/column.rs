use crate::types::{ScalarType, Value, WkbType};

/// Type discriminant of a column: exactly one of scalar or geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Scalar(ScalarType),
    Geometry {
        wkb_type: WkbType,
        /// `None` when the reference system is not statically known.
        srid: Option<i64>,
    },
}

/// A schema column, or the resolved type of one output column of a query.
///
/// Invariants: a constant column is always scalar and carries its value;
/// geometry columns are never constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnType {
    name: String,
    kind: ColumnKind,
    value: Option<Value>,
}

impl ColumnType {
    pub fn scalar(name: &str, scalar_type: ScalarType) -> Self {
        ColumnType {
            name: name.to_string(),
            kind: ColumnKind::Scalar(scalar_type),
            value: None,
        }
    }

    pub fn geometry(name: &str, wkb_type: WkbType, srid: impl Into<Option<i64>>) -> Self {
        ColumnType {
            name: name.to_string(),
            kind: ColumnKind::Geometry {
                wkb_type,
                srid: srid.into(),
            },
            value: None,
        }
    }

    /// An unnamed constant; the scalar type follows the value.
    pub fn constant(value: Value) -> Self {
        if value.is_null() {
            return ColumnType::invalid();
        }
        ColumnType {
            name: String::new(),
            kind: ColumnKind::Scalar(value.scalar_type()),
            value: Some(value),
        }
    }

    /// An unnamed column of unknown type.
    pub fn invalid() -> Self {
        ColumnType::scalar("", ScalarType::Invalid)
    }

    /// Build a column from an SQL declared type, the way SQLite's
    /// `PRAGMA table_info` reports it. Unrecognized declarations are text.
    pub fn from_declared_type(name: &str, declared: &str, srid: Option<i64>) -> Self {
        if let Some(wkb_type) = WkbType::from_type_name(declared) {
            return ColumnType::geometry(name, wkb_type, srid);
        }
        let upper = declared.trim().to_ascii_uppercase();
        let scalar_type = if upper.contains("INT") {
            ScalarType::Int
        } else if upper == "REAL" || upper.contains("FLOA") || upper.contains("DOUB") {
            ScalarType::Double
        } else {
            ScalarType::String
        };
        ColumnType::scalar(name, scalar_type)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.set_name(name);
        self
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self.kind, ColumnKind::Geometry { .. })
    }

    pub fn is_constant(&self) -> bool {
        self.value.is_some()
    }

    /// The folded value, for constant columns only.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Drop constness, keeping name and type.
    pub fn into_non_constant(mut self) -> Self {
        self.value = None;
        self
    }

    /// `None` for geometry columns.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            ColumnKind::Scalar(t) => Some(t),
            ColumnKind::Geometry { .. } => None,
        }
    }

    /// `None` for scalar columns.
    pub fn wkb_type(&self) -> Option<WkbType> {
        match self.kind {
            ColumnKind::Geometry { wkb_type, .. } => Some(wkb_type),
            ColumnKind::Scalar(_) => None,
        }
    }

    pub fn srid(&self) -> Option<i64> {
        match self.kind {
            ColumnKind::Geometry { srid, .. } => srid,
            ColumnKind::Scalar(_) => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.kind == ColumnKind::Scalar(ScalarType::Invalid)
    }
}
