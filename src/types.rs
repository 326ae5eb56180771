use std::fmt;

/// A statically known value, produced by literals and constant folding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Scalar type carried by this value. NULL has no type of its own.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Value::Integer(_) => ScalarType::Int,
            Value::Double(_) => ScalarType::Double,
            Value::Text(_) => ScalarType::String,
            Value::Null => ScalarType::Invalid,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Int,
    Double,
    String,
    /// Type could not be determined statically.
    Invalid,
}

impl ScalarType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ScalarType::Int | ScalarType::Double)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Int => write!(f, "int"),
            ScalarType::Double => write!(f, "real"),
            ScalarType::String => write!(f, "string"),
            ScalarType::Invalid => write!(f, "invalid"),
        }
    }
}

const WKB_25D_FLAG: u32 = 0x8000_0000;

/// Well-known-binary geometry type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WkbType {
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    NoGeometry,
    Point25D,
    LineString25D,
    Polygon25D,
    MultiPoint25D,
    MultiLineString25D,
    MultiPolygon25D,
}

impl WkbType {
    /// Numeric tag; 25D variants set the high bit over their flat code.
    pub fn code(self) -> u32 {
        match self {
            WkbType::Unknown => 0,
            WkbType::Point => 1,
            WkbType::LineString => 2,
            WkbType::Polygon => 3,
            WkbType::MultiPoint => 4,
            WkbType::MultiLineString => 5,
            WkbType::MultiPolygon => 6,
            WkbType::GeometryCollection => 7,
            WkbType::NoGeometry => 100,
            WkbType::Point25D
            | WkbType::LineString25D
            | WkbType::Polygon25D
            | WkbType::MultiPoint25D
            | WkbType::MultiLineString25D
            | WkbType::MultiPolygon25D => WKB_25D_FLAG | self.to_2d().code(),
        }
    }

    pub fn from_code(code: u32) -> Option<WkbType> {
        if code & WKB_25D_FLAG != 0 {
            let flat = WkbType::from_code(code & !WKB_25D_FLAG)?;
            return match flat {
                WkbType::Point
                | WkbType::LineString
                | WkbType::Polygon
                | WkbType::MultiPoint
                | WkbType::MultiLineString
                | WkbType::MultiPolygon => Some(flat.to_25d()),
                _ => None,
            };
        }
        match code {
            0 => Some(WkbType::Unknown),
            1 => Some(WkbType::Point),
            2 => Some(WkbType::LineString),
            3 => Some(WkbType::Polygon),
            4 => Some(WkbType::MultiPoint),
            5 => Some(WkbType::MultiLineString),
            6 => Some(WkbType::MultiPolygon),
            7 => Some(WkbType::GeometryCollection),
            100 => Some(WkbType::NoGeometry),
            1001..=1006 => WkbType::from_code(code - 1000).map(WkbType::to_25d),
            _ => None,
        }
    }

    /// SpatiaLite geometry code: flat code, plus 1000 for XYZ geometries.
    pub fn spatialite_code(self) -> u32 {
        match self {
            WkbType::NoGeometry => 0,
            t if t.is_25d() => 1000 + t.to_2d().code(),
            t => t.code(),
        }
    }

    pub fn coord_dimension(self) -> u8 {
        match self {
            WkbType::NoGeometry => 0,
            t if t.is_25d() => 3,
            _ => 2,
        }
    }

    pub fn is_25d(self) -> bool {
        matches!(
            self,
            WkbType::Point25D
                | WkbType::LineString25D
                | WkbType::Polygon25D
                | WkbType::MultiPoint25D
                | WkbType::MultiLineString25D
                | WkbType::MultiPolygon25D
        )
    }

    pub fn to_25d(self) -> WkbType {
        match self {
            WkbType::Point => WkbType::Point25D,
            WkbType::LineString => WkbType::LineString25D,
            WkbType::Polygon => WkbType::Polygon25D,
            WkbType::MultiPoint => WkbType::MultiPoint25D,
            WkbType::MultiLineString => WkbType::MultiLineString25D,
            WkbType::MultiPolygon => WkbType::MultiPolygon25D,
            other => other,
        }
    }

    pub fn to_2d(self) -> WkbType {
        match self {
            WkbType::Point25D => WkbType::Point,
            WkbType::LineString25D => WkbType::LineString,
            WkbType::Polygon25D => WkbType::Polygon,
            WkbType::MultiPoint25D => WkbType::MultiPoint,
            WkbType::MultiLineString25D => WkbType::MultiLineString,
            WkbType::MultiPolygon25D => WkbType::MultiPolygon,
            other => other,
        }
    }

    pub fn to_multi(self) -> WkbType {
        let multi = match self.to_2d() {
            WkbType::Point => WkbType::MultiPoint,
            WkbType::LineString => WkbType::MultiLineString,
            WkbType::Polygon => WkbType::MultiPolygon,
            other => return other,
        };
        if self.is_25d() {
            multi.to_25d()
        } else {
            multi
        }
    }

    pub fn to_single(self) -> WkbType {
        let single = match self.to_2d() {
            WkbType::MultiPoint => WkbType::Point,
            WkbType::MultiLineString => WkbType::LineString,
            WkbType::MultiPolygon => WkbType::Polygon,
            other => return other,
        };
        if self.is_25d() {
            single.to_25d()
        } else {
            single
        }
    }

    /// Geometry keyword used in SQL declarations (`POINT`, `MULTIPOLYGON`, ...).
    pub fn type_name(self) -> &'static str {
        match self.to_2d() {
            WkbType::Point => "POINT",
            WkbType::LineString => "LINESTRING",
            WkbType::Polygon => "POLYGON",
            WkbType::MultiPoint => "MULTIPOINT",
            WkbType::MultiLineString => "MULTILINESTRING",
            WkbType::MultiPolygon => "MULTIPOLYGON",
            WkbType::GeometryCollection => "GEOMETRYCOLLECTION",
            WkbType::NoGeometry => "NONE",
            _ => "GEOMETRY",
        }
    }

    /// Reverse of [`WkbType::type_name`]. Accepts a trailing `Z` or `25D`
    /// (`POINTZ`, `LINESTRING25D`, `POLYGON Z`), case-insensitively.
    pub fn from_type_name(name: &str) -> Option<WkbType> {
        let upper = name.trim().to_ascii_uppercase();
        let (base, elevated) = if let Some(b) = upper.strip_suffix("25D") {
            (b.trim_end(), true)
        } else if let Some(b) = upper.strip_suffix('Z') {
            (b.trim_end(), true)
        } else {
            (upper.as_str(), false)
        };
        let flat = match base {
            "POINT" => WkbType::Point,
            "LINESTRING" => WkbType::LineString,
            "POLYGON" => WkbType::Polygon,
            "MULTIPOINT" => WkbType::MultiPoint,
            "MULTILINESTRING" => WkbType::MultiLineString,
            "MULTIPOLYGON" => WkbType::MultiPolygon,
            "GEOMETRYCOLLECTION" if !elevated => WkbType::GeometryCollection,
            "GEOMETRY" if !elevated => WkbType::Unknown,
            _ => return None,
        };
        Some(if elevated { flat.to_25d() } else { flat })
    }
}

impl fmt::Display for WkbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_25d() {
            write!(f, "{}25D", self.type_name())
        } else {
            write!(f, "{}", self.type_name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wkb_codes() {
        assert_eq!(WkbType::Point25D.code(), 0x8000_0001);
        assert_eq!(WkbType::from_code(0x8000_0002), Some(WkbType::LineString25D));
        assert_eq!(WkbType::from_code(1006), Some(WkbType::MultiPolygon25D));
        assert_eq!(WkbType::from_code(42), None);
        assert_eq!(WkbType::MultiPolygon25D.spatialite_code(), 1006);
        assert_eq!(WkbType::Polygon.spatialite_code(), 3);
    }

    #[test]
    fn test_wkb_dimension_changes() {
        assert_eq!(WkbType::Point.to_25d(), WkbType::Point25D);
        assert_eq!(WkbType::Point25D.to_2d(), WkbType::Point);
        assert_eq!(WkbType::LineString25D.to_multi(), WkbType::MultiLineString25D);
        assert_eq!(WkbType::MultiPolygon.to_single(), WkbType::Polygon);
        assert_eq!(WkbType::Unknown.to_25d(), WkbType::Unknown);
        assert_eq!(WkbType::Polygon25D.coord_dimension(), 3);
    }

    #[test]
    fn test_wkb_type_names() {
        assert_eq!(WkbType::from_type_name("linestring"), Some(WkbType::LineString));
        assert_eq!(WkbType::from_type_name("POINT Z"), Some(WkbType::Point25D));
        assert_eq!(WkbType::from_type_name("MultiPolygon25D"), Some(WkbType::MultiPolygon25D));
        assert_eq!(WkbType::from_type_name("TEXT"), None);
        assert_eq!(WkbType::MultiPoint25D.to_string(), "MULTIPOINT25D");
    }

    #[test]
    fn test_value_display_and_eq() {
        assert_eq!(Value::Integer(3), 3);
        assert_eq!(Value::Text("ok".into()), "ok");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.scalar_type(), ScalarType::Invalid);
    }
}
