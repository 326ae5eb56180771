/// Result types of SQL functions: SpatiaLite geometry constructors,
/// transforms and accessors, plus the SQLite scalar and aggregate built-ins.
///
/// Names match case-insensitively and an `ST_` prefix is optional
/// (`ST_Union` and `union` share a rule). Functions without a rule return
/// `None` and the caller degrades the column to `Invalid`.
use crate::schema::ColumnType;
use crate::types::{ScalarType, Value, WkbType};

fn normalize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.strip_prefix("st_") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => lower,
    }
}

/// Whether the result keeps the name of a plain column passed as first argument.
pub(super) fn keeps_argument_name(name: &str) -> bool {
    let name = normalize(name);
    geometry_transform(&name).is_some()
        || matches!(name.as_str(), "setsrid" | "transform" | "min" | "max")
}

/// Result type of `name(args...)`, arguments already typed.
pub(super) fn function_type(name: &str, args: &[ColumnType]) -> Option<ColumnType> {
    let name = normalize(name);

    if let Some(wkb_type) = constructor(&name) {
        return Some(construct(&name, wkb_type, args));
    }

    if let Some(transform) = geometry_transform(&name) {
        return Some(match arg_geometry(args, 0) {
            Some((wkb_type, srid)) => {
                let srid = if transform == Transform::DropSrid { None } else { srid };
                ColumnType::geometry("", transform.apply(wkb_type), srid)
            }
            None => ColumnType::invalid(),
        });
    }

    if let Some(scalar_type) = spatial_scalar(&name) {
        return Some(ColumnType::scalar("", scalar_type));
    }

    builtin(&name, args)
}

// Geometry constructors

fn constructor(name: &str) -> Option<WkbType> {
    let family = name
        .strip_suffix("fromtext")
        .or_else(|| name.strip_suffix("fromwkb"))?;
    Some(match family {
        "geom" | "geometry" => WkbType::Unknown,
        "point" => WkbType::Point,
        "line" | "linestring" => WkbType::LineString,
        "poly" | "polygon" => WkbType::Polygon,
        "mpoint" | "multipoint" => WkbType::MultiPoint,
        "mline" | "multilinestring" => WkbType::MultiLineString,
        "mpoly" | "multipolygon" => WkbType::MultiPolygon,
        "geomcoll" | "geometrycollection" => WkbType::GeometryCollection,
        _ => return None,
    })
}

fn construct(name: &str, wkb_type: WkbType, args: &[ColumnType]) -> ColumnType {
    let wkb_type = if wkb_type == WkbType::Unknown && name.ends_with("fromtext") {
        args.first()
            .and_then(|a| a.value())
            .and_then(Value::as_str)
            .and_then(wkt_type)
            .unwrap_or(WkbType::Unknown)
    } else {
        wkb_type
    };
    let srid = arg_int(args, 1);

    // Nothing is known about a generic geometry without a reference system
    if wkb_type == WkbType::Unknown && srid.is_none() {
        return ColumnType::invalid();
    }
    ColumnType::geometry("", wkb_type, srid)
}

/// Geometry type announced by the leading keyword of a WKT string,
/// e.g. `POINT Z (1 2 3)` is a 25D point.
fn wkt_type(wkt: &str) -> Option<WkbType> {
    let tag: String = wkt
        .trim_start()
        .chars()
        .take_while(|c| *c != '(')
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    // Measures do not change the stored type
    let tag = tag
        .strip_suffix("ZM")
        .map(|b| format!("{}Z", b))
        .or_else(|| tag.strip_suffix('M').map(str::to_string))
        .unwrap_or(tag);
    WkbType::from_type_name(&tag)
}

// Geometry to geometry

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Keep,
    To25d,
    To2d,
    ToMulti,
    ToSingle,
    Fixed(WkbType),
    /// Result type and reference system depend on the data.
    DropSrid,
    /// The reference system of the first argument survives, the type does not.
    Generic,
}

impl Transform {
    fn apply(self, wkb_type: WkbType) -> WkbType {
        match self {
            Transform::Keep => wkb_type,
            Transform::To25d => wkb_type.to_25d(),
            Transform::To2d => wkb_type.to_2d(),
            Transform::ToMulti => wkb_type.to_multi(),
            Transform::ToSingle => wkb_type.to_single(),
            Transform::Fixed(t) => t,
            Transform::DropSrid | Transform::Generic => WkbType::Unknown,
        }
    }
}

fn geometry_transform(name: &str) -> Option<Transform> {
    Some(match name {
        "union" | "simplify" | "simplifypreservetopology" | "reverse" | "translate"
        | "shiftcoords" | "shiftcoordinates" | "scalecoords" | "scalecoordinates"
        | "rotatecoords" | "rotatecoordinates" | "snaptogrid" | "forcelhr" => Transform::Keep,
        "casttoxyz" | "force_3d" | "force3d" => Transform::To25d,
        "casttoxy" | "force_2d" | "force2d" => Transform::To2d,
        "casttomulti" | "collect" => Transform::ToMulti,
        "casttosingle" => Transform::ToSingle,
        "casttopoint" | "centroid" | "pointonsurface" | "startpoint" | "endpoint"
        | "pointn" => Transform::Fixed(WkbType::Point),
        "casttolinestring" | "makeline" | "boundary" => Transform::Fixed(WkbType::LineString),
        "casttopolygon" | "polygonize" | "extent" | "envelope" | "buffer" | "convexhull"
        | "makepolygon" => Transform::Fixed(WkbType::Polygon),
        "casttomultipoint" => Transform::Fixed(WkbType::MultiPoint),
        "casttomultilinestring" => Transform::Fixed(WkbType::MultiLineString),
        "casttomultipolygon" => Transform::Fixed(WkbType::MultiPolygon),
        "casttogeometrycollection" => Transform::Fixed(WkbType::GeometryCollection),
        "intersection" | "difference" | "symdifference" => Transform::Generic,
        "linemerge" | "unaryunion" => Transform::DropSrid,
        _ => return None,
    })
}

// Spatial functions returning plain values

fn spatial_scalar(name: &str) -> Option<ScalarType> {
    Some(match name {
        "area" | "glength" | "perimeter" | "distance" | "x" | "y" | "z" | "m"
        | "minx" | "miny" | "maxx" | "maxy" | "minz" | "maxz" | "hausdorffdistance" => {
            ScalarType::Double
        }
        "srid" | "npoints" | "numpoints" | "numgeometries" | "numinteriorrings"
        | "isvalid" | "intersects" | "contains" | "within" | "touches" | "equals"
        | "disjoint" | "crosses" | "overlaps" | "covers" | "coveredby" | "issimple"
        | "isempty" | "isclosed" | "isring" | "dimension" | "coorddimension" => {
            ScalarType::Int
        }
        "astext" | "aswkt" | "asewkt" | "geometrytype" | "asgeojson" | "askml" | "asgml"
        | "assvg" | "isvalidreason" => ScalarType::String,
        _ => return None,
    })
}

// SQLite built-ins

fn builtin(name: &str, args: &[ColumnType]) -> Option<ColumnType> {
    let first_scalar = args.first().and_then(ColumnType::scalar_type);

    Some(match name {
        "makepoint" | "makepointz" | "makepointm" | "makepointzm" => {
            let (wkb_type, srid_index) = match name {
                "makepointz" => (WkbType::Point25D, 3),
                "makepointm" => (WkbType::Point, 3),
                "makepointzm" => (WkbType::Point25D, 4),
                _ => (WkbType::Point, 2),
            };
            ColumnType::geometry("", wkb_type, arg_int(args, srid_index))
        }
        "setsrid" | "transform" => {
            let wkb_type = arg_geometry(args, 0)
                .map(|(t, _)| t)
                .unwrap_or(WkbType::Unknown);
            ColumnType::geometry("", wkb_type, arg_int(args, 1))
        }

        "count" => ColumnType::scalar("", ScalarType::Int),
        "avg" | "total" => ColumnType::scalar("", ScalarType::Double),
        "sum" => ColumnType::scalar(
            "",
            if first_scalar == Some(ScalarType::Int) {
                ScalarType::Int
            } else {
                ScalarType::Double
            },
        ),
        "group_concat" => ColumnType::scalar("", ScalarType::String),
        // Single argument: aggregate over the column
        "min" | "max" if args.len() == 1 => args[0].clone().into_non_constant().with_name(""),
        "min" | "max" | "coalesce" | "ifnull" | "nullif" => {
            match args.iter().find(|a| !a.is_invalid()) {
                Some(a) => a.clone().into_non_constant().with_name(""),
                None => ColumnType::invalid(),
            }
        }

        "abs" => match args.first() {
            Some(a) if a.is_geometry() => ColumnType::invalid(),
            Some(a) => match a.value() {
                Some(Value::Integer(n)) => match n.checked_abs() {
                    Some(n) => ColumnType::constant(Value::Integer(n)),
                    None => ColumnType::scalar("", ScalarType::Int),
                },
                Some(Value::Double(x)) => ColumnType::constant(Value::Double(x.abs())),
                _ if a.scalar_type() == Some(ScalarType::Int) => {
                    ColumnType::scalar("", ScalarType::Int)
                }
                _ => ColumnType::scalar("", ScalarType::Double),
            },
            None => ColumnType::invalid(),
        },
        "round" => match (arg_value(args, 0).and_then(Value::as_f64), args.len()) {
            (Some(x), 1) => ColumnType::constant(Value::Double(x.round())),
            (Some(x), 2) => match arg_int(args, 1) {
                Some(digits) if (0..=15).contains(&digits) => {
                    let scale = 10f64.powi(digits as i32);
                    ColumnType::constant(Value::Double((x * scale).round() / scale))
                }
                _ => ColumnType::scalar("", ScalarType::Double),
            },
            _ => ColumnType::scalar("", ScalarType::Double),
        },

        "lower" | "upper" | "trim" | "ltrim" | "rtrim" if args.len() == 1 => {
            match arg_value(args, 0).and_then(Value::as_str) {
                Some(s) => ColumnType::constant(Value::Text(match name {
                    "lower" => s.to_lowercase(),
                    "upper" => s.to_uppercase(),
                    "trim" => s.trim_matches(' ').to_string(),
                    "ltrim" => s.trim_start_matches(' ').to_string(),
                    _ => s.trim_end_matches(' ').to_string(),
                })),
                None => ColumnType::scalar("", ScalarType::String),
            }
        }
        "lower" | "upper" | "trim" | "ltrim" | "rtrim" | "substr" | "substring" | "replace"
        | "printf" | "format" | "quote" | "hex" | "typeof" | "char" | "sqlite_version" => {
            ColumnType::scalar("", ScalarType::String)
        }

        // ST_Length of a geometry, or the character count of a string
        "length" if args.first().is_some_and(ColumnType::is_geometry) => {
            ColumnType::scalar("", ScalarType::Double)
        }
        "length" => match arg_value(args, 0).and_then(Value::as_str) {
            Some(s) => ColumnType::constant(Value::Integer(s.chars().count() as i64)),
            None => ColumnType::scalar("", ScalarType::Int),
        },
        "instr" | "unicode" | "random" | "changes" | "total_changes" | "last_insert_rowid"
        | "sign" => ColumnType::scalar("", ScalarType::Int),

        _ => return None,
    })
}

// Argument helpers

fn arg_value(args: &[ColumnType], index: usize) -> Option<&Value> {
    args.get(index).and_then(ColumnType::value)
}

fn arg_int(args: &[ColumnType], index: usize) -> Option<i64> {
    arg_value(args, index).and_then(Value::as_i64)
}

fn arg_geometry(args: &[ColumnType], index: usize) -> Option<(WkbType, Option<i64>)> {
    let arg = args.get(index)?;
    Some((arg.wkb_type()?, arg.srid()))
}
