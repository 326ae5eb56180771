/// Virtual layer definitions.
///
/// A virtual layer is described by a URI such as
///
/// ```text
/// /tmp/layer.sqlite?layer=ogr:%2Fdata%2Froads.shp:roads&query=SELECT%20*%20FROM%20roads&uid=id&geometry=geom:2:4326
/// ```
///
/// The path part is optional (a temporary layer); the query part lists the
/// source layers, attribute type overrides, the SQL query, the unique id
/// column and the geometry column.
use std::fmt::Write as _;

use regex::Regex;
use tracing::debug;

use crate::error::{DefinitionError, Result};
use crate::schema::{ColumnType, TableDefs};
use crate::sql::infer::column_types;
use crate::sql::parser::parse_sql;
use crate::sql::tables::referenced_tables;
use crate::types::{ScalarType, WkbType};

/// A layer the virtual layer reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLayer {
    /// `layer=<provider>:<source>:<name>`, opened from its data source.
    Embedded {
        provider: String,
        source: String,
        name: String,
    },
    /// `layer_id=<id>`, an already loaded layer; its id is its table name.
    ById(String),
}

impl SourceLayer {
    /// Table name under which the query sees this layer.
    pub fn table_name(&self) -> &str {
        match self {
            SourceLayer::Embedded { name, .. } => name,
            SourceLayer::ById(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeometryField {
    /// Detect from the query result.
    #[default]
    Auto,
    /// `geometry=<name>`
    Named(String),
    /// `geometry=<name>:<wkb type code>:<srid>`
    Typed {
        name: String,
        wkb_type: WkbType,
        srid: i64,
    },
    /// `nogeometry`
    Disabled,
}

impl GeometryField {
    fn name(&self) -> Option<&str> {
        match self {
            GeometryField::Named(name) | GeometryField::Typed { name, .. } => Some(name),
            GeometryField::Auto | GeometryField::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualLayerDefinition {
    /// Empty for a temporary layer.
    pub path: String,
    pub source_layers: Vec<SourceLayer>,
    /// `field=<name>:<int|real|string>` overrides, in declaration order.
    pub fields: Vec<(String, ScalarType)>,
    pub query: Option<String>,
    pub uid: Option<String>,
    pub geometry: GeometryField,
}

/// Attribute and geometry columns a virtual layer exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSchema {
    pub fields: Vec<ColumnType>,
    pub geometry: Option<ColumnType>,
}

impl VirtualLayerDefinition {
    pub fn from_uri(uri: &str) -> std::result::Result<Self, DefinitionError> {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        let mut def = VirtualLayerDefinition {
            path: percent_decode(path, false)?,
            ..Default::default()
        };

        for item in query.split('&').filter(|item| !item.is_empty()) {
            let (key, value) = match item.split_once('=') {
                Some((key, value)) => (key, percent_decode(value, true)?),
                None => (item, String::new()),
            };
            match key {
                "layer" => def.source_layers.push(parse_embedded_layer(&value)?),
                "layer_id" => def.source_layers.push(SourceLayer::ById(value)),
                "field" => {
                    let (name, type_name) = value.split_once(':').ok_or_else(|| {
                        DefinitionError::Malformed(format!("field without a type: {}", value))
                    })?;
                    let scalar_type = match type_name.to_ascii_lowercase().as_str() {
                        "int" | "integer" => ScalarType::Int,
                        "real" | "double" => ScalarType::Double,
                        "string" | "text" => ScalarType::String,
                        other => {
                            return Err(DefinitionError::Malformed(format!(
                                "unknown field type '{}' for {}",
                                other, name
                            )))
                        }
                    };
                    def.fields.push((name.to_string(), scalar_type));
                }
                "geometry" => def.geometry = parse_geometry(&value)?,
                "nogeometry" => def.geometry = GeometryField::Disabled,
                "uid" => def.uid = Some(value),
                "query" => def.query = Some(value),
                // Unknown keys are ignored
                other => debug!(key = other, "ignoring unknown definition key"),
            }
        }
        Ok(def)
    }

    pub fn to_uri(&self) -> String {
        let mut items = Vec::new();
        for layer in &self.source_layers {
            match layer {
                SourceLayer::Embedded {
                    provider,
                    source,
                    name,
                } => items.push(format!(
                    "layer={}:{}:{}",
                    percent_encode(provider),
                    percent_encode(source),
                    percent_encode(name)
                )),
                SourceLayer::ById(id) => items.push(format!("layer_id={}", percent_encode(id))),
            }
        }
        for (name, scalar_type) in &self.fields {
            items.push(format!("field={}:{}", percent_encode(name), scalar_type));
        }
        match &self.geometry {
            GeometryField::Auto => {}
            GeometryField::Named(name) => items.push(format!("geometry={}", percent_encode(name))),
            GeometryField::Typed {
                name,
                wkb_type,
                srid,
            } => items.push(format!(
                "geometry={}:{}:{}",
                percent_encode(name),
                wkb_type.code(),
                srid
            )),
            GeometryField::Disabled => items.push("nogeometry".to_string()),
        }
        if let Some(uid) = &self.uid {
            items.push(format!("uid={}", percent_encode(uid)));
        }
        if let Some(query) = &self.query {
            items.push(format!("query={}", percent_encode(query)));
        }

        let mut uri = percent_encode_path(&self.path);
        if !items.is_empty() {
            uri.push('?');
            uri.push_str(&items.join("&"));
        }
        uri
    }

    /// Consistency checks a provider performs before opening the layer.
    pub fn validate(&self) -> std::result::Result<(), DefinitionError> {
        let has_query = self.query.as_deref().is_some_and(|q| !q.trim().is_empty());
        if self.source_layers.len() > 1 && !has_query {
            return Err(DefinitionError::MissingQuery);
        }
        if has_query && self.uid.as_deref().map_or(true, str::is_empty) {
            return Err(DefinitionError::MissingUid);
        }
        if self.source_layers.len() > 1
            && self.geometry != GeometryField::Disabled
            && self.geometry.name().is_none()
        {
            return Err(DefinitionError::MissingGeometry);
        }
        Ok(())
    }

    /// Columns the layer exposes, given the schemas of its source layers.
    pub fn layer_schema(&self, tables: &TableDefs) -> Result<LayerSchema> {
        self.validate()?;

        let columns = match self.query.as_deref().filter(|q| !q.trim().is_empty()) {
            Some(query) => {
                let stmt = parse_sql(query)?;
                for table in referenced_tables(&stmt) {
                    if !self.source_layers.iter().any(|l| l.table_name() == table) {
                        return Err(DefinitionError::UnknownSource(table).into());
                    }
                }
                column_types(&stmt, tables)?
            }
            None => {
                let source = match self.source_layers.first() {
                    Some(source) => source.table_name(),
                    None => {
                        return Err(DefinitionError::Malformed(
                            "no source layer and no query".into(),
                        )
                        .into())
                    }
                };
                tables
                    .get(source)
                    .map(|t| t.columns().to_vec())
                    .ok_or_else(|| DefinitionError::UnknownSource(source.to_string()))?
            }
        };

        let mut schema = LayerSchema {
            fields: Vec::new(),
            geometry: None,
        };
        for column in columns {
            if column.is_geometry() {
                let wanted = match &self.geometry {
                    GeometryField::Disabled => false,
                    GeometryField::Auto => schema.geometry.is_none(),
                    named => named.name() == Some(column.name()),
                };
                if wanted {
                    schema.geometry = Some(column);
                }
                continue;
            }
            let column = match self.fields.iter().find(|(name, _)| name == column.name()) {
                Some((name, scalar_type)) => ColumnType::scalar(name, *scalar_type),
                None => column.into_non_constant(),
            };
            schema.fields.push(column);
        }

        // A declared type wins over the inferred one
        if let GeometryField::Typed {
            name,
            wkb_type,
            srid,
        } = &self.geometry
        {
            schema.geometry = Some(ColumnType::geometry(name, *wkb_type, *srid));
        }

        debug!(
            fields = schema.fields.len(),
            has_geometry = schema.geometry.is_some(),
            "resolved layer schema"
        );
        Ok(schema)
    }
}

fn parse_embedded_layer(value: &str) -> std::result::Result<SourceLayer, DefinitionError> {
    // The source itself may contain ':' (Windows drives, connection strings)
    let (provider, rest) = value
        .split_once(':')
        .ok_or_else(|| DefinitionError::Malformed(format!("invalid layer: {}", value)))?;
    let (source, name) = rest
        .rsplit_once(':')
        .ok_or_else(|| DefinitionError::Malformed(format!("invalid layer: {}", value)))?;
    if provider.is_empty() || name.is_empty() {
        return Err(DefinitionError::Malformed(format!("invalid layer: {}", value)));
    }
    Ok(SourceLayer::Embedded {
        provider: provider.to_string(),
        source: source.to_string(),
        name: name.to_string(),
    })
}

fn parse_geometry(value: &str) -> std::result::Result<GeometryField, DefinitionError> {
    let re = Regex::new(r"(\w+):(\d+):(\d+)")
        .map_err(|e| DefinitionError::Malformed(format!("Invalid regex: {}", e)))?;
    if let Some(caps) = re.captures(value) {
        let code: u32 = caps[2]
            .parse()
            .map_err(|_| DefinitionError::Malformed(format!("invalid geometry type: {}", value)))?;
        let wkb_type = WkbType::from_code(code)
            .ok_or_else(|| DefinitionError::Malformed(format!("unknown geometry type {}", code)))?;
        let srid = caps[3]
            .parse()
            .map_err(|_| DefinitionError::Malformed(format!("invalid srid: {}", value)))?;
        return Ok(GeometryField::Typed {
            name: caps[1].to_string(),
            wkb_type,
            srid,
        });
    }
    if value.is_empty() {
        return Err(DefinitionError::Malformed("empty geometry column".into()));
    }
    Ok(GeometryField::Named(value.to_string()))
}

fn percent_decode(s: &str, plus_as_space: bool) -> std::result::Result<String, DefinitionError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        DefinitionError::Malformed(format!("bad percent escape in '{}'", s))
                    })?;
                out.push(hex);
                i += 3;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| DefinitionError::Malformed(format!("invalid UTF-8 in '{}'", s)))
}

fn encode_with(s: &str, keep: impl Fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || keep(b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{:02X}", b);
        }
    }
    out
}

/// Encode a query value; `:` is escaped so layer fields stay separable.
fn percent_encode(s: &str) -> String {
    encode_with(s, |b| matches!(b, b'-' | b'_' | b'.' | b'~'))
}

fn percent_encode_path(s: &str) -> String {
    encode_with(s, |b| matches!(b, b'-' | b'_' | b'.' | b'~' | b'/' | b':' | b'\\'))
}
