use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use serde_json::json;
use vlayer_sql::{
    column_types, parse_sql, referenced_tables, ColumnKind, ColumnType, TableDef, TableDefs,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(
    name = "vlayer-sql",
    about = "Inspect the output columns of a virtual layer query"
)]
struct Cli {
    /// JSON schema catalogue: {"table": [{"name", "type", "srid"?}, ...]}
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Inline table, e.g. t=geom:linestring:4326,a:int,b:int (repeatable)
    #[arg(long = "table", value_name = "SPEC")]
    tables: Vec<String>,

    /// Analyze SQL and exit
    #[arg(short = 'e')]
    execute: Option<String>,

    /// Print the referenced tables instead of the output columns
    #[arg(long = "tables")]
    list_tables: bool,

    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

/// `name=col:type[:srid],col:type[:srid],...`
fn parse_table_spec(spec: &str) -> Result<(String, TableDef), String> {
    let (name, columns) = spec
        .split_once('=')
        .ok_or_else(|| format!("Invalid table spec '{}': expected name=columns", spec))?;
    let mut table = TableDef::new();
    for column in columns.split(',').filter(|c| !c.trim().is_empty()) {
        let mut parts = column.trim().splitn(3, ':');
        let col_name = parts.next().unwrap_or_default();
        let declared = parts
            .next()
            .ok_or_else(|| format!("Column '{}' of table '{}' has no type", col_name, name))?;
        let srid = match parts.next() {
            Some(s) => Some(
                s.parse::<i64>()
                    .map_err(|_| format!("Invalid srid '{}' for column '{}'", s, col_name))?,
            ),
            None => None,
        };
        table.push(ColumnType::from_declared_type(col_name, declared, srid));
    }
    Ok((name.to_string(), table))
}

fn load_tables(cli: &Cli) -> Result<TableDefs, String> {
    let mut defs = match &cli.schema {
        Some(path) => TableDefs::from_json_file(path)
            .map_err(|e| format!("Failed to load schema {}: {}", path.display(), e))?,
        None => TableDefs::new(),
    };
    for spec in &cli.tables {
        let (name, table) = parse_table_spec(spec)?;
        defs.insert(&name, table);
    }
    Ok(defs)
}

fn type_label(column: &ColumnType) -> String {
    match column.kind() {
        ColumnKind::Scalar(t) => t.to_string(),
        ColumnKind::Geometry { wkb_type, .. } => wkb_type.to_string(),
    }
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter())
        .map(|(cell, w)| format!("| {:<width$} ", cell, width = w))
        .collect::<String>()
        + "|"
}

fn format_columns(columns: &[ColumnType]) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let headers = ["#", "name", "type", "srid", "value"];
    let rows: Vec<[String; 5]> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            [
                i.to_string(),
                c.name().to_string(),
                type_label(c),
                c.srid().map(|s| s.to_string()).unwrap_or_default(),
                c.value().map(|v| v.to_string()).unwrap_or_default(),
            ]
        })
        .collect();

    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+";
    let mut out = String::new();
    out.push_str(&separator);
    out.push('\n');
    out.push_str(&format_line(headers.iter().copied(), &widths));
    out.push('\n');
    out.push_str(&separator);
    out.push('\n');
    for row in &rows {
        out.push_str(&format_line(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out.push_str(&separator);
    out.push('\n');
    out.push_str(&format!("{} column(s)", rows.len()));
    out
}

fn columns_json(columns: &[ColumnType]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = columns
        .iter()
        .map(|c| {
            let value = match c.value() {
                Some(vlayer_sql::Value::Integer(n)) => json!(n),
                Some(vlayer_sql::Value::Double(n)) => json!(n),
                Some(vlayer_sql::Value::Text(s)) => json!(s),
                Some(vlayer_sql::Value::Null) | None => serde_json::Value::Null,
            };
            let mut item = json!({
                "name": c.name(),
                "type": type_label(c),
                "geometry": c.is_geometry(),
                "srid": c.srid(),
                "constant": c.is_constant(),
                "value": value,
            });
            if let Some(wkb_type) = c.wkb_type() {
                item["wkb_code"] = json!(wkb_type.code());
                item["spatialite_code"] = json!(wkb_type.spatialite_code());
                item["dimension"] = json!(wkb_type.coord_dimension());
            }
            item
        })
        .collect();
    serde_json::Value::Array(items)
}

fn analyze(
    sql: &str,
    tables: &TableDefs,
    list_tables: bool,
    format: OutputFormat,
) -> Result<String, vlayer_sql::Error> {
    let stmt = parse_sql(sql)?;

    if list_tables {
        let names = referenced_tables(&stmt);
        return Ok(match format {
            OutputFormat::Table => names.into_iter().collect::<Vec<_>>().join("\n"),
            OutputFormat::Json => json!(names).to_string(),
        });
    }

    let columns = column_types(&stmt, tables)?;
    Ok(match format {
        OutputFormat::Table => format_columns(&columns),
        OutputFormat::Json => columns_json(&columns).to_string(),
    })
}

fn run_repl(tables: &TableDefs, list_tables: bool, format: OutputFormat) {
    let mut rl = rustyline::DefaultEditor::new().unwrap_or_else(|e| {
        eprintln!("ERROR: Failed to initialize REPL: {}", e);
        process::exit(1);
    });

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            "vlayer> "
        } else {
            "     -> "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if buffer.is_empty() && (trimmed == "quit" || trimmed == "exit") {
                    break;
                }

                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(trimmed);

                // Statements end with ';'
                if buffer.trim_end().ends_with(';') {
                    let sql = buffer.trim().to_string();
                    let _ = rl.add_history_entry(&sql);
                    match analyze(&sql, tables, list_tables, format) {
                        Ok(out) => println!("{}", out),
                        Err(e) => eprintln!("ERROR: {}", e),
                    }
                    buffer.clear();
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ctrl-C: clear current buffer
                buffer.clear();
                println!();
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                break;
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let tables = load_tables(&cli).unwrap_or_else(|e| {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    });

    if let Some(sql) = &cli.execute {
        match analyze(sql, &tables, cli.list_tables, cli.format) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        }
    } else {
        run_repl(&tables, cli.list_tables, cli.format);
    }
}
