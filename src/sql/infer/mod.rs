/// Static type inference of a query's output columns.
///
/// Each SELECT builds a scope from its FROM entries: a base table exposes the
/// columns of its `TableDefs` entry, a derived table exposes the columns
/// inferred for its body. Output expressions are then typed bottom-up,
/// folding constants along the way.
use tracing::{debug, trace};

use crate::error::TypeError;
use crate::schema::{ColumnType, TableDef, TableDefs};
use crate::sql::ast::*;
use crate::types::{ScalarType, Value, WkbType};

mod fold;
mod functions;

type InferResult<T> = Result<T, TypeError>;

/// Implicit integer key of every SQLite table.
const ROWID_ALIASES: [&str; 3] = ["rowid", "oid", "_rowid_"];

/// Infer the output columns of `stmt` against the schema catalogue.
///
/// The first hard error (unknown column, unknown table, type mismatch)
/// aborts inference. For compound selects, every arm is checked and the
/// first arm's columns are returned.
pub fn column_types(stmt: &Statement, tables: &TableDefs) -> InferResult<Vec<ColumnType>> {
    TypeInferer { tables }.statement(stmt, None)
}

/// Columns visible under one FROM entry name.
struct ScopeEntry {
    name: String,
    /// `None` for a base table missing from the catalogue.
    columns: Option<TableDef>,
}

/// FROM entries of one SELECT. A scalar subquery's scope falls back to
/// the scope of the query it appears in.
struct Scope<'p> {
    entries: Vec<ScopeEntry>,
    parent: Option<&'p Scope<'p>>,
}

impl Scope<'_> {
    fn entry(&self, name: &str) -> Option<&ScopeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn has_table(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|e| e.columns.is_some())
    }

    /// Inner entries first. A qualifier naming an inner table binds there
    /// even when the column is missing.
    fn resolve(&self, table: Option<&str>, column: &str) -> InferResult<ColumnType> {
        let local = self.resolve_local(table, column);
        match self.parent {
            Some(parent) if local.is_err() && !table.is_some_and(|t| self.has_table(t)) => {
                parent.resolve(table, column)
            }
            _ => local,
        }
    }

    fn resolve_local(&self, table: Option<&str>, column: &str) -> InferResult<ColumnType> {
        let candidates: Vec<&ScopeEntry> = match table {
            Some(t) => match self.entry(t) {
                Some(e) if e.columns.is_some() => vec![e],
                _ => return Err(TypeError::UnknownTable(t.to_string())),
            },
            None => self.entries.iter().collect(),
        };

        // First match in FROM order wins
        let found = candidates
            .iter()
            .filter_map(|e| e.columns.as_ref())
            .find_map(|t| t.find(column));
        if let Some(c) = found {
            return Ok(c.clone());
        }

        if !candidates.is_empty()
            && ROWID_ALIASES
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(column))
        {
            return Ok(ColumnType::scalar(column, ScalarType::Int));
        }
        Err(TypeError::UnknownColumn(column.to_string()))
    }
}

struct TypeInferer<'a> {
    tables: &'a TableDefs,
}

impl TypeInferer<'_> {
    fn statement(
        &self,
        stmt: &Statement,
        outer: Option<&Scope>,
    ) -> InferResult<Vec<ColumnType>> {
        let mut result = None;
        for sel in stmt.selects() {
            let columns = self.select(sel, outer)?;
            result.get_or_insert(columns);
        }
        Ok(result.unwrap_or_default())
    }

    fn select(&self, sel: &Select, outer: Option<&Scope>) -> InferResult<Vec<ColumnType>> {
        let scope = self.scope(sel, outer)?;

        let mut columns = Vec::new();
        for item in &sel.columns {
            match item {
                SelectColumn::Star => {
                    for entry in &scope.entries {
                        match &entry.columns {
                            Some(cols) => columns.extend(cols.columns().iter().cloned()),
                            None => return Err(TypeError::UnknownTable(entry.name.clone())),
                        }
                    }
                }
                SelectColumn::TableStar(table) => {
                    match scope.entry(table).and_then(|e| e.columns.as_ref()) {
                        Some(cols) => columns.extend(cols.columns().iter().cloned()),
                        None => return Err(TypeError::UnknownTable(table.clone())),
                    }
                }
                SelectColumn::Expr(expr, alias) => {
                    let column = self.expr(expr, &scope)?;
                    columns.push(match alias {
                        Some(alias) => column.with_name(alias),
                        None => column,
                    });
                }
            }
        }

        debug!(
            scope_entries = scope.entries.len(),
            columns = columns.len(),
            "inferred select columns"
        );
        Ok(columns)
    }

    fn scope<'p>(&self, sel: &Select, outer: Option<&'p Scope<'p>>) -> InferResult<Scope<'p>> {
        let mut scope = Scope {
            entries: Vec::new(),
            parent: outer,
        };
        for table_ref in &sel.from {
            for factor in table_ref.factors() {
                let columns = match factor {
                    TableFactor::Table { name, .. } => self.tables.get(name).cloned(),
                    // Derived tables cannot see the enclosing query
                    TableFactor::Subquery { query, .. } => {
                        Some(TableDef::from(self.statement(query, None)?))
                    }
                };
                scope.entries.push(ScopeEntry {
                    name: factor.visible_name().to_string(),
                    columns,
                });
            }
        }
        Ok(scope)
    }

    fn expr(&self, expr: &Expr, scope: &Scope) -> InferResult<ColumnType> {
        match expr {
            Expr::IntLiteral(n) => Ok(ColumnType::constant(Value::Integer(*n))),
            Expr::FloatLiteral(n) => Ok(ColumnType::constant(Value::Double(*n))),
            Expr::StringLiteral(s) => Ok(ColumnType::constant(Value::Text(s.clone()))),
            Expr::Null => Ok(ColumnType::invalid()),

            Expr::ColumnRef { table, column } => scope.resolve(table.as_deref(), column),

            Expr::BinaryOp { left, op, right } => {
                let l = self.expr(left, scope)?;
                let r = self.expr(right, scope)?;
                let result_type = if op.is_arithmetic() {
                    arithmetic_type(&l, &r)
                } else if *op == BinaryOp::Concat {
                    ScalarType::String
                } else {
                    ScalarType::Int
                };
                let folded = match (l.value(), r.value()) {
                    (Some(a), Some(b)) => fold::fold_binary(a, *op, b),
                    _ => None,
                };
                Ok(typed(result_type, folded))
            }

            Expr::UnaryOp { op, operand } => {
                let inner = self.expr(operand, scope)?;
                let result_type = match op {
                    UnaryOp::Not => ScalarType::Int,
                    UnaryOp::Neg | UnaryOp::Plus => match inner.scalar_type() {
                        Some(t) if t.is_numeric() => t,
                        _ => ScalarType::Invalid,
                    },
                };
                let folded = inner.value().and_then(|v| fold::fold_unary(*op, v));
                Ok(typed(result_type, folded))
            }

            Expr::Like { expr, pattern, .. } => {
                self.expr(expr, scope)?;
                self.expr(pattern, scope)?;
                Ok(ColumnType::scalar("", ScalarType::Int))
            }
            Expr::InList { expr, list, .. } => {
                self.expr(expr, scope)?;
                for e in list {
                    self.expr(e, scope)?;
                }
                Ok(ColumnType::scalar("", ScalarType::Int))
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.expr(expr, scope)?;
                self.expr(low, scope)?;
                self.expr(high, scope)?;
                Ok(ColumnType::scalar("", ScalarType::Int))
            }
            Expr::IsNull { expr, negated } => {
                let inner = self.expr(expr, scope)?;
                let folded = inner
                    .value()
                    .map(|v| Value::Integer(i64::from(v.is_null() != *negated)));
                Ok(typed(ScalarType::Int, folded))
            }
            // Subquery bodies may be correlated with the enclosing scope
            Expr::InSubquery { expr, .. } => {
                self.expr(expr, scope)?;
                Ok(ColumnType::scalar("", ScalarType::Int))
            }
            Expr::Exists { .. } => Ok(ColumnType::scalar("", ScalarType::Int)),
            Expr::ScalarSubquery(query) => {
                let columns = self.statement(query, Some(scope))?;
                Ok(match columns.into_iter().next() {
                    Some(c) => c.into_non_constant().with_name(""),
                    None => ColumnType::invalid(),
                })
            }

            Expr::FunctionCall { name, args, .. } => self.function_call(name, args, scope),
            Expr::CaseWhen {
                operand,
                when_clauses,
                else_clause,
            } => self.case_when(operand.as_deref(), when_clauses, else_clause.as_deref(), scope),
            Expr::Cast { expr, type_name } => {
                let inner = self.expr(expr, scope)?;
                let target = fold::affinity(type_name);
                let folded = inner.value().and_then(|v| fold::fold_cast(v, target));
                Ok(typed(target, folded))
            }
        }
    }

    fn function_call(&self, name: &str, args: &[Expr], scope: &Scope) -> InferResult<ColumnType> {
        // Arguments are typed even for unknown functions so that bad
        // column references still surface
        let arg_types = args
            .iter()
            .map(|a| self.expr(a, scope))
            .collect::<InferResult<Vec<_>>>()?;

        let column = match functions::function_type(name, &arg_types) {
            Some(c) => c,
            None => {
                trace!(function = name, "no typing rule, result type unknown");
                return Ok(ColumnType::invalid());
            }
        };

        match (args.first(), arg_types.first()) {
            (Some(Expr::ColumnRef { .. }), Some(arg)) if functions::keeps_argument_name(name) => {
                Ok(column.with_name(arg.name()))
            }
            _ => Ok(column.with_name("")),
        }
    }

    fn case_when(
        &self,
        operand: Option<&Expr>,
        when_clauses: &[(Expr, Expr)],
        else_clause: Option<&Expr>,
        scope: &Scope,
    ) -> InferResult<ColumnType> {
        let operand = operand.map(|e| self.expr(e, scope)).transpose()?;
        let mut conditions = Vec::with_capacity(when_clauses.len());
        let mut branches = Vec::with_capacity(when_clauses.len() + 1);
        for (condition, result) in when_clauses {
            conditions.push(self.expr(condition, scope)?);
            branches.push(self.expr(result, scope)?);
        }
        let else_branch = else_clause.map(|e| self.expr(e, scope)).transpose()?;

        // With constant conditions the taken branch is known statically
        if let Some(taken) = constant_branch(operand.as_ref(), &conditions) {
            let column = match taken {
                Some(i) => branches.swap_remove(i),
                None => else_branch.unwrap_or_else(ColumnType::invalid),
            };
            return Ok(column.with_name(""));
        }

        branches.extend(else_branch);
        let mut unified: Option<ColumnType> = None;
        for branch in branches {
            if branch.is_invalid() {
                continue;
            }
            unified = Some(match unified {
                None => branch,
                Some(current) => unify(current, branch)?,
            });
        }
        Ok(match unified {
            Some(c) => c.into_non_constant().with_name(""),
            None => ColumnType::invalid(),
        })
    }
}

/// Index of the branch a CASE takes when every condition it needs is
/// constant: `Some(Some(i))` for WHEN branch `i`, `Some(None)` for ELSE,
/// `None` when it depends on row data.
fn constant_branch(operand: Option<&ColumnType>, conditions: &[ColumnType]) -> Option<Option<usize>> {
    let operand_value = match operand {
        Some(o) => Some(o.value()?),
        None => None,
    };
    for (i, condition) in conditions.iter().enumerate() {
        let value = condition.value()?;
        let taken = match operand_value {
            Some(o) => {
                fold::fold_binary(o, BinaryOp::Eq, value).and_then(|v| fold::is_truthy(&v))
            }
            None => fold::is_truthy(value),
        };
        if taken == Some(true) {
            return Some(Some(i));
        }
    }
    Some(None)
}

/// Common type of two CASE branches.
fn unify(a: ColumnType, b: ColumnType) -> InferResult<ColumnType> {
    match (a.is_geometry(), b.is_geometry()) {
        (true, true) => {
            let wkb_type = match (a.wkb_type(), b.wkb_type()) {
                (Some(x), Some(y)) if x == y => x,
                _ => WkbType::Unknown,
            };
            let srid = if a.srid() == b.srid() { a.srid() } else { None };
            Ok(ColumnType::geometry("", wkb_type, srid))
        }
        (false, false) => match (a.scalar_type(), b.scalar_type()) {
            (Some(x), Some(y)) if x == y => Ok(a),
            (Some(x), Some(y)) if x.is_numeric() && y.is_numeric() => {
                Ok(ColumnType::scalar("", ScalarType::Double))
            }
            _ => Err(mismatch(&a, &b)),
        },
        _ => Err(mismatch(&a, &b)),
    }
}

fn mismatch(a: &ColumnType, b: &ColumnType) -> TypeError {
    TypeError::TypeMismatch(describe(a), describe(b))
}

/// How a column appears in error messages: its value, else its name, else its type.
fn describe(column: &ColumnType) -> String {
    if let Some(v) = column.value() {
        return v.to_string();
    }
    if !column.name().is_empty() {
        return column.name().to_string();
    }
    match column.wkb_type() {
        Some(wkb_type) => wkb_type.to_string(),
        None => column
            .scalar_type()
            .map(|t| t.to_string())
            .unwrap_or_default(),
    }
}

/// Result of arithmetic: integer unless a real is involved. A numeric
/// operand paired with anything else decides the type on its own.
fn arithmetic_type(l: &ColumnType, r: &ColumnType) -> ScalarType {
    match (l.scalar_type(), r.scalar_type()) {
        (Some(ScalarType::Int), Some(ScalarType::Int)) => ScalarType::Int,
        (Some(ScalarType::Double), _) | (_, Some(ScalarType::Double)) => ScalarType::Double,
        (Some(ScalarType::Int), _) | (_, Some(ScalarType::Int)) => ScalarType::Int,
        _ => ScalarType::Invalid,
    }
}

/// Unnamed column of `result_type`, constant when folding produced a value.
fn typed(result_type: ScalarType, folded: Option<Value>) -> ColumnType {
    match folded {
        Some(v) if !v.is_null() => ColumnType::constant(v),
        _ => ColumnType::scalar("", result_type),
    }
}

#[cfg(test)]
mod tests;
