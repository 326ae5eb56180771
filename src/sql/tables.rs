/// Collect the base tables a query reads from.
use std::collections::BTreeSet;

use crate::sql::ast::*;

/// Names of every base table referenced anywhere in the statement: FROM
/// entries, joined tables, derived tables and subqueries nested in
/// expressions. Subquery aliases are not tables and are not reported.
pub fn referenced_tables(stmt: &Statement) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    collect_statement(stmt, &mut tables);
    tables
}

fn collect_statement(stmt: &Statement, tables: &mut BTreeSet<String>) {
    for sel in stmt.selects() {
        collect_select(sel, tables);
    }
    if let Statement::SetQuery(sq) = stmt {
        if let Some(items) = &sq.order_by {
            for item in items {
                collect_expr(&item.expr, tables);
            }
        }
        for e in sq.limit.iter().chain(sq.offset.iter()) {
            collect_expr(e, tables);
        }
    }
}

fn collect_select(sel: &Select, tables: &mut BTreeSet<String>) {
    for col in &sel.columns {
        if let SelectColumn::Expr(e, _) = col {
            collect_expr(e, tables);
        }
    }

    for table_ref in &sel.from {
        for factor in table_ref.factors() {
            match factor {
                TableFactor::Table { name, .. } => {
                    tables.insert(name.clone());
                }
                TableFactor::Subquery { query, .. } => collect_statement(query, tables),
            }
        }
        for join in &table_ref.joins {
            if let JoinConstraint::On(e) = &join.constraint {
                collect_expr(e, tables);
            }
        }
    }

    let clauses = sel
        .where_clause
        .iter()
        .chain(sel.group_by.iter().flatten())
        .chain(sel.having.iter())
        .chain(sel.order_by.iter().flatten().map(|item| &item.expr))
        .chain(sel.limit.iter())
        .chain(sel.offset.iter());
    for e in clauses {
        collect_expr(e, tables);
    }
}

fn collect_expr(expr: &Expr, tables: &mut BTreeSet<String>) {
    expr.for_each_subquery(&mut |subquery| collect_statement(subquery, tables));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::parse_sql;

    fn tables_of(sql: &str) -> Vec<String> {
        referenced_tables(&parse_sql(sql).unwrap())
            .into_iter()
            .collect()
    }

    #[test]
    fn test_from_subquery_and_in() {
        assert_eq!(
            tables_of(
                "Select * From table, (select * from table2) as tt WHERE a IN (select id FROM table3)"
            ),
            vec!["table", "table2", "table3"]
        );
    }

    #[test]
    fn test_quoted_name_with_space() {
        assert_eq!(tables_of(r#"Select * from "Feuille 1""#), vec!["Feuille 1"]);
    }

    #[test]
    fn test_no_from() {
        assert!(tables_of("select 1").is_empty());
    }

    #[test]
    fn test_aliases_and_duplicates() {
        assert_eq!(
            tables_of("select * from t as a join t as b on a.id = b.id"),
            vec!["t"]
        );
    }

    #[test]
    fn test_nested_everywhere() {
        assert_eq!(
            tables_of(
                "select (select max(x) from s1), a from t \
                 left join u on u.id = (select id from s2) \
                 where exists (select 1 from s3) \
                 group by a having count(*) > (select count(*) from s4) \
                 union select b from v order by (select 1 from s5)"
            ),
            vec!["s1", "s2", "s3", "s4", "s5", "t", "u", "v"]
        );
    }
}
