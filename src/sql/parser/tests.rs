use super::*;

fn select(sql: &str) -> Select {
    match parse_sql(sql).unwrap() {
        Statement::Select(sel) => *sel,
        other => panic!("Expected Select, got {:?}", other),
    }
}

fn parse_err(sql: &str) -> String {
    parse_sql(sql).unwrap_err().to_string()
}

#[test]
fn test_parse_select() {
    let sel = select("Select * From table");
    assert_eq!(sel.columns, vec![SelectColumn::Star]);
    assert_eq!(sel.from.len(), 1);
    assert_eq!(sel.from[0].factor.visible_name(), "table");
    assert!(sel.where_clause.is_none());
}

#[test]
fn test_misspelled_from() {
    assert_eq!(
        parse_err("Select * form table"),
        "1:10: syntax error, unexpected IDENTIFIER, expecting $end"
    );
}

#[test]
fn test_error_at_end_of_input() {
    assert_eq!(
        parse_err("select a from"),
        "1:14: syntax error, unexpected $end, expecting IDENTIFIER"
    );
}

#[test]
fn test_error_not_a_select() {
    assert_eq!(
        parse_err("delete from t"),
        "1:1: syntax error, unexpected IDENTIFIER, expecting SELECT"
    );
}

#[test]
fn test_error_on_second_line() {
    assert_eq!(
        parse_err("select a,\n  from t"),
        "2:3: syntax error, unexpected FROM"
    );
}

#[test]
fn test_parse_queries_accepted() {
    for sql in [
        "select *, geometry as geom from departements",
        "select * from departements order by id_geofla",
        "select * from departements order by id_geofla desc",
        "select * from departements group by id_geofla",
        "select * from (select 42 from t) as toto limit 1",
        "select count(*) from t",
        "select count(DISTINCT id) from t",
        "select count(DISTINCT id, e) from t",
        "select a from t where b not in (1, 2) and c is not null",
        "select a from t where name like 'x%' or name between 'a' and 'b'",
        "select a from t limit 10 offset 5;",
    ] {
        assert!(parse_sql(sql).is_ok(), "failed to parse: {}", sql);
    }
}

#[test]
fn test_parse_select_items() {
    let sel = select("select a, t.b AS bb, t.*, 1 + 2 three from t");
    assert_eq!(sel.columns.len(), 4);
    assert_eq!(
        sel.columns[0],
        SelectColumn::Expr(
            Expr::ColumnRef {
                table: None,
                column: "a".into()
            },
            None
        )
    );
    assert_eq!(
        sel.columns[1],
        SelectColumn::Expr(
            Expr::ColumnRef {
                table: Some("t".into()),
                column: "b".into()
            },
            Some("bb".into())
        )
    );
    assert_eq!(sel.columns[2], SelectColumn::TableStar("t".into()));
    assert!(matches!(
        &sel.columns[3],
        SelectColumn::Expr(Expr::BinaryOp { op: BinaryOp::Add, .. }, Some(alias)) if alias == "three"
    ));
}

#[test]
fn test_parse_distinct() {
    assert!(select("select distinct a from t").distinct);
    assert!(!select("select all a from t").distinct);
}

#[test]
fn test_parse_subquery_source() {
    let sel = select("select * from (select 42 from t) as toto limit 1");
    match &sel.from[0].factor {
        TableFactor::Subquery { query, alias } => {
            assert_eq!(alias, "toto");
            assert_eq!(query.first_select().columns.len(), 1);
        }
        other => panic!("Expected subquery, got {:?}", other),
    }
    assert_eq!(sel.limit, Some(Expr::IntLiteral(1)));

    // Alias without AS
    let sel = select("select * from (select 1) t2, t");
    assert_eq!(sel.from.len(), 2);
    assert_eq!(sel.from[0].factor.visible_name(), "t2");
}

#[test]
fn test_subquery_source_requires_alias() {
    assert_eq!(
        parse_err("select * from (select 1)"),
        "1:25: syntax error, unexpected $end, expecting AS or IDENTIFIER"
    );
}

#[test]
fn test_parse_quoted_table() {
    let sel = select(r#"Select * from "Feuille 1""#);
    assert_eq!(sel.from[0].factor.visible_name(), "Feuille 1");
}

#[test]
fn test_parse_joins() {
    let sel = select(
        "select * from a join b on a.id = b.id left outer join c using (id) natural join d cross join e",
    );
    let joins = &sel.from[0].joins;
    assert_eq!(joins.len(), 4);
    assert_eq!(joins[0].join_type, JoinType::Inner);
    assert!(matches!(joins[0].constraint, JoinConstraint::On(_)));
    assert_eq!(joins[1].join_type, JoinType::Left);
    assert_eq!(joins[1].constraint, JoinConstraint::Using(vec!["id".into()]));
    assert_eq!(joins[2].constraint, JoinConstraint::Natural);
    assert_eq!(joins[3].join_type, JoinType::Cross);
    assert_eq!(joins[3].constraint, JoinConstraint::None);
}

#[test]
fn test_parse_in_subquery() {
    let sel = select("select * from t where a IN (select id FROM t3)");
    match sel.where_clause {
        Some(Expr::InSubquery {
            subquery, negated, ..
        }) => {
            assert!(!negated);
            assert_eq!(
                subquery.first_select().from[0].factor.visible_name(),
                "t3"
            );
        }
        other => panic!("Expected IN subquery, got {:?}", other),
    }
}

#[test]
fn test_parse_function_calls() {
    let sel = select("select count(*), count(DISTINCT a, b), random(), PointFromText('', 4326) from t");
    assert_eq!(
        sel.columns[0],
        SelectColumn::Expr(
            Expr::FunctionCall {
                name: "count".into(),
                args: vec![],
                distinct: false,
                wildcard: true,
            },
            None
        )
    );
    match &sel.columns[1] {
        SelectColumn::Expr(Expr::FunctionCall { args, distinct, .. }, _) => {
            assert!(*distinct);
            assert_eq!(args.len(), 2);
        }
        other => panic!("Expected function call, got {:?}", other),
    }
    match &sel.columns[2] {
        SelectColumn::Expr(Expr::FunctionCall { args, .. }, _) => assert!(args.is_empty()),
        other => panic!("Expected function call, got {:?}", other),
    }
    match &sel.columns[3] {
        SelectColumn::Expr(Expr::FunctionCall { name, args, .. }, _) => {
            assert_eq!(name, "PointFromText");
            assert_eq!(args[1], Expr::IntLiteral(4326));
        }
        other => panic!("Expected function call, got {:?}", other),
    }
}

#[test]
fn test_parse_case() {
    let sel = select("select CASE when a+0 THEN 'ok' ELSE 'no' END from t");
    match &sel.columns[0] {
        SelectColumn::Expr(
            Expr::CaseWhen {
                operand,
                when_clauses,
                else_clause,
            },
            None,
        ) => {
            assert!(operand.is_none());
            assert_eq!(when_clauses.len(), 1);
            assert_eq!(when_clauses[0].1, Expr::StringLiteral("ok".into()));
            assert_eq!(
                else_clause.as_deref(),
                Some(&Expr::StringLiteral("no".into()))
            );
        }
        other => panic!("Expected CASE, got {:?}", other),
    }

    let sel = select("select case a when 1 then 'one' end from t");
    assert!(matches!(
        &sel.columns[0],
        SelectColumn::Expr(Expr::CaseWhen { operand: Some(_), else_clause: None, .. }, None)
    ));

    assert_eq!(
        parse_err("select case else 1 end"),
        "1:13: syntax error, unexpected ELSE, expecting WHEN"
    );
}

#[test]
fn test_parse_cast() {
    let sel = select("select CAST(abs(-4) AS real) as ab, cast(x as varchar(20)) from t");
    match &sel.columns[0] {
        SelectColumn::Expr(Expr::Cast { expr, type_name }, Some(alias)) => {
            assert_eq!(type_name, "real");
            assert_eq!(alias, "ab");
            match expr.as_ref() {
                Expr::FunctionCall { args, .. } => assert_eq!(args[0], Expr::IntLiteral(-4)),
                other => panic!("Expected function call, got {:?}", other),
            }
        }
        other => panic!("Expected CAST, got {:?}", other),
    }
    assert!(matches!(
        &sel.columns[1],
        SelectColumn::Expr(Expr::Cast { type_name, .. }, None) if type_name == "varchar(20)"
    ));
}

#[test]
fn test_operator_precedence() {
    let sel = select("select 1 + 2 * 3, 'a' || 'b' = 'ab', not a = 1 or b");
    assert_eq!(
        sel.columns[0],
        SelectColumn::Expr(
            Expr::BinaryOp {
                left: Box::new(Expr::IntLiteral(1)),
                op: BinaryOp::Add,
                right: Box::new(Expr::BinaryOp {
                    left: Box::new(Expr::IntLiteral(2)),
                    op: BinaryOp::Mul,
                    right: Box::new(Expr::IntLiteral(3)),
                }),
            },
            None
        )
    );
    assert!(matches!(
        &sel.columns[1],
        SelectColumn::Expr(Expr::BinaryOp { op: BinaryOp::Eq, left, .. }, None)
            if matches!(left.as_ref(), Expr::BinaryOp { op: BinaryOp::Concat, .. })
    ));
    assert!(matches!(
        &sel.columns[2],
        SelectColumn::Expr(Expr::BinaryOp { op: BinaryOp::Or, left, .. }, None)
            if matches!(left.as_ref(), Expr::UnaryOp { op: UnaryOp::Not, .. })
    ));
}

#[test]
fn test_limit_comma_form() {
    let sel = select("select a from t limit 5, 10");
    assert_eq!(sel.limit, Some(Expr::IntLiteral(10)));
    assert_eq!(sel.offset, Some(Expr::IntLiteral(5)));
}

#[test]
fn test_parse_union() {
    let stmt = parse_sql("select a from t union all select b from u order by 1 limit 3").unwrap();
    match stmt {
        Statement::SetQuery(sq) => {
            assert_eq!(sq.ops.len(), 1);
            assert_eq!(sq.ops[0].0, SetOp::UnionAll);
            assert!(sq.order_by.is_some());
            assert_eq!(sq.limit, Some(Expr::IntLiteral(3)));
            assert!(sq.ops[0].1.limit.is_none());
        }
        other => panic!("Expected SetQuery, got {:?}", other),
    }
}

#[test]
fn test_parse_scalar_subquery_and_exists() {
    let sel = select("select (select max(a) from t) from u where not exists (select 1 from v)");
    assert!(matches!(
        &sel.columns[0],
        SelectColumn::Expr(Expr::ScalarSubquery(_), None)
    ));
    assert!(matches!(
        sel.where_clause,
        Some(Expr::Exists { negated: true, .. })
    ));
}

#[test]
fn test_nesting_within_limit() {
    let sql = format!("select {}1{}", "(".repeat(80), ")".repeat(80));
    assert!(parse_sql(&sql).is_ok());

    let sql = format!("select {}1", "- ".repeat(300));
    assert!(parse_sql(&sql).is_ok());

    let sql = format!("select {}1", "1 + ".repeat(400));
    assert!(parse_sql(&sql).is_ok());

    let mut sql = "select 1".to_string();
    for _ in 0..50 {
        sql = format!("select * from ({}) as s", sql);
    }
    assert!(parse_sql(&sql).is_ok());
}

#[test]
fn test_excessive_nesting_is_rejected() {
    for sql in [
        format!("select {}1{}", "(".repeat(250), ")".repeat(250)),
        format!("select {}1{}", "(".repeat(100_000), ")".repeat(100_000)),
        format!("select {}1", "- ".repeat(1000)),
        format!("select {}1", "not ".repeat(1000)),
        format!("select {}1", "1 + ".repeat(1000)),
        format!("select 1 from t where {}1", "a = 1 or ".repeat(1000)),
        format!("select {}1", "abs(".repeat(500)),
        format!("select {}1 end", "case when 1 then ".repeat(500)),
    ] {
        let err = parse_err(&sql);
        assert!(err.starts_with("1:"), "{}", err);
        assert!(err.contains("syntax error, unexpected"), "{}", err);
    }

    let mut sql = "select 1".to_string();
    for _ in 0..200 {
        sql = format!("select * from ({}) as s", sql);
    }
    assert!(parse_sql(&sql).is_err());
}

#[test]
fn test_nesting_error_position() {
    // Budget runs out on the 99th parenthesis level
    let sql = format!("select {}1{}", "(".repeat(120), ")".repeat(120));
    let err = parse_sql(&sql).unwrap_err();
    assert_eq!((err.line, err.column), (1, 107));
    assert_eq!(err.unexpected, "'('");
}
