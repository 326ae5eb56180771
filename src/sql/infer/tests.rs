use super::*;
use crate::schema::TableDef;
use crate::sql::parser::parse_sql;

fn catalog() -> TableDefs {
    let mut defs = TableDefs::new();
    defs.insert(
        "t",
        TableDef::new()
            .column(ColumnType::geometry("geom", WkbType::LineString, 4326))
            .column(ColumnType::scalar("a", ScalarType::Int))
            .column(ColumnType::scalar("b", ScalarType::Int)),
    );
    defs.insert(
        "u",
        TableDef::new()
            .column(ColumnType::scalar("a", ScalarType::String))
            .column(ColumnType::scalar("x", ScalarType::Double))
            .column(ColumnType::geometry("pt", WkbType::Point, 2154)),
    );
    defs
}

fn infer(sql: &str) -> InferResult<Vec<ColumnType>> {
    column_types(&parse_sql(sql).unwrap(), &catalog())
}

fn err(sql: &str) -> String {
    infer(sql).unwrap_err().to_string()
}

#[test]
fn test_star_expands_in_from_order() {
    let cols = infer("select * from u, t").unwrap();
    let names: Vec<&str> = cols.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["a", "x", "pt", "geom", "a", "b"]);
}

#[test]
fn test_star_over_unknown_table() {
    assert_eq!(err("select * from t, nowhere"), "Unknown table nowhere");
}

#[test]
fn test_unqualified_column_takes_first_table() {
    let cols = infer("select a from u, t").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::String));
    let cols = infer("select a from t join u on t.b = u.x").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::Int));
}

#[test]
fn test_qualified_column() {
    let cols = infer("select u.a, t2.a from u, t as t2").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::String));
    assert_eq!(cols[1].scalar_type(), Some(ScalarType::Int));
    assert_eq!(err("select t.a from t as t2"), "Unknown table t");
    assert_eq!(err("select t.zz from t"), "Cannot find column zz");
}

#[test]
fn test_column_lookup_ignores_case() {
    let cols = infer("select GEOM, A from t").unwrap();
    assert_eq!(cols[0].name(), "geom");
    assert!(cols[0].is_geometry());
    assert_eq!(cols[1].name(), "a");
}

#[test]
fn test_rowid_aliases() {
    let cols = infer("select t.rowid, oid, _ROWID_ from t").unwrap();
    assert!(cols
        .iter()
        .all(|c| c.scalar_type() == Some(ScalarType::Int)));
    // Without any table there is no rowid
    assert_eq!(err("select rowid"), "Cannot find column rowid");
}

#[test]
fn test_errors_inside_expressions_propagate() {
    assert_eq!(err("select abs(c + 1) from t"), "Cannot find column c");
    assert_eq!(err("select unknown_fn(zz) from t"), "Cannot find column zz");
    assert_eq!(
        err("select case when a in (1, zz) then 1 end from t"),
        "Cannot find column zz"
    );
    assert_eq!(err("select u.* from t"), "Unknown table u");
}

#[test]
fn test_arithmetic_types() {
    let cols = infer("select a + b, a * x, a + 0.5, a || 'x', -x, a + 'text' from t, u").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::Int));
    assert_eq!(cols[1].scalar_type(), Some(ScalarType::Double));
    assert_eq!(cols[2].scalar_type(), Some(ScalarType::Double));
    assert_eq!(cols[3].scalar_type(), Some(ScalarType::String));
    assert_eq!(cols[4].scalar_type(), Some(ScalarType::Double));
    assert_eq!(cols[5].scalar_type(), Some(ScalarType::Int));
    assert!(cols.iter().all(|c| c.name().is_empty() && !c.is_constant()));
}

#[test]
fn test_constant_folding() {
    let cols = infer("select 2 + 1, 7 / 2, 1.5 * 2, 1 / 0, 1 < 2, not 0, 'a' || 1").unwrap();
    assert_eq!(cols[0].value(), Some(&Value::Integer(3)));
    assert_eq!(cols[1].value(), Some(&Value::Integer(3)));
    assert_eq!(cols[2].value(), Some(&Value::Double(3.0)));
    // Division by zero is not folded
    assert!(!cols[3].is_constant());
    assert_eq!(cols[3].scalar_type(), Some(ScalarType::Int));
    assert_eq!(cols[4].value(), Some(&Value::Integer(1)));
    assert_eq!(cols[5].value(), Some(&Value::Integer(1)));
    assert_eq!(cols[6].value(), Some(&Value::Text("a1".into())));
}

#[test]
fn test_null_literal() {
    let cols = infer("select NULL, NULL + 1").unwrap();
    assert!(cols[0].is_invalid());
    assert!(!cols[0].is_constant());
    assert!(!cols[1].is_constant());
}

#[test]
fn test_predicates_are_int() {
    let cols = infer(
        "select a like 'x%', a in (1, 2), a between 1 and 3, a is null, \
         exists (select 1 from t), a in (select b from t) from t",
    )
    .unwrap();
    assert!(cols
        .iter()
        .all(|c| c.scalar_type() == Some(ScalarType::Int) && !c.is_constant()));
}

#[test]
fn test_cast() {
    let cols = infer("select cast(a as text), cast('12' as integer), cast(x as float), cast(a as blob) from t, u")
        .unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::String));
    assert_eq!(cols[1].value(), Some(&Value::Integer(12)));
    assert_eq!(cols[2].scalar_type(), Some(ScalarType::Double));
    assert!(cols[3].is_invalid());
}

#[test]
fn test_case_numeric_branches_widen() {
    let cols = infer("select case when a > 0 then 1 else 2.5 end from t").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::Double));
    assert!(!cols[0].is_constant());
}

#[test]
fn test_case_null_branch_is_ignored() {
    let cols = infer("select case when a > 0 then 'x' else null end from t").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::String));
}

#[test]
fn test_case_constant_selection() {
    let cols = infer(
        "select case when 0 then 'a' when 2 > 1 then 'b' end, \
         case 3 when 1 then 'one' when 3 then 'three' else 'other' end, \
         case when 0 then 1 end",
    )
    .unwrap();
    assert_eq!(cols[0].value(), Some(&Value::Text("b".into())));
    assert_eq!(cols[1].value(), Some(&Value::Text("three".into())));
    assert!(cols[2].is_invalid());
}

#[test]
fn test_case_geometry_branches() {
    let cols = infer("select case when a > 0 then geom else geom end from t").unwrap();
    assert_eq!(cols[0].wkb_type(), Some(WkbType::LineString));
    assert_eq!(cols[0].srid(), Some(4326));
    assert!(cols[0].name().is_empty());

    let cols = infer("select case when t.a > 0 then geom else pt end from t, u").unwrap();
    assert_eq!(cols[0].wkb_type(), Some(WkbType::Unknown));
    assert_eq!(cols[0].srid(), None);

    assert_eq!(
        err("select case when a > 0 then geom else 1 end from t"),
        "Type mismatch between geom and 1"
    );
}

#[test]
fn test_case_mismatch_describes_columns() {
    assert_eq!(
        err("select case when b > 0 then a else 'x' end from t"),
        "Type mismatch between a and x"
    );
}

#[test]
fn test_subquery_source_keeps_constness() {
    let cols = infer("select s.* from (select 2 + 1 as three, a from t) as s").unwrap();
    assert_eq!(cols[0].name(), "three");
    assert_eq!(cols[0].value(), Some(&Value::Integer(3)));
    assert_eq!(cols[1].name(), "a");

    let cols = infer("select three * 2 from (select 3 as three) s").unwrap();
    assert_eq!(cols[0].value(), Some(&Value::Integer(6)));
}

#[test]
fn test_scalar_subquery() {
    let cols = infer("select (select max(x) from u), (select 1) as one from t").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::Double));
    assert_eq!(cols[1].scalar_type(), Some(ScalarType::Int));
    assert!(!cols[1].is_constant());
    assert_eq!(cols[1].name(), "one");
}

#[test]
fn test_compound_checks_every_arm() {
    let cols = infer("select a, geom from t union all select a, pt from u").unwrap();
    assert_eq!(cols.len(), 2);
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::Int));
    assert_eq!(cols[1].wkb_type(), Some(WkbType::LineString));

    assert_eq!(
        err("select a from t except select zz from u"),
        "Cannot find column zz"
    );
}

#[test]
fn test_unknown_function_degrades() {
    let cols = infer("select my_function(a) as f from t").unwrap();
    assert!(cols[0].is_invalid());
    assert_eq!(cols[0].name(), "f");
}

#[test]
fn test_function_result_names() {
    let cols = infer("select st_union(geom), CastToXYZ(t.geom), st_area(geom), max(a) from t").unwrap();
    assert_eq!(cols[0].name(), "geom");
    assert_eq!(cols[1].name(), "geom");
    assert_eq!(cols[1].wkb_type(), Some(WkbType::LineString25D));
    assert!(cols[2].name().is_empty());
    assert_eq!(cols[3].name(), "a");
}

#[test]
fn test_set_srid_on_column() {
    let cols = infer("select SetSrid(geom, 2154) from t").unwrap();
    assert_eq!(cols[0].wkb_type(), Some(WkbType::LineString));
    assert_eq!(cols[0].srid(), Some(2154));
    assert_eq!(cols[0].name(), "geom");
}

#[test]
fn test_correlated_scalar_subquery() {
    let cols = infer("select (select t.a) as n from t").unwrap();
    assert_eq!(cols[0].name(), "n");
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::Int));

    let cols = infer("select (select b + x from u) from t").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::Double));

    // Inner tables shadow outer ones
    let cols = infer("select (select a from u) from t").unwrap();
    assert_eq!(cols[0].scalar_type(), Some(ScalarType::String));

    assert_eq!(err("select (select zz from u) from t"), "Cannot find column zz");
    assert_eq!(err("select (select u.b from u) from t"), "Cannot find column b");
    assert_eq!(err("select (select w.a) from t"), "Unknown table w");
}

#[test]
fn test_derived_table_does_not_see_outer_scope() {
    assert_eq!(
        err("select (select s.b from (select b) as s) from t"),
        "Cannot find column b"
    );
}

#[test]
fn test_long_operator_chain_folds() {
    let cols = infer(&format!("select {}1 from t", "1 + ".repeat(299))).unwrap();
    assert_eq!(cols[0].value(), Some(&Value::Integer(300)));
}
