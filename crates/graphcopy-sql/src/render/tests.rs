use crate::*;

#[test]
fn test_select_columns_from_qualified_table() {
    let stmt = SelectStmt::new(TableRef::qualified("public", "user"))
        .columns(["id", "email", "display name"]);

    let result = render(&stmt, Placeholders::Dollar);
    insta::assert_snapshot!(result.sql, @r#"
    SELECT "id", "email", "display name"
    FROM "public"."user"
    "#);
    assert_eq!(result.param_count, 0);
}

#[test]
fn test_select_without_columns_is_star() {
    let stmt = SelectStmt::new(TableRef::bare("tenant"));

    let result = render(&stmt, Placeholders::Dollar);
    assert_eq!(result.sql, "SELECT *\nFROM \"tenant\"");
}

#[test]
fn test_insert_multi_row_numbers_params_across_rows() {
    let stmt = InsertStmt::new(TableRef::qualified("dest", "post"))
        .columns(["id", "title"])
        .param_rows(3);

    let result = render(&stmt, Placeholders::Dollar);
    insta::assert_snapshot!(result.sql, @r#"
    INSERT INTO "dest"."post" ("id", "title")
    VALUES ($1, $2), ($3, $4), ($5, $6)
    "#);
    assert_eq!(result.param_count, 6);
}

#[test]
fn test_insert_overriding_system_value() {
    let stmt = InsertStmt::new(TableRef::qualified("dest", "invoice"))
        .columns(["id", "total"])
        .param_rows(2)
        .overriding_system_value(true);

    let result = render(&stmt, Placeholders::Dollar);
    insta::assert_snapshot!(result.sql, @r#"
    INSERT INTO "dest"."invoice" ("id", "total")
    OVERRIDING SYSTEM VALUE
    VALUES ($1, $2), ($3, $4)
    "#);
    assert_eq!(result.param_count, 4);
}

#[test]
fn test_insert_question_placeholders() {
    let stmt = InsertStmt::new(TableRef::bare("tag"))
        .columns(["id", "name"])
        .param_rows(2);

    let result = render(&stmt, Placeholders::Question);
    assert_eq!(
        result.sql,
        "INSERT INTO \"tag\" (\"id\", \"name\")\nVALUES (?, ?), (?, ?)"
    );
    assert_eq!(result.param_count, 4);
}

#[test]
fn test_upsert_updates_non_key_columns() {
    let columns: Vec<String> = vec!["id".into(), "subject_id".into(), "subject_type".into()];
    let stmt = InsertStmt::new(TableRef::qualified("perms", "subjects"))
        .columns(columns.clone())
        .param_rows(2)
        .on_conflict(OnConflict::update_others(&["id".to_string()], &columns));

    let result = render(&stmt, Placeholders::Dollar);
    insta::assert_snapshot!(result.sql, @r#"
    INSERT INTO "perms"."subjects" ("id", "subject_id", "subject_type")
    VALUES ($1, $2, $3), ($4, $5, $6)
    ON CONFLICT ("id") DO UPDATE SET "subject_id" = EXCLUDED."subject_id", "subject_type" = EXCLUDED."subject_type"
    "#);
}

#[test]
fn test_upsert_with_only_key_columns_does_nothing() {
    let columns = vec!["id".to_string()];
    let stmt = InsertStmt::new(TableRef::bare("marker"))
        .columns(columns.clone())
        .row(vec![Expr::Param])
        .on_conflict(OnConflict::update_others(&columns, &columns));

    let result = render(&stmt, Placeholders::Dollar);
    assert_eq!(
        result.sql,
        "INSERT INTO \"marker\" (\"id\")\nVALUES ($1)\nON CONFLICT (\"id\") DO NOTHING"
    );
}

#[test]
fn test_delete_whole_table() {
    let stmt = DeleteStmt::new(TableRef::qualified("dest", "order"));

    let result = render(&stmt, Placeholders::Dollar);
    assert_eq!(result.sql, "DELETE FROM \"dest\".\"order\"");
}

#[test]
fn test_lock_tables() {
    let stmt = LockStmt::new(
        [TableRef::bare("subjects"), TableRef::bare("resources")],
        LockMode::Exclusive,
    );
    let result = render(&stmt, Placeholders::Dollar);
    assert_eq!(
        result.sql,
        "LOCK TABLE \"subjects\", \"resources\" IN EXCLUSIVE MODE"
    );
}

#[test]
fn test_identifier_quotes_are_doubled() {
    let stmt = DeleteStmt::new(TableRef::bare("we\"ird"));

    let result = render(&stmt, Placeholders::Dollar);
    assert_eq!(result.sql, "DELETE FROM \"we\"\"ird\"");
}
