use anyhow::Result;
use sqlite_store::{Row, SqliteStore, StoreConfig, Value};

// Helper to create an in-memory store for testing
fn create_test_store() -> Result<SqliteStore> {
    Ok(SqliteStore::open(StoreConfig::in_memory())?)
}

// Helper that also sets up the users table used by most scenarios
async fn create_users_store() -> Result<SqliteStore> {
    let store = create_test_store()?;
    store
        .create_table("users", &["id INTEGER PRIMARY KEY", "name TEXT"])
        .await?;
    Ok(store)
}

#[tokio::test]
async fn test_create_table_is_idempotent() -> Result<()> {
    let store = create_test_store()?;
    let defs = ["id INTEGER PRIMARY KEY", "name TEXT NOT NULL"];

    store.create_table("users", &defs).await?;
    // Second creation with identical defs must not fail (IF NOT EXISTS)
    store.create_table("users", &defs).await?;

    Ok(())
}

#[tokio::test]
async fn test_create_table_with_malformed_defs_fails() -> Result<()> {
    let store = create_test_store()?;
    let result = store.create_table("broken", &["id NOT A TYPE !!"]).await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_drop_table_on_missing_table_succeeds() -> Result<()> {
    let store = create_test_store()?;
    store.drop_table("never_created").await?;
    Ok(())
}

#[tokio::test]
async fn test_insert_then_select_preserves_values_exactly() -> Result<()> {
    let store = create_test_store()?;
    store
        .create_table(
            "samples",
            &[
                "id INTEGER PRIMARY KEY",
                "label TEXT",
                "weight REAL",
                "payload BLOB",
                "note TEXT",
            ],
        )
        .await?;

    // Values with embedded quotes and SQL metacharacters; surviving the
    // round trip proves they were bound as parameters, not concatenated.
    let tricky = r#"Robert'); DROP TABLE samples; -- "quoted""#;
    let row = Row::new()
        .with("label", tricky)
        .with("weight", 2.75)
        .with("payload", vec![0u8, 1, 2, 255])
        .with("note", None::<String>);
    store.insert_rows("samples", &[row]).await?;

    let rows = store.select_rows("samples", None).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("label"), Some(&Value::Text(tricky.to_string())));
    assert_eq!(rows[0].get("weight"), Some(&Value::Real(2.75)));
    assert_eq!(
        rows[0].get("payload"),
        Some(&Value::Blob(vec![0u8, 1, 2, 255]))
    );
    assert_eq!(rows[0].get("note"), Some(&Value::Null));
    Ok(())
}

#[tokio::test]
async fn test_boolean_values_are_stored_as_integers() -> Result<()> {
    let store = create_test_store()?;
    store
        .create_table("flags", &["id INTEGER PRIMARY KEY", "active INTEGER"])
        .await?;
    store
        .insert_rows("flags", &[Row::new().with("active", true)])
        .await?;

    let rows = store.select_rows("flags", None).await?;
    assert_eq!(rows[0].get("active"), Some(&Value::Integer(1)));
    Ok(())
}

#[tokio::test]
async fn test_users_scenario_insert_delete() -> Result<()> {
    let store = create_users_store().await?;

    store
        .insert_rows(
            "users",
            &[Row::new().with("name", "A"), Row::new().with("name", "B")],
        )
        .await?;

    // Rowids are assigned in insertion order
    let rows = store.select_rows("users", None).await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    assert_eq!(rows[0].get("name"), Some(&Value::Text("A".to_string())));
    assert_eq!(rows[1].get("id"), Some(&Value::Integer(2)));
    assert_eq!(rows[1].get("name"), Some(&Value::Text("B".to_string())));

    store.delete_rows("users", Some("WHERE name = 'A'")).await?;
    let rows = store.select_rows("users", None).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Text("B".to_string())));
    Ok(())
}

#[tokio::test]
async fn test_update_row_with_condition() -> Result<()> {
    let store = create_users_store().await?;
    store
        .insert_rows(
            "users",
            &[Row::new().with("name", "A"), Row::new().with("name", "B")],
        )
        .await?;

    store
        .update_row("users", &Row::new().with("name", "C"), Some("WHERE id = 1"))
        .await?;

    let rows = store.select_rows("users", Some("WHERE id = 1")).await?;
    assert_eq!(rows[0].get("name"), Some(&Value::Text("C".to_string())));
    let rows = store.select_rows("users", Some("WHERE id = 2")).await?;
    assert_eq!(rows[0].get("name"), Some(&Value::Text("B".to_string())));
    Ok(())
}

#[tokio::test]
async fn test_update_row_without_condition_affects_all_rows() -> Result<()> {
    let store = create_users_store().await?;
    store
        .insert_rows(
            "users",
            &[Row::new().with("name", "A"), Row::new().with("name", "B")],
        )
        .await?;

    store
        .update_row("users", &Row::new().with("name", "everyone"), None)
        .await?;

    let rows = store.select_rows("users", None).await?;
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.get("name"), Some(&Value::Text("everyone".to_string())));
    }
    Ok(())
}

#[tokio::test]
async fn test_delete_rows_without_condition_clears_table() -> Result<()> {
    let store = create_users_store().await?;
    store
        .insert_rows(
            "users",
            &[Row::new().with("name", "A"), Row::new().with("name", "B")],
        )
        .await?;

    store.delete_rows("users", None).await?;
    assert!(store.select_rows("users", None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_alter_table_adds_and_drops_columns() -> Result<()> {
    use sqlite_store::AlterOperation;

    let store = create_users_store().await?;
    store
        .alter_table("users", AlterOperation::Add, &["email TEXT"])
        .await?;

    store
        .insert_rows(
            "users",
            &[Row::new().with("name", "A").with("email", "a@example.com")],
        )
        .await?;
    let rows = store.select_rows("users", None).await?;
    assert_eq!(
        rows[0].get("email"),
        Some(&Value::Text("a@example.com".to_string()))
    );

    store
        .alter_table("users", AlterOperation::Drop, &["email"])
        .await?;
    let rows = store.select_rows("users", None).await?;
    assert_eq!(rows[0].get("email"), None);
    Ok(())
}

#[tokio::test]
async fn test_alter_table_with_no_columns_is_a_noop() -> Result<()> {
    use sqlite_store::AlterOperation;

    let store = create_test_store()?;
    // No statements are issued, so even a nonexistent table succeeds
    store
        .alter_table("never_created", AlterOperation::Add, &[])
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_insert_failure_rejects_the_batch() -> Result<()> {
    let store = create_test_store()?;
    store
        .create_table("unique_names", &["name TEXT PRIMARY KEY"])
        .await?;

    let result = store
        .insert_rows(
            "unique_names",
            &[
                Row::new().with("name", "dup"),
                Row::new().with("name", "dup"),
            ],
        )
        .await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_foreign_keys_are_enforced() -> Result<()> {
    let store = create_test_store()?;
    store
        .create_table("artists", &["id INTEGER PRIMARY KEY", "name TEXT"])
        .await?;
    store
        .create_table("albums", &["id INTEGER PRIMARY KEY", "title TEXT"])
        .await?;
    store
        .create_table(
            "album_artists",
            &[
                "album_id INTEGER NOT NULL REFERENCES albums(id)",
                "artist_id INTEGER NOT NULL REFERENCES artists(id)",
            ],
        )
        .await?;

    // Junction row referencing parents that do not exist
    let result = store
        .insert_rows(
            "album_artists",
            &[Row::new().with("album_id", 42).with("artist_id", 7)],
        )
        .await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_raw_execute_and_query() -> Result<()> {
    let store = create_users_store().await?;
    let changed = store
        .execute(
            "INSERT INTO users (name) VALUES (?)",
            &[Value::Text("raw".to_string())],
        )
        .await?;
    assert_eq!(changed, 1);

    let rows = store
        .query(
            "SELECT name FROM users WHERE name = ?",
            &[Value::Text("raw".to_string())],
        )
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Text("raw".to_string())));
    Ok(())
}
