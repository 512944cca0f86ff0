use anyhow::Result;
use rusqlite::Connection;
use sqlite_manager::utf16::{self, from_wide, to_wide, DatabaseHandle, WideString};
use sqlite_manager::{EncodingError, Error, ErrorCode};
use tempfile::tempdir;

fn create_test_db() -> DatabaseHandle {
    let mut db = DatabaseHandle::create(&to_wide(":memory:")).unwrap();
    let code = db.execute_update(&to_wide(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);",
    ));
    assert_eq!(code, ErrorCode::Ok, "{}", from_wide(db.last_error()));
    db
}

fn row(pairs: &[(&str, &str)]) -> utf16::Row {
    pairs
        .iter()
        .map(|(name, value)| (to_wide(name), to_wide(value)))
        .collect()
}

#[test]
fn test_non_ascii_round_trip() {
    let mut db = create_test_db();
    let code = db.execute_update(&to_wide(
        "INSERT INTO t (id, name) VALUES (1, 'café');",
    ));
    assert_eq!(code, ErrorCode::Ok);
    assert_eq!(db.last_change_count(), Some(1));

    let rows = db.execute_query(&to_wide("SELECT * FROM t;")).unwrap();
    assert_eq!(rows, vec![row(&[("id", "1"), ("name", "café")])]);
}

#[test]
fn test_surrogate_pairs_round_trip() {
    let mut db = create_test_db();
    db.execute_update(&to_wide("INSERT INTO t (name) VALUES ('🦀 日本語');"));

    let rows = db.execute_query(&to_wide("SELECT name AS 名前 FROM t;")).unwrap();
    assert_eq!(rows, vec![row(&[("名前", "🦀 日本語")])]);
}

#[test]
fn test_last_error_is_wide() {
    let mut db = create_test_db();
    assert_eq!(db.last_error(), &[] as &[u16]);

    assert_eq!(
        db.execute_update(&to_wide("DELETE FROM missing;")),
        ErrorCode::Error
    );
    assert_eq!(db.last_error(), to_wide("no such table: missing").as_slice());

    assert_eq!(db.execute_update(&to_wide("DELETE FROM t;")), ErrorCode::Ok);
    assert!(db.last_error().is_empty());
}

#[test]
fn test_null_cells_read_as_empty() {
    let mut db = create_test_db();
    db.execute_update(&to_wide("INSERT INTO t (id) VALUES (7);"));

    let rows = db.execute_query(&to_wide("SELECT id, name FROM t;")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][&to_wide("id")], to_wide("7"));
    assert_eq!(rows[0][&to_wide("name")], WideString::new());
}

#[test]
fn test_empty_statement() {
    let mut db = create_test_db();
    assert_eq!(db.execute_update(&[]), ErrorCode::Ok);
    assert_eq!(db.execute_query(&[]), Some(Vec::new()));
}

#[test]
fn test_unpaired_surrogate_is_rejected() {
    let mut db = create_test_db();
    let mut statement = to_wide("INSERT INTO t (name) VALUES ('x');");
    statement.insert(30, 0xdc00);

    assert_eq!(db.execute_update(&statement), ErrorCode::Misuse);
    assert!(from_wide(db.last_error()).contains("surrogate"));
    assert!(db.execute_query(&statement).is_none());
    assert_eq!(
        db.try_query(&statement),
        Err(Error::Encoding(EncodingError::InvalidUtf16 { position: 30 }))
    );

    let rows = db.execute_query(&to_wide("SELECT COUNT(*) AS n FROM t;")).unwrap();
    assert_eq!(rows, vec![row(&[("n", "0")])]);
}

#[test]
fn test_malformed_query_is_absent() {
    let db = create_test_db();
    assert!(db.execute_query(&to_wide("SELECT FROM WHERE")).is_none());
}

#[test]
fn test_wide_path_with_non_ascii_name() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("données-日本.db");
    let wide_path = to_wide(path.to_str().unwrap());

    let mut db = DatabaseHandle::create(&wide_path).unwrap();
    db.try_update(&to_wide("CREATE TABLE notes (body TEXT);"))?;
    db.try_update(&to_wide("INSERT INTO notes VALUES ('crème brûlée');"))?;
    drop(db);

    assert!(path.exists());
    let conn = Connection::open(&path)?;
    let body: String = conn.query_row("SELECT body FROM notes", [], |row| row.get(0))?;
    assert_eq!(body, "crème brûlée");
    Ok(())
}

#[test]
fn test_wide_create_fails_for_unreachable_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent").join("db.sqlite");
    assert!(DatabaseHandle::create(&to_wide(path.to_str().unwrap())).is_none());
    assert!(DatabaseHandle::create(&to_wide("nul\0.db")).is_none());
}

#[test]
fn test_wide_create_rejects_unpaired_surrogate_in_path() -> Result<()> {
    let dir = tempdir()?;
    let mut path = to_wide(dir.path().join("x").to_str().unwrap());
    path.push(0xd800);
    path.extend(to_wide(".db"));

    assert!(DatabaseHandle::create(&path).is_none());
    let config = utf16::SqliteConfig::new(path);
    assert!(DatabaseHandle::create_with_config(&config).is_none());

    // Nothing was created under a mangled name either.
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_try_update_error_message() {
    let mut db = create_test_db();
    let err = db.try_update(&to_wide("INSERT INTO t (id) VALUES ('not-an-id');"));
    assert!(
        matches!(err, Err(Error::Sqlite { code: ErrorCode::Mismatch, .. })),
        "{err:?}"
    );
    assert_eq!(from_wide(db.last_error()), "datatype mismatch");
}
