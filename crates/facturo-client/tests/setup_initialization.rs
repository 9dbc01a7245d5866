//! First-run initialization: the books home, the schema, the meta keys, and
//! the seeded sales journal for the default company.

use facturo_client::setup;
use rusqlite::Connection;
use tempfile::TempDir;

fn open_books_db(home: &TempDir) -> Connection {
    let connection = Connection::open(home.path().join("books.db"));
    assert!(connection.is_ok());
    match connection {
        Ok(connection) => connection,
        Err(_) => unreachable!(),
    }
}

#[test]
fn first_init_creates_the_schema() {
    let home = TempDir::new();
    assert!(home.is_ok());
    let Ok(home) = home else { return };

    let context = setup::ensure_initialized_at(home.path());
    assert!(context.is_ok());
    if let Ok(context) = context {
        assert!(context.db_path.ends_with("books.db"));
        assert_eq!(context.schema_version, "v1");
    }
    assert!(home.path().join("books.db").exists());

    let connection = open_books_db(&home);
    let tables = connection.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'table' AND name IN
           ('internal_meta', 'import_batches', 'import_lines', 'customers',
            'products', 'accounts', 'journals', 'invoices', 'invoice_lines')",
        [],
        |row| row.get::<_, i64>(0),
    );
    assert_eq!(tables.ok(), Some(9));
}

#[test]
fn init_seeds_one_sales_journal_for_the_default_company() {
    let home = TempDir::new();
    assert!(home.is_ok());
    let Ok(home) = home else { return };

    assert!(setup::ensure_initialized_at(home.path()).is_ok());

    let connection = open_books_db(&home);
    let journal = connection.query_row(
        "SELECT company, journal_type, name FROM journals",
        [],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    );
    assert!(journal.is_ok());
    if let Ok((company, journal_type, name)) = journal {
        assert_eq!(company, "main");
        assert_eq!(journal_type, "sale");
        assert_eq!(name, "Customer Invoices");
    }
}

#[test]
fn reinitialization_is_idempotent() {
    let home = TempDir::new();
    assert!(home.is_ok());
    let Ok(home) = home else { return };

    assert!(setup::ensure_initialized_at(home.path()).is_ok());
    assert!(setup::ensure_initialized_at(home.path()).is_ok());

    let connection = open_books_db(&home);
    let journals = connection.query_row("SELECT COUNT(*) FROM journals", [], |row| {
        row.get::<_, i64>(0)
    });
    assert_eq!(journals.ok(), Some(1));
}

#[test]
fn init_writes_the_required_meta_keys() {
    let home = TempDir::new();
    assert!(home.is_ok());
    let Ok(home) = home else { return };

    assert!(setup::ensure_initialized_at(home.path()).is_ok());

    let connection = open_books_db(&home);
    for key in ["schema_version", "import_contract_version"] {
        let value = connection.query_row(
            "SELECT value FROM internal_meta WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        );
        assert_eq!(value.ok(), Some("v1".to_string()));
    }
}

#[test]
fn deleted_meta_keys_are_restored_on_the_next_init() {
    let home = TempDir::new();
    assert!(home.is_ok());
    let Ok(home) = home else { return };

    assert!(setup::ensure_initialized_at(home.path()).is_ok());

    {
        let connection = open_books_db(&home);
        let deleted = connection.execute(
            "DELETE FROM internal_meta WHERE key = 'import_contract_version'",
            [],
        );
        assert!(deleted.is_ok());
    }

    assert!(setup::ensure_initialized_at(home.path()).is_ok());

    let connection = open_books_db(&home);
    let value = connection.query_row(
        "SELECT value FROM internal_meta WHERE key = 'import_contract_version'",
        [],
        |row| row.get::<_, String>(0),
    );
    assert_eq!(value.ok(), Some("v1".to_string()));
}

#[test]
fn garbage_database_file_is_reported_as_corrupt() {
    let home = TempDir::new();
    assert!(home.is_ok());
    let Ok(home) = home else { return };

    let created = std::fs::create_dir_all(home.path());
    assert!(created.is_ok());
    let written = std::fs::write(home.path().join("books.db"), b"this is not sqlite at all");
    assert!(written.is_ok());

    let context = setup::ensure_initialized_at(home.path());
    assert!(context.is_err());
    if let Err(error) = context {
        assert_eq!(error.code, "books_corrupt");
        assert!(!error.recovery_steps.is_empty());
    }
}
