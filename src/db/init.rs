// Database initialization and connection management
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use std::sync::{Arc, Mutex};

use crate::error::DomainError;

pub type DbPool = Arc<Mutex<SqliteConnection>>;

/// Open the SQLite database and turn on foreign key enforcement.
/// Note: SQLite has built-in thread-safety; Arc<Mutex<>> provides safe shared access
pub fn init_db(database_url: &str) -> Result<DbPool, DomainError> {
    use diesel::sql_query;
    use diesel::RunQueryDsl;

    let mut conn = SqliteConnection::establish(database_url)
        .map_err(|e| DomainError::Storage(e.to_string()))?;

    // Referential-integrity checks are per-connection in SQLite.
    sql_query("PRAGMA foreign_keys = ON").execute(&mut conn)?;

    Ok(Arc::new(Mutex::new(conn)))
}

/// Run migrations on the database
pub fn run_migrations(db: &DbPool) -> Result<(), DomainError> {
    use diesel::sql_query;
    use diesel::RunQueryDsl;

    let mut conn = db.lock().unwrap();

    let tables = vec![
        "CREATE TABLE IF NOT EXISTS products (
            product_id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS license_types (
            license_type_id TEXT PRIMARY KEY NOT NULL,
            type_name TEXT NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS roles (
            role_id TEXT PRIMARY KEY NOT NULL,
            role_name TEXT NOT NULL UNIQUE
        )",

        "CREATE TABLE IF NOT EXISTS devices (
            device_id TEXT PRIMARY KEY NOT NULL,
            device_name TEXT NOT NULL,
            serial_number TEXT UNIQUE
        )",

        "CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password_digest TEXT NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS user_credentials (
            user_id TEXT PRIMARY KEY NOT NULL REFERENCES users(user_id),
            password_hash TEXT NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS user_roles (
            user_id TEXT NOT NULL REFERENCES users(user_id),
            role_id TEXT NOT NULL REFERENCES roles(role_id),
            PRIMARY KEY (user_id, role_id)
        )",

        "CREATE TABLE IF NOT EXISTS licenses (
            license_id TEXT PRIMARY KEY NOT NULL,
            license_name TEXT NOT NULL,
            product_id TEXT NOT NULL REFERENCES products(product_id),
            license_type_id TEXT NOT NULL REFERENCES license_types(license_type_id)
        )",

        "CREATE TABLE IF NOT EXISTS license_assignments (
            assignment_id TEXT PRIMARY KEY NOT NULL,
            license_id TEXT NOT NULL REFERENCES licenses(license_id),
            user_id TEXT NOT NULL REFERENCES users(user_id),
            device_id TEXT NOT NULL REFERENCES devices(device_id),
            created_at INTEGER NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS license_uses (
            use_id TEXT PRIMARY KEY NOT NULL,
            assignment_id TEXT NOT NULL REFERENCES license_assignments(assignment_id),
            used_at INTEGER NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS assignment_logs (
            log_id TEXT PRIMARY KEY NOT NULL,
            assignment_id TEXT NOT NULL REFERENCES license_assignments(assignment_id),
            logged_at INTEGER NOT NULL,
            action TEXT NOT NULL,
            actor TEXT NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS security_logs (
            event_id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            logged_at INTEGER NOT NULL,
            action TEXT NOT NULL,
            object TEXT NOT NULL,
            details TEXT
        )",
    ];

    for table_sql in tables {
        sql_query(table_sql).execute(&mut *conn)?;
    }
    tracing::debug!("✅ Tables created/verified");

    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_licenses_product_id ON licenses(product_id)",
        "CREATE INDEX IF NOT EXISTS idx_license_assignments_license_id ON license_assignments(license_id)",
        "CREATE INDEX IF NOT EXISTS idx_license_uses_assignment_id ON license_uses(assignment_id)",
        "CREATE INDEX IF NOT EXISTS idx_assignment_logs_assignment_id ON assignment_logs(assignment_id)",
        "CREATE INDEX IF NOT EXISTS idx_assignment_logs_logged_at ON assignment_logs(logged_at)",
        "CREATE INDEX IF NOT EXISTS idx_security_logs_user_id ON security_logs(user_id)",
    ];

    for index_sql in indexes {
        sql_query(index_sql).execute(&mut *conn)?;
    }
    tracing::debug!("✅ Indexes created/verified");

    // Storage-level backstop for the audit immutability rule: even a raw
    // UPDATE against security_logs is aborted. The error message is what the
    // error mapping keys on.
    sql_query(
        "CREATE TRIGGER IF NOT EXISTS security_logs_immutable
         BEFORE UPDATE ON security_logs
         BEGIN
             SELECT RAISE(ABORT, 'security_logs rows are immutable');
         END",
    )
    .execute(&mut *conn)?;
    tracing::debug!("✅ security_logs immutability trigger created/verified");

    Ok(())
}
