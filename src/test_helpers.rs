use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::MigrationHarness;
use tempfile::TempDir;

use crate::channel::Channel;
use crate::models::measurement::NewMeasurement;
use crate::{initialize_db_pool, DbPool, MIGRATIONS};

/// Create a test database with a temporary file, configured like the
/// production pool
pub fn create_test_db() -> (TempDir, DbPool) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let database_url = db_path.display().to_string();

    let pool = initialize_db_pool(&database_url).expect("Failed to create pool");

    // Run migrations
    let mut conn = pool.get().expect("Failed to get connection");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    (temp_dir, pool)
}

/// Create an in-memory test database connection
pub fn get_test_db_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .unwrap_or_else(|_| panic!("Error connecting to in-memory SQLite database"));

    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");
    conn
}

/// Store one measurement at a fixed position near Lisbon
pub fn insert_measurement(
    conn: &mut SqliteConnection,
    when: &str,
    node_id: i32,
    values: &[(Channel, f64)],
) -> i32 {
    NewMeasurement {
        when_: when.to_string(),
        node_id,
        longitude: -9.1393,
        latitude: 38.7223,
        gps_error: 3.0,
    }
    .insert(conn, values)
    .expect("Failed to insert measurement")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestResult;

    #[test]
    fn test_create_test_db() {
        let (_temp_dir, pool) = create_test_db();
        let mut conn = pool.get().expect("Failed to get connection");

        // Verify we can query the database
        let result: i32 = diesel::sql_query("SELECT 1 as test")
            .get_result::<TestResult>(&mut conn)
            .map(|r| r.test)
            .expect("Failed to query test database");

        assert_eq!(result, 1);
    }

    #[test]
    fn test_test_db_enforces_foreign_keys() {
        let (_temp_dir, pool) = create_test_db();
        let mut conn = pool.get().expect("Failed to get connection");

        let enabled = diesel::sql_query("SELECT foreign_keys AS test FROM pragma_foreign_keys()")
            .get_result::<TestResult>(&mut conn)
            .map(|r| r.test)
            .expect("Failed to read pragma");
        assert_eq!(enabled, 1);

        // a value row needs its measurement
        let orphan = diesel::sql_query("INSERT INTO measurement_co (mp_id, value) VALUES (999, 1.0)")
            .execute(&mut conn);
        assert!(orphan.is_err());
    }

    #[test]
    fn test_insert_measurement_returns_new_ids() {
        let mut conn = get_test_db_connection();
        let first = insert_measurement(&mut conn, "2024-01-01T10:00:00", 1, &[]);
        let second = insert_measurement(&mut conn, "2024-01-01T10:01:00", 1, &[]);
        assert!(second > first);
    }
}
