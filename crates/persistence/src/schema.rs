//! ScyllaDB schema creation
//!
//! Timestamps are stored as epoch milliseconds in BIGINT columns; structured
//! values are stored as JSON text.

use crate::error::PersistenceError;
use scylla::Session;

pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let customers_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.customers (
            id TEXT,
            scenario_id TEXT,
            customer_json TEXT,
            vehicle_json TEXT,
            trade_in_json TEXT,
            lender_json TEXT,
            extras_json TEXT,
            created_at BIGINT,
            updated_at BIGINT,
            PRIMARY KEY (id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(customers_table, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create customers table: {}", e)))?;

    let templates_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.pdf_templates (
            id TEXT,
            name TEXT,
            filename TEXT,
            category TEXT,
            description TEXT,
            document_id TEXT,
            required_scenarios_json TEXT,
            form_fields_json TEXT,
            created_at BIGINT,
            updated_at BIGINT,
            PRIMARY KEY (id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(templates_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create pdf_templates table: {}", e))
        })?;

    Ok(())
}
