//! Customer persistence
//!
//! A saved customer is the deal record of a session, keyed by a generated id.
//! Each record category is stored as its own JSON blob.

use crate::{PersistenceError, ScyllaClient};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dealer_assist_core::{
    CustomerRecord, DealRecord, LenderRecord, TradeInRecord, VehicleRecord,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Stored customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerEntry {
    pub id: String,
    #[serde(default)]
    pub scenario_id: Option<String>,
    pub record: DealRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerEntry {
    pub fn new(record: DealRecord) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scenario_id: None,
            record,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_scenario(mut self, scenario_id: impl Into<String>) -> Self {
        self.scenario_id = Some(scenario_id.into());
        self
    }

    /// Customer's full name, if known
    pub fn display_name(&self) -> Option<String> {
        let customer = &self.record.customer;
        match (&customer.first_name, &customer.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        }
    }
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Insert or replace by id
    async fn save(&self, entry: &CustomerEntry) -> Result<(), PersistenceError>;
    async fn get(&self, id: &str) -> Result<Option<CustomerEntry>, PersistenceError>;
    /// Most recently updated first
    async fn list(&self, limit: usize) -> Result<Vec<CustomerEntry>, PersistenceError>;
    async fn delete(&self, id: &str) -> Result<bool, PersistenceError>;
}

/// Process-local customer store
#[derive(Default)]
pub struct InMemoryCustomerStore {
    entries: RwLock<HashMap<String, CustomerEntry>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn save(&self, entry: &CustomerEntry) -> Result<(), PersistenceError> {
        self.entries.write().insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CustomerEntry>, PersistenceError> {
        Ok(self.entries.read().get(id).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<CustomerEntry>, PersistenceError> {
        let mut entries: Vec<_> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        Ok(self.entries.write().remove(id).is_some())
    }
}

#[derive(Clone)]
pub struct ScyllaCustomerStore {
    client: ScyllaClient,
}

type CustomerRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    i64,
);

const CUSTOMER_COLUMNS: &str = "id, scenario_id, customer_json, vehicle_json, trade_in_json, \
                                lender_json, extras_json, created_at, updated_at";

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
}

fn parse_json<T: Default + serde::de::DeserializeOwned>(
    value: Option<String>,
) -> Result<T, PersistenceError> {
    match value {
        Some(json) if !json.is_empty() => Ok(serde_json::from_str(&json)?),
        _ => Ok(T::default()),
    }
}

impl ScyllaCustomerStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_entry(
        &self,
        row: scylla::frame::response::result::Row,
    ) -> Result<CustomerEntry, PersistenceError> {
        let (id, scenario_id, customer, vehicle, trade_in, lender, extras, created_at, updated_at): CustomerRow =
            row.into_typed()
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        let record = DealRecord {
            customer: parse_json::<CustomerRecord>(customer)?,
            vehicle: parse_json::<VehicleRecord>(vehicle)?,
            trade_in: parse_json::<TradeInRecord>(trade_in)?,
            lender: parse_json::<LenderRecord>(lender)?,
            extras: parse_json::<BTreeMap<String, String>>(extras)?,
        };

        Ok(CustomerEntry {
            id,
            scenario_id,
            record,
            created_at: millis_to_datetime(created_at),
            updated_at: millis_to_datetime(updated_at),
        })
    }
}

#[async_trait]
impl CustomerStore for ScyllaCustomerStore {
    async fn save(&self, entry: &CustomerEntry) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.customers ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace(),
            CUSTOMER_COLUMNS
        );
        let record = &entry.record;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &entry.id,
                    &entry.scenario_id,
                    serde_json::to_string(&record.customer)?,
                    serde_json::to_string(&record.vehicle)?,
                    serde_json::to_string(&record.trade_in)?,
                    serde_json::to_string(&record.lender)?,
                    serde_json::to_string(&record.extras)?,
                    entry.created_at.timestamp_millis(),
                    entry.updated_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::info!(customer_id = %entry.id, "Customer saved to ScyllaDB");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CustomerEntry>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM {}.customers WHERE id = ?",
            CUSTOMER_COLUMNS,
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                return Ok(Some(self.row_to_entry(row)?));
            }
        }
        Ok(None)
    }

    async fn list(&self, limit: usize) -> Result<Vec<CustomerEntry>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM {}.customers",
            CUSTOMER_COLUMNS,
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, &[]).await?;

        let mut entries = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                entries.push(self.row_to_entry(row)?);
            }
        }
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        let existed = self.get(id).await?.is_some();
        let query = format!("DELETE FROM {}.customers WHERE id = ?", self.client.keyspace());
        self.client.session().query_unpaged(query, (id,)).await?;
        Ok(existed)
    }
}
