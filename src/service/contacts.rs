use log::warn;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use super::{segment, DataService, Mode};
use crate::local::keys;
use crate::models::{
    ApiResponse, ArchivedRecord, ClientRecord, ContactStatus, CustomerRecord, RecordType, SpecialNumber,
};

/// One of the two contact databases and its wire names
struct Database {
    path: &'static str,
    plural: &'static str,
    singular: &'static str,
}

const CLIENTS: Database = Database {
    path: "/database/clients",
    plural: "clients",
    singular: "client",
};

const CUSTOMERS: Database = Database {
    path: "/database/customers",
    plural: "customers",
    singular: "customer",
};

impl DataService {
    pub async fn get_clients(&self) -> ApiResponse<Vec<ClientRecord>> {
        self.list_records(&CLIENTS).await
    }

    pub async fn import_clients(&self, records: &[ClientRecord]) -> ApiResponse<usize> {
        self.import_records(&CLIENTS, records).await
    }

    pub async fn assign_clients(&self, ids: &[String], agent_id: &str) -> ApiResponse<usize> {
        self.assign_records(&CLIENTS, ids, agent_id).await
    }

    pub async fn record_client_outcome(
        &self,
        id: &str,
        status: ContactStatus,
        notes: Option<&str>,
    ) -> ApiResponse<ClientRecord> {
        self.record_outcome(&CLIENTS, id, status, notes).await
    }

    pub async fn get_customers(&self) -> ApiResponse<Vec<CustomerRecord>> {
        self.list_records(&CUSTOMERS).await
    }

    pub async fn import_customers(&self, records: &[CustomerRecord]) -> ApiResponse<usize> {
        self.import_records(&CUSTOMERS, records).await
    }

    pub async fn assign_customers(&self, ids: &[String], agent_id: &str) -> ApiResponse<usize> {
        self.assign_records(&CUSTOMERS, ids, agent_id).await
    }

    pub async fn record_customer_outcome(
        &self,
        id: &str,
        status: ContactStatus,
        notes: Option<&str>,
    ) -> ApiResponse<CustomerRecord> {
        self.record_outcome(&CUSTOMERS, id, status, notes).await
    }

    /// Special numbers; the last successful fetch is kept as an offline snapshot
    pub async fn get_special_database(&self) -> ApiResponse<Vec<SpecialNumber>> {
        self.with_fallback(
            "get_special_database",
            Mode::Logged,
            async {
                let numbers: Vec<SpecialNumber> = self.api.get("/special-database").execute_field("numbers").await?;
                if let Err(e) = self.store.set(keys::SPECIAL_DATABASE, &numbers) {
                    warn!("Could not cache special database: {}", e);
                }
                Ok(numbers)
            },
            || Ok(self.store.get(keys::SPECIAL_DATABASE, Vec::new())),
        )
        .await
    }

    pub async fn import_special_numbers(&self, numbers: &[SpecialNumber]) -> ApiResponse<usize> {
        self.remote_only("import_special_numbers", async {
            let imported: Option<usize> = self
                .api
                .post("/special-database/import")
                .json(&json!({ "numbers": numbers }))?
                .execute_field("imported")
                .await?;
            Ok(imported.unwrap_or(numbers.len()))
        })
        .await
    }

    pub async fn delete_special_number(&self, id: &str) -> ApiResponse<()> {
        let path = format!("/special-database/{}", segment(id));
        self.remote_only("delete_special_number", async {
            self.api.delete(&path).execute_value().await?;
            Ok(())
        })
        .await
    }

    pub async fn get_archive(&self) -> ApiResponse<Vec<ArchivedRecord>> {
        self.with_fallback(
            "get_archive",
            Mode::Logged,
            async { self.api.get("/archive").execute_field("records").await },
            || Ok(Vec::new()),
        )
        .await
    }

    pub async fn archive_records(&self, record_type: RecordType, ids: &[String]) -> ApiResponse<usize> {
        self.remote_only("archive_records", async {
            let archived: Option<usize> = self
                .api
                .post("/archive")
                .json(&json!({ "recordType": record_type, "ids": ids }))?
                .execute_field("archived")
                .await?;
            Ok(archived.unwrap_or(ids.len()))
        })
        .await
    }

    /// Move archived records back into their database.
    ///
    /// Bulk writes report the backend's count, or the number of items sent
    /// when the backend does not give one.
    pub async fn recycle_records(&self, ids: &[String]) -> ApiResponse<usize> {
        self.remote_only("recycle_records", async {
            let recycled: Option<usize> = self
                .api
                .post("/archive/recycle")
                .json(&json!({ "ids": ids }))?
                .execute_field("recycled")
                .await?;
            Ok(recycled.unwrap_or(ids.len()))
        })
        .await
    }

    async fn list_records<T: DeserializeOwned>(&self, db: &Database) -> ApiResponse<Vec<T>> {
        self.with_fallback(
            db.plural,
            Mode::Logged,
            async { self.api.get(db.path).execute_field(db.plural).await },
            || Ok(Vec::new()),
        )
        .await
    }

    async fn import_records<T: Serialize>(&self, db: &Database, records: &[T]) -> ApiResponse<usize> {
        let path = format!("{}/import", db.path);
        self.remote_only("import_records", async {
            let mut body = serde_json::Map::new();
            body.insert(db.plural.to_string(), serde_json::to_value(records)?);
            let imported: Option<usize> = self.api.post(&path).json(&body)?.execute_field("imported").await?;
            Ok(imported.unwrap_or(records.len()))
        })
        .await
    }

    async fn assign_records(&self, db: &Database, ids: &[String], agent_id: &str) -> ApiResponse<usize> {
        let path = format!("{}/assign", db.path);
        self.remote_only("assign_records", async {
            let assigned: Option<usize> = self
                .api
                .post(&path)
                .json(&json!({ "ids": ids, "agentId": agent_id }))?
                .execute_field("assigned")
                .await?;
            Ok(assigned.unwrap_or(ids.len()))
        })
        .await
    }

    async fn record_outcome<T: DeserializeOwned>(
        &self,
        db: &Database,
        id: &str,
        status: ContactStatus,
        notes: Option<&str>,
    ) -> ApiResponse<T> {
        let path = format!("{}/{}/status", db.path, segment(id));
        self.remote_only("record_outcome", async {
            self.api
                .put(&path)
                .json(&json!({ "status": status, "notes": notes }))?
                .execute_field(db.singular)
                .await
        })
        .await
    }
}
