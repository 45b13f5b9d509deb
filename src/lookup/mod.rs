pub mod mysql;

use anyhow::Result;
use async_trait::async_trait;

/// One result row keyed by column name.
pub type LookupRow = serde_json::Map<String, serde_json::Value>;

/// An open connection to the lookup database.
#[async_trait]
pub trait LookupSession: Send {
    /// Run a parameterized query and return every row.
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<LookupRow>>;

    /// Close the connection. Dropping a session without calling this still
    /// releases the underlying socket.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens lookup sessions scoped to one database.
#[async_trait]
pub trait LookupConnector: Send + Sync {
    async fn connect(&self, database: &str) -> Result<Box<dyn LookupSession>>;
}
