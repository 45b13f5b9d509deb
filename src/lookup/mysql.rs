use anyhow::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, MySqlConnection, Row, TypeInfo};

use crate::lookup::{LookupConnector, LookupRow, LookupSession};

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Connection settings for the brand-group database.
#[derive(Clone)]
pub struct MySqlCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for MySqlCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

pub struct MySqlConnector {
    credentials: MySqlCredentials,
}

impl MySqlConnector {
    pub fn new(credentials: MySqlCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl LookupConnector for MySqlConnector {
    async fn connect(&self, database: &str) -> Result<Box<dyn LookupSession>> {
        let options = MySqlConnectOptions::new()
            .host(&self.credentials.host)
            .port(self.credentials.port)
            .username(&self.credentials.user)
            .password(&self.credentials.password)
            .database(database);

        let conn = options.connect().await.map_err(|e| {
            anyhow::anyhow!(
                "{}:{} as '{}': {}",
                self.credentials.host,
                self.credentials.port,
                self.credentials.user,
                e
            )
        })?;
        Ok(Box::new(MySqlSession { conn }))
    }
}

/// A single MySQL connection held for one pipeline invocation.
pub struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl LookupSession for MySqlSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<LookupRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let rows = query.fetch_all(&mut self.conn).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

/// Convert a row to a JSON object by inspecting column types at runtime.
fn row_to_json(row: &MySqlRow) -> LookupRow {
    let mut map = serde_json::Map::new();

    for col in row.columns() {
        let index = col.ordinal();
        let type_name = col.type_info().name();

        let value = if type_name.contains("INT") {
            row.try_get::<Option<i64>, _>(index)
                .map(|v| serde_json::json!(v))
                .or_else(|_| {
                    row.try_get::<Option<u64>, _>(index)
                        .map(|v| serde_json::json!(v))
                })
                .unwrap_or(serde_json::Value::Null)
        } else {
            match type_name {
                "FLOAT" | "DOUBLE" => row
                    .try_get::<Option<f64>, _>(index)
                    .map(|v| serde_json::json!(v))
                    .unwrap_or(serde_json::Value::Null),
                "BOOLEAN" => row
                    .try_get::<Option<bool>, _>(index)
                    .map(|v| serde_json::json!(v))
                    .unwrap_or(serde_json::Value::Null),
                // Default: try as string (VARCHAR, TEXT, CHAR, etc.)
                _ => row
                    .try_get::<Option<String>, _>(index)
                    .map(|v| serde_json::json!(v))
                    .unwrap_or(serde_json::Value::Null),
            }
        };

        map.insert(col.name().to_string(), value);
    }

    map
}
