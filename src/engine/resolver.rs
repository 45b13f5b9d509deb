use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::types::{BrandGroup, BrandGroupId};
use crate::error::UploaderError;
use crate::lookup::{LookupConnector, LookupRow, LookupSession};

/// Brand-group lookup for one identifier, scoped to `database`.
pub fn lookup_sql(database: &str) -> String {
    format!(
        "SELECT bg.id AS brand_group_id, bg.name AS brand_group_name \
         FROM {db}.out_brands AS b \
         LEFT JOIN {db}.brands_groups AS bg ON b.brands_group_id = bg.id \
         WHERE b.mongodb_id = ? \
         LIMIT 1",
        db = database
    )
}

/// Outcome of resolving one identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(BrandGroup),
    Unresolved { reason: String },
}

impl Resolution {
    /// The group to use downstream; unresolved identifiers get the
    /// not-found placeholder.
    pub fn brand_group(&self) -> BrandGroup {
        match self {
            Resolution::Resolved(group) => group.clone(),
            Resolution::Unresolved { .. } => BrandGroup::not_found(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Unresolved { reason } => Some(reason),
        }
    }
}

/// Resolve one identifier. Never fails; lookup problems become
/// `Resolution::Unresolved`.
pub async fn resolve(
    session: &mut dyn LookupSession,
    identifier: &str,
    database: &str,
) -> Resolution {
    let clean_id = identifier.trim();
    let sql = lookup_sql(database);

    let rows = match session.query(&sql, &[clean_id]).await {
        Ok(rows) => rows,
        Err(e) => {
            return Resolution::Unresolved {
                reason: format!("Database error: {}", e),
            };
        }
    };

    let Some(row) = rows.first() else {
        return Resolution::Unresolved {
            reason: format!(
                "No rows returned from query for mongodb_id: '{}' (database: {})",
                clean_id, database
            ),
        };
    };

    match brand_group_from_row(row) {
        Some(group) => Resolution::Resolved(group),
        None => Resolution::Unresolved {
            reason: format!(
                "Brand group id is NULL for mongodb_id: '{}' (database: {})",
                clean_id, database
            ),
        },
    }
}

fn brand_group_from_row(row: &LookupRow) -> Option<BrandGroup> {
    let id = match row.get("brand_group_id")? {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(id) => BrandGroupId::Number(id),
            None => BrandGroupId::Text(n.to_string()),
        },
        serde_json::Value::String(s) => BrandGroupId::Text(s.clone()),
        _ => return None,
    };
    let name = row
        .get("brand_group_name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    Some(BrandGroup { id, name })
}

/// Resolutions for every identifier of one invocation, in the order the
/// identifiers were resolved.
#[derive(Debug, Default)]
pub struct ResolutionBatch {
    resolutions: HashMap<String, Resolution>,
    order: Vec<String>,
    pub duration: Duration,
}

impl ResolutionBatch {
    pub fn get(&self, identifier: &str) -> Option<&Resolution> {
        self.resolutions.get(identifier)
    }

    pub fn brand_group(&self, identifier: &str) -> BrandGroup {
        self.get(identifier)
            .map(Resolution::brand_group)
            .unwrap_or_else(BrandGroup::not_found)
    }

    /// Identifier and failure reason for every unresolved identifier, in
    /// resolution order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order.iter().filter_map(|id| {
            self.resolutions
                .get(id)
                .and_then(Resolution::reason)
                .map(|reason| (id.as_str(), reason))
        })
    }

    pub fn len(&self) -> usize {
        self.resolutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }
}

/// Resolve all identifiers over one connection. The connection is opened
/// once and closed after the last lookup; a failed connect is fatal, a failed
/// lookup is not.
pub async fn resolve_all(
    connector: &dyn LookupConnector,
    database: &str,
    identifiers: &[String],
) -> Result<ResolutionBatch, UploaderError> {
    let start = Instant::now();
    let mut session =
        connector
            .connect(database)
            .await
            .map_err(|e| UploaderError::Connection {
                database: database.to_string(),
                message: format!("{:#}", e),
            })?;

    let mut resolutions = HashMap::with_capacity(identifiers.len());
    let mut order = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        let resolution = resolve(session.as_mut(), identifier, database).await;
        match &resolution {
            Resolution::Resolved(group) => {
                debug!(io_id = %identifier, brand_group_id = %group.id, "Brand group resolved")
            }
            Resolution::Unresolved { reason } => {
                warn!(io_id = %identifier, reason = %reason, "Brand group not resolved")
            }
        }
        if resolutions.insert(identifier.clone(), resolution).is_none() {
            order.push(identifier.clone());
        }
    }

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close lookup connection");
    }

    Ok(ResolutionBatch {
        resolutions,
        order,
        duration: start.elapsed(),
    })
}
