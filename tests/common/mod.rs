#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use ryze_uploader::engine::types::Record;
use ryze_uploader::lookup::{LookupConnector, LookupRow, LookupSession};

pub fn rec(value: serde_json::Value) -> Record {
    value.as_object().expect("record must be an object").clone()
}

pub fn recs(values: Vec<serde_json::Value>) -> Vec<Record> {
    values.into_iter().map(rec).collect()
}

#[derive(Clone)]
pub enum Reply {
    Rows(Vec<LookupRow>),
    Fail(String),
}

pub fn group_row(id: serde_json::Value, name: &str) -> LookupRow {
    rec(serde_json::json!({"brand_group_id": id, "brand_group_name": name}))
}

#[derive(Default)]
pub struct LookupLog {
    pub connects: Vec<String>,
    pub queries: Vec<(String, Vec<String>)>,
    pub closes: usize,
}

/// Lookup double keyed by the (trimmed) identifier. Unknown identifiers get
/// no rows.
#[derive(Default)]
pub struct FakeLookup {
    replies: HashMap<String, Reply>,
    refuse_connect: Option<String>,
    pub log: Arc<Mutex<LookupLog>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, identifier: &str, id: serde_json::Value, name: &str) -> Self {
        self.replies
            .insert(identifier.to_string(), Reply::Rows(vec![group_row(id, name)]));
        self
    }

    pub fn with_reply(mut self, identifier: &str, reply: Reply) -> Self {
        self.replies.insert(identifier.to_string(), reply);
        self
    }

    pub fn refusing(message: &str) -> Self {
        Self {
            refuse_connect: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<(String, Vec<String>)> {
        self.log.lock().unwrap().queries.clone()
    }

    pub fn connects(&self) -> Vec<String> {
        self.log.lock().unwrap().connects.clone()
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

struct FakeSession {
    replies: HashMap<String, Reply>,
    log: Arc<Mutex<LookupLog>>,
}

#[async_trait]
impl LookupConnector for FakeLookup {
    async fn connect(&self, database: &str) -> Result<Box<dyn LookupSession>> {
        if let Some(message) = &self.refuse_connect {
            anyhow::bail!("{}", message);
        }
        self.log.lock().unwrap().connects.push(database.to_string());
        Ok(Box::new(FakeSession {
            replies: self.replies.clone(),
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl LookupSession for FakeSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<LookupRow>> {
        self.log.lock().unwrap().queries.push((
            sql.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        ));
        match params.first().and_then(|id| self.replies.get(*id)) {
            Some(Reply::Rows(rows)) => Ok(rows.clone()),
            Some(Reply::Fail(message)) => anyhow::bail!("{}", message),
            None => Ok(Vec::new()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
