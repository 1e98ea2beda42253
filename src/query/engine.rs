//! `JulesQuery` grammar and the engine that evaluates it against cached
//! sessions and activities.

use super::filter::{evaluate_where, path_matches, FieldMatcher, WhereClause};
use super::projection::project;
use crate::activity_client::SelectOptions;
use crate::client::Client;
use crate::error::Result;
use crate::model::truncate_summary;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Which cached collection a [`JulesQuery`] runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Sessions,
    Activities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

/// `include.activities` clause on a sessions query.
#[derive(Debug, Clone, Default)]
pub struct IncludeActivities {
    pub where_clause: Option<WhereClause>,
    pub limit: Option<usize>,
}

/// `include.session` clause on an activities query.
#[derive(Debug, Clone, Default)]
pub struct IncludeSession {
    pub select: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub enum Include {
    #[default]
    None,
    Activities(IncludeActivities),
    Session(IncludeSession),
}

/// A structured query against the cache.
#[derive(Debug, Clone)]
pub struct JulesQuery {
    pub from: Domain,
    pub where_clause: WhereClause,
    pub select: Option<Vec<String>>,
    pub order: Order,
    pub limit: Option<usize>,
    pub start_at: Option<String>,
    pub start_after: Option<String>,
    pub include: Include,
}

impl JulesQuery {
    pub fn new(from: Domain) -> Self {
        Self {
            from,
            where_clause: WhereClause::new(),
            select: None,
            order: Order::default(),
            limit: None,
            start_at: None,
            start_after: None,
            include: Include::None,
        }
    }
}

fn default_select(domain: Domain) -> Vec<String> {
    match domain {
        Domain::Activities => vec![
            "id".into(),
            "type".into(),
            "createTime".into(),
            "originator".into(),
            "artifactCount".into(),
            "summary".into(),
        ],
        Domain::Sessions => vec!["id".into(), "state".into(), "title".into(), "createTime".into()],
    }
}

fn activity_summary(doc: &Value) -> String {
    let activity_type = doc.get("type").and_then(|v| v.as_str()).unwrap_or("");
    let text = match activity_type {
        "userMessaged" | "agentMessaged" => doc
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        "planGenerated" => doc.get("plan").and_then(|v| v.as_str()).map(str::to_string),
        "progressUpdated" => doc
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        "sessionFailed" => doc.get("reason").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
    .unwrap_or_else(|| activity_type.to_string());
    truncate_summary(&text)
}

/// Inject computed fields onto a raw cached document before projection.
fn with_computed_fields(domain: Domain, mut doc: Value) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        match domain {
            Domain::Activities => {
                let artifact_count = obj.get("artifacts").and_then(|v| v.as_array()).map(Vec::len).unwrap_or(0);
                obj.insert("artifactCount".into(), json!(artifact_count));
                let summary = activity_summary(&Value::Object(obj.clone()));
                obj.insert("summary".into(), json!(summary));
            }
            Domain::Sessions => {
                let created = obj
                    .get("createTime")
                    .and_then(|v| v.as_str())
                    .and_then(crate::model::parse_rfc3339_millis);
                let updated = obj
                    .get("updateTime")
                    .and_then(|v| v.as_str())
                    .and_then(crate::model::parse_rfc3339_millis);
                let duration = match (created, updated) {
                    (Some(c), Some(u)) => (u - c).max(0),
                    _ => 0,
                };
                obj.insert("durationMs".into(), json!(duration));
            }
        }
    }
    doc
}

fn sort_key(doc: &Value) -> (String, String) {
    let create_time = doc.get("createTime").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let id = doc.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
    (create_time, id)
}

fn sort_results(mut docs: Vec<Value>, order: Order) -> Vec<Value> {
    docs.sort_by(|a, b| {
        let (at, ai) = sort_key(a);
        let (bt, bi) = sort_key(b);
        let ordering = (at, ai).cmp(&(bt, bi));
        match order {
            Order::Asc => ordering,
            Order::Desc => ordering.reverse(),
        }
    });
    docs
}

fn apply_cursor(docs: Vec<Value>, start_at: &Option<String>, start_after: &Option<String>) -> Vec<Value> {
    let cursor = start_at.as_ref().or(start_after.as_ref());
    let Some(cursor_id) = cursor else {
        return docs;
    };
    let position = docs.iter().position(|d| d.get("id").and_then(|v| v.as_str()) == Some(cursor_id.as_str()));
    match position {
        None => Vec::new(),
        Some(idx) => {
            let start = if start_at.is_some() { idx } else { idx + 1 };
            docs[start..].to_vec()
        }
    }
}

fn apply_limit(mut docs: Vec<Value>, limit: Option<usize>) -> Vec<Value> {
    if let Some(limit) = limit {
        docs.truncate(limit);
    }
    docs
}

/// Evaluates [`JulesQuery`] instances against a [`Client`]'s cached sessions
/// and activities.
pub struct QueryEngine<'a> {
    client: &'a Client,
}

impl<'a> QueryEngine<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn execute(&self, query: JulesQuery) -> Result<Vec<Value>> {
        let select = query.select.clone().unwrap_or_else(|| default_select(query.from));
        let docs = match query.from {
            Domain::Sessions => self.evaluate_sessions(&query).await?,
            Domain::Activities => self.evaluate_activities(&query).await?,
        };

        let domain = query.from;
        let computed: Vec<Value> = docs.into_iter().map(|d| with_computed_fields(domain, d)).collect();
        let sorted = sort_results(computed, query.order);
        let paged = apply_cursor(sorted, &query.start_at, &query.start_after);
        let limited = apply_limit(paged, query.limit);

        Ok(limited
            .into_iter()
            .map(|doc| {
                let mut projected = project(&doc, &select);
                if let Value::Object(obj) = &mut projected {
                    obj.remove("_sortKey");
                }
                projected
            })
            .collect())
    }

    async fn evaluate_sessions(&self, query: &JulesQuery) -> Result<Vec<Value>> {
        let storage = self.client.session_storage();
        let index = storage.scan_index().await?;

        // Pass 1: index-only filters (id, state, title, search).
        let index_fields = ["id", "state", "title"];
        let survivors: Vec<_> = index
            .into_iter()
            .filter(|entry| {
                let doc = json!({
                    "id": entry.id,
                    "state": entry.state.wire_value(),
                    "title": entry.title,
                });
                for (path, matcher) in &query.where_clause {
                    if path == "search" {
                        let FieldMatcher::Scalar(Value::String(needle)) = matcher else {
                            continue;
                        };
                        if !entry.title.to_lowercase().contains(&needle.to_lowercase()) {
                            return false;
                        }
                        continue;
                    }
                    if index_fields.contains(&path.as_str()) && !path_matches(&doc, path, matcher) {
                        return false;
                    }
                }
                true
            })
            .collect();

        // Pass 2: hydrate and evaluate the full where clause (dot-paths too).
        let mut results = Vec::new();
        for entry in survivors {
            let Some(cached) = storage.get(&entry.id).await? else {
                continue;
            };
            let doc = serde_json::to_value(&cached.resource)?;
            if !evaluate_where(&doc, &query.where_clause) {
                continue;
            }

            let mut doc = doc;
            // Pass 3: include activities, a finite local read.
            if let Include::Activities(opts) = &query.include {
                let session = self.client.open_session(&entry.id).await?;
                let mut activities = session
                    .activities()
                    .select(SelectOptions::default())
                    .await?;
                if let Some(where_clause) = &opts.where_clause {
                    activities.retain(|a| {
                        let value = serde_json::to_value(a).unwrap_or(Value::Null);
                        evaluate_where(&value, where_clause)
                    });
                }
                if let Some(limit) = opts.limit {
                    activities.truncate(limit);
                }
                let activities_json = serde_json::to_value(&activities)?;
                if let Some(obj) = doc.as_object_mut() {
                    obj.insert("activities".into(), activities_json);
                }
            }
            results.push(doc);
        }
        Ok(results)
    }

    async fn evaluate_activities(&self, query: &JulesQuery) -> Result<Vec<Value>> {
        let session_ids = match routed_session_id(&query.where_clause) {
            Some(id) => vec![id],
            None => {
                let storage = self.client.session_storage();
                storage.scan_index().await?.into_iter().map(|e| e.id).collect()
            }
        };

        let routing_clause: WhereClause = query
            .where_clause
            .iter()
            .filter(|(k, _)| k.as_str() != "sessionId")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut session_cache: HashMap<String, Value> = HashMap::new();
        let mut results = Vec::new();
        for session_id in session_ids {
            let session = self.client.open_session(&session_id).await?;
            let activities = session.activities().select(SelectOptions::default()).await?;
            for activity in activities {
                let doc = serde_json::to_value(&activity)?;
                if !evaluate_where(&doc, &routing_clause) {
                    continue;
                }
                let mut doc = doc;
                if let Include::Session(opts) = &query.include {
                    let session_doc = match session_cache.get(&session_id) {
                        Some(cached) => cached.clone(),
                        None => {
                            let info = session.info().await?;
                            let raw = serde_json::to_value(&info)?;
                            let projected = match &opts.select {
                                Some(select) => project(&raw, select),
                                None => raw,
                            };
                            session_cache.insert(session_id.clone(), projected.clone());
                            projected
                        }
                    };
                    if let Some(obj) = doc.as_object_mut() {
                        obj.insert("session".into(), session_doc);
                    }
                }
                results.push(doc);
            }
        }
        Ok(results)
    }
}

/// If the where clause pins `sessionId` to a single value, return it so
/// activity evaluation can route to just that session instead of scanning
/// the whole index.
fn routed_session_id(clause: &WhereClause) -> Option<String> {
    match clause.get("sessionId")? {
        FieldMatcher::Scalar(Value::String(id)) => Some(id.clone()),
        FieldMatcher::Scalar(_) => None,
        FieldMatcher::Ops(ops) => match &ops.eq {
            Some(Value::String(id)) => Some(id.clone()),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn test_client() -> Client {
        let config = ClientConfig::builder()
            .api_key("key")
            .base_url("http://127.0.0.1:1")
            .force_memory_storage(true)
            .build();
        Client::new(config).unwrap()
    }

    #[test]
    fn default_select_matches_per_domain_defaults() {
        assert_eq!(
            default_select(Domain::Activities),
            vec!["id", "type", "createTime", "originator", "artifactCount", "summary"]
        );
        assert_eq!(default_select(Domain::Sessions), vec!["id", "state", "title", "createTime"]);
    }

    #[test]
    fn truncate_summary_ellipsises_long_text() {
        let long = "x".repeat(250);
        let summary = truncate_summary(&long);
        assert!(summary.ends_with('…'));
        assert_eq!(summary.chars().count(), 201);
    }

    #[test]
    fn sort_results_orders_desc_by_default_with_id_tiebreak() {
        let docs = vec![
            json!({"id": "a", "createTime": "T1"}),
            json!({"id": "b", "createTime": "T1"}),
            json!({"id": "c", "createTime": "T2"}),
        ];
        let sorted = sort_results(docs, Order::Desc);
        let ids: Vec<_> = sorted.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn cursor_start_after_excludes_the_cursor_and_start_at_includes_it() {
        let docs = vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})];
        let after = apply_cursor(docs.clone(), &None, &Some("a".into()));
        assert_eq!(after.len(), 2);
        let at = apply_cursor(docs.clone(), &Some("b".into()), &None);
        assert_eq!(at.iter().map(|d| d["id"].as_str().unwrap()).collect::<Vec<_>>(), vec!["b", "c"]);
        let missing = apply_cursor(docs, &Some("zzz".into()), &None);
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn sessions_query_with_empty_cache_returns_empty() {
        let client = test_client();
        let engine = QueryEngine::new(&client);
        let results = engine.execute(JulesQuery::new(Domain::Sessions)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn activities_query_with_empty_cache_returns_empty() {
        let client = test_client();
        let engine = QueryEngine::new(&client);
        let results = engine.execute(JulesQuery::new(Domain::Activities)).await.unwrap();
        assert!(results.is_empty());
    }
}
