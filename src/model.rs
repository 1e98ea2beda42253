//! Data model: activities, artifacts, sessions, and their cached projections.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Who produced an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Originator {
    User,
    Agent,
    System,
}

/// The tagged variant of an [`Activity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    PlanGenerated,
    PlanApproved,
    UserMessaged,
    AgentMessaged,
    ProgressUpdated,
    SessionCompleted,
    SessionFailed,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::PlanGenerated => "planGenerated",
            ActivityType::PlanApproved => "planApproved",
            ActivityType::UserMessaged => "userMessaged",
            ActivityType::AgentMessaged => "agentMessaged",
            ActivityType::ProgressUpdated => "progressUpdated",
            ActivityType::SessionCompleted => "sessionCompleted",
            ActivityType::SessionFailed => "sessionFailed",
        }
    }
}

/// A per-file diff parsed lazily out of a [`ChangeSetArtifact`]'s unidiff patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub path: String,
    pub change_type: ChangeType,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaArtifact {
    pub id: String,
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BashOutputArtifact {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetArtifact {
    pub source: String,
    pub patch: String,
    pub base_commit: String,
    pub suggested_commit_message: String,
}

impl ChangeSetArtifact {
    /// Parse `patch` (a unidiff) into per-file diffs. Lazy by construction:
    /// callers only pay this cost if they actually ask for it.
    pub fn file_diffs(&self) -> Vec<FileDiff> {
        let mut diffs = Vec::new();
        let mut lines = self.patch.lines().peekable();

        while let Some(line) = lines.next() {
            let Some(from) = line.strip_prefix("--- ") else { continue };
            let Some(to) = lines.next().and_then(|l| l.strip_prefix("+++ ")) else { continue };

            let created = from == "/dev/null";
            let deleted = to == "/dev/null";
            let path = if deleted {
                from.strip_prefix("a/").unwrap_or(from)
            } else {
                to.strip_prefix("b/").unwrap_or(to)
            };
            let mut diff = FileDiff {
                path: path.to_string(),
                change_type: if created {
                    ChangeType::Created
                } else if deleted {
                    ChangeType::Deleted
                } else {
                    ChangeType::Modified
                },
                additions: 0,
                deletions: 0,
            };

            while let Some(&next) = lines.peek() {
                if next.starts_with("--- ") {
                    break;
                }
                let next = lines.next().unwrap();
                if next.starts_with('+') && !next.starts_with("+++") {
                    diff.additions += 1;
                } else if next.starts_with('-') && !next.starts_with("---") {
                    diff.deletions += 1;
                }
            }
            diffs.push(diff);
        }
        diffs
    }
}

/// A typed artifact attached to an [`Activity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Artifact {
    Media(MediaArtifact),
    BashOutput(BashOutputArtifact),
    ChangeSet(ChangeSetArtifact),
    /// A tag this version of the SDK doesn't recognise; preserved verbatim.
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

/// Rehydrate a raw cached artifact value into a typed [`Artifact`], tolerating
/// both the flat shape (`{type, ...fields}`) and the legacy nested shape
/// (`{type, bashOutput: {...}}` / `changeSet` / `media`).
pub fn rehydrate_artifact(raw: serde_json::Value) -> Artifact {
    let Some(obj) = raw.as_object() else {
        return Artifact::Unknown(raw);
    };
    let Some(tag) = obj.get("type").and_then(|v| v.as_str()) else {
        return Artifact::Unknown(raw.clone());
    };

    let nested_key = match tag {
        "bashOutput" => Some("bashOutput"),
        "changeSet" => Some("changeSet"),
        "media" => Some("media"),
        _ => None,
    };

    let fields = match nested_key.and_then(|k| obj.get(k)) {
        Some(nested) => nested.clone(),
        None => {
            let mut flat = obj.clone();
            flat.remove("type");
            serde_json::Value::Object(flat)
        }
    };

    match tag {
        "media" => serde_json::from_value(fields)
            .map(Artifact::Media)
            .unwrap_or(Artifact::Unknown(raw)),
        "bashOutput" => serde_json::from_value(fields)
            .map(Artifact::BashOutput)
            .unwrap_or(Artifact::Unknown(raw)),
        "changeSet" => serde_json::from_value(fields)
            .map(Artifact::ChangeSet)
            .unwrap_or(Artifact::Unknown(raw)),
        _ => Artifact::Unknown(raw),
    }
}

/// An immutable event emitted by a remote coding session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub session_id: String,
    pub create_time: String,
    pub originator: Originator,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Free-form payload specific to the activity type (plan body, message
    /// text, progress description, failure reason, ...).
    #[serde(default, flatten)]
    pub payload: HashMap<String, serde_json::Value>,
}

impl Activity {
    pub fn rehydrated(mut self) -> Self {
        self.artifacts = self
            .artifacts
            .into_iter()
            .map(|a| match a {
                Artifact::Unknown(v) => rehydrate_artifact(v),
                other => other,
            })
            .collect();
        self
    }
}

/// Lifecycle state of a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Unspecified,
    Queued,
    Planning,
    InProgress,
    AwaitingPlanApproval,
    AwaitingUserFeedback,
    Paused,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }

    /// Normalise a raw state string: the Agent API sends SCREAMING_SNAKE_CASE
    /// over the wire; unrecognised values degrade to a best-effort lowercase
    /// match rather than failing ingestion (open extension point, see DESIGN.md).
    pub fn normalize(raw: &str) -> Self {
        let canonical: String = raw.chars().filter(|c| *c != '_').collect::<String>().to_ascii_uppercase();
        match canonical.as_str() {
            "QUEUED" => SessionState::Queued,
            "PLANNING" => SessionState::Planning,
            "INPROGRESS" => SessionState::InProgress,
            "AWAITINGPLANAPPROVAL" => SessionState::AwaitingPlanApproval,
            "AWAITINGUSERFEEDBACK" => SessionState::AwaitingUserFeedback,
            "PAUSED" => SessionState::Paused,
            "COMPLETED" => SessionState::Completed,
            "FAILED" => SessionState::Failed,
            "UNSPECIFIED" | "" => SessionState::Unspecified,
            _ => {
                tracing::debug!(state = raw, "unrecognised session state, using fallback");
                SessionState::Unspecified
            }
        }
    }
}

/// Source repository + base branch a session was launched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSource {
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionOutput {
    PullRequest {
        url: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_ref: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        head_ref: Option<String>,
    },
    #[serde(untagged)]
    Other(serde_json::Value),
}

/// A remote session resource as returned by the Agent API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    pub source: SessionSource,
    #[serde(default)]
    pub source_context: String,
    #[serde(default)]
    pub url: String,
    pub state: SessionState,
    pub create_time: String,
    pub update_time: String,
    #[serde(default)]
    pub outputs: Vec<SessionOutput>,
}

impl SessionResource {
    /// Strip a leading `sessions/` prefix, as session ids are sometimes
    /// passed around in resource-name form.
    pub fn normalize_id(id: &str) -> &str {
        id.strip_prefix("sessions/").unwrap_or(id)
    }

    pub fn pull_request(&self) -> Option<(&str, &str)> {
        self.outputs.iter().find_map(|o| match o {
            SessionOutput::PullRequest { url, title, .. } => Some((url.as_str(), title.as_str())),
            SessionOutput::Other(_) => None,
        })
    }
}

/// Lightweight projection persisted separately from the full session resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIndexEntry {
    pub id: String,
    pub title: String,
    pub state: SessionState,
    pub create_time: String,
    pub source_label: String,
    pub updated_at: i64,
}

impl From<&SessionResource> for SessionIndexEntry {
    fn from(resource: &SessionResource) -> Self {
        Self {
            id: resource.id.clone(),
            title: resource.title.clone(),
            state: resource.state,
            create_time: resource.create_time.clone(),
            source_label: format!("{}/{}", resource.source.owner, resource.source.repo),
            updated_at: now_millis(),
        }
    }
}

/// `{resource, _lastSyncedAt}` cache envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSession {
    pub resource: SessionResource,
    #[serde(rename = "_lastSyncedAt")]
    pub last_synced_at: i64,
}

/// One ordered entry in a [`SessionSnapshot`]'s `timeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: String,
    pub create_time: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub summary: String,
}

/// Point-in-time composition of a session and its activity history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub resource: SessionResource,
    pub activities: Vec<Activity>,
    pub duration_ms: i64,
    pub activity_counts: HashMap<String, usize>,
    pub timeline: Vec<TimelineEntry>,
    pub insights: SessionInsights,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInsights {
    pub completion_attempts: usize,
    pub plan_regenerations: usize,
    pub user_interventions: usize,
    pub failed_commands: usize,
    pub pull_request: Option<(String, String)>,
}

impl SessionSnapshot {
    pub fn build(resource: SessionResource, activities: Vec<Activity>) -> Self {
        let mut activity_counts: HashMap<String, usize> = HashMap::new();
        let mut insights = SessionInsights::default();
        let mut timeline = Vec::with_capacity(activities.len());

        for activity in &activities {
            *activity_counts
                .entry(activity.activity_type.as_str().to_string())
                .or_default() += 1;

            match activity.activity_type {
                ActivityType::SessionCompleted => insights.completion_attempts += 1,
                ActivityType::PlanGenerated => insights.plan_regenerations += 1,
                ActivityType::UserMessaged => insights.user_interventions += 1,
                _ => {}
            }

            for artifact in &activity.artifacts {
                if let Artifact::BashOutput(b) = artifact {
                    if b.exit_code != 0 {
                        insights.failed_commands += 1;
                    }
                }
            }

            timeline.push(TimelineEntry {
                id: activity.id.clone(),
                create_time: activity.create_time.clone(),
                activity_type: activity.activity_type,
                summary: activity_text_summary(activity),
            });
        }

        insights.pull_request = resource
            .pull_request()
            .map(|(url, title)| (url.to_string(), title.to_string()));

        let duration_ms = parse_rfc3339_millis(&resource.update_time)
            .zip(parse_rfc3339_millis(&resource.create_time))
            .map(|(end, start)| (end - start).max(0))
            .unwrap_or(0);

        Self {
            resource,
            activities,
            duration_ms,
            activity_counts,
            timeline,
            insights,
        }
    }
}

/// Truncate `text` to ~200 chars, ellipsising if cut. Shared with the query
/// engine's activity summaries so both renderings agree on one truncation rule.
pub(crate) fn truncate_summary(text: &str) -> String {
    const MAX: usize = 200;
    if text.chars().count() <= MAX {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX).collect();
    out.push('…');
    out
}

/// One-line human summary of an activity, for timeline rendering.
fn activity_text_summary(activity: &Activity) -> String {
    let text = match activity.activity_type {
        ActivityType::UserMessaged | ActivityType::AgentMessaged => {
            activity.payload.get("message").and_then(|v| v.as_str()).map(str::to_string)
        }
        ActivityType::PlanGenerated => {
            activity.payload.get("plan").and_then(|v| v.as_str()).map(str::to_string)
        }
        ActivityType::ProgressUpdated => {
            activity.payload.get("description").and_then(|v| v.as_str()).map(str::to_string)
        }
        ActivityType::SessionFailed => {
            activity.payload.get("reason").and_then(|v| v.as_str()).map(str::to_string)
        }
        _ => None,
    }
    .unwrap_or_else(|| activity.activity_type.as_str().to_string());
    truncate_summary(&text)
}

/// Parse an RFC 3339 timestamp into epoch milliseconds without pulling in a
/// full date/time dependency: every timestamp in this system is produced by
/// either the Agent API or our own `now_millis()`, both of which always use
/// the `YYYY-MM-DDTHH:MM:SS(.sss)?Z` profile.
pub fn parse_rfc3339_millis(s: &str) -> Option<i64> {
    let s = s.strip_suffix('Z')?;
    let (date, time) = s.split_once('T')?;
    let mut date_parts = date.split('-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: i64 = date_parts.next()?.parse().ok()?;
    let day: i64 = date_parts.next()?.parse().ok()?;

    let (time, frac_millis) = match time.split_once('.') {
        Some((t, frac)) => {
            let mut frac = frac.to_string();
            frac.truncate(3);
            while frac.len() < 3 {
                frac.push('0');
            }
            (t, frac.parse::<i64>().ok()?)
        }
        None => (time, 0),
    };
    let mut time_parts = time.split(':');
    let hour: i64 = time_parts.next()?.parse().ok()?;
    let minute: i64 = time_parts.next()?.parse().ok()?;
    let second: i64 = time_parts.next()?.parse().ok()?;

    let days = days_from_civil(year, month, day);
    let millis = days * 86_400_000 + hour * 3_600_000 + minute * 60_000 + second * 1000 + frac_millis;
    Some(millis)
}

/// Howard Hinnant's days-from-civil algorithm (proleptic Gregorian, days since epoch).
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_state_normalizes_screaming_snake_case() {
        assert_eq!(SessionState::normalize("IN_PROGRESS"), SessionState::InProgress);
        assert_eq!(
            SessionState::normalize("AWAITING_PLAN_APPROVAL"),
            SessionState::AwaitingPlanApproval
        );
        assert_eq!(SessionState::normalize("bogus"), SessionState::Unspecified);
    }

    #[test]
    fn rehydrates_flat_bash_output_artifact() {
        let raw = serde_json::json!({
            "type": "bashOutput",
            "command": "ls",
            "stdout": "a.txt",
            "stderr": "",
            "exitCode": 0
        });
        let artifact = rehydrate_artifact(raw);
        assert!(matches!(artifact, Artifact::BashOutput(b) if b.command == "ls"));
    }

    #[test]
    fn rehydrates_nested_change_set_artifact() {
        let raw = serde_json::json!({
            "type": "changeSet",
            "changeSet": {
                "source": "agent",
                "patch": "--- a/x\n+++ b/x\n",
                "baseCommit": "abc123",
                "suggestedCommitMessage": "fix"
            }
        });
        let artifact = rehydrate_artifact(raw);
        assert!(matches!(artifact, Artifact::ChangeSet(c) if c.base_commit == "abc123"));
    }

    #[test]
    fn unknown_artifact_tag_passes_through() {
        let raw = serde_json::json!({"type": "futureThing", "x": 1});
        let artifact = rehydrate_artifact(raw.clone());
        assert!(matches!(artifact, Artifact::Unknown(v) if v == raw));
    }

    #[test]
    fn change_set_parses_created_modified_deleted_files() {
        let patch = "--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,1 @@\n+hello\n\
--- a/old.txt\n+++ /dev/null\n@@ -1,1 +0,0 @@\n-bye\n\
--- a/mod.txt\n+++ b/mod.txt\n@@ -1,1 +1,1 @@\n-old\n+new\n";
        let artifact = ChangeSetArtifact {
            source: "agent".into(),
            patch: patch.into(),
            base_commit: "abc".into(),
            suggested_commit_message: "msg".into(),
        };
        let diffs = artifact.file_diffs();
        assert_eq!(diffs.len(), 3);
        assert_eq!(diffs[0].path, "new.txt");
        assert_eq!(diffs[0].change_type, ChangeType::Created);
        assert_eq!(diffs[0].additions, 1);
        assert_eq!(diffs[1].change_type, ChangeType::Deleted);
        assert_eq!(diffs[2].change_type, ChangeType::Modified);
        assert_eq!(diffs[2].additions, 1);
        assert_eq!(diffs[2].deletions, 1);
    }

    #[test]
    fn session_id_normalization_strips_prefix() {
        assert_eq!(SessionResource::normalize_id("sessions/abc"), "abc");
        assert_eq!(SessionResource::normalize_id("abc"), "abc");
    }

    #[test]
    fn rfc3339_parses_and_orders_correctly() {
        let a = parse_rfc3339_millis("2026-01-01T00:00:00Z").unwrap();
        let b = parse_rfc3339_millis("2026-01-01T00:00:01Z").unwrap();
        let c = parse_rfc3339_millis("2026-01-02T00:00:00.500Z").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b - a, 1000);
    }

    #[test]
    fn snapshot_computes_duration_and_insights() {
        let resource = SessionResource {
            id: "s1".into(),
            name: String::new(),
            title: "t".into(),
            prompt: String::new(),
            source: SessionSource {
                owner: "o".into(),
                repo: "r".into(),
                base_branch: "main".into(),
            },
            source_context: String::new(),
            url: String::new(),
            state: SessionState::Completed,
            create_time: "2026-01-01T00:00:00Z".into(),
            update_time: "2026-01-01T00:05:00Z".into(),
            outputs: vec![],
        };
        let activities = vec![Activity {
            id: "a1".into(),
            session_id: "s1".into(),
            create_time: "2026-01-01T00:01:00Z".into(),
            originator: Originator::Agent,
            activity_type: ActivityType::SessionCompleted,
            artifacts: vec![],
            payload: HashMap::new(),
        }];
        let snapshot = SessionSnapshot::build(resource, activities);
        assert_eq!(snapshot.duration_ms, 5 * 60 * 1000);
        assert_eq!(snapshot.insights.completion_attempts, 1);
    }
}
