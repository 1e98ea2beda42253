//! Reconstruct the dispatch -> PR -> merge correlation chain for a session,
//! issue, or milestone.

use super::forge::ForgeClient;
use super::result::{FleetError, FleetResult};

const MARKER: &str = "Fleet Dispatch Event";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Dispatched,
    PrCreated,
    PrMerged,
}

#[derive(Debug, Clone)]
pub struct SessionTrace {
    pub session_id: String,
    pub dispatched_by: Option<(u64, String)>,
    pub pull_request: Option<(u64, String, String, bool)>,
    pub changed_files: Vec<String>,
    pub events: Vec<TraceEvent>,
}

#[derive(Debug, Clone)]
pub enum TraceInput {
    Session(String),
    Issue(u64),
    Milestone(u64),
}

#[derive(Debug, Clone)]
pub struct MilestoneTrace {
    pub milestone: u64,
    pub sessions: Vec<SessionTrace>,
}

fn extract_session_id(comment_body: &str) -> Option<String> {
    comment_body
        .lines()
        .find_map(|line| line.strip_prefix("session: "))
        .map(|s| s.trim().to_string())
}

async fn trace_issue(forge: &dyn ForgeClient, issue_number: u64) -> FleetResult<SessionTrace> {
    let issue = forge.get_issue(issue_number).await?;
    let comments = forge.list_comments(issue_number).await?;
    let dispatch_comment = comments.iter().find(|c| c.body.contains(MARKER));
    let session_id = dispatch_comment
        .and_then(|c| extract_session_id(&c.body))
        .unwrap_or_default();

    let mut events = vec![];
    if dispatch_comment.is_some() {
        events.push(TraceEvent::Dispatched);
    }

    let pulls = forge.list_pulls(None).await?;
    let matching_pr = pulls.into_iter().find(|p| p.body.contains(&session_id) && !session_id.is_empty());

    let (pull_request, changed_files) = if let Some(pr) = &matching_pr {
        events.push(TraceEvent::PrCreated);
        if pr.merged {
            events.push(TraceEvent::PrMerged);
        }
        let files = forge.list_pull_files(pr.number).await.unwrap_or_default();
        (
            Some((pr.number, pr.title.clone(), pr.state.clone(), pr.merged)),
            files,
        )
    } else {
        (None, vec![])
    };

    Ok(SessionTrace {
        session_id,
        dispatched_by: Some((issue.number, issue.title)),
        pull_request,
        changed_files,
        events,
    })
}

async fn trace_session(forge: &dyn ForgeClient, session_id: &str) -> FleetResult<SessionTrace> {
    let pulls = forge.list_pulls(None).await?;
    let matching_pr = pulls.into_iter().find(|p| p.body.contains(session_id));

    let mut events = vec![TraceEvent::Dispatched];
    let (pull_request, changed_files) = if let Some(pr) = &matching_pr {
        events.push(TraceEvent::PrCreated);
        if pr.merged {
            events.push(TraceEvent::PrMerged);
        }
        let files = forge.list_pull_files(pr.number).await.unwrap_or_default();
        (
            Some((pr.number, pr.title.clone(), pr.state.clone(), pr.merged)),
            files,
        )
    } else {
        (None, vec![])
    };

    Ok(SessionTrace {
        session_id: session_id.to_string(),
        dispatched_by: None,
        pull_request,
        changed_files,
        events,
    })
}

pub async fn execute(forge: &dyn ForgeClient, input: TraceInput) -> FleetResult<MilestoneTrace> {
    match input {
        TraceInput::Session(id) => {
            let trace = trace_session(forge, &id).await?;
            Ok(MilestoneTrace { milestone: 0, sessions: vec![trace] })
        }
        TraceInput::Issue(number) => {
            let trace = trace_issue(forge, number).await?;
            Ok(MilestoneTrace { milestone: 0, sessions: vec![trace] })
        }
        TraceInput::Milestone(number) => {
            let milestone = forge
                .get_milestone(number)
                .await
                .map_err(|_| FleetError::new("MILESTONE_NOT_FOUND", format!("milestone #{number} not found")))?;
            let issues = forge.list_issues_for_repo(Some(milestone.number), &["fleet".to_string()]).await?;
            let mut sessions = vec![];
            for issue in issues {
                sessions.push(trace_issue(forge, issue.number).await?);
            }
            Ok(MilestoneTrace { milestone: milestone.number, sessions })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::forge::{ForgeIssue, ForgeMilestone, ForgePullRequest, MockForgeClient};

    #[tokio::test]
    async fn traces_issue_through_dispatch_and_pr() {
        let forge = MockForgeClient::new();
        forge.seed_issue(ForgeIssue {
            number: 1,
            title: "Fix bug".into(),
            body: "do it".into(),
            labels: vec!["fleet".into()],
            state: "open".into(),
        });
        forge.create_comment(1, "Fleet Dispatch Event\nsession: sess-1\nat: 100").await.unwrap();
        forge.seed_pull(ForgePullRequest {
            number: 5,
            title: "Fix bug".into(),
            body: "closes #1, session sess-1".into(),
            head_ref: "h".into(),
            base_ref: "main".into(),
            state: "open".into(),
            merged: true,
            labels: vec![],
        });

        let trace = execute(&forge, TraceInput::Issue(1)).await.unwrap();
        let session = &trace.sessions[0];
        assert_eq!(session.session_id, "sess-1");
        assert_eq!(session.pull_request.as_ref().unwrap().0, 5);
        assert!(session.events.contains(&TraceEvent::PrMerged));
    }

    #[tokio::test]
    async fn milestone_trace_aggregates_all_fleet_issues() {
        let forge = MockForgeClient::new();
        forge.milestones.lock().unwrap().insert(1, ForgeMilestone { number: 1, title: "Q1".into(), state: "open".into() });
        forge.seed_issue(ForgeIssue { number: 1, title: "A".into(), body: "a".into(), labels: vec!["fleet".into()], state: "open".into() });
        forge.seed_issue(ForgeIssue { number: 2, title: "B".into(), body: "b".into(), labels: vec!["fleet".into()], state: "open".into() });

        let trace = execute(&forge, TraceInput::Milestone(1)).await.unwrap();
        assert_eq!(trace.sessions.len(), 2);
    }

    #[tokio::test]
    async fn missing_milestone_fails_with_milestone_not_found() {
        let forge = MockForgeClient::new();
        let result = execute(&forge, TraceInput::Milestone(99)).await;
        assert!(matches!(result, Err(e) if e.code == "MILESTONE_NOT_FOUND"));
    }
}
