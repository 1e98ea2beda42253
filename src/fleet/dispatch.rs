//! Dispatch fleet-labeled, un-dispatched issues in a milestone to worker
//! sessions.

use super::dispatcher::{DispatchRequest, SessionDispatcher};
use super::forge::ForgeClient;
use super::result::{FleetError, FleetResult};

const MARKER: &str = "Fleet Dispatch Event";

#[derive(Debug, Clone)]
pub struct DispatchInput {
    pub milestone: u64,
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
}

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub issue: u64,
    pub session_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchOutput {
    pub dispatched: Vec<DispatchOutcome>,
    pub skipped: Vec<u64>,
    pub failed: Vec<(u64, FleetError)>,
}

fn worker_prompt(issue_body: &str) -> String {
    format!("You are a fleet worker. Resolve the following issue:\n\n{issue_body}")
}

pub async fn execute(
    forge: &dyn ForgeClient,
    dispatcher: &dyn SessionDispatcher,
    input: DispatchInput,
) -> FleetResult<DispatchOutput> {
    let issues = forge
        .list_issues_for_repo(Some(input.milestone), &["fleet".to_string()])
        .await?;

    let mut output = DispatchOutput::default();
    for issue in issues {
        let comments = match forge.list_comments(issue.number).await {
            Ok(c) => c,
            Err(e) => {
                output.failed.push((issue.number, e));
                continue;
            }
        };
        if comments.iter().any(|c| c.body.contains(MARKER)) {
            output.skipped.push(issue.number);
            continue;
        }

        let request = DispatchRequest {
            prompt: worker_prompt(&issue.body),
            owner: input.owner.clone(),
            repo: input.repo.clone(),
            base_branch: input.base_branch.clone(),
            require_approval: false,
            auto_pr: true,
        };
        match dispatcher.dispatch(request).await {
            Ok(dispatched) => {
                let marker = format!("{MARKER}\nsession: {}\nat: {}", dispatched.session_id, crate::model::now_millis());
                let _ = forge.create_comment(issue.number, &marker).await;
                output.dispatched.push(DispatchOutcome {
                    issue: issue.number,
                    session_id: dispatched.session_id,
                });
            }
            Err(e) => output.failed.push((issue.number, e)),
        }
    }
    Ok(output)
}
