//! Sequential squash-merge pipeline: rebase each selected PR onto the base
//! branch, wait for CI, merge, and re-dispatch on conflict.

use super::dispatcher::{DispatchRequest, SessionDispatcher};
use super::forge::{ForgeClient, ForgePullRequest};
use super::result::{FleetError, FleetResult};
use std::time::Duration;

const CONFLICT_FOOTER: &str = "\n\n---\nClosed by fleet merge due to a rebase conflict; re-dispatched to a new session.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Label,
    FleetRun,
}

#[derive(Debug, Clone)]
pub struct MergeInput {
    pub mode: SelectionMode,
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
    pub admin: bool,
    pub re_dispatch: bool,
    pub max_ci_wait_seconds: u64,
    pub max_retries: u32,
    pub poll_timeout_seconds: u64,
    pub run_id: Option<String>,
}

impl MergeInput {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, base_branch: impl Into<String>) -> Self {
        Self {
            mode: SelectionMode::Label,
            owner: owner.into(),
            repo: repo.into(),
            base_branch: base_branch.into(),
            admin: false,
            re_dispatch: false,
            max_ci_wait_seconds: 600,
            max_retries: 2,
            poll_timeout_seconds: 900,
            run_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrState {
    Selected,
    Rebased,
    CiGreen,
    Merged,
}

#[derive(Debug, Clone)]
pub struct MergedPr {
    pub number: u64,
    pub state: PrState,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    pub merged: Vec<MergedPr>,
    pub conflicts_redispatched: Vec<(u64, String)>,
}

fn checks_are_green(checks: &[super::forge::CheckRun]) -> bool {
    if checks.is_empty() {
        return true;
    }
    checks.iter().all(|c| {
        c.status == "completed"
            && matches!(c.conclusion.as_deref(), Some("success") | Some("skipped"))
    })
}

async fn select_pulls(forge: &dyn ForgeClient, input: &MergeInput) -> FleetResult<Vec<ForgePullRequest>> {
    match input.mode {
        SelectionMode::Label => {
            let mut pulls = forge.list_pulls(Some("fleet-merge-ready")).await?;
            pulls.sort_by_key(|p| p.number);
            Ok(pulls)
        }
        SelectionMode::FleetRun => {
            let run_id = input.run_id.as_deref().unwrap_or_default();
            let marker = format!("<!-- fleet-run: {run_id} -->");
            let mut pulls: Vec<ForgePullRequest> = forge
                .list_pulls(None)
                .await?
                .into_iter()
                .filter(|p| p.body.contains(&marker))
                .collect();
            pulls.sort_by_key(|p| p.number);
            Ok(pulls)
        }
    }
}

/// Poll CI for `sha` until every check is a terminal success/skip, or time
/// out after `max_wait_seconds`.
async fn wait_for_ci(forge: &dyn ForgeClient, sha: &str, max_wait_seconds: u64) -> FleetResult<()> {
    let deadline = Duration::from_secs(max_wait_seconds);
    let poll_interval = Duration::from_secs(10);
    let mut waited = Duration::ZERO;
    loop {
        let checks = forge.list_checks_for_ref(sha).await?;
        if checks_are_green(&checks) {
            return Ok(());
        }
        if checks
            .iter()
            .any(|c| c.status == "completed" && matches!(c.conclusion.as_deref(), Some("failure") | Some("cancelled")))
        {
            return Err(FleetError::new("GITHUB_API_ERROR", format!("CI failed for {sha}")));
        }
        if waited >= deadline {
            return Err(FleetError::new("TIMEOUT", format!("CI for {sha} did not complete within {max_wait_seconds}s")));
        }
        tokio::time::sleep(poll_interval).await;
        waited += poll_interval;
    }
}

/// Close the conflicting PR, dispatch a replacement session with the same
/// prompt, and poll for the new PR it opens.
async fn redispatch_after_conflict(
    forge: &dyn ForgeClient,
    dispatcher: &dyn SessionDispatcher,
    pull: &ForgePullRequest,
    input: &MergeInput,
) -> FleetResult<(u64, String)> {
    forge
        .update_pull(pull.number, Some(format!("{}{}", pull.body, CONFLICT_FOOTER)), Some("closed".to_string()))
        .await?;

    let request = DispatchRequest {
        prompt: pull.body.clone(),
        owner: input.owner.clone(),
        repo: input.repo.clone(),
        base_branch: input.base_branch.clone(),
        require_approval: false,
        auto_pr: true,
    };
    let dispatched = dispatcher.dispatch(request).await?;

    let deadline = Duration::from_secs(input.poll_timeout_seconds);
    let poll_interval = Duration::from_secs(30);
    let mut waited = Duration::ZERO;
    loop {
        let pulls = forge.list_pulls(None).await?;
        if let Some(replacement) = pulls.iter().find(|p| {
            p.body.contains(&dispatched.session_id) || p.head_ref.contains(&dispatched.session_id)
        }) {
            return Ok((replacement.number, dispatched.session_id.clone()));
        }
        if waited >= deadline {
            return Err(FleetError::new(
                "REDISPATCH_FAILED",
                format!("no replacement PR opened for session {} within {}s", dispatched.session_id, input.poll_timeout_seconds),
            ));
        }
        tokio::time::sleep(poll_interval).await;
        waited += poll_interval;
    }
}

pub async fn execute(
    forge: &dyn ForgeClient,
    dispatcher: &dyn SessionDispatcher,
    input: MergeInput,
) -> FleetResult<MergeOutput> {
    let pulls = select_pulls(forge, &input).await?;
    let mut output = MergeOutput::default();

    let mut queue: Vec<(ForgePullRequest, u32)> = pulls.into_iter().map(|p| (p, 0u32)).collect();
    let mut cursor = 0usize;
    while cursor < queue.len() {
        let (pull, retries) = queue[cursor].clone();

        // The first PR of a batch is already up to date with the base branch
        // on its first attempt (nothing has merged ahead of it yet), so
        // updateBranch is skipped there.
        let skip_update_branch = cursor == 0 && retries == 0;
        let update_result = if skip_update_branch { Ok(()) } else { forge.update_branch(pull.number).await };

        match update_result {
            Ok(()) => {}
            Err(e) if e.code == "MERGE_CONFLICT" => {
                if !input.re_dispatch {
                    return Err(FleetError::new(
                        "MERGE_FAILED",
                        format!("PR #{} has a merge conflict; see pulls/{} for manual resolution", pull.number, pull.number),
                    ));
                }
                if retries >= input.max_retries {
                    return Err(FleetError::new(
                        "REDISPATCH_FAILED",
                        format!("PR #{} exceeded {} re-dispatch retries; see pulls/{} for manual resolution", pull.number, input.max_retries, pull.number),
                    ));
                }
                let (new_number, session_id) = redispatch_after_conflict(forge, dispatcher, &pull, &input).await?;
                output.conflicts_redispatched.push((pull.number, session_id));
                let replacement = forge.get_pull(new_number).await?;
                queue[cursor] = (replacement, retries + 1);
                continue;
            }
            Err(e) => return Err(e),
        }

        wait_for_ci(forge, &pull.head_ref, input.max_ci_wait_seconds).await?;

        forge.merge_pull(pull.number, input.admin).await?;

        output.merged.push(MergedPr { number: pull.number, state: PrState::Merged });
        cursor += 1;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::dispatcher::MockSessionDispatcher;
    use crate::fleet::forge::{CheckRun, MockForgeClient};

    fn pull(number: u64, labels: Vec<&str>) -> ForgePullRequest {
        ForgePullRequest {
            number,
            title: format!("PR {number}"),
            body: "fixes the thing".into(),
            head_ref: format!("head-{number}"),
            base_ref: "main".into(),
            state: "open".into(),
            merged: false,
            labels: labels.into_iter().map(String::from).collect(),
        }
    }

    fn green_checks() -> Vec<CheckRun> {
        vec![CheckRun { status: "completed".into(), conclusion: Some("success".into()) }]
    }

    #[tokio::test]
    async fn merges_a_single_labeled_pr_once_ci_is_green() {
        let forge = MockForgeClient::new();
        forge.seed_pull(pull(1, vec!["fleet-merge-ready"]));
        forge.seed_checks("head-1", green_checks());
        let dispatcher = MockSessionDispatcher::new();
        let input = MergeInput::new("acme", "widgets", "main");
        let output = execute(&forge, &dispatcher, input).await.unwrap();
        assert_eq!(output.merged.len(), 1);
        assert_eq!(output.merged[0].state, PrState::Merged);
        assert!(forge.merged.lock().unwrap().contains(&1));
    }

    #[tokio::test]
    async fn merges_multiple_prs_in_ascending_order() {
        let forge = MockForgeClient::new();
        forge.seed_pull(pull(2, vec!["fleet-merge-ready"]));
        forge.seed_pull(pull(1, vec!["fleet-merge-ready"]));
        forge.seed_checks("head-1", green_checks());
        forge.seed_checks("head-2", green_checks());
        let dispatcher = MockSessionDispatcher::new();
        let input = MergeInput::new("acme", "widgets", "main");
        let output = execute(&forge, &dispatcher, input).await.unwrap();
        assert_eq!(output.merged.iter().map(|m| m.number).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn ci_timeout_is_fatal() {
        let forge = MockForgeClient::new();
        forge.seed_pull(pull(1, vec!["fleet-merge-ready"]));
        // A check run that is still in progress never satisfies checks_are_green
        // nor the failure/cancelled branch, so the wait runs out the clock.
        forge.seed_checks("head-1", vec![CheckRun { status: "in_progress".into(), conclusion: None }]);
        let dispatcher = MockSessionDispatcher::new();
        let mut input = MergeInput::new("acme", "widgets", "main");
        input.max_ci_wait_seconds = 0;
        let result = execute(&forge, &dispatcher, input).await;
        assert!(matches!(result, Err(e) if e.code == "TIMEOUT"));
    }

    #[tokio::test]
    async fn no_check_runs_counts_as_green() {
        let forge = MockForgeClient::new();
        forge.seed_pull(pull(1, vec!["fleet-merge-ready"]));
        // No seed_checks call: list_checks_for_ref returns an empty vec.
        let dispatcher = MockSessionDispatcher::new();
        let input = MergeInput::new("acme", "widgets", "main");
        let output = execute(&forge, &dispatcher, input).await.unwrap();
        assert_eq!(output.merged.len(), 1);
    }

    #[tokio::test]
    async fn first_pr_of_a_batch_skips_update_branch_on_first_attempt() {
        let forge = MockForgeClient::new();
        forge.seed_pull(pull(2, vec!["fleet-merge-ready"]));
        forge.seed_pull(pull(1, vec!["fleet-merge-ready"]));
        forge.seed_checks("head-1", green_checks());
        forge.seed_checks("head-2", green_checks());
        let dispatcher = MockSessionDispatcher::new();
        let input = MergeInput::new("acme", "widgets", "main");
        execute(&forge, &dispatcher, input).await.unwrap();
        assert_eq!(*forge.update_branch_calls.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn redispatch_matches_replacement_by_head_ref_not_just_body() {
        let forge = MockForgeClient::new();
        forge.seed_pull(pull(1, vec!["fleet-merge-ready"]));
        forge.seed_pull(pull(2, vec!["fleet-merge-ready"]));
        forge.seed_checks("head-1", green_checks());
        forge.seed_checks("head-2", green_checks());
        forge.seed_conflict(2);

        // The replacement PR the mock dispatcher's session opens: its body
        // says nothing about the session, only its head ref does.
        let mut replacement = pull(3, vec![]);
        replacement.head_ref = "branch-mock-session-1".into();
        replacement.body = "unrelated body text".into();
        forge.seed_pull(replacement);
        forge.seed_checks("branch-mock-session-1", green_checks());

        let dispatcher = MockSessionDispatcher::new();
        let mut input = MergeInput::new("acme", "widgets", "main");
        input.re_dispatch = true;
        let output = execute(&forge, &dispatcher, input).await.unwrap();

        assert_eq!(output.conflicts_redispatched.len(), 1);
        assert_eq!(output.conflicts_redispatched[0].0, 2);
        assert_eq!(output.merged.iter().map(|m| m.number).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn fleet_run_mode_selects_by_run_marker() {
        let forge = MockForgeClient::new();
        let mut p = pull(1, vec![]);
        p.body = "implements the run\n\n<!-- fleet-run: run-42 -->".into();
        forge.seed_pull(p);
        forge.seed_checks("head-1", green_checks());
        let dispatcher = MockSessionDispatcher::new();
        let mut input = MergeInput::new("acme", "widgets", "main");
        input.mode = SelectionMode::FleetRun;
        input.run_id = Some("run-42".into());
        let output = execute(&forge, &dispatcher, input).await.unwrap();
        assert_eq!(output.merged.len(), 1);
    }
}
