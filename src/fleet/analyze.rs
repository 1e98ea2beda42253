//! Read goal files, gather milestone context, and dispatch one analyzer
//! session per goal.

use super::dispatcher::{DispatchRequest, SessionDispatcher};
use super::forge::ForgeClient;
use super::result::{FleetError, FleetResult};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Goal {
    pub path: String,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct ParsedGoal {
    pub frontmatter: HashMap<String, String>,
    pub body: String,
}

/// Parse a goal markdown file's `---`-delimited YAML frontmatter + body.
/// A minimal `key: value` line parser — goal frontmatter is flat by
/// convention, so a full YAML dependency isn't warranted here.
pub fn parse_goal(raw: &str) -> ParsedGoal {
    let Some(rest) = raw.strip_prefix("---\n") else {
        return ParsedGoal {
            frontmatter: HashMap::new(),
            body: raw.to_string(),
        };
    };
    let Some(end) = rest.find("\n---\n") else {
        return ParsedGoal {
            frontmatter: HashMap::new(),
            body: raw.to_string(),
        };
    };
    let (frontmatter_block, body) = rest.split_at(end);
    let body = body.trim_start_matches("\n---\n").to_string();
    let frontmatter = frontmatter_block
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    ParsedGoal { frontmatter, body }
}

#[derive(Debug, Clone)]
pub struct AnalyzeInput {
    pub goals: Vec<Goal>,
    pub owner: String,
    pub repo: String,
    pub base_branch: String,
    pub milestone: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOutput {
    pub sessions_started: Vec<String>,
    pub failures: Vec<(String, FleetError)>,
}

fn analyzer_prompt(goal: &ParsedGoal, open_issue_titles: &[String], recent_pr_titles: &[String]) -> String {
    format!(
        "You are a fleet analyzer operating in multiple phases:\n\
         Phase 1: Read the goal below and the current milestone context.\n\
         Phase 2: Deduplicate against existing open issues; do not re-raise a signal for\n\
         a goal that is already covered by an open issue or PR.\n\
         Phase 3: Where a new signal is warranted, create it with the fleet signal CLI\n\
         (`fleet signal create --kind <insight|assessment> --title <title> --body <body>`).\n\n\
         Goal:\n{}\n\n\
         Open issues:\n{}\n\n\
         Recent pull requests:\n{}\n",
        goal.body,
        open_issue_titles.join("\n"),
        recent_pr_titles.join("\n"),
    )
}

pub async fn execute(
    forge: &dyn ForgeClient,
    dispatcher: &dyn SessionDispatcher,
    input: AnalyzeInput,
) -> FleetResult<AnalyzeOutput> {
    let open_issues = forge.list_issues_for_repo(Some(input.milestone), &[]).await?;
    let recent_pulls = forge.list_pulls(None).await?;
    let open_issue_titles: Vec<String> = open_issues.iter().map(|i| i.title.clone()).collect();
    let recent_pr_titles: Vec<String> = recent_pulls.iter().map(|p| p.title.clone()).collect();

    let mut output = AnalyzeOutput::default();
    for goal in &input.goals {
        let parsed = parse_goal(&goal.raw);
        let prompt = analyzer_prompt(&parsed, &open_issue_titles, &recent_pr_titles);
        let request = DispatchRequest {
            prompt,
            owner: input.owner.clone(),
            repo: input.repo.clone(),
            base_branch: input.base_branch.clone(),
            require_approval: false,
            auto_pr: false,
        };
        match dispatcher.dispatch(request).await {
            Ok(session) => output.sessions_started.push(session.session_id),
            Err(e) => output.failures.push((goal.path.clone(), e)),
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::dispatcher::MockSessionDispatcher;
    use crate::fleet::forge::MockForgeClient;

    #[test]
    fn parses_frontmatter_and_body() {
        let raw = "---\ntitle: Reduce flakiness\npriority: high\n---\nInvestigate test X.";
        let parsed = parse_goal(raw);
        assert_eq!(parsed.frontmatter.get("title").unwrap(), "Reduce flakiness");
        assert_eq!(parsed.body, "Investigate test X.");
    }

    #[tokio::test]
    async fn dispatches_one_analyzer_session_per_goal() {
        let forge = MockForgeClient::new();
        let dispatcher = MockSessionDispatcher::new();
        let output = execute(
            &forge,
            &dispatcher,
            AnalyzeInput {
                goals: vec![
                    Goal { path: "goals/a.md".into(), raw: "---\ntitle: A\n---\nBody A".into() },
                    Goal { path: "goals/b.md".into(), raw: "---\ntitle: B\n---\nBody B".into() },
                ],
                owner: "acme".into(),
                repo: "widgets".into(),
                base_branch: "main".into(),
                milestone: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(output.sessions_started.len(), 2);
        assert!(output.failures.is_empty());
    }
}
