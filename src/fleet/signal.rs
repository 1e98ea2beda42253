//! Create a forge issue carrying an insight/assessment signal.

use super::forge::{ForgeClient, ForgeIssue};
use super::result::{FleetError, FleetResult};

#[derive(Debug, Clone)]
pub struct SignalInput {
    pub kind: SignalKind,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Insight,
    Assessment,
}

impl SignalKind {
    fn label(&self) -> &'static str {
        match self {
            SignalKind::Insight => "fleet-insight",
            SignalKind::Assessment => "fleet-assessment",
        }
    }
}

pub async fn execute(forge: &dyn ForgeClient, input: SignalInput) -> FleetResult<ForgeIssue> {
    if let Some(scope) = &input.scope {
        let milestones = forge.list_milestones().await?;
        let matched = milestones.iter().any(|m| m.title.eq_ignore_ascii_case(scope));
        if !matched {
            return Err(FleetError::new("SCOPE_NOT_FOUND", format!("no open milestone titled '{scope}'")));
        }
    }

    let mut labels = vec![input.kind.label().to_string()];
    labels.extend(input.tags.clone());
    forge.create_issue(&input.title, &input.body, &labels).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::forge::{ForgeMilestone, MockForgeClient};

    #[tokio::test]
    async fn creates_issue_with_kind_label_plus_tags() {
        let forge = MockForgeClient::new();
        let issue = execute(
            &forge,
            SignalInput {
                kind: SignalKind::Insight,
                title: "Found a pattern".into(),
                body: "details".into(),
                tags: vec!["perf".into()],
                scope: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(issue.labels, vec!["fleet-insight", "perf"]);
    }

    #[tokio::test]
    async fn unresolvable_scope_fails_with_scope_not_found() {
        let forge = MockForgeClient::new();
        forge.milestones.lock().unwrap().insert(
            1,
            ForgeMilestone {
                number: 1,
                title: "Q1 Cleanup".into(),
                state: "open".into(),
            },
        );
        let result = execute(
            &forge,
            SignalInput {
                kind: SignalKind::Assessment,
                title: "t".into(),
                body: "b".into(),
                tags: vec![],
                scope: Some("Q2 Cleanup".into()),
            },
        )
        .await;
        assert!(matches!(result, Err(e) if e.code == "SCOPE_NOT_FOUND"));
    }

    #[tokio::test]
    async fn scope_matches_case_insensitively() {
        let forge = MockForgeClient::new();
        forge.milestones.lock().unwrap().insert(
            1,
            ForgeMilestone {
                number: 1,
                title: "Q1 Cleanup".into(),
                state: "open".into(),
            },
        );
        let result = execute(
            &forge,
            SignalInput {
                kind: SignalKind::Insight,
                title: "t".into(),
                body: "b".into(),
                tags: vec![],
                scope: Some("q1 cleanup".into()),
            },
        )
        .await;
        assert!(result.is_ok());
    }
}
