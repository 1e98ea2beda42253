//! Repo label management: the `configure` fleet handler.

use super::forge::ForgeClient;
use super::result::FleetResult;

/// The label set `init` provisions on a freshly-onboarded repo.
pub const DEFAULT_LABELS: &[(&str, &str)] = &[
    ("fleet", "5319e7"),
    ("fleet-insight", "0e8a16"),
    ("fleet-assessment", "1d76db"),
    ("fleet-merge-ready", "d93f0b"),
];

#[derive(Debug, Clone)]
pub enum LabelAction {
    Create { name: String, color: String },
    Delete { name: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigureOutput {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub deleted: Vec<String>,
}

pub async fn execute(forge: &dyn ForgeClient, actions: Vec<LabelAction>) -> FleetResult<ConfigureOutput> {
    let mut output = ConfigureOutput::default();
    for action in actions {
        match action {
            LabelAction::Create { name, color } => {
                if forge.create_label(&name, &color).await? {
                    output.created.push(name);
                } else {
                    output.skipped.push(name);
                }
            }
            LabelAction::Delete { name } => {
                if forge.delete_label(&name).await? {
                    output.deleted.push(name);
                } else {
                    output.skipped.push(name);
                }
            }
        }
    }
    Ok(output)
}

/// Provision the default fleet label set, used by `init`.
pub async fn create_default_labels(forge: &dyn ForgeClient) -> FleetResult<ConfigureOutput> {
    let actions = DEFAULT_LABELS
        .iter()
        .map(|(name, color)| LabelAction::Create {
            name: name.to_string(),
            color: color.to_string(),
        })
        .collect();
    execute(forge, actions).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::forge::MockForgeClient;

    #[tokio::test]
    async fn create_default_labels_creates_all_four() {
        let forge = MockForgeClient::new();
        let output = create_default_labels(&forge).await.unwrap();
        assert_eq!(output.created.len(), 4);
        assert!(output.skipped.is_empty());
    }

    #[tokio::test]
    async fn repeated_create_reports_skip() {
        let forge = MockForgeClient::new();
        create_default_labels(&forge).await.unwrap();
        let second = create_default_labels(&forge).await.unwrap();
        assert_eq!(second.skipped.len(), 4);
        assert!(second.created.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_label_is_skipped_not_failed() {
        let forge = MockForgeClient::new();
        let output = execute(
            &forge,
            vec![LabelAction::Delete {
                name: "nonexistent".into(),
            }],
        )
        .await
        .unwrap();
        assert_eq!(output.skipped, vec!["nonexistent"]);
    }
}
