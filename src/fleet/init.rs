//! Fleet onboarding: branch + commit templates + PR + default labels.

use super::configure::create_default_labels;
use super::forge::ForgeClient;
use super::result::{FleetError, FleetResult};

#[derive(Debug, Clone)]
pub struct InitInput {
    pub base_branch: String,
    /// `(path, content)` pairs; callers append an `example-goal` entry of
    /// their own alongside the fixed fleet templates.
    pub templates: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct InitOutput {
    pub pr_number: u64,
    pub pr_url: String,
    pub files_created: usize,
    pub labels_created: usize,
}

pub async fn execute(forge: &dyn ForgeClient, input: InitInput) -> FleetResult<InitOutput> {
    let branch = format!("fleet/init-{}", crate::model::now_millis());
    let base_sha = forge
        .get_ref(&format!("heads/{}", input.base_branch))
        .await
        .map_err(|e| FleetError::new("BRANCH_CREATE_FAILED", e.message))?;
    forge
        .create_ref(&format!("heads/{branch}"), &base_sha)
        .await
        .map_err(|e| FleetError::new("BRANCH_CREATE_FAILED", e.message))?;

    let mut files_created = 0usize;
    for (path, content) in &input.templates {
        match forge.create_or_update_file(path, content, "fleet init", &branch).await {
            Ok(true) => files_created += 1,
            Ok(false) => {} // already exists, treated as skip
            Err(e) => return Err(FleetError::new("FILE_COMMIT_FAILED", e.message)),
        }
    }

    if files_created == 0 {
        return Err(FleetError::new(
            "ALREADY_INITIALIZED",
            "this repo already has fleet templates",
        )
        .with_suggestion("Use configure to update settings"));
    }

    let pull = forge
        .create_pull(
            "Fleet: initialize workflow templates",
            "Adds fleet goal/worker templates.",
            &branch,
            &input.base_branch,
        )
        .await
        .map_err(|e| FleetError::new("PR_CREATE_FAILED", e.message))?;

    let labels = create_default_labels(forge).await?;

    Ok(InitOutput {
        pr_number: pull.number,
        pr_url: format!("pulls/{}", pull.number),
        files_created,
        labels_created: labels.created.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::forge::MockForgeClient;

    fn input() -> InitInput {
        InitInput {
            base_branch: "main".into(),
            templates: vec![("fleet/goal-template.md".into(), "# Goal".into())],
        }
    }

    #[tokio::test]
    async fn init_creates_branch_files_pr_and_labels() {
        let forge = MockForgeClient::new();
        forge.create_ref("heads/main", "sha0").await.unwrap();
        let output = execute(&forge, input()).await.unwrap();
        assert_eq!(output.files_created, 1);
        assert_eq!(output.labels_created, 4);
        assert_eq!(output.pr_number, 1);
    }

    #[tokio::test]
    async fn second_init_with_same_templates_is_already_initialized() {
        let forge = MockForgeClient::new();
        forge.create_ref("heads/main", "sha0").await.unwrap();
        execute(&forge, input()).await.unwrap();
        let result = execute(&forge, input()).await;
        assert!(matches!(result, Err(e) if e.code == "ALREADY_INITIALIZED"));
    }
}
