//! GitHub-shaped issues/pulls/refs/contents/checks surface, abstracted
//! behind a trait so fleet handlers are testable without a live connection.

use super::result::{FleetError, FleetResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Deserialize)]
pub struct ForgeIssue {
    pub number: u64,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgeComment {
    pub id: u64,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgeMilestone {
    pub number: u64,
    pub title: String,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgePullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub head_ref: String,
    pub base_ref: String,
    pub state: String,
    pub merged: bool,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub status: String,
    pub conclusion: Option<String>,
}

/// GitHub-shaped forge surface used by every fleet handler.
#[async_trait]
pub trait ForgeClient: Send + Sync {
    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> FleetResult<ForgeIssue>;
    async fn list_issues_for_repo(&self, milestone: Option<u64>, labels: &[String]) -> FleetResult<Vec<ForgeIssue>>;
    async fn get_issue(&self, number: u64) -> FleetResult<ForgeIssue>;
    async fn list_comments(&self, issue_number: u64) -> FleetResult<Vec<ForgeComment>>;
    async fn create_comment(&self, issue_number: u64, body: &str) -> FleetResult<ForgeComment>;
    async fn get_milestone(&self, number: u64) -> FleetResult<ForgeMilestone>;
    async fn list_milestones(&self) -> FleetResult<Vec<ForgeMilestone>>;
    /// Returns `Ok(false)` when the label already existed (422, skipped).
    async fn create_label(&self, name: &str, color: &str) -> FleetResult<bool>;
    /// Returns `Ok(false)` when the label was already gone (404, skipped).
    async fn delete_label(&self, name: &str) -> FleetResult<bool>;
    async fn list_pulls(&self, label: Option<&str>) -> FleetResult<Vec<ForgePullRequest>>;
    async fn get_pull(&self, number: u64) -> FleetResult<ForgePullRequest>;
    async fn merge_pull(&self, number: u64, admin: bool) -> FleetResult<()>;
    async fn update_pull(&self, number: u64, body: Option<String>, state: Option<String>) -> FleetResult<()>;
    /// Returns `Err` with code `MERGE_CONFLICT` on a 422 from GitHub.
    async fn update_branch(&self, number: u64) -> FleetResult<()>;
    async fn create_pull(&self, title: &str, body: &str, head: &str, base: &str) -> FleetResult<ForgePullRequest>;
    async fn list_pull_files(&self, number: u64) -> FleetResult<Vec<String>>;
    async fn get_ref(&self, git_ref: &str) -> FleetResult<String>;
    async fn create_ref(&self, git_ref: &str, sha: &str) -> FleetResult<()>;
    /// Returns `Ok(false)` when the file already existed (422, skipped).
    async fn create_or_update_file(&self, path: &str, content: &str, message: &str, branch: &str) -> FleetResult<bool>;
    async fn compare_commits(&self, base: &str, head: &str) -> FleetResult<Vec<String>>;
    async fn get_content(&self, path: &str, git_ref: Option<&str>) -> FleetResult<String>;
    async fn list_checks_for_ref(&self, sha: &str) -> FleetResult<Vec<CheckRun>>;
}

/// Thin `reqwest`-based GitHub REST client, authenticated from a PAT
/// (`GITHUB_TOKEN` or a caller-supplied token). GitHub App JWT auth (RS256)
/// is out of scope here; see DESIGN.md.
pub struct GitHubForgeClient {
    http: reqwest::Client,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubForgeClient {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("https://api.github.com/repos/{}/{}{}", self.owner, self.repo, path)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "jules-fleet-sdk")
            .header("Accept", "application/vnd.github+json")
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> FleetResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()).recoverable())?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()).recoverable())?;
        if !status.is_success() {
            return Err(FleetError::new(
                "GITHUB_API_ERROR",
                format!("GitHub API returned {status}: {body}"),
            )
            .recoverable());
        }
        serde_json::from_str(&body).map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()))
    }
}

#[async_trait]
impl ForgeClient for GitHubForgeClient {
    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> FleetResult<ForgeIssue> {
        let payload = serde_json::json!({"title": title, "body": body, "labels": labels});
        let builder = self.request(reqwest::Method::POST, &self.url("/issues")).json(&payload);
        self.send_json(builder).await
    }

    async fn list_issues_for_repo(&self, milestone: Option<u64>, labels: &[String]) -> FleetResult<Vec<ForgeIssue>> {
        let mut url = self.url("/issues?state=open");
        if let Some(m) = milestone {
            url.push_str(&format!("&milestone={m}"));
        }
        if !labels.is_empty() {
            url.push_str(&format!("&labels={}", labels.join(",")));
        }
        let builder = self.request(reqwest::Method::GET, &url);
        self.send_json(builder).await
    }

    async fn get_issue(&self, number: u64) -> FleetResult<ForgeIssue> {
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/issues/{number}")));
        self.send_json(builder).await
    }

    async fn list_comments(&self, issue_number: u64) -> FleetResult<Vec<ForgeComment>> {
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/issues/{issue_number}/comments")));
        self.send_json(builder).await
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> FleetResult<ForgeComment> {
        let payload = serde_json::json!({"body": body});
        let builder = self
            .request(reqwest::Method::POST, &self.url(&format!("/issues/{issue_number}/comments")))
            .json(&payload);
        self.send_json(builder).await
    }

    async fn get_milestone(&self, number: u64) -> FleetResult<ForgeMilestone> {
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/milestones/{number}")));
        self.send_json(builder).await
    }

    async fn list_milestones(&self) -> FleetResult<Vec<ForgeMilestone>> {
        let builder = self.request(reqwest::Method::GET, &self.url("/milestones?state=open"));
        self.send_json(builder).await
    }

    async fn create_label(&self, name: &str, color: &str) -> FleetResult<bool> {
        let payload = serde_json::json!({"name": name, "color": color});
        let response = self
            .request(reqwest::Method::POST, &self.url("/labels"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()).recoverable())?;
        if response.status().as_u16() == 422 {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(FleetError::new("GITHUB_API_ERROR", format!("create_label failed: {}", response.status())).recoverable());
        }
        Ok(true)
    }

    async fn delete_label(&self, name: &str) -> FleetResult<bool> {
        let response = self
            .request(reqwest::Method::DELETE, &self.url(&format!("/labels/{name}")))
            .send()
            .await
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()).recoverable())?;
        if response.status().as_u16() == 404 {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(FleetError::new("GITHUB_API_ERROR", format!("delete_label failed: {}", response.status())).recoverable());
        }
        Ok(true)
    }

    async fn list_pulls(&self, label: Option<&str>) -> FleetResult<Vec<ForgePullRequest>> {
        let mut url = self.url("/pulls?state=open");
        if let Some(label) = label {
            url.push_str(&format!("&labels={label}"));
        }
        let builder = self.request(reqwest::Method::GET, &url);
        self.send_json(builder).await
    }

    async fn get_pull(&self, number: u64) -> FleetResult<ForgePullRequest> {
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/pulls/{number}")));
        self.send_json(builder).await
    }

    async fn merge_pull(&self, number: u64, admin: bool) -> FleetResult<()> {
        let payload = serde_json::json!({"merge_method": "squash", "admin": admin});
        let response = self
            .request(reqwest::Method::PUT, &self.url(&format!("/pulls/{number}/merge")))
            .json(&payload)
            .send()
            .await
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()).recoverable())?;
        if !response.status().is_success() {
            return Err(FleetError::new("MERGE_FAILED", format!("merge_pull({number}) failed: {}", response.status())));
        }
        Ok(())
    }

    async fn update_pull(&self, number: u64, body: Option<String>, state: Option<String>) -> FleetResult<()> {
        let mut payload = serde_json::Map::new();
        if let Some(body) = body {
            payload.insert("body".into(), serde_json::Value::String(body));
        }
        if let Some(state) = state {
            payload.insert("state".into(), serde_json::Value::String(state));
        }
        let response = self
            .request(reqwest::Method::PATCH, &self.url(&format!("/pulls/{number}")))
            .json(&payload)
            .send()
            .await
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()).recoverable())?;
        if !response.status().is_success() {
            return Err(FleetError::new("GITHUB_API_ERROR", format!("update_pull failed: {}", response.status())).recoverable());
        }
        Ok(())
    }

    async fn update_branch(&self, number: u64) -> FleetResult<()> {
        let response = self
            .request(reqwest::Method::PUT, &self.url(&format!("/pulls/{number}/update-branch")))
            .send()
            .await
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()).recoverable())?;
        if response.status().as_u16() == 422 {
            return Err(FleetError::new("MERGE_CONFLICT", format!("PR #{number} has a merge conflict")));
        }
        if !response.status().is_success() {
            return Err(FleetError::new("GITHUB_API_ERROR", format!("update_branch failed: {}", response.status())).recoverable());
        }
        Ok(())
    }

    async fn create_pull(&self, title: &str, body: &str, head: &str, base: &str) -> FleetResult<ForgePullRequest> {
        let payload = serde_json::json!({"title": title, "body": body, "head": head, "base": base});
        let builder = self.request(reqwest::Method::POST, &self.url("/pulls")).json(&payload);
        self.send_json(builder).await
    }

    async fn list_pull_files(&self, number: u64) -> FleetResult<Vec<String>> {
        #[derive(Deserialize)]
        struct FileEntry {
            filename: String,
        }
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/pulls/{number}/files")));
        let entries: Vec<FileEntry> = self.send_json(builder).await?;
        Ok(entries.into_iter().map(|f| f.filename).collect())
    }

    async fn get_ref(&self, git_ref: &str) -> FleetResult<String> {
        #[derive(Deserialize)]
        struct RefObject {
            sha: String,
        }
        #[derive(Deserialize)]
        struct RefResponse {
            object: RefObject,
        }
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/git/ref/{git_ref}")));
        let resp: RefResponse = self.send_json(builder).await?;
        Ok(resp.object.sha)
    }

    async fn create_ref(&self, git_ref: &str, sha: &str) -> FleetResult<()> {
        let payload = serde_json::json!({"ref": format!("refs/{git_ref}"), "sha": sha});
        let response = self
            .request(reqwest::Method::POST, &self.url("/git/refs"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| FleetError::new("BRANCH_CREATE_FAILED", e.to_string()).recoverable())?;
        if !response.status().is_success() {
            return Err(FleetError::new("BRANCH_CREATE_FAILED", format!("create_ref failed: {}", response.status())));
        }
        Ok(())
    }

    async fn create_or_update_file(&self, path: &str, content: &str, message: &str, branch: &str) -> FleetResult<bool> {
        use base64::Engine;
        let payload = serde_json::json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(content),
            "branch": branch,
        });
        let response = self
            .request(reqwest::Method::PUT, &self.url(&format!("/contents/{path}")))
            .json(&payload)
            .send()
            .await
            .map_err(|e| FleetError::new("FILE_COMMIT_FAILED", e.to_string()).recoverable())?;
        if response.status().as_u16() == 422 {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(FleetError::new("FILE_COMMIT_FAILED", format!("create_or_update_file failed: {}", response.status())));
        }
        Ok(true)
    }

    async fn compare_commits(&self, base: &str, head: &str) -> FleetResult<Vec<String>> {
        #[derive(Deserialize)]
        struct FileEntry {
            filename: String,
        }
        #[derive(Deserialize)]
        struct CompareResponse {
            files: Vec<FileEntry>,
        }
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/compare/{base}...{head}")));
        let resp: CompareResponse = self.send_json(builder).await?;
        Ok(resp.files.into_iter().map(|f| f.filename).collect())
    }

    async fn get_content(&self, path: &str, git_ref: Option<&str>) -> FleetResult<String> {
        #[derive(Deserialize)]
        struct ContentResponse {
            content: String,
        }
        let mut url = self.url(&format!("/contents/{path}"));
        if let Some(r) = git_ref {
            url.push_str(&format!("?ref={r}"));
        }
        let builder = self.request(reqwest::Method::GET, &url);
        let resp: ContentResponse = self.send_json(builder).await?;
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(resp.content.replace('\n', ""))
            .map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()))?;
        String::from_utf8(decoded).map_err(|e| FleetError::new("GITHUB_API_ERROR", e.to_string()))
    }

    async fn list_checks_for_ref(&self, sha: &str) -> FleetResult<Vec<CheckRun>> {
        #[derive(Deserialize)]
        struct ChecksResponse {
            check_runs: Vec<CheckRun>,
        }
        let builder = self.request(reqwest::Method::GET, &self.url(&format!("/commits/{sha}/check-runs")));
        let resp: ChecksResponse = self.send_json(builder).await?;
        Ok(resp.check_runs)
    }
}

/// In-memory forge, used throughout the fleet handler test suite.
#[derive(Default)]
pub struct MockForgeClient {
    pub issues: Mutex<HashMap<u64, ForgeIssue>>,
    pub comments: Mutex<HashMap<u64, Vec<ForgeComment>>>,
    pub milestones: Mutex<HashMap<u64, ForgeMilestone>>,
    pub labels: Mutex<Vec<String>>,
    pub pulls: Mutex<HashMap<u64, ForgePullRequest>>,
    pub checks: Mutex<HashMap<String, Vec<CheckRun>>>,
    pub files: Mutex<HashMap<String, String>>,
    pub refs: Mutex<HashMap<String, String>>,
    pub merged: Mutex<Vec<u64>>,
    pub update_branch_calls: Mutex<Vec<u64>>,
    pub conflicted: Mutex<HashSet<u64>>,
    pub next_issue_id: Mutex<u64>,
    pub next_pr_id: Mutex<u64>,
    pub next_comment_id: Mutex<u64>,
}

impl MockForgeClient {
    pub fn new() -> Self {
        Self {
            next_issue_id: Mutex::new(1),
            next_pr_id: Mutex::new(1),
            next_comment_id: Mutex::new(1),
            ..Default::default()
        }
    }

    pub fn seed_issue(&self, issue: ForgeIssue) {
        self.issues.lock().unwrap().insert(issue.number, issue);
    }

    pub fn seed_pull(&self, pull: ForgePullRequest) {
        self.pulls.lock().unwrap().insert(pull.number, pull);
    }

    pub fn seed_checks(&self, sha: &str, checks: Vec<CheckRun>) {
        self.checks.lock().unwrap().insert(sha.to_string(), checks);
    }

    /// Make the next `update_branch` call for `number` fail with `MERGE_CONFLICT`.
    pub fn seed_conflict(&self, number: u64) {
        self.conflicted.lock().unwrap().insert(number);
    }
}

#[async_trait]
impl ForgeClient for MockForgeClient {
    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> FleetResult<ForgeIssue> {
        let mut id = self.next_issue_id.lock().unwrap();
        let issue = ForgeIssue {
            number: *id,
            title: title.to_string(),
            body: body.to_string(),
            labels: labels.to_vec(),
            state: "open".to_string(),
        };
        *id += 1;
        self.issues.lock().unwrap().insert(issue.number, issue.clone());
        Ok(issue)
    }

    async fn list_issues_for_repo(&self, _milestone: Option<u64>, labels: &[String]) -> FleetResult<Vec<ForgeIssue>> {
        Ok(self
            .issues
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.state == "open" && labels.iter().all(|l| i.labels.contains(l)))
            .cloned()
            .collect())
    }

    async fn get_issue(&self, number: u64) -> FleetResult<ForgeIssue> {
        self.issues
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| FleetError::new("ISSUE_NOT_FOUND", format!("issue #{number} not found")))
    }

    async fn list_comments(&self, issue_number: u64) -> FleetResult<Vec<ForgeComment>> {
        Ok(self.comments.lock().unwrap().get(&issue_number).cloned().unwrap_or_default())
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> FleetResult<ForgeComment> {
        let mut id = self.next_comment_id.lock().unwrap();
        let comment = ForgeComment {
            id: *id,
            body: body.to_string(),
            created_at: crate::model::now_millis().to_string(),
        };
        *id += 1;
        self.comments.lock().unwrap().entry(issue_number).or_default().push(comment.clone());
        Ok(comment)
    }

    async fn get_milestone(&self, number: u64) -> FleetResult<ForgeMilestone> {
        self.milestones
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| FleetError::new("MILESTONE_NOT_FOUND", format!("milestone #{number} not found")))
    }

    async fn list_milestones(&self) -> FleetResult<Vec<ForgeMilestone>> {
        Ok(self.milestones.lock().unwrap().values().cloned().collect())
    }

    async fn create_label(&self, name: &str, _color: &str) -> FleetResult<bool> {
        let mut labels = self.labels.lock().unwrap();
        if labels.iter().any(|l| l == name) {
            return Ok(false);
        }
        labels.push(name.to_string());
        Ok(true)
    }

    async fn delete_label(&self, name: &str) -> FleetResult<bool> {
        let mut labels = self.labels.lock().unwrap();
        let before = labels.len();
        labels.retain(|l| l != name);
        Ok(labels.len() != before)
    }

    async fn list_pulls(&self, label: Option<&str>) -> FleetResult<Vec<ForgePullRequest>> {
        let mut pulls: Vec<_> = self
            .pulls
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.state == "open" && label.map(|l| p.labels.iter().any(|x| x == l)).unwrap_or(true))
            .cloned()
            .collect();
        pulls.sort_by_key(|p| p.number);
        Ok(pulls)
    }

    async fn get_pull(&self, number: u64) -> FleetResult<ForgePullRequest> {
        self.pulls
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| FleetError::new("ISSUE_NOT_FOUND", format!("PR #{number} not found")))
    }

    async fn merge_pull(&self, number: u64, _admin: bool) -> FleetResult<()> {
        let mut pulls = self.pulls.lock().unwrap();
        let Some(pull) = pulls.get_mut(&number) else {
            return Err(FleetError::new("MERGE_FAILED", format!("PR #{number} not found")));
        };
        pull.merged = true;
        pull.state = "closed".to_string();
        self.merged.lock().unwrap().push(number);
        Ok(())
    }

    async fn update_pull(&self, number: u64, body: Option<String>, state: Option<String>) -> FleetResult<()> {
        let mut pulls = self.pulls.lock().unwrap();
        let Some(pull) = pulls.get_mut(&number) else {
            return Err(FleetError::new("ISSUE_NOT_FOUND", format!("PR #{number} not found")));
        };
        if let Some(body) = body {
            pull.body = body;
        }
        if let Some(state) = state {
            pull.state = state;
        }
        Ok(())
    }

    async fn update_branch(&self, number: u64) -> FleetResult<()> {
        self.update_branch_calls.lock().unwrap().push(number);
        if !self.pulls.lock().unwrap().contains_key(&number) {
            return Err(FleetError::new("ISSUE_NOT_FOUND", format!("PR #{number} not found")));
        }
        if self.conflicted.lock().unwrap().remove(&number) {
            return Err(FleetError::new("MERGE_CONFLICT", format!("PR #{number} has a merge conflict")));
        }
        Ok(())
    }

    async fn create_pull(&self, title: &str, body: &str, head: &str, base: &str) -> FleetResult<ForgePullRequest> {
        let mut id = self.next_pr_id.lock().unwrap();
        let pull = ForgePullRequest {
            number: *id,
            title: title.to_string(),
            body: body.to_string(),
            head_ref: head.to_string(),
            base_ref: base.to_string(),
            state: "open".to_string(),
            merged: false,
            labels: vec![],
        };
        *id += 1;
        self.pulls.lock().unwrap().insert(pull.number, pull.clone());
        Ok(pull)
    }

    async fn list_pull_files(&self, _number: u64) -> FleetResult<Vec<String>> {
        Ok(vec![])
    }

    async fn get_ref(&self, git_ref: &str) -> FleetResult<String> {
        self.refs
            .lock()
            .unwrap()
            .get(git_ref)
            .cloned()
            .ok_or_else(|| FleetError::new("BRANCH_CREATE_FAILED", format!("ref {git_ref} not found")))
    }

    async fn create_ref(&self, git_ref: &str, sha: &str) -> FleetResult<()> {
        self.refs.lock().unwrap().insert(git_ref.to_string(), sha.to_string());
        Ok(())
    }

    async fn create_or_update_file(&self, path: &str, content: &str, _message: &str, _branch: &str) -> FleetResult<bool> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Ok(false);
        }
        files.insert(path.to_string(), content.to_string());
        Ok(true)
    }

    async fn compare_commits(&self, _base: &str, _head: &str) -> FleetResult<Vec<String>> {
        Ok(self.files.lock().unwrap().keys().cloned().collect())
    }

    async fn get_content(&self, path: &str, _git_ref: Option<&str>) -> FleetResult<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| FleetError::new("GITHUB_API_ERROR", format!("{path} not found")))
    }

    async fn list_checks_for_ref(&self, sha: &str) -> FleetResult<Vec<CheckRun>> {
        Ok(self.checks.lock().unwrap().get(sha).cloned().unwrap_or_default())
    }
}
