//! Repository-issue delivery via the GitHub API.
//!
//! Probes for an existing invitation issue first so a repository is
//! never spammed twice, then files the issue with a marker label.

use super::{ContactExecutor, ContactOutcome};
use crate::util::parse_github_repo;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const INVITATION_LABEL: &str = "agentry-invitation";

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RepoIssueExecutor {
    client: reqwest::Client,
    github_token: Option<String>,
}

impl RepoIssueExecutor {
    pub fn new(client: reqwest::Client, github_token: Option<String>) -> Self {
        Self {
            client,
            github_token,
        }
    }
}

fn has_duplicate_invitation(issues: &Value) -> bool {
    let Value::Array(items) = issues else {
        return false;
    };
    items.iter().any(|issue| {
        issue
            .get("title")
            .and_then(|t| t.as_str())
            .map(|t| t.to_lowercase().contains("agentry"))
            .unwrap_or(false)
    })
}

#[async_trait]
impl ContactExecutor for RepoIssueExecutor {
    async fn contact(&self, repo_url: &str, payload: &Value) -> ContactOutcome {
        // Both preconditions fail fast without touching the network.
        let Some((owner, repo)) = parse_github_repo(repo_url) else {
            return ContactOutcome::failed("Invalid GitHub repository URL");
        };
        let Some(token) = self.github_token.as_deref() else {
            return ContactOutcome::failed("GITHUB_TOKEN is missing");
        };

        let probe_url = format!(
            "https://api.github.com/repos/{owner}/{repo}/issues?state=all&labels={INVITATION_LABEL}&per_page=20"
        );
        let probe = self
            .client
            .get(&probe_url)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(token)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        if let Ok(response) = probe {
            if response.status().is_success() {
                let issues = response.json::<Value>().await.unwrap_or(Value::Null);
                if has_duplicate_invitation(&issues) {
                    return ContactOutcome {
                        success: true,
                        sent: false,
                        status: Some(200),
                        response: None,
                        error: None,
                        note: Some(
                            "An Agentry invitation issue already exists for this repository"
                                .into(),
                        ),
                    };
                }
            }
        }

        let issue = json!({
            "title": payload.get("title").cloned().unwrap_or(Value::Null),
            "body": payload.get("body").cloned().unwrap_or(Value::Null),
            "labels": [INVITATION_LABEL],
        });

        let result = self
            .client
            .post(format!("https://api.github.com/repos/{owner}/{repo}/issues"))
            .header("Accept", "application/vnd.github+json")
            .header("Content-Type", "application/json")
            .bearer_auth(token)
            .json(&issue)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response.json::<Value>().await.ok();
                let error = if status.is_success() {
                    None
                } else {
                    Some(
                        body.as_ref()
                            .and_then(|b| b.get("message"))
                            .and_then(|m| m.as_str())
                            .unwrap_or("Failed to create GitHub issue")
                            .to_string(),
                    )
                };
                ContactOutcome {
                    success: status.is_success(),
                    sent: status.is_success(),
                    status: Some(status.as_u16()),
                    response: body,
                    error,
                    note: None,
                }
            }
            Err(err) => ContactOutcome::failed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fails_fast_without_token() {
        let exec = RepoIssueExecutor::new(reqwest::Client::new(), None);
        let out = exec
            .contact("https://github.com/acme/helper-bot", &json!({}))
            .await;
        assert!(!out.success);
        assert!(!out.sent);
        assert_eq!(out.error.as_deref(), Some("GITHUB_TOKEN is missing"));
    }

    #[tokio::test]
    async fn fails_fast_on_bad_repo_url() {
        let exec = RepoIssueExecutor::new(reqwest::Client::new(), Some("tok".into()));
        let out = exec.contact("https://example.com/not-a-repo", &json!({})).await;
        assert_eq!(out.error.as_deref(), Some("Invalid GitHub repository URL"));
    }

    #[test]
    fn duplicate_detection_matches_title() {
        let issues = json!([{"title": "List helper-bot on Agentry"}]);
        assert!(has_duplicate_invitation(&issues));
        assert!(!has_duplicate_invitation(&json!([{"title": "Bug report"}])));
        assert!(!has_duplicate_invitation(&Value::Null));
    }
}
