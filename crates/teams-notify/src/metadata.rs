use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_TITLE: &str = "Workflow run";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetadata {
    pub repository: Option<String>,
    pub repository_url: Option<String>,
    pub server_url: Option<String>,
    pub workflow: Option<String>,
    pub event_name: Option<String>,
    pub job_name: Option<String>,
    pub run_id: Option<String>,
    pub sender_login: Option<String>,
    pub sender_url: Option<String>,
    pub compare_url: Option<String>,
    pub commit_count: usize,
    pub head_commit_timestamp: Option<String>,
}

/// Subset of the webhook event payload found at `GITHUB_EVENT_PATH`.
#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    repository: Option<EventRepository>,
    compare: Option<String>,
    sender: Option<EventSender>,
    #[serde(default)]
    commits: Vec<serde_json::Value>,
    head_commit: Option<EventCommit>,
}

#[derive(Debug, Deserialize)]
struct EventRepository {
    name: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventSender {
    login: Option<String>,
    html_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventCommit {
    timestamp: Option<String>,
}

impl RunMetadata {
    /// Collect metadata from GitHub Actions environment variables, reading
    /// the event payload file when one is present.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let event = var("GITHUB_EVENT_PATH")
            .and_then(|path| read_event(Path::new(&path)))
            .unwrap_or_default();

        let repository = var("GITHUB_REPOSITORY")
            .or_else(|| event.repository.as_ref().and_then(|r| r.name.clone()));
        let server_url = var("GITHUB_SERVER_URL");
        let repository_url = event
            .repository
            .as_ref()
            .and_then(|r| r.html_url.clone())
            .or_else(|| match (&server_url, &repository) {
                (Some(server), Some(repo)) => {
                    Some(format!("{}/{}", server.trim_end_matches('/'), repo))
                }
                _ => None,
            });
        let (sender_login, sender_url) = match event.sender {
            Some(s) => (s.login, s.html_url.or(s.url)),
            None => (None, None),
        };

        Self {
            repository,
            repository_url,
            server_url,
            workflow: var("GITHUB_WORKFLOW"),
            event_name: var("GITHUB_EVENT_NAME"),
            job_name: var("GITHUB_JOB"),
            run_id: var("GITHUB_RUN_ID"),
            sender_login,
            sender_url,
            compare_url: event.compare,
            commit_count: event.commits.len(),
            head_commit_timestamp: event.head_commit.and_then(|c| c.timestamp),
        }
    }

    /// Title used when the caller did not supply one. Never empty.
    pub fn default_title(&self) -> String {
        let mut title = match (&self.workflow, &self.repository) {
            (Some(wf), Some(repo)) => format!("{wf} on {repo}"),
            (Some(wf), None) => wf.clone(),
            (None, Some(repo)) => repo.clone(),
            (None, None) => DEFAULT_TITLE.to_string(),
        };
        if let Some(event) = &self.event_name {
            title.push_str(&format!(" ({event})"));
        }
        title
    }

    /// Link to the run's summary page, when enough is known to build it.
    pub fn run_url(&self) -> Option<String> {
        match (&self.server_url, &self.repository, &self.run_id) {
            (Some(server), Some(repo), Some(id)) => Some(format!(
                "{}/{}/actions/runs/{}",
                server.trim_end_matches('/'),
                repo,
                id
            )),
            _ => None,
        }
    }
}

fn read_event(path: &Path) -> Option<EventPayload> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read event payload");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(event) => {
            debug!(path = %path.display(), "Loaded event payload");
            Some(event)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not parse event payload");
            None
        }
    }
}
