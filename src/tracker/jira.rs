use crate::error::{ReleaseError, Result};
use crate::tracker::{Credentials, IssueFilter, IssueTracker, TrackerVersion, VersionPosition};
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

mod constants {
    pub const USER_AGENT: &str = concat!("gitflow-release/", env!("CARGO_PKG_VERSION"));
    pub const TIMEOUT_SECS: u64 = 30;
    pub const PAGE_SIZE: usize = 100;
    pub const DATE_FORMAT: &str = "%Y-%m-%d";
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraVersion {
    id: String,
    name: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    released: bool,
    #[serde(default)]
    archived: bool,
}

impl From<JiraVersion> for TrackerVersion {
    fn from(version: JiraVersion) -> Self {
        TrackerVersion {
            release_date: version
                .release_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, constants::DATE_FORMAT).ok()),
            id: version.id,
            name: version.name,
            released: version.released,
            archived: version.archived,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    issues: Vec<IssueRef>,
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct IssueRef {
    key: String,
}

/// Jira REST (v2) client for one project
pub struct JiraTracker {
    client: Client,
    base_url: String,
    project: String,
    credentials: Credentials,
}

impl JiraTracker {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure)
    pub fn new(base_url: &str, project: &str, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(constants::USER_AGENT)
            .timeout(Duration::from_secs(constants::TIMEOUT_SECS))
            .build()?;

        Ok(JiraTracker {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(
            &self.credentials.username,
            Some(self.credentials.token.expose_secret()),
        )
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authed(request).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(ReleaseError::tracker(format!("{}: {}", status, body)))
    }

    fn jql(&self, version_id: &str, filter: IssueFilter) -> String {
        let condition = match filter {
            IssueFilter::Unresolved => "resolution = Unresolved",
            IssueFilter::Open => "statusCategory != Done",
            IssueFilter::Closed => "statusCategory = Done",
        };
        format!(
            "project = \"{}\" AND fixVersion = {} AND {}",
            self.project, version_id, condition
        )
    }
}

impl IssueTracker for JiraTracker {
    fn versions(&self) -> Result<Vec<TrackerVersion>> {
        let url = self.url(&format!("project/{}/versions", self.project));
        let versions: Vec<JiraVersion> = self.send(self.client.get(url))?.json()?;
        debug!("tracker lists {} versions", versions.len());
        Ok(versions.into_iter().map(TrackerVersion::from).collect())
    }

    fn create_version(
        &self,
        name: &str,
        release_date: Option<NaiveDate>,
    ) -> Result<TrackerVersion> {
        let mut body = json!({
            "name": name,
            "project": self.project,
            "released": false,
        });
        if let Some(date) = release_date {
            body["releaseDate"] = json!(date.format(constants::DATE_FORMAT).to_string());
        }

        let created: JiraVersion = self
            .send(self.client.post(self.url("version")).json(&body))?
            .json()?;
        info!("created tracker version '{}' ({})", created.name, created.id);
        Ok(created.into())
    }

    fn release_version(&self, id: &str, date: NaiveDate) -> Result<()> {
        let body = json!({
            "released": true,
            "releaseDate": date.format(constants::DATE_FORMAT).to_string(),
        });
        self.send(self.client.put(self.url(&format!("version/{}", id))).json(&body))?;
        info!("released tracker version {}", id);
        Ok(())
    }

    fn delete_version(&self, id: &str) -> Result<()> {
        self.send(self.client.delete(self.url(&format!("version/{}", id))))?;
        info!("deleted tracker version {}", id);
        Ok(())
    }

    fn move_version(&self, id: &str, position: &VersionPosition) -> Result<()> {
        let body = match position {
            VersionPosition::First => json!({ "position": "First" }),
            VersionPosition::After(other) => json!({ "after": self.url(&format!("version/{}", other)) }),
        };
        self.send(
            self.client
                .post(self.url(&format!("version/{}/move", id)))
                .json(&body),
        )?;
        debug!("moved tracker version {} to {:?}", id, position);
        Ok(())
    }

    fn issues(&self, version_id: &str, filter: IssueFilter) -> Result<Vec<String>> {
        let jql = self.jql(version_id, filter);
        let mut keys = Vec::new();

        loop {
            let start_at = keys.len().to_string();
            let page_size = constants::PAGE_SIZE.to_string();
            let page: SearchPage = self
                .send(self.client.get(self.url("search")).query(&[
                    ("jql", jql.as_str()),
                    ("fields", "key"),
                    ("startAt", start_at.as_str()),
                    ("maxResults", page_size.as_str()),
                ]))?
                .json()?;

            let fetched = page.issues.len();
            keys.extend(page.issues.into_iter().map(|issue| issue.key));
            if fetched == 0 || keys.len() >= page.total {
                break;
            }
        }

        debug!("{} issues match '{}'", keys.len(), jql);
        Ok(keys)
    }

    fn move_issues(&self, keys: &[String], from_id: &str, to_id: &str) -> Result<()> {
        let body = json!({
            "update": {
                "fixVersions": [
                    { "remove": { "id": from_id } },
                    { "add": { "id": to_id } },
                ]
            }
        });
        for key in keys {
            self.send(
                self.client
                    .put(self.url(&format!("issue/{}", key)))
                    .json(&body),
            )?;
        }
        if !keys.is_empty() {
            info!("moved {} issues from version {} to {}", keys.len(), from_id, to_id);
        }
        Ok(())
    }

    fn check_credentials(&self) -> Result<bool> {
        let response = self.authed(self.client.get(self.url("myself"))).send()?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            status => Err(ReleaseError::tracker(format!(
                "credential check returned {}",
                status
            ))),
        }
    }
}
