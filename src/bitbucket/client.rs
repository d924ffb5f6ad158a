use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::types::{Branch, BranchListing, NewPullRequest, Page, Pipeline, PullRequest, Repository, Step};
use super::{ApiError, Bitbucket};
use crate::config::Credentials;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fields trimmed from branch listings; they are large and never shown.
const BRANCH_FIELDS: &str = "-values.target.repository,-values.target.parents";

type Query = Vec<(&'static str, String)>;

fn repositories_query(since: DateTime<Utc>) -> Query {
    vec![
        ("q", format!("updated_on > {}", since.to_rfc3339())),
        ("sort", "-updated_on".to_string()),
        ("pagelen", "100".to_string()),
    ]
}

fn pipelines_query() -> Query {
    vec![("sort", "-created_on".to_string())]
}

fn steps_query() -> Query {
    vec![("pagelen", "100".to_string())]
}

fn branches_query() -> Query {
    vec![
        ("fields", BRANCH_FIELDS.to_string()),
        ("pagelen", "20".to_string()),
    ]
}

fn open_pull_requests_query() -> Query {
    vec![
        ("fields", "+values.reviewers".to_string()),
        ("sort", "-created_on".to_string()),
        ("q", r#"state = "OPEN""#.to_string()),
    ]
}

fn pull_request_lookup_query(id: u64) -> Query {
    vec![("q", format!("id={id}"))]
}

/// What to request once a page has been consumed.
#[derive(Debug, PartialEq, Eq)]
enum NextPage {
    /// The service's `next` link, used verbatim.
    Link(String),
    /// The original query again with `page=<n>`.
    Number(u32),
    Done,
}

/// Move the items of `page` that `keep` accepts into `items`, then decide
/// what comes next. The walk ends at the first rejected item.
fn take_page<T, F>(page: Page<T>, keep: &mut F, items: &mut Vec<T>) -> NextPage
where
    F: FnMut(&T) -> bool,
{
    let following = page.following_page();
    for item in page.values {
        if !keep(&item) {
            return NextPage::Done;
        }
        items.push(item);
    }
    match (page.next, following) {
        (Some(link), _) => NextPage::Link(link),
        (None, Some(number)) => NextPage::Number(number),
        (None, None) => NextPage::Done,
    }
}

/// `Bitbucket` backed by the Bitbucket Cloud REST API over HTTPS.
pub struct HttpBitbucket {
    client: reqwest::Client,
    api_url: Url,
    workspace: String,
    username: String,
    password: String,
}

impl HttpBitbucket {
    pub fn new(creds: &Credentials) -> Result<Self, ApiError> {
        let api_url = Url::parse(&creds.api_url)
            .map_err(|e| ApiError::Unavailable(format!("invalid API url {}: {e}", creds.api_url)))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("bucketbar/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url,
            workspace: creds.workspace.clone(),
            username: creds.username.clone(),
            password: creds.password.clone(),
        })
    }

    /// `<api>/repositories/<workspace>/<segments...>`, each segment escaped.
    fn repo_url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("repositories")
                .push(&self.workspace)
                .extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "request failed");
        Err(ApiError::from_status(status, body))
    }

    /// Walk a paginated listing, stopping at the first item `keep` rejects.
    async fn collect_pages<T, F>(
        &self,
        url: Url,
        query: Query,
        mut keep: F,
    ) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned + Send,
        F: FnMut(&T) -> bool + Send,
    {
        let mut items = Vec::new();
        let mut request = self.client.get(url.clone()).query(&query);
        loop {
            let page: Page<T> = self.send(request).await?.json().await?;
            debug!(items = page.values.len(), next = ?page.next, page = ?page.page, "received page");

            request = match take_page(page, &mut keep, &mut items) {
                NextPage::Link(link) => self.client.get(link),
                NextPage::Number(number) => {
                    let mut query = query.clone();
                    query.push(("page", number.to_string()));
                    self.client.get(url.clone()).query(&query)
                }
                NextPage::Done => return Ok(items),
            };
        }
    }

    async fn post_empty(&self, url: Url) -> Result<(), ApiError> {
        self.send(self.client.post(url).json(&json!({}))).await?;
        Ok(())
    }
}

#[async_trait]
impl Bitbucket for HttpBitbucket {
    #[instrument(skip(self))]
    async fn recent_repositories(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Repository>, ApiError> {
        let query = repositories_query(since);
        self.collect_pages(self.repo_url(&[]), query, |repo: &Repository| {
            repo.updated_on > since
        })
        .await
    }

    #[instrument(skip(self))]
    async fn recent_pipelines(
        &self,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Pipeline>, ApiError> {
        self.collect_pages(
            self.repo_url(&[repo, "pipelines", ""]),
            pipelines_query(),
            |pipeline: &Pipeline| pipeline.created_on > since,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn pipeline_steps(&self, repo: &str, pipeline_uuid: &str) -> Result<Vec<Step>, ApiError> {
        let url = self.repo_url(&[repo, "pipelines", pipeline_uuid, "steps", ""]);
        self.collect_pages(url, steps_query(), |_: &Step| true)
            .await
    }

    #[instrument(skip(self))]
    async fn step_log(
        &self,
        repo: &str,
        pipeline_uuid: &str,
        step_uuid: &str,
    ) -> Result<Option<String>, ApiError> {
        let url = self.repo_url(&[repo, "pipelines", pipeline_uuid, "steps", step_uuid, "log"]);
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let bytes = response.bytes().await?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::from_status(s, body))
            }
        }
    }

    #[instrument(skip(self))]
    async fn branches(&self, repo: &str) -> Result<BranchListing, ApiError> {
        let url = self.repo_url(&[repo, "refs", "branches"]);
        let page: Page<Branch> = self
            .send(self.client.get(url).query(&branches_query()))
            .await?
            .json()
            .await?;
        let total = page.size.unwrap_or(page.values.len() as u64);
        Ok(BranchListing {
            branches: page.values,
            total,
        })
    }

    #[instrument(skip(self))]
    async fn open_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>, ApiError> {
        self.collect_pages(
            self.repo_url(&[repo, "pullrequests"]),
            open_pull_requests_query(),
            |_: &PullRequest| true,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_open_pull_request(&self, repo: &str, id: u64) -> Result<PullRequest, ApiError> {
        let url = self.repo_url(&[repo, "pullrequests"]);
        let page: Page<PullRequest> = self
            .send(self.client.get(url).query(&pull_request_lookup_query(id)))
            .await?
            .json()
            .await?;
        page.values
            .into_iter()
            .find(|pr| pr.id == id && pr.is_open())
            .ok_or_else(|| ApiError::NotFound(format!("open pull request #{id} in {repo}")))
    }

    #[instrument(skip(self))]
    async fn create_branch(&self, repo: &str, name: &str, parent: &str) -> Result<(), ApiError> {
        let url = self.repo_url(&[repo, "refs", "branches"]);
        let body = json!({ "name": name, "target": { "hash": parent } });
        let created: serde_json::Value = self.send(self.client.post(url).json(&body)).await?.json().await?;
        debug!(%created, "branch created");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_branch(&self, repo: &str, name: &str) -> Result<(), ApiError> {
        let url = self.repo_url(&[repo, "refs", "branches", name]);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_pull_request(
        &self,
        repo: &str,
        pr: &NewPullRequest,
    ) -> Result<PullRequest, ApiError> {
        let url = self.repo_url(&[repo, "pullrequests"]);
        let created: PullRequest = self
            .send(self.client.post(url).json(&pr.to_body()))
            .await?
            .json()
            .await?;
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn merge_pull_request(&self, repo: &str, id: u64) -> Result<(), ApiError> {
        let id = id.to_string();
        self.post_empty(self.repo_url(&[repo, "pullrequests", &id, "merge"])).await
    }

    #[instrument(skip(self))]
    async fn decline_pull_request(&self, repo: &str, id: u64) -> Result<(), ApiError> {
        let id = id.to_string();
        self.post_empty(self.repo_url(&[repo, "pullrequests", &id, "decline"])).await
    }

    #[instrument(skip(self, pr), fields(pr = pr.id))]
    async fn set_reviewers(
        &self,
        repo: &str,
        pr: &PullRequest,
        reviewer_uuids: &[String],
    ) -> Result<(), ApiError> {
        let id = pr.id.to_string();
        let url = self.repo_url(&[repo, "pullrequests", &id]);
        let reviewers: Vec<_> = reviewer_uuids.iter().map(|uuid| json!({ "uuid": uuid })).collect();
        let body = json!({ "title": pr.title, "reviewers": reviewers });
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }
}
