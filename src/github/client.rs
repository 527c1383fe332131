use crate::error::{DoctorError, Result};
use crate::github::{PullRequestDraft, PullRequestHost, RepositorySlug};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const API_VERSION: &str = "2022-11-28";
const REFERENCE_EXISTS: &str = "Reference already exists";

/// GitHub REST client for branch and pull request operations
pub struct GitHubClient {
    client: Client,
    api_base: Url,
    token: String,
}

impl GitHubClient {
    pub fn new(api_base: &str, token: &str) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| {
            DoctorError::Configuration(format!("Invalid API URL '{api_base}': {e}"))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(DoctorError::Configuration(format!(
                "API URL '{api_base}' cannot be used as a base"
            )));
        }
        if token.trim().is_empty() {
            return Err(DoctorError::Configuration(
                "A GitHub token is required for pull request creation".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("dependency-doctor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DoctorError::HostApi(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base,
            token: token.trim().to_string(),
        })
    }

    fn endpoint(&self, repo: &RepositorySlug, tail: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| DoctorError::Configuration("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["repos", repo.owner.as_str(), repo.repo.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        self.authorized(request)
            .send()
            .map_err(|e| DoctorError::HostApi(format!("{action}: {e}")))
    }

    fn base_sha(&self, repo: &RepositorySlug, base: &str) -> Result<String> {
        let mut tail = vec!["git", "ref", "heads"];
        tail.extend(base.split('/'));
        let url = self.endpoint(repo, &tail)?;

        let response = self.send(self.client.get(url), "get base ref")?;
        let response = ensure_success(response, "get base ref")?;
        let reference: GitRef = response
            .json()
            .map_err(|e| DoctorError::HostApi(format!("get base ref: {e}")))?;
        Ok(reference.object.sha)
    }
}

impl PullRequestHost for GitHubClient {
    fn create_branch(&self, repo: &RepositorySlug, branch: &str, base: &str) -> Result<()> {
        let sha = self.base_sha(repo, base)?;
        let url = self.endpoint(repo, &["git", "refs"])?;
        let payload = CreateRef {
            reference: format!("refs/heads/{branch}"),
            sha,
        };

        let response = self.send(self.client.post(url).json(&payload), "create ref")?;
        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let message = api_message(response.text().unwrap_or_default());
            // The branch was already pushed; any other 422 is a real failure.
            if message.contains(REFERENCE_EXISTS) {
                debug!(branch, "ref already exists");
                return Ok(());
            }
            return Err(api_error("create ref", status, &message));
        }
        ensure_success(response, "create ref")?;
        info!(%repo, branch, "created remote branch");
        Ok(())
    }

    fn create_pull_request(&self, repo: &RepositorySlug, draft: &PullRequestDraft) -> Result<()> {
        let url = self.endpoint(repo, &["pulls"])?;
        let payload = CreatePull {
            title: &draft.title,
            head: &draft.head,
            base: &draft.base,
            body: &draft.body,
        };

        let response = self.send(self.client.post(url).json(&payload), "create pull request")?;
        ensure_success(response, "create pull request")?;
        info!(%repo, head = %draft.head, base = %draft.base, "pull request created");
        Ok(())
    }

    fn find_pull_request_url(
        &self,
        repo: &RepositorySlug,
        branch: &str,
    ) -> Result<Option<String>> {
        let url = self.endpoint(repo, &["pulls"])?;
        let head = format!("{}:{}", repo.owner, branch);

        let response = self.send(
            self.client.get(url).query(&[("head", head.as_str())]),
            "list pull requests",
        )?;
        let response = ensure_success(response, "list pull requests")?;
        let pulls: Vec<PullSummary> = response
            .json()
            .map_err(|e| DoctorError::HostApi(format!("list pull requests: {e}")))?;

        Ok(pulls.into_iter().next().map(|pull| pull.html_url))
    }
}

fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = api_message(response.text().unwrap_or_default());
    Err(api_error(action, status, &message))
}

/// GitHub's `message` field, or the raw body when it is not JSON.
fn api_message(body: String) -> String {
    serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body)
}

fn api_error(action: &str, status: StatusCode, message: &str) -> DoctorError {
    DoctorError::HostApi(format!("{action} returned {status}: {}", message.trim()))
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRef {
    #[serde(rename = "ref")]
    reference: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreatePull<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct PullSummary {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn slug() -> RepositorySlug {
        RepositorySlug::parse("acme/widgets").unwrap()
    }

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&server.base_url(), "secret").unwrap()
    }

    #[test]
    fn rejects_empty_token() {
        assert!(GitHubClient::new("https://api.github.com", " ").is_err());
        assert!(GitHubClient::new("not a url", "t").is_err());
    }

    #[test]
    fn creates_branch_from_base_sha() {
        let server = MockServer::start();
        let get_ref = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/widgets/git/ref/heads/main")
                .header("authorization", "Bearer secret");
            then.status(200)
                .json_body(json!({"ref": "refs/heads/main", "object": {"sha": "abc123"}}));
        });
        let create_ref = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/acme/widgets/git/refs")
                .json_body(json!({"ref": "refs/heads/chore/deps-update-1", "sha": "abc123"}));
            then.status(201).json_body(json!({"ref": "refs/heads/chore/deps-update-1"}));
        });

        client(&server)
            .create_branch(&slug(), "chore/deps-update-1", "main")
            .unwrap();

        get_ref.assert();
        create_ref.assert();
    }

    #[test]
    fn existing_branch_is_not_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/widgets/git/ref/heads/main");
            then.status(200).json_body(json!({"object": {"sha": "abc123"}}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/repos/acme/widgets/git/refs");
            then.status(422)
                .json_body(json!({"message": "Reference already exists"}));
        });

        assert!(client(&server).create_branch(&slug(), "b", "main").is_ok());
    }

    #[test]
    fn other_unprocessable_ref_errors_are_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/widgets/git/ref/heads/main");
            then.status(200).json_body(json!({"object": {"sha": "abc123"}}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/repos/acme/widgets/git/refs");
            then.status(422).json_body(json!({"message": "Object does not exist"}));
        });

        let err = client(&server)
            .create_branch(&slug(), "b", "main")
            .unwrap_err();
        assert!(matches!(err, DoctorError::HostApi(_)));
        assert!(err.to_string().contains("Object does not exist"));
        assert!(err.to_string().contains("422"));
    }

    #[test]
    fn missing_base_branch_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/widgets/git/ref/heads/trunk");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });

        let err = client(&server)
            .create_branch(&slug(), "b", "trunk")
            .unwrap_err();
        assert!(matches!(err, DoctorError::HostApi(_)));
        assert!(err.to_string().contains("Not Found"));
    }

    #[test]
    fn creates_pull_request_with_report_body() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST).path("/repos/acme/widgets/pulls").json_body(json!({
                "title": "chore(deps): update dependencies",
                "head": "chore/deps-update-1",
                "base": "main",
                "body": "# Dependency Doctor Report"
            }));
            then.status(201)
                .json_body(json!({"html_url": "https://github.com/acme/widgets/pull/9"}));
        });

        let draft = PullRequestDraft {
            title: "chore(deps): update dependencies".to_string(),
            head: "chore/deps-update-1".to_string(),
            base: "main".to_string(),
            body: "# Dependency Doctor Report".to_string(),
        };
        client(&server).create_pull_request(&slug(), &draft).unwrap();
        create.assert();
    }

    #[test]
    fn finds_first_pull_request_for_head() {
        let server = MockServer::start();
        let list = server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/widgets/pulls")
                .query_param("head", "acme:chore/deps-update-1");
            then.status(200).json_body(json!([
                {"html_url": "https://github.com/acme/widgets/pull/9"},
                {"html_url": "https://github.com/acme/widgets/pull/3"}
            ]));
        });

        let url = client(&server)
            .find_pull_request_url(&slug(), "chore/deps-update-1")
            .unwrap();

        list.assert();
        assert_eq!(url.as_deref(), Some("https://github.com/acme/widgets/pull/9"));
    }

    #[test]
    fn no_matching_pull_request_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/widgets/pulls");
            then.status(200).json_body(json!([]));
        });

        let url = client(&server).find_pull_request_url(&slug(), "b").unwrap();
        assert!(url.is_none());
    }
}
