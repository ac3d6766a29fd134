//! GitHub REST implementation of [`RemoteApi`].
//!
//! Uses the git data endpoints under `/repos/{owner}/{repo}/git/...` plus the
//! tag listing endpoint. Reference names are passed around in full
//! (`refs/heads/main`); the `refs/` prefix is stripped only when building a
//! URL because the API addresses references relative to it.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Commit, NewCommit, NewTag, Reference, RemoteApi, Tag, Tree, TreeEntry};
use crate::defaults;
use crate::error::{Error, Result};
use crate::path::RepositoryUrl;

const PAGE_SIZE: usize = 100;
const API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";

/// Authenticated client for one API root.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api_url: String,
    token: String,
    http: Client,
}

impl GitHubClient {
    /// Build a client for `api_url` authenticating with `token`.
    pub fn new(api_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = build_http_client(timeout)?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    fn repo_url(&self, repo: &RepositoryUrl, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, repo.owner, repo.name, path
        )
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        with_api_headers(builder).bearer_auth(&self.token)
    }

    fn send<T: DeserializeOwned>(&self, operation: &str, builder: RequestBuilder) -> Result<T> {
        match self.send_optional(operation, builder)? {
            Some(value) => Ok(value),
            None => Err(Error::Api {
                operation: operation.to_string(),
                status: Some(StatusCode::NOT_FOUND.as_u16()),
                message: "Not Found".to_string(),
            }),
        }
    }

    /// Like [`Self::send`] but maps 404 to `None`.
    fn send_optional<T: DeserializeOwned>(
        &self,
        operation: &str,
        builder: RequestBuilder,
    ) -> Result<Option<T>> {
        debug!("remote: {}", operation);
        let response = self
            .request(builder)
            .send()
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(Error::Api {
                operation: operation.to_string(),
                status: Some(status.as_u16()),
                message: error_message(&body),
            });
        }

        response
            .json()
            .map(Some)
            .map_err(|e| transport_error(operation, e))
    }
}

impl RemoteApi for GitHubClient {
    fn list_tags(&self, repo: &RepositoryUrl) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct TagListing {
            name: String,
        }

        let operation = format!("list tags of {}", repo.slug());
        let mut names = Vec::new();
        let mut page = 1;
        loop {
            let url = self.repo_url(repo, "tags");
            let listing: Vec<TagListing> = self.send(
                &operation,
                self.http.get(url).query(&[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ]),
            )?;
            let count = listing.len();
            names.extend(listing.into_iter().map(|t| t.name));
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(names)
    }

    fn get_ref(&self, repo: &RepositoryUrl, reference: &str) -> Result<Option<Reference>> {
        let url = self.repo_url(repo, &format!("git/ref/{}", short_ref(reference)));
        self.send_optional(
            &format!("get reference {} of {}", reference, repo.slug()),
            self.http.get(url),
        )
    }

    fn get_commit(&self, repo: &RepositoryUrl, sha: &str) -> Result<Commit> {
        let url = self.repo_url(repo, &format!("git/commits/{}", sha));
        self.send(
            &format!("get commit {} of {}", sha, repo.slug()),
            self.http.get(url),
        )
    }

    fn create_blob(&self, repo: &RepositoryUrl, content: &[u8]) -> Result<String> {
        #[derive(Serialize)]
        struct NewBlob {
            content: String,
            encoding: &'static str,
        }
        #[derive(Deserialize)]
        struct Blob {
            sha: String,
        }

        let body = NewBlob {
            content: BASE64.encode(content),
            encoding: "base64",
        };
        let blob: Blob = self.send(
            &format!("create blob in {}", repo.slug()),
            self.http.post(self.repo_url(repo, "git/blobs")).json(&body),
        )?;
        Ok(blob.sha)
    }

    fn create_tree(
        &self,
        repo: &RepositoryUrl,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<Tree> {
        #[derive(Serialize)]
        struct NewTree<'a> {
            base_tree: &'a str,
            tree: &'a [TreeEntry],
        }

        self.send(
            &format!("create tree in {}", repo.slug()),
            self.http
                .post(self.repo_url(repo, "git/trees"))
                .json(&NewTree {
                    base_tree,
                    tree: entries,
                }),
        )
    }

    fn create_commit(&self, repo: &RepositoryUrl, commit: &NewCommit) -> Result<Commit> {
        self.send(
            &format!("create commit in {}", repo.slug()),
            self.http.post(self.repo_url(repo, "git/commits")).json(commit),
        )
    }

    fn update_ref(
        &self,
        repo: &RepositoryUrl,
        reference: &str,
        sha: &str,
        expected: &str,
    ) -> Result<Reference> {
        #[derive(Serialize)]
        struct RefUpdate<'a> {
            sha: &'a str,
            force: bool,
        }

        // The API only offers fast-forward protection, so compare against
        // the caller's view first.
        let current = self
            .get_ref(repo, reference)?
            .ok_or_else(|| Error::RefNotFound {
                repository: repo.slug(),
                reference: reference.to_string(),
            })?;
        if current.object.sha != expected {
            return Err(Error::RefConflict {
                reference: reference.to_string(),
                expected: expected.to_string(),
                actual: current.object.sha,
            });
        }

        let url = self.repo_url(repo, &format!("git/refs/{}", short_ref(reference)));
        self.send(
            &format!("update reference {} of {}", reference, repo.slug()),
            self.http.patch(url).json(&RefUpdate { sha, force: false }),
        )
    }

    fn create_tag(&self, repo: &RepositoryUrl, tag: &NewTag) -> Result<Tag> {
        self.send(
            &format!("create tag {} in {}", tag.tag, repo.slug()),
            self.http.post(self.repo_url(repo, "git/tags")).json(tag),
        )
    }

    fn create_ref(&self, repo: &RepositoryUrl, reference: &str, sha: &str) -> Result<Reference> {
        #[derive(Serialize)]
        struct NewRef<'a> {
            #[serde(rename = "ref")]
            reference: &'a str,
            sha: &'a str,
        }

        self.send(
            &format!("create reference {} in {}", reference, repo.slug()),
            self.http
                .post(self.repo_url(repo, "git/refs"))
                .json(&NewRef { reference, sha }),
        )
    }
}

/// HTTP client with the connect and request timeouts every API call uses.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(defaults::API_CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Api {
            operation: "initialize HTTP client".to_string(),
            status: None,
            message: e.to_string(),
        })
}

/// Headers every GitHub request carries, authentication aside.
pub(crate) fn with_api_headers(builder: RequestBuilder) -> RequestBuilder {
    builder
        .header("Accept", ACCEPT)
        .header("User-Agent", concat!("monoship/", env!("CARGO_PKG_VERSION")))
        .header("X-GitHub-Api-Version", API_VERSION)
}

pub(crate) fn transport_error(operation: &str, error: reqwest::Error) -> Error {
    Error::Api {
        operation: operation.to_string(),
        status: error.status().map(|s| s.as_u16()),
        message: error.to_string(),
    }
}

/// Extract `message` from a JSON error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }

    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn short_ref(reference: &str) -> &str {
    reference.strip_prefix("refs/").unwrap_or(reference)
}
