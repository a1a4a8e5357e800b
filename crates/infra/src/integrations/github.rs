//! GitHub commit source
//!
//! Counts commits authored by the configured user across every repository
//! the token can see (personal and, optionally, one organization's).

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use clout_core::CommitSource;
use clout_domain::{FetchFailure, GitHubConfig, ProviderResult, COMMIT_PROVIDER};
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, ACCEPT, LINK};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::response::{decode_json, endpoint};
use crate::http::HttpClient;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;
/// Upper bound on pages fetched for one listing.
const MAX_PAGES: usize = 200;
/// Repositories whose commits are fetched concurrently.
const REPO_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Deserialize)]
struct Repository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    committer: Option<Signature>,
    #[serde(default)]
    author: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

impl CommitItem {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.commit
            .committer
            .as_ref()
            .and_then(|sig| sig.date)
            .or_else(|| self.commit.author.as_ref().and_then(|sig| sig.date))
    }
}

/// GitHub REST client implementing [`CommitSource`].
pub struct GitHubCommitSource {
    http: HttpClient,
    token: String,
    username: String,
    organization: Option<String>,
    api_base: String,
}

impl GitHubCommitSource {
    pub fn new(http: HttpClient, config: &GitHubConfig) -> Self {
        Self {
            http,
            token: config.token.expose().to_string(),
            username: config.username.clone(),
            organization: config.organization.clone().filter(|org| !org.trim().is_empty()),
            api_base: config.api_base.clone().unwrap_or_else(|| GITHUB_API_BASE.to_string()),
        }
    }

    /// Every repository visible to the token, de-duplicated by `full_name`.
    ///
    /// # Errors
    /// Fails if any repository listing fails.
    pub async fn list_repositories(&self) -> Result<Vec<String>, FetchFailure> {
        let mut names = BTreeSet::new();

        let personal: Vec<Repository> = self
            .fetch_all_pages(&endpoint(&self.api_base, "user/repos"), &[("type", "all".to_string())])
            .await?;
        names.extend(personal.into_iter().map(|repo| repo.full_name));

        if let Some(org) = &self.organization {
            let org_repos: Vec<Repository> = self
                .fetch_all_pages(
                    &endpoint(&self.api_base, &format!("orgs/{org}/repos")),
                    &[("type", "all".to_string())],
                )
                .await?;
            debug!(organization = %org, repos = org_repos.len(), "listed organization repositories");
            names.extend(org_repos.into_iter().map(|repo| repo.full_name));
        }

        info!(repos = names.len(), "listed repositories");
        Ok(names.into_iter().collect())
    }

    /// Commits by the configured author in every repository, per repository.
    ///
    /// A repository whose commit listing fails (e.g. 409 for an empty
    /// repository) is skipped with a warning.
    async fn commits_per_repository(
        &self,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<(String, Vec<CommitItem>)>, FetchFailure> {
        let repositories = self.list_repositories().await?;

        let mut query = vec![
            ("since", since.to_rfc3339()),
            ("author", self.username.clone()),
        ];
        if let Some(until) = until {
            query.push(("until", until.to_rfc3339()));
        }
        let query = &query;

        let results: Vec<(String, Result<Vec<CommitItem>, FetchFailure>)> =
            stream::iter(repositories)
                .map(|full_name| async move {
                    let url = endpoint(&self.api_base, &format!("repos/{full_name}/commits"));
                    let commits = self.fetch_all_pages(&url, query).await;
                    (full_name, commits)
                })
                .buffer_unordered(REPO_CONCURRENCY)
                .collect()
                .await;

        let mut per_repo = Vec::with_capacity(results.len());
        for (full_name, result) in results {
            match result {
                Ok(commits) => per_repo.push((full_name, commits)),
                Err(failure) => {
                    warn!(repo = %full_name, kind = %failure.kind, error = %failure.message, "skipping repository");
                }
            }
        }
        Ok(per_repo)
    }

    async fn fetch_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, FetchFailure> {
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let request = self
                .http
                .get(url)
                .bearer_auth(&self.token)
                .header(ACCEPT, "application/vnd.github+json")
                .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
                .query(query)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())]);

            let response = self.http.send(request).await.map_err(FetchFailure::from)?;
            let headers = response.headers().clone();
            let batch: Vec<T> = decode_json(COMMIT_PROVIDER, response).await?;
            let count = batch.len();
            items.extend(batch);

            if !has_next_page(&headers, count) {
                break;
            }
            if page == MAX_PAGES {
                warn!(url, pages = MAX_PAGES, "pagination limit reached");
            }
        }

        Ok(items)
    }
}

/// Pagination stops on an empty page, on a `Link` header without
/// `rel="next"`, or on a short page when no `Link` header is present.
fn has_next_page(headers: &HeaderMap, page_len: usize) -> bool {
    if page_len == 0 {
        return false;
    }
    match headers.get(LINK).and_then(|value| value.to_str().ok()) {
        Some(link) => link.contains("rel=\"next\""),
        None => page_len >= PER_PAGE,
    }
}

/// Start of `date` in `tz`, as UTC.
fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).earliest().map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl CommitSource for GitHubCommitSource {
    #[instrument(skip(self), fields(user = %self.username))]
    async fn count_commits_since(&self, anchor: DateTime<Utc>) -> ProviderResult {
        let per_repo = self.commits_per_repository(anchor, None).await?;

        let mut total: u64 = 0;
        for (full_name, commits) in &per_repo {
            debug!(repo = %full_name, commits = commits.len(), "counted repository commits");
            total = total.saturating_add(commits.len() as u64);
        }
        info!(total, repos = per_repo.len(), "counted commits");
        Ok(total)
    }

    #[instrument(skip(self), fields(user = %self.username))]
    async fn daily_commit_counts(
        &self,
        since: NaiveDate,
        until: NaiveDate,
        timezone: Tz,
    ) -> Result<BTreeMap<NaiveDate, u64>, FetchFailure> {
        let day_after = until
            .checked_add_days(Days::new(1))
            .ok_or_else(|| FetchFailure::malformed("backfill range ends past the calendar"))?;
        let (Some(start), Some(end)) = (local_midnight(since, timezone), local_midnight(day_after, timezone))
        else {
            return Err(FetchFailure::malformed("backfill range has no local midnight"));
        };

        let per_repo = self.commits_per_repository(start, Some(end)).await?;

        let mut daily = BTreeMap::new();
        for (_, commits) in per_repo {
            for commit in commits {
                let Some(at) = commit.timestamp() else { continue };
                let day = at.with_timezone(&timezone).date_naive();
                if day >= since && day <= until {
                    *daily.entry(day).or_insert(0u64) += 1;
                }
            }
        }
        info!(days = daily.len(), "bucketed daily commits");
        Ok(daily)
    }
}
