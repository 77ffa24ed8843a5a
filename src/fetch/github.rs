//! GitHub REST contents API client

use crate::domain::{FileBytes, RepoCoordinate, TreeEntry};
use crate::error::{Error, Result};
use crate::fetch::HostingApi;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

/// GitHub returns at most this many entries for one directory and does not paginate.
const CONTENTS_LISTING_CAP: usize = 1000;

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawListing {
    Directory(Vec<RawEntry>),
    Single(RawEntry),
}

/// Blocking client for `GET /repos/{owner}/{repo}/contents/{path}` and raw file downloads.
pub struct GitHubClient {
    http: Client,
    api_base: String,
    raw_base: String,
}

impl GitHubClient {
    pub fn new(api_base: &str, raw_base: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn contents_url(&self, coord: &RepoCoordinate, path: &str) -> Result<Url> {
        let mut url = parse_base(&self.api_base)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["repos", coord.owner.as_str(), coord.name.as_str(), "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        url.query_pairs_mut().append_pair("ref", &coord.branch);
        Ok(url)
    }

    pub fn raw_url(&self, coord: &RepoCoordinate, path: &str) -> Result<Url> {
        let mut url = parse_base(&self.raw_base)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.raw_base.clone()))?
            .pop_if_empty()
            .extend([coord.owner.as_str(), coord.name.as_str()])
            .extend(coord.branch.split('/').filter(|s| !s.is_empty()))
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn get(&self, coord: &RepoCoordinate, url: &Url) -> RequestBuilder {
        let mut req = self
            .http
            .get(url.clone())
            .header(USER_AGENT, "repo-explain")
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &coord.token {
            req = req.header(AUTHORIZATION, format!("token {token}"));
        }
        req
    }
}

impl HostingApi for GitHubClient {
    fn list_children(&self, coord: &RepoCoordinate, path: &str) -> Result<Vec<TreeEntry>> {
        let url = self.contents_url(coord, path)?;
        let resp = ensure_success(self.get(coord, &url).send()?, &url)?;
        let body = resp.text()?;
        let entries = parse_listing(&body, &url)?;
        if entries.len() >= CONTENTS_LISTING_CAP {
            tracing::warn!(
                "directory '{}' listed {} entries; GitHub may have truncated it",
                path,
                entries.len()
            );
        }
        Ok(entries)
    }

    fn fetch_file(&self, coord: &RepoCoordinate, path: &str) -> Result<FileBytes> {
        let url = self.raw_url(coord, path)?;
        let resp = ensure_success(self.get(coord, &url).send()?, &url)?;
        let bytes = resp.bytes()?.to_vec();
        tracing::debug!("downloaded {} ({} bytes)", path, bytes.len());
        Ok(FileBytes { path: path.to_string(), bytes })
    }
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))
}

fn ensure_success(resp: Response, url: &Url) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(Error::remote(status.as_u16(), url.as_str(), body))
}

/// Decode a contents listing. Entries other than files and directories
/// (symlinks, submodules) are skipped.
pub fn parse_listing(body: &str, url: &Url) -> Result<Vec<TreeEntry>> {
    let listing: RawListing = serde_json::from_str(body).map_err(|e| {
        Error::remote(200, url.as_str(), format!("unexpected listing payload: {e}"))
    })?;
    let raw = match listing {
        RawListing::Directory(entries) => entries,
        RawListing::Single(entry) => {
            return Err(Error::remote(
                200,
                url.as_str(),
                format!("expected a directory listing, got a single {} entry", entry.kind),
            ))
        }
    };

    let entries = raw
        .into_iter()
        .filter_map(|entry| match entry.kind.as_str() {
            "file" => Some(TreeEntry::file(entry.path)),
            "dir" => Some(TreeEntry::dir(entry.path)),
            other => {
                tracing::debug!("skipping {} entry {}", other, entry.path);
                None
            }
        })
        .collect();
    Ok(entries)
}
