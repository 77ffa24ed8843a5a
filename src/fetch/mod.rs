//! Repository fetching from a hosting API.
//!
//! A [`TreeFetcher`] walks the remote tree depth-first in the order the API
//! lists entries, optionally mirrors every file to disk, and folds the decoded
//! file texts into one aggregate.

use crate::aggregate::Aggregator;
use crate::domain::{EntryKind, FetchLimits, FileBytes, RepoCoordinate, TreeEntry};
use crate::error::{Error, Result};
use crate::persist::persist;
use crate::utils::decode_utf8;
use std::path::{Path, PathBuf};

pub mod github;

pub use github::GitHubClient;

/// Read access to a repository host.
pub trait HostingApi {
    /// List the direct children of `path` (`""` is the root).
    fn list_children(&self, coord: &RepoCoordinate, path: &str) -> Result<Vec<TreeEntry>>;

    /// Raw content of one file.
    fn fetch_file(&self, coord: &RepoCoordinate, path: &str) -> Result<FileBytes>;
}

/// Counters for one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub directories_listed: usize,
    pub files_fetched: usize,
    pub bytes_fetched: usize,
    pub max_depth_seen: usize,
}

/// Result of a completed traversal.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub text: String,
    pub stats: FetchStats,
}

/// Depth-first walker over a remote tree.
pub struct TreeFetcher<'a> {
    api: &'a dyn HostingApi,
    limits: FetchLimits,
    mirror_root: Option<PathBuf>,
    on_file: Option<Box<dyn FnMut(&str) + 'a>>,
}

impl<'a> TreeFetcher<'a> {
    pub fn new(api: &'a dyn HostingApi) -> Self {
        Self { api, limits: FetchLimits::default(), mirror_root: None, on_file: None }
    }

    pub fn limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Also write every fetched file under `root`, preserving relative paths.
    pub fn mirror_to(mut self, root: Option<&Path>) -> Self {
        self.mirror_root = root.map(Path::to_path_buf);
        self
    }

    /// Called with each file path just before it is downloaded.
    pub fn on_file(mut self, callback: impl FnMut(&str) + 'a) -> Self {
        self.on_file = Some(Box::new(callback));
        self
    }

    /// Fetch the whole tree below `path` and return its aggregate text.
    ///
    /// Any remote, decode, IO or limit error aborts the traversal; the partial
    /// aggregate is discarded.
    pub fn fetch(&mut self, coord: &RepoCoordinate, path: &str) -> Result<FetchOutcome> {
        tracing::info!("fetching {} from '{}'", coord.slug(), path);
        let mut agg = Aggregator::with_max_bytes(self.limits.max_aggregate_bytes);
        let mut stats = FetchStats::default();
        self.walk(coord, path, 0, &mut agg, &mut stats)?;
        tracing::info!(
            "fetched {} file(s), {} bytes, {} director(ies) from {}",
            stats.files_fetched,
            stats.bytes_fetched,
            stats.directories_listed,
            coord.slug()
        );
        Ok(FetchOutcome { text: agg.into_text(), stats })
    }

    fn walk(
        &mut self,
        coord: &RepoCoordinate,
        path: &str,
        depth: usize,
        agg: &mut Aggregator,
        stats: &mut FetchStats,
    ) -> Result<()> {
        if let Some(max_depth) = self.limits.max_depth {
            if depth > max_depth {
                return Err(Error::limit(format!(
                    "directory '{path}' is nested deeper than {max_depth} levels"
                )));
            }
        }
        stats.max_depth_seen = stats.max_depth_seen.max(depth);

        let entries = self.api.list_children(coord, path)?;
        stats.directories_listed += 1;
        tracing::debug!("listed '{}': {} entries", path, entries.len());

        for entry in entries {
            match entry.kind {
                EntryKind::File => self.take_file(coord, &entry.path, agg, stats)?,
                EntryKind::Directory => self.walk(coord, &entry.path, depth + 1, agg, stats)?,
            }
        }
        Ok(())
    }

    fn take_file(
        &mut self,
        coord: &RepoCoordinate,
        path: &str,
        agg: &mut Aggregator,
        stats: &mut FetchStats,
    ) -> Result<()> {
        if let Some(max_files) = self.limits.max_files {
            if stats.files_fetched >= max_files {
                return Err(Error::limit(format!("repository has more than {max_files} files")));
            }
        }
        if let Some(callback) = self.on_file.as_mut() {
            callback(path);
        }

        let file = self.api.fetch_file(coord, path)?;
        stats.files_fetched += 1;
        stats.bytes_fetched += file.bytes.len();

        if let Some(root) = &self.mirror_root {
            persist(root, &file.path, &file.bytes)?;
        }

        let text = decode_utf8(&file.path, file.bytes)?;
        agg.push(&text)
    }
}

/// Convenience wrapper: fetch `coord` from the root with the given limits.
pub fn fetch_tree(
    api: &dyn HostingApi,
    coord: &RepoCoordinate,
    mirror_root: Option<&Path>,
    limits: FetchLimits,
) -> Result<FetchOutcome> {
    TreeFetcher::new(api).limits(limits).mirror_to(mirror_root).fetch(coord, "")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory host: directory path -> listing, file path -> bytes.
    #[derive(Default)]
    pub struct FakeHost {
        pub dirs: HashMap<String, Vec<TreeEntry>>,
        pub files: HashMap<String, Vec<u8>>,
        pub failing_dirs: HashMap<String, u16>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn dir(mut self, path: &str, entries: Vec<TreeEntry>) -> Self {
            self.dirs.insert(path.to_string(), entries);
            self
        }

        pub fn file(mut self, path: &str, content: &str) -> Self {
            self.files.insert(path.to_string(), content.as_bytes().to_vec());
            self
        }

        pub fn raw_file(mut self, path: &str, content: Vec<u8>) -> Self {
            self.files.insert(path.to_string(), content);
            self
        }

        pub fn fail_listing(mut self, path: &str, status: u16) -> Self {
            self.failing_dirs.insert(path.to_string(), status);
            self
        }
    }

    impl HostingApi for FakeHost {
        fn list_children(&self, _coord: &RepoCoordinate, path: &str) -> Result<Vec<TreeEntry>> {
            self.calls.borrow_mut().push(format!("list:{path}"));
            if let Some(status) = self.failing_dirs.get(path) {
                return Err(Error::remote(*status, format!("contents/{path}"), "Not Found"));
            }
            self.dirs
                .get(path)
                .cloned()
                .ok_or_else(|| Error::remote(404, format!("contents/{path}"), "Not Found"))
        }

        fn fetch_file(&self, _coord: &RepoCoordinate, path: &str) -> Result<FileBytes> {
            self.calls.borrow_mut().push(format!("file:{path}"));
            let bytes = self
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| Error::remote(404, format!("raw/{path}"), "Not Found"))?;
            Ok(FileBytes { path: path.to_string(), bytes })
        }
    }
}
