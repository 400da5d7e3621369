//! Offline asset cache with a versioned, cache-first policy: install
//! pre-populates the current version from a fixed manifest, activation prunes
//! every other version, and fetches serve cached bytes before consulting the
//! source. API paths are never stored.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};

/// Bump to invalidate every previously installed cache on next activation.
pub const CACHE_VERSION: &str = "shotclock-v1";

pub const UPLOAD_ENDPOINT: &str = "/api/config/upload";

/// Assets installed up front. Missing any of them fails the install and the
/// cache for that version never activates.
pub const PRECACHE_MANIFEST: &[&str] = &[
    "index.html",
    "countdown.html",
    "admin.html",
    "style.css",
    "app.js",
    "manifest.webmanifest",
    "config.json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub path: String,
    pub method: Method,
}

impl AssetRequest {
    pub fn get(path: &str) -> Self {
        Self {
            path: path.to_string(),
            method: Method::Get,
        }
    }

    pub fn post(path: &str) -> Self {
        Self {
            path: path.to_string(),
            method: Method::Post,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from the installed cache; the source was not consulted.
    CacheHit(Vec<u8>),
    /// Served fresh from the source (and stored, if the policy allows).
    Network(Vec<u8>),
    /// Upload-endpoint POSTs pass the cache by entirely.
    Bypass,
    /// Cache miss and the source could not provide the asset.
    Offline,
}

/// Where fresh assets come from. The static file server is a black box
/// behind this seam.
pub trait AssetSource {
    fn get(&self, path: &str) -> Result<Vec<u8>>;
}

/// Directory-backed asset source.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl AssetSource for DirSource {
    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path.trim_start_matches('/'));
        fs::read(&full).with_context(|| format!("asset {} unavailable", full.display()))
    }
}

pub struct AssetCache {
    root: PathBuf,
    version: String,
}

impl AssetCache {
    pub fn new(root: PathBuf) -> Self {
        Self::with_version(root, CACHE_VERSION)
    }

    pub fn with_version(root: PathBuf, version: &str) -> Self {
        Self {
            root,
            version: version.to_string(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Pre-populate this version's cache with the manifest. Any asset the
    /// source cannot provide fails the whole install.
    pub fn install(&self, source: &impl AssetSource) -> Result<()> {
        fs::create_dir_all(self.version_dir()).with_context(|| {
            format!("failed to create cache directory for '{}'", self.version)
        })?;

        for path in PRECACHE_MANIFEST {
            let bytes = source
                .get(path)
                .with_context(|| format!("precaching '{path}' failed"))?;
            self.put(path, &bytes)?;
        }

        info!(
            "cache '{}' installed ({} assets)",
            self.version,
            PRECACHE_MANIFEST.len()
        );
        Ok(())
    }

    /// Delete every cache version other than the current one.
    pub fn activate(&self) -> Result<()> {
        if !self.root.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("failed to list cache root {}", self.root.display()))?
        {
            let entry = entry?;
            let name = entry.file_name();
            if name != self.version.as_str() {
                info!("deleting old cache '{}'", name.to_string_lossy());
                fs::remove_dir_all(entry.path()).with_context(|| {
                    format!("failed to delete old cache '{}'", name.to_string_lossy())
                })?;
            }
        }
        Ok(())
    }

    /// Resolve one asset request. Cache hits win; on a miss the source is
    /// consulted and successful GET responses outside `/api/` are stored
    /// before being returned.
    pub fn fetch(&self, request: &AssetRequest, source: &impl AssetSource) -> Result<FetchOutcome> {
        if request.method == Method::Post && request.path == UPLOAD_ENDPOINT {
            return Ok(FetchOutcome::Bypass);
        }

        if let Some(bytes) = self.lookup(&request.path)? {
            debug!("serving '{}' from cache", request.path);
            return Ok(FetchOutcome::CacheHit(bytes));
        }

        debug!("fetching '{}' from source", request.path);
        match source.get(&request.path) {
            Ok(bytes) => {
                if request.method == Method::Get && !is_api_path(&request.path) {
                    self.put(&request.path, &bytes)?;
                }
                Ok(FetchOutcome::Network(bytes))
            }
            Err(err) => {
                warn!("fetch failed for '{}': {err:?}", request.path);
                Ok(FetchOutcome::Offline)
            }
        }
    }

    fn version_dir(&self) -> PathBuf {
        self.root.join(&self.version)
    }

    fn entry_path(&self, path: &str) -> PathBuf {
        self.version_dir().join(path.trim_start_matches('/'))
    }

    fn lookup(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let entry = self.entry_path(path);
        if !entry.exists() {
            return Ok(None);
        }
        fs::read(&entry)
            .map(Some)
            .with_context(|| format!("failed to read cached asset {}", entry.display()))
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let entry = self.entry_path(path);
        if let Some(parent) = entry.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cache path {}", parent.display()))?;
        }
        fs::write(&entry, bytes)
            .with_context(|| format!("failed to store cached asset {}", entry.display()))
    }
}

fn is_api_path(path: &str) -> bool {
    path.trim_start_matches('/').starts_with("api/")
}
