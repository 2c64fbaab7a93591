//! On-disk, day-keyed memoization of noise profiles.
//!
//! Each profile is stored as one JSON file named from the backend identifier
//! and the local calendar date, so every run on the same day reuses the
//! first fetch. Writes go to a temporary file in the cache directory and are
//! renamed into place, so a reader never sees a partial record.
//!
//! Two callers missing the same key at once may both fetch and both write;
//! the last rename wins and both files hold the same profile.

use std::fmt;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::service::{NoiseProfile, ProviderError};

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Memoizing accessor for noise profiles.
pub struct NoiseProfileCache {
    dir: PathBuf,
    today: Clock,
}

impl fmt::Debug for NoiseProfileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseProfileCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl NoiseProfileCache {
    /// Cache rooted at `dir`, keyed by the local date.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, || Local::now().date_naive())
    }

    /// Cache with an injected date source.
    pub fn with_clock<F>(dir: impl Into<PathBuf>, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        Self {
            dir: dir.into(),
            today: Box::new(today),
        }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for `(backend, date)`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` in the backend id are replaced by `_`.
    pub fn key(backend: &str, date: NaiveDate) -> String {
        let safe: String = backend
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_{}_noise.json", safe, date.format("%Y%m%d"))
    }

    /// Path the profile of `backend` is stored at today.
    pub fn path_for(&self, backend: &str) -> PathBuf {
        self.dir.join(Self::key(backend, (self.today)()))
    }

    /// Return today's profile for `backend`, calling `fetch` only on a miss.
    ///
    /// Fetch failures propagate as [`Error::Provider`] and are not cached.
    pub fn get<F>(&self, backend: &str, fetch: F) -> Result<NoiseProfile>
    where
        F: FnOnce(&str) -> std::result::Result<NoiseProfile, ProviderError>,
    {
        let path = self.path_for(backend);

        if let Some(profile) = self.load(&path)? {
            tracing::debug!(backend, path = %path.display(), "noise profile cache hit");
            return Ok(profile);
        }

        tracing::debug!(backend, path = %path.display(), "noise profile cache miss, fetching");
        let profile = fetch(backend).map_err(Error::provider(backend, "fetch_profile"))?;
        self.store(&path, &profile)?;
        tracing::info!(backend, path = %path.display(), "cached noise profile");

        Ok(profile)
    }

    fn load(&self, path: &Path) -> Result<Option<NoiseProfile>> {
        let file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Cache {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                // Only a foreign write can produce this; treat as a miss and overwrite.
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "unreadable cache record, refetching"
                );
                Ok(None)
            }
        }
    }

    fn store(&self, path: &Path, profile: &NoiseProfile) -> Result<()> {
        let cache_err = |source| Error::Cache {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|source| Error::Cache {
            path: self.dir.clone(),
            source,
        })?;

        let tmp = NamedTempFile::new_in(&self.dir).map_err(cache_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, profile)?;
            writer.flush().map_err(cache_err)?;
        }
        tmp.persist(path).map_err(|e| cache_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            NoiseProfileCache::key("fake_brisbane", date),
            "fake_brisbane_20240309_noise.json"
        );
        assert_eq!(
            NoiseProfileCache::key("ibm/kyiv v2", date),
            "ibm_kyiv_v2_20240309_noise.json"
        );
    }
}
