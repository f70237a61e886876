// tbx-common/src/cache.rs
// Caches downloaded repository metadata per remote repository.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::error::{Result, TbxError};
use crate::Config;

pub struct Cache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl Cache {
    /// Create a new Cache using the config's metadata cache dir
    pub fn new(config: &Config) -> Result<Self> {
        let cache_dir = config.metadata_cache_dir();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        Ok(Self {
            cache_dir,
            ttl: config.metadata_ttl,
        })
    }

    pub fn get_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Location of a cached file for `repository_id`; `relative` uses `/`.
    pub fn path_for(&self, repository_id: &str, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.cache_dir.join(repository_id), |p, s| p.join(s))
    }

    pub fn store_raw(&self, repository_id: &str, relative: &str, data: &str) -> Result<PathBuf> {
        let path = self.path_for(repository_id, relative);
        tracing::debug!("Saving raw data to cache file: {:?}", path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(path)
    }

    pub fn load_raw(&self, repository_id: &str, relative: &str) -> Result<String> {
        let path = self.path_for(repository_id, relative);
        tracing::debug!("Loading raw data from cache file: {:?}", path);

        if !path.exists() {
            return Err(TbxError::Cache(format!(
                "Cache file {} does not exist",
                path.display()
            )));
        }

        fs::read_to_string(&path).map_err(|e| TbxError::Cache(format!("IO error: {e}")))
    }

    /// Checks if a cache file exists and is within its TTL
    pub fn is_cache_valid(&self, repository_id: &str, relative: &str) -> Result<bool> {
        let path = self.path_for(repository_id, relative);
        if !path.exists() {
            return Ok(false);
        }

        let modified_time = fs::metadata(&path)?.modified()?;
        let age = SystemTime::now()
            .duration_since(modified_time)
            .map_err(|e| TbxError::Cache(format!("System time error: {e}")))?;

        Ok(age <= self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_metadata_is_valid_until_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::rooted_at(dir.path());
        let cache = Cache::new(&config).unwrap();
        assert!(!cache.is_cache_valid("central", "g/maven-metadata.xml").unwrap());

        let path = cache
            .store_raw("central", "g/maven-metadata.xml", "<metadata/>")
            .unwrap();
        assert!(path.starts_with(cache.get_dir()));
        assert!(cache.is_cache_valid("central", "g/maven-metadata.xml").unwrap());
        assert_eq!(cache.load_raw("central", "g/maven-metadata.xml").unwrap(), "<metadata/>");

        config.metadata_ttl = Duration::ZERO;
        std::thread::sleep(Duration::from_millis(20));
        let expired = Cache::new(&config).unwrap();
        assert!(!expired.is_cache_valid("central", "g/maven-metadata.xml").unwrap());
    }

    #[test]
    fn missing_entry_is_a_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(&Config::rooted_at(dir.path())).unwrap();
        assert!(matches!(
            cache.load_raw("central", "nope.xml"),
            Err(TbxError::Cache(_))
        ));
    }
}
