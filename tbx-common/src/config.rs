// tbx-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::UserDirs;
use tracing::debug;

use super::error::{Result, TbxError};
use crate::model::RemoteRepository;

const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const TBX_HOME_DIRNAME: &str = ".tbx";

#[derive(Debug, Clone)]
pub struct Config {
    pub tbx_home: PathBuf,
    /// Maven 2 layout directory that doubles as the artifact file cache.
    pub local_repository: PathBuf,
    pub remote_repositories: Vec<RemoteRepository>,
    pub metadata_ttl: Duration,
    pub offline: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading tbx configuration");

        let home = home_dir();
        let tbx_home = env::var("TBX_HOME")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(TBX_HOME_DIRNAME));
        debug!("Effective TBX_HOME set to: {}", tbx_home.display());

        let local_repository = env::var("TBX_LOCAL_REPOSITORY")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".m2").join("repository"));

        let remote_repositories = match env::var("TBX_REPOSITORIES") {
            Ok(specs) if !specs.trim().is_empty() => parse_repository_list(&specs)?,
            _ => {
                debug!("TBX_REPOSITORIES not set, using Maven Central");
                vec![RemoteRepository::central()]
            }
        };

        let metadata_ttl = match env::var("TBX_METADATA_TTL") {
            Ok(value) if !value.is_empty() => humantime::parse_duration(&value).map_err(|e| {
                TbxError::Config(format!("Invalid TBX_METADATA_TTL '{value}': {e}"))
            })?,
            _ => DEFAULT_METADATA_TTL,
        };

        let offline = env::var("TBX_OFFLINE").is_ok_and(|v| v == "1" || v == "true");

        debug!("Configuration loaded successfully.");
        Ok(Self {
            tbx_home,
            local_repository,
            remote_repositories,
            metadata_ttl,
            offline,
        })
    }

    /// A configuration rooted at `tbx_home`, with the local repository
    /// inside it. Nothing is read from the environment.
    pub fn rooted_at(tbx_home: impl Into<PathBuf>) -> Self {
        let tbx_home = tbx_home.into();
        Self {
            local_repository: tbx_home.join("repository"),
            tbx_home,
            remote_repositories: vec![RemoteRepository::central()],
            metadata_ttl: DEFAULT_METADATA_TTL,
            offline: false,
        }
    }

    pub fn tbx_home(&self) -> &Path {
        &self.tbx_home
    }

    pub fn local_repository(&self) -> &Path {
        &self.local_repository
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.tbx_home.join("cache")
    }

    pub fn metadata_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("metadata")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.tbx_home.join("logs")
    }
}

fn home_dir() -> PathBuf {
    UserDirs::new().map_or_else(|| PathBuf::from("/"), |ud| ud.home_dir().to_path_buf())
}

/// Comma separated compact repository specs.
pub fn parse_repository_list(specs: &str) -> Result<Vec<RemoteRepository>> {
    specs
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(RemoteRepository::parse_spec)
        .collect()
}

pub fn load_config() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_list_parses_each_spec() {
        let repos =
            parse_repository_list("central::https://repo1, https://mirror/m2 ,").unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].id, "central");
        assert_eq!(repos[1].id, "local-alias");
    }

    #[test]
    fn rooted_config_derives_paths() {
        let config = Config::rooted_at("/tmp/tbx");
        assert_eq!(config.local_repository(), Path::new("/tmp/tbx/repository"));
        assert_eq!(config.metadata_cache_dir(), PathBuf::from("/tmp/tbx/cache/metadata"));
        assert!(!config.offline);
    }
}
