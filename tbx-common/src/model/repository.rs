use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TbxError};

pub const DEFAULT_REPOSITORY_ID: &str = "local-alias";
pub const DEFAULT_REPOSITORY_TYPE: &str = "default";
pub const CENTRAL_ID: &str = "central";
pub const CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    #[serde(rename = "type")]
    pub repository_type: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            repository_type: DEFAULT_REPOSITORY_TYPE.to_string(),
            url: url.into(),
        }
    }

    pub fn central() -> Self {
        Self::new(CENTRAL_ID, CENTRAL_URL)
    }

    /// Parses the compact `url`, `id::url` or `id::type::url` form.
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let invalid = |reason: String| TbxError::RepositorySpecFormat {
            spec: spec.to_string(),
            reason,
        };
        let parts: Vec<&str> = spec.split("::").collect();
        let (id, repository_type, url) = match parts.as_slice() {
            [url] => (DEFAULT_REPOSITORY_ID, DEFAULT_REPOSITORY_TYPE, *url),
            [id, url] => (*id, DEFAULT_REPOSITORY_TYPE, *url),
            [id, repository_type, url] => (*id, *repository_type, *url),
            _ => {
                return Err(invalid(format!(
                    "expected 1 to 3 '::' separated segments, got {}",
                    parts.len()
                )))
            }
        };
        if url.trim().is_empty() {
            return Err(invalid("url must not be empty".to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            repository_type: repository_type.to_string(),
            url: url.trim_end_matches('/').to_string(),
        })
    }

    pub fn join(&self, relative: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), relative)
    }
}

impl FromStr for RemoteRepository {
    type Err = TbxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RemoteRepository::parse_spec(s)
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.id, self.repository_type, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_url_spec_uses_default_type() {
        let repo = RemoteRepository::parse_spec("central::https://example/repo").unwrap();
        assert_eq!(repo.id, "central");
        assert_eq!(repo.repository_type, "default");
        assert_eq!(repo.url, "https://example/repo");
    }

    #[test]
    fn bare_url_gets_default_id() {
        let repo = RemoteRepository::parse_spec("https://example/repo/").unwrap();
        assert_eq!(repo.id, DEFAULT_REPOSITORY_ID);
        assert_eq!(repo.url, "https://example/repo");
    }

    #[test]
    fn three_segments_set_type() {
        let repo = RemoteRepository::parse_spec("corp::legacy::https://corp/m1").unwrap();
        assert_eq!(repo.repository_type, "legacy");
    }

    #[test]
    fn four_segments_is_a_format_error() {
        let err = RemoteRepository::parse_spec("bad::a::b::c").unwrap_err();
        assert!(matches!(err, TbxError::RepositorySpecFormat { .. }));
    }

    #[test]
    fn empty_url_is_a_format_error() {
        assert!(RemoteRepository::parse_spec("central::").is_err());
    }
}
