use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TbxError};

pub const DEFAULT_EXTENSION: &str = "jar";

/// Identifies a single distributable artifact.
///
/// Equality covers every field. Merging and de-duplication use
/// [`Coordinate::versionless_id`] instead, so that managing the version of a
/// dependency stays meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub classifier: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: String::new(),
            extension: default_extension(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    /// Parses `group:artifact[:extension[:classifier]]:version`.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| TbxError::CoordinateParse {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.chars().any(char::is_whitespace) {
            return Err(invalid("coordinates must not contain whitespace"));
        }
        let parts: Vec<&str> = input.split(':').collect();
        let (group_id, artifact_id, extension, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, "", "", *v),
            [g, a, e, v] => (*g, *a, *e, "", *v),
            [g, a, e, c, v] => (*g, *a, *e, *c, *v),
            _ => {
                return Err(invalid(
                    "expected <groupId>:<artifactId>[:<extension>[:<classifier>]]:<version>",
                ))
            }
        };
        if group_id.is_empty() || artifact_id.is_empty() {
            return Err(invalid("groupId and artifactId must not be empty"));
        }
        if version.is_empty() {
            return Err(invalid("version must not be empty"));
        }

        Ok(Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: classifier.to_string(),
            extension: if extension.is_empty() {
                default_extension()
            } else {
                extension.to_string()
            },
        })
    }

    /// `group:artifact:classifier:extension`, the identity used for merging.
    pub fn versionless_id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.classifier, self.extension
        )
    }

    pub fn group_artifact(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with("SNAPSHOT")
    }

    /// File name of the artifact inside a Maven 2 layout repository.
    pub fn file_name(&self) -> String {
        if self.classifier.is_empty() {
            format!("{}-{}.{}", self.artifact_id, self.version, self.extension)
        } else {
            format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, self.classifier, self.extension
            )
        }
    }

    /// `org/example/lib/1.0`, relative to a repository root.
    pub fn version_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    pub fn repository_path(&self) -> String {
        format!("{}/{}", self.version_dir(), self.file_name())
    }

    /// The POM that describes this artifact.
    pub fn pom(&self) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            classifier: String::new(),
            extension: "pom".to_string(),
        }
    }
}

impl FromStr for Coordinate {
    type Err = TbxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Coordinate::parse(s)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}
