// Repository metadata (`maven-metadata.xml`) at group and artifact level.
use std::path::PathBuf;

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use super::repository::RemoteRepository;
use crate::error::Result;

pub const METADATA_FILE_NAME: &str = "maven-metadata.xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub artifact_id: String,
}

/// Latest deployment of a `-SNAPSHOT` version in a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub timestamp: String,
    pub build_number: u32,
}

impl SnapshotInfo {
    /// `1.0-SNAPSHOT` becomes `1.0-20240101.120000-3`.
    pub fn expand(&self, base_version: &str) -> String {
        match base_version.strip_suffix("SNAPSHOT") {
            Some(prefix) => format!("{}{}-{}", prefix, self.timestamp, self.build_number),
            None => base_version.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub latest: Option<String>,
    pub release: Option<String>,
    /// In document order, which repositories keep ascending.
    pub versions: Vec<String>,
    pub last_updated: Option<String>,
    pub snapshot: Option<SnapshotInfo>,
    pub plugins: Vec<PluginEntry>,
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl RepositoryMetadata {
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();

        let mut metadata = RepositoryMetadata {
            group_id: child_text(root, "groupId"),
            artifact_id: child_text(root, "artifactId"),
            ..Default::default()
        };

        if let Some(versioning) = child(root, "versioning") {
            metadata.latest = child_text(versioning, "latest");
            metadata.release = child_text(versioning, "release");
            metadata.last_updated = child_text(versioning, "lastUpdated");
            metadata.snapshot = child(versioning, "snapshot").and_then(|snapshot| {
                Some(SnapshotInfo {
                    timestamp: child_text(snapshot, "timestamp")?,
                    build_number: child_text(snapshot, "buildNumber")?.parse().ok()?,
                })
            });
            if let Some(versions) = child(versioning, "versions") {
                metadata.versions = versions
                    .children()
                    .filter(|c| c.is_element() && c.tag_name().name() == "version")
                    .filter_map(|c| c.text())
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
        }

        if let Some(plugins) = child(root, "plugins") {
            metadata.plugins = plugins
                .children()
                .filter(|c| c.is_element() && c.tag_name().name() == "plugin")
                .filter_map(|p| {
                    Some(PluginEntry {
                        artifact_id: child_text(p, "artifactId")?,
                        name: child_text(p, "name"),
                        prefix: child_text(p, "prefix"),
                    })
                })
                .collect();
        }

        Ok(metadata)
    }
}

/// Outcome of fetching group-level metadata from one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataResult {
    pub group_id: String,
    pub repository: RemoteRepository,
    pub file: Option<PathBuf>,
    pub error: Option<String>,
}

impl MetadataResult {
    pub fn found(group_id: impl Into<String>, repository: RemoteRepository, file: PathBuf) -> Self {
        Self {
            group_id: group_id.into(),
            repository,
            file: Some(file),
            error: None,
        }
    }

    pub fn missing(
        group_id: impl Into<String>,
        repository: RemoteRepository,
        error: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            repository,
            file: None,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_plugin_metadata() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <plugins>
    <plugin>
      <name>Apache Maven Clean Plugin</name>
      <prefix>clean</prefix>
      <artifactId>maven-clean-plugin</artifactId>
    </plugin>
    <plugin>
      <prefix>jar</prefix>
      <artifactId>maven-jar-plugin</artifactId>
    </plugin>
    <plugin><name>no artifact id</name></plugin>
  </plugins>
</metadata>"#;
        let metadata = RepositoryMetadata::parse(xml).unwrap();
        assert_eq!(metadata.plugins.len(), 2);
        assert_eq!(metadata.plugins[0].artifact_id, "maven-clean-plugin");
        assert_eq!(metadata.plugins[1].name, None);
    }

    #[test]
    fn parses_artifact_versioning() {
        let xml = r#"<metadata>
  <groupId>org.example</groupId>
  <artifactId>lib</artifactId>
  <versioning>
    <latest>1.2-SNAPSHOT</latest>
    <release>1.0</release>
    <versions>
      <version>1.0</version>
      <version>1.1-SNAPSHOT</version>
      <version>1.2-SNAPSHOT</version>
    </versions>
    <lastUpdated>20240101120000</lastUpdated>
  </versioning>
</metadata>"#;
        let metadata = RepositoryMetadata::parse(xml).unwrap();
        assert_eq!(metadata.artifact_id.as_deref(), Some("lib"));
        assert_eq!(metadata.versions, ["1.0", "1.1-SNAPSHOT", "1.2-SNAPSHOT"]);
        assert_eq!(metadata.release.as_deref(), Some("1.0"));
    }

    #[test]
    fn snapshot_versioning_expands_base_version() {
        let xml = r#"<metadata>
  <versioning>
    <snapshot><timestamp>20240101.120000</timestamp><buildNumber>3</buildNumber></snapshot>
  </versioning>
</metadata>"#;
        let snapshot = RepositoryMetadata::parse(xml).unwrap().snapshot.unwrap();
        assert_eq!(snapshot.expand("1.0-SNAPSHOT"), "1.0-20240101.120000-3");
        assert_eq!(snapshot.expand("1.0"), "1.0");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(RepositoryMetadata::parse("<metadata><versioning>").is_err());
    }
}
