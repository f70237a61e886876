// tbx-net/src/pom.rs
// Project descriptor parsing and the inheritance/interpolation rules that
// turn a parent chain into an artifact descriptor.

use std::collections::HashMap;

use roxmltree::{Document, Node};
use tbx_common::dependency::merge_dependencies;
use tbx_common::error::{Result, TbxError};
use tbx_common::model::{
    scopes, ArtifactDescriptor, Coordinate, Dependency, Exclusion, RemoteRepository,
};
use tracing::debug;

const MAX_INTERPOLATION_DEPTH: usize = 10;

/// A `<dependency>` entry exactly as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub dependency_type: Option<String>,
    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<String>,
    pub exclusions: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<Coordinate>,
    /// Declaration order is kept; later entries win.
    pub properties: Vec<(String, String)>,
    pub dependencies: Vec<PomDependency>,
    pub managed_dependencies: Vec<PomDependency>,
    pub repositories: Vec<(String, String)>,
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_dependencies(container: Option<Node<'_, '_>>) -> Vec<PomDependency> {
    let Some(container) = container else {
        return Vec::new();
    };
    children(container, "dependency")
        .filter_map(|d| {
            let exclusions = child(d, "exclusions")
                .map(|ex| {
                    children(ex, "exclusion")
                        .filter_map(|e| {
                            Some((child_text(e, "groupId")?, child_text(e, "artifactId")?))
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(PomDependency {
                group_id: child_text(d, "groupId")?,
                artifact_id: child_text(d, "artifactId")?,
                version: child_text(d, "version"),
                dependency_type: child_text(d, "type"),
                classifier: child_text(d, "classifier"),
                scope: child_text(d, "scope"),
                optional: child_text(d, "optional"),
                exclusions,
            })
        })
        .collect()
}

impl Pom {
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        let project = doc.root_element();
        if project.tag_name().name() != "project" {
            return Err(TbxError::Generic(format!(
                "Expected <project> as POM root, found <{}>",
                project.tag_name().name()
            )));
        }

        let parent = child(project, "parent").and_then(|p| {
            Some(
                Coordinate::new(
                    child_text(p, "groupId")?,
                    child_text(p, "artifactId")?,
                    child_text(p, "version")?,
                )
                .with_extension("pom"),
            )
        });

        let properties = child(project, "properties")
            .map(|props| {
                props
                    .children()
                    .filter(|c| c.is_element())
                    .map(|c| {
                        (
                            c.tag_name().name().to_string(),
                            c.text().map(|t| t.trim().to_string()).unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let repositories = child(project, "repositories")
            .map(|repos| {
                children(repos, "repository")
                    .filter_map(|r| Some((child_text(r, "id")?, child_text(r, "url")?)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Pom {
            group_id: child_text(project, "groupId"),
            artifact_id: child_text(project, "artifactId"),
            version: child_text(project, "version"),
            packaging: child_text(project, "packaging"),
            parent,
            properties,
            dependencies: parse_dependencies(child(project, "dependencies")),
            managed_dependencies: parse_dependencies(
                child(project, "dependencyManagement").and_then(|dm| child(dm, "dependencies")),
            ),
            repositories,
        })
    }
}

/// Replaces `${...}` references from `properties`. Unknown references are
/// left in place.
pub fn interpolate(value: &str, properties: &HashMap<String, String>) -> String {
    let mut current = value.to_string();
    for _ in 0..MAX_INTERPOLATION_DEPTH {
        if !current.contains("${") {
            break;
        }
        let mut out = String::with_capacity(current.len());
        let mut rest = current.as_str();
        let mut changed = false;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match properties.get(key) {
                        Some(replacement) => {
                            out.push_str(replacement);
                            changed = true;
                        }
                        None => {
                            out.push_str("${");
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        current = out;
        if !changed {
            break;
        }
    }
    current
}

/// Maps a dependency `type` onto the extension and implied classifier of the
/// file it refers to.
fn type_to_extension(dependency_type: &str) -> (&str, Option<&'static str>) {
    match dependency_type {
        "test-jar" => ("jar", Some("tests")),
        "java-source" => ("jar", Some("sources")),
        "javadoc" => ("jar", Some("javadoc")),
        "maven-plugin" | "ejb" | "bundle" => ("jar", None),
        "ejb-client" => ("jar", Some("client")),
        other => (other, None),
    }
}

/// The inherited, interpolated model of one artifact, before BOM imports
/// and dependency management are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePom {
    pub coordinate: Coordinate,
    pub packaging: String,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
}

impl EffectivePom {
    /// `chain[0]` is the artifact's own POM, followed by its ancestors.
    pub fn build(chain: &[Pom]) -> Result<Self> {
        let Some(own) = chain.first() else {
            return Err(TbxError::Generic("Empty POM chain".to_string()));
        };
        let parent_ref = own.parent.as_ref();
        let group_id = own
            .group_id
            .clone()
            .or_else(|| parent_ref.map(|p| p.group_id.clone()))
            .ok_or_else(|| TbxError::Generic("POM declares no groupId".to_string()))?;
        let artifact_id = own
            .artifact_id
            .clone()
            .ok_or_else(|| TbxError::Generic("POM declares no artifactId".to_string()))?;
        let version = own
            .version
            .clone()
            .or_else(|| parent_ref.map(|p| p.version.clone()))
            .ok_or_else(|| TbxError::Generic(format!("POM of {group_id}:{artifact_id} declares no version")))?;
        let packaging = own.packaging.clone().unwrap_or_else(|| "jar".to_string());

        let mut properties: HashMap<String, String> = HashMap::new();
        for pom in chain.iter().rev() {
            for (key, value) in &pom.properties {
                properties.insert(key.clone(), value.clone());
            }
        }
        for prefix in ["project", "pom"] {
            properties.insert(format!("{prefix}.groupId"), group_id.clone());
            properties.insert(format!("{prefix}.artifactId"), artifact_id.clone());
            properties.insert(format!("{prefix}.version"), version.clone());
            properties.insert(format!("{prefix}.packaging"), packaging.clone());
            if let Some(parent) = parent_ref {
                properties.insert(format!("{prefix}.parent.groupId"), parent.group_id.clone());
                properties.insert(format!("{prefix}.parent.artifactId"), parent.artifact_id.clone());
                properties.insert(format!("{prefix}.parent.version"), parent.version.clone());
            }
        }
        properties.insert("version".to_string(), version.clone());

        // Nearer POMs dominate their ancestors.
        let mut dependencies = Vec::new();
        let mut managed_dependencies = Vec::new();
        let mut repositories: Vec<RemoteRepository> = Vec::new();
        for pom in chain {
            let own_deps = pom
                .dependencies
                .iter()
                .map(|d| to_dependency(d, &properties))
                .collect();
            dependencies = merge_dependencies(dependencies, own_deps);
            let own_managed = pom
                .managed_dependencies
                .iter()
                .map(|d| to_dependency(d, &properties))
                .collect();
            managed_dependencies = merge_dependencies(managed_dependencies, own_managed);
            for (id, url) in &pom.repositories {
                let url = interpolate(url, &properties);
                if repositories.iter().any(|r| &r.id == id) {
                    continue;
                }
                if url.starts_with("http://") || url.starts_with("https://") {
                    repositories.push(RemoteRepository::new(id.clone(), url.trim_end_matches('/')));
                } else {
                    debug!("Ignoring repository {} with unsupported url {}", id, url);
                }
            }
        }

        Ok(EffectivePom {
            coordinate: Coordinate::new(group_id, artifact_id, version),
            packaging,
            dependencies,
            managed_dependencies,
            repositories,
        })
    }

    /// BOMs pulled in through `<scope>import</scope>` management entries.
    pub fn bom_imports(&self) -> Vec<Coordinate> {
        self.managed_dependencies
            .iter()
            .filter(|d| d.has_scope(scopes::IMPORT) && d.coordinate.extension == "pom")
            .map(|d| d.coordinate.clone())
            .collect()
    }

    /// Folds in managed entries imported from BOMs and injects management
    /// into the declared dependencies.
    pub fn into_descriptor(self, imported: Vec<Dependency>) -> ArtifactDescriptor {
        let own: Vec<Dependency> = self
            .managed_dependencies
            .into_iter()
            .filter(|d| !d.has_scope(scopes::IMPORT))
            .collect();
        let managed = merge_dependencies(own, imported);
        let by_id: HashMap<String, &Dependency> = managed
            .iter()
            .rev()
            .map(|d| (d.versionless_id(), d))
            .collect();

        let dependencies = self
            .dependencies
            .into_iter()
            .map(|mut dependency| {
                if let Some(rule) = by_id.get(&dependency.versionless_id()) {
                    if dependency.coordinate.version.is_empty() {
                        dependency.coordinate.version = rule.coordinate.version.clone();
                    }
                    if dependency.scope.is_empty() {
                        dependency.scope = rule.scope.clone();
                    }
                    if dependency.exclusions.is_empty() {
                        dependency.exclusions = rule.exclusions.clone();
                    }
                }
                if dependency.scope.is_empty() {
                    dependency.scope = scopes::COMPILE.to_string();
                }
                dependency
            })
            .collect();

        ArtifactDescriptor {
            coordinate: self.coordinate,
            dependencies,
            managed_dependencies: managed,
            repositories: self.repositories,
        }
    }
}

fn to_dependency(raw: &PomDependency, properties: &HashMap<String, String>) -> Dependency {
    let dependency_type = raw
        .dependency_type
        .as_deref()
        .map(|t| interpolate(t, properties))
        .unwrap_or_else(|| "jar".to_string());
    let (extension, implied_classifier) = type_to_extension(&dependency_type);
    let classifier = raw
        .classifier
        .as_deref()
        .map(|c| interpolate(c, properties))
        .or_else(|| implied_classifier.map(str::to_string))
        .unwrap_or_default();

    let coordinate = Coordinate::new(
        interpolate(&raw.group_id, properties),
        interpolate(&raw.artifact_id, properties),
        raw.version
            .as_deref()
            .map(|v| interpolate(v, properties))
            .unwrap_or_default(),
    )
    .with_extension(extension)
    .with_classifier(classifier);

    let exclusions = raw
        .exclusions
        .iter()
        .map(|(g, a)| Exclusion::new(interpolate(g, properties), interpolate(a, properties)))
        .collect();
    let optional = raw
        .optional
        .as_deref()
        .is_some_and(|o| interpolate(o, properties).eq_ignore_ascii_case("true"));

    Dependency::new(
        coordinate,
        raw.scope
            .as_deref()
            .map(|s| interpolate(s, properties).to_ascii_lowercase())
            .unwrap_or_default(),
    )
    .with_optional(optional)
    .with_exclusions(exclusions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: &str = r#"<?xml version="1.0"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <groupId>org.example</groupId>
  <artifactId>parent</artifactId>
  <version>2.0</version>
  <packaging>pom</packaging>
  <properties>
    <slf4j.version>2.0.9</slf4j.version>
    <junit.version>4.13.2</junit.version>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.slf4j</groupId>
        <artifactId>slf4j-api</artifactId>
        <version>${slf4j.version}</version>
      </dependency>
      <dependency>
        <groupId>org.example</groupId>
        <artifactId>platform-bom</artifactId>
        <version>${project.version}</version>
        <type>pom</type>
        <scope>import</scope>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>${junit.version}</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>"#;

    const CHILD: &str = r#"<project>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>2.0</version>
  </parent>
  <artifactId>app</artifactId>
  <properties>
    <slf4j.version>2.0.12</slf4j.version>
  </properties>
  <repositories>
    <repository><id>corp</id><url>https://repo.example.com/m2/</url></repository>
    <repository><id>files</id><url>file:///tmp/repo</url></repository>
  </repositories>
  <dependencies>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>core</artifactId>
      <version>${project.version}</version>
      <type>test-jar</type>
      <optional>true</optional>
      <exclusions>
        <exclusion><groupId>commons-logging</groupId><artifactId>*</artifactId></exclusion>
      </exclusions>
    </dependency>
  </dependencies>
</project>"#;

    fn chain() -> Vec<Pom> {
        vec![Pom::parse(CHILD).unwrap(), Pom::parse(PARENT).unwrap()]
    }

    #[test]
    fn parses_namespaced_pom() {
        let parent = Pom::parse(PARENT).unwrap();
        assert_eq!(parent.artifact_id.as_deref(), Some("parent"));
        assert_eq!(parent.packaging.as_deref(), Some("pom"));
        assert_eq!(parent.managed_dependencies.len(), 2);
        assert_eq!(parent.dependencies[0].scope.as_deref(), Some("test"));

        let child = Pom::parse(CHILD).unwrap();
        assert_eq!(child.parent.unwrap().to_string(), "org.example:parent:pom:2.0");
        assert_eq!(child.dependencies[1].exclusions.len(), 1);
    }

    #[test]
    fn rejects_non_project_documents() {
        assert!(Pom::parse("<metadata/>").is_err());
        assert!(Pom::parse("<project>").is_err());
    }

    #[test]
    fn interpolation_is_recursive_and_leaves_unknowns() {
        let props: HashMap<String, String> = [
            ("a".to_string(), "${b}-x".to_string()),
            ("b".to_string(), "1.0".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(interpolate("v${a}", &props), "v1.0-x");
        assert_eq!(interpolate("${missing}", &props), "${missing}");
        assert_eq!(interpolate("${unterminated", &props), "${unterminated");
    }

    #[test]
    fn child_inherits_coordinates_and_overrides_properties() {
        let effective = EffectivePom::build(&chain()).unwrap();
        assert_eq!(effective.coordinate.to_string(), "org.example:app:jar:2.0");
        let slf4j = effective
            .managed_dependencies
            .iter()
            .find(|d| d.coordinate.artifact_id == "slf4j-api")
            .unwrap();
        assert_eq!(slf4j.coordinate.version, "2.0.12");
        assert_eq!(effective.repositories.len(), 1);
        assert_eq!(effective.repositories[0].url, "https://repo.example.com/m2");
    }

    #[test]
    fn import_scoped_entries_are_reported_as_boms() {
        let effective = EffectivePom::build(&chain()).unwrap();
        let boms = effective.bom_imports();
        assert_eq!(boms.len(), 1);
        assert_eq!(boms[0].to_string(), "org.example:platform-bom:pom:2.0");
    }

    #[test]
    fn management_fills_versions_and_default_scope() {
        let effective = EffectivePom::build(&chain()).unwrap();
        let imported = vec![Dependency::compile(Coordinate::new("org.other", "util", "7"))];
        let descriptor = effective.into_descriptor(imported);

        let ids: Vec<String> = descriptor
            .dependencies
            .iter()
            .map(|d| d.coordinate.to_string())
            .collect();
        assert_eq!(
            ids,
            [
                "org.slf4j:slf4j-api:jar:2.0.12",
                "org.example:core:jar:tests:2.0",
                "junit:junit:jar:4.13.2",
            ]
        );
        assert_eq!(descriptor.dependencies[0].scope, "compile");
        assert!(descriptor.dependencies[1].optional);
        assert_eq!(descriptor.dependencies[2].scope, "test");
        assert!(descriptor
            .managed_dependencies
            .iter()
            .all(|d| !d.has_scope(scopes::IMPORT)));
        assert!(descriptor
            .managed_dependencies
            .iter()
            .any(|d| d.coordinate.artifact_id == "util"));
    }
}
