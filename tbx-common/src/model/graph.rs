use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;
use super::dependency::Dependency;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub dependency: Dependency,
    #[serde(default)]
    pub children: Vec<DependencyNode>,
    /// Located artifact file, set once the node has been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Why the engine kept this node only for display (verbose collection).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omitted_for: Option<String>,
}

impl DependencyNode {
    pub fn new(dependency: Dependency) -> Self {
        Self {
            dependency,
            children: Vec::new(),
            file: None,
            omitted_for: None,
        }
    }

    /// A root node whose dependency carries an empty scope.
    pub fn root(coordinate: Coordinate) -> Self {
        Self::new(Dependency::new(coordinate, ""))
    }

    pub fn with_children(mut self, children: Vec<DependencyNode>) -> Self {
        self.children = children;
        self
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.dependency.coordinate
    }

    pub fn scope(&self) -> &str {
        &self.dependency.scope
    }

    pub fn is_omitted(&self) -> bool {
        self.omitted_for.is_some()
    }

    /// Removes direct children for which `keep` is false, subtrees included.
    /// Returns how many were removed.
    pub fn retain_children<F>(&mut self, keep: F) -> usize
    where
        F: Fn(&DependencyNode) -> bool,
    {
        let before = self.children.len();
        self.children.retain(|c| keep(c));
        before - self.children.len()
    }

    /// Pre-order walk below this node (the node itself excluded).
    pub fn descendants(&self) -> Vec<&DependencyNode> {
        let mut out = Vec::new();
        fn walk<'a>(node: &'a DependencyNode, out: &mut Vec<&'a DependencyNode>) {
            for child in &node.children {
                out.push(child);
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// Pre-order walk below this node, handing each descendant to `f`.
    pub fn for_each_descendant_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut DependencyNode),
    {
        for child in self.children.iter_mut() {
            f(child);
            child.for_each_descendant_mut(f);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DependencyNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectResult {
    pub root: DependencyNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactResult {
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Id of the repository the file came from; `None` for the local repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<String>,
}

impl ArtifactResult {
    pub fn resolved(coordinate: Coordinate, file: PathBuf, repository: Option<String>) -> Self {
        Self {
            coordinate,
            file: Some(file),
            repository,
            exceptions: Vec::new(),
        }
    }

    pub fn failed(coordinate: Coordinate, exceptions: Vec<String>) -> Self {
        Self {
            coordinate,
            file: None,
            repository: None,
            exceptions,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.file.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyResult {
    pub root: DependencyNode,
    /// Graph order (pre-order); after orchestration the root sits at index 0.
    pub artifact_results: Vec<ArtifactResult>,
}

impl DependencyResult {
    pub fn failures(&self) -> Vec<&ArtifactResult> {
        self.artifact_results
            .iter()
            .filter(|r| !r.is_resolved())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(a: &str, scope: &str) -> DependencyNode {
        DependencyNode::new(Dependency::new(Coordinate::new("g", a, "1"), scope))
    }

    #[test]
    fn retain_children_drops_whole_subtrees() {
        let mut root = DependencyNode::root(Coordinate::new("g", "root", "1")).with_children(vec![
            node("a", "compile").with_children(vec![node("a1", "compile")]),
            node("b", "test").with_children(vec![node("b1", "test")]),
        ]);
        let removed = root.retain_children(|c| c.scope() != "test");
        assert_eq!(removed, 1);
        let ids: Vec<&str> = root
            .descendants()
            .iter()
            .map(|n| n.coordinate().artifact_id.as_str())
            .collect();
        assert_eq!(ids, ["a", "a1"]);
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn mutable_walk_visits_in_pre_order() {
        let mut root = DependencyNode::root(Coordinate::new("g", "root", "1")).with_children(vec![
            node("a", "compile").with_children(vec![node("a1", "runtime")]),
            node("b", "compile"),
        ]);
        let mut idx = 0;
        root.for_each_descendant_mut(&mut |n| {
            n.file = Some(PathBuf::from(format!("/repo/{idx}.jar")));
            idx += 1;
        });
        assert_eq!(root.children[0].children[0].file, Some(PathBuf::from("/repo/1.jar")));
        assert_eq!(root.children[1].file, Some(PathBuf::from("/repo/2.jar")));
    }
}
