use std::collections::HashSet;

use tracing::{debug, warn};

use crate::model::{Coordinate, Dependency};

/// Merges two dependency lists by versionless identity.
///
/// Every dominant entry is kept, in order; recessive entries follow in
/// their own order unless the dominant side already declares them.
pub fn merge_dependencies(dominant: Vec<Dependency>, recessive: Vec<Dependency>) -> Vec<Dependency> {
    if dominant.is_empty() {
        return recessive;
    }
    if recessive.is_empty() {
        return dominant;
    }

    let mut ids: HashSet<String> = HashSet::with_capacity(dominant.len() + recessive.len());
    let mut result = Vec::with_capacity(dominant.len() + recessive.len());
    for dependency in dominant {
        ids.insert(dependency.versionless_id());
        result.push(dependency);
    }
    for dependency in recessive {
        if !ids.contains(&dependency.versionless_id()) {
            result.push(dependency);
        }
    }
    result
}

/// Left-to-right fold of BOM managed dependencies: the first BOM to declare
/// an artifact wins, later declarations are dropped with a warning.
#[derive(Debug, Default)]
pub struct BomImport {
    seen: HashSet<String>,
    managed: Vec<Dependency>,
}

impl BomImport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, bom: &Coordinate, managed: Vec<Dependency>) {
        debug!("Importing {} managed dependencies from BOM {}", managed.len(), bom);
        for dependency in managed {
            if self.seen.insert(dependency.versionless_id()) {
                self.managed.push(dependency);
            } else {
                warn!(
                    "BOM {} introduced an already managed dependency {}",
                    bom, dependency
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.managed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
    }

    pub fn finish(self) -> Vec<Dependency> {
        self.managed
    }
}
