//! Direct dependency cycles between files.
//!
//! Only relative specifiers that resolve to an indexed file become edges, and
//! only reciprocal pairs (A imports B, B imports A) are reported. Longer
//! cycles such as A -> B -> C -> A are out of scope.

use crate::index::IndexedFile;
use crate::language::MODULE_EXTENSIONS;
use crate::syntax::{visit_items, SyntaxItem};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use sigfix_protocol::LineRange;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Import statements from one file to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportEdge {
    /// Line ranges of the importing statements, in document order
    pub statements: Vec<LineRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCycle {
    /// Lexicographically smaller side of the pair
    pub from: String,
    pub to: String,
    /// First statement in `from` importing `to`
    pub from_range: LineRange,
    /// First statement in `to` importing `from`
    pub to_range: LineRange,
}

/// File-level import graph.
#[derive(Default)]
pub struct ImportGraph {
    graph: DiGraph<String, ImportEdge>,
    index: HashMap<String, NodeIndex>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every import-like statement in `files`.
    pub fn build(files: &[IndexedFile]) -> Self {
        let known: HashSet<&str> = files.iter().map(|f| f.record.path.as_str()).collect();
        let mut graph = Self::new();

        for file in files {
            graph.add_file(&file.record.path);
            if !file.language.has_module_imports() {
                continue;
            }
            let Some(tree) = &file.tree else {
                continue;
            };

            visit_items(tree, &file.content, file.language, |item| {
                let SyntaxItem::Import {
                    specifier,
                    statement,
                } = item
                else {
                    return;
                };
                match resolve_specifier(&file.record.path, &specifier, &known) {
                    Some(target) => graph.add_import(&file.record.path, &target, statement),
                    None => log::trace!(
                        "Unresolved import {specifier:?} in {} skipped",
                        file.record.path
                    ),
                }
            });
        }

        log::debug!(
            "Built import graph: {} files, {} edges",
            graph.file_count(),
            graph.edge_count()
        );
        graph
    }

    pub fn add_file(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.index.insert(path.to_string(), idx);
        idx
    }

    /// Record that `from` imports `to` at `statement`. Self-imports are ignored.
    pub fn add_import(&mut self, from: &str, to: &str, statement: LineRange) {
        if from == to {
            return;
        }
        let a = self.add_file(from);
        let b = self.add_file(to);
        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge].statements.push(statement),
            None => {
                self.graph.add_edge(
                    a,
                    b,
                    ImportEdge {
                        statements: vec![statement],
                    },
                );
            }
        }
    }

    pub fn file_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// `file -> {target -> [import statement ranges]}`
    pub fn adjacency(&self) -> BTreeMap<String, BTreeMap<String, Vec<LineRange>>> {
        let mut adjacency: BTreeMap<String, BTreeMap<String, Vec<LineRange>>> = BTreeMap::new();
        for edge in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            adjacency
                .entry(self.graph[a].clone())
                .or_default()
                .insert(self.graph[b].clone(), self.graph[edge].statements.clone());
        }
        adjacency
    }

    /// Reciprocal pairs, once per unordered pair, sorted by `(from, to)`.
    pub fn direct_cycles(&self) -> Vec<DependencyCycle> {
        let mut cycles = Vec::new();
        for edge in self.graph.edge_indices() {
            let Some((a, b)) = self.graph.edge_endpoints(edge) else {
                continue;
            };
            if self.graph[a] >= self.graph[b] {
                continue;
            }
            let Some(back) = self.graph.find_edge(b, a) else {
                continue;
            };
            let (Some(&from_range), Some(&to_range)) = (
                self.graph[edge].statements.first(),
                self.graph[back].statements.first(),
            ) else {
                continue;
            };
            cycles.push(DependencyCycle {
                from: self.graph[a].clone(),
                to: self.graph[b].clone(),
                from_range,
                to_range,
            });
        }
        cycles.sort_by(|x, y| x.from.cmp(&y.from).then_with(|| x.to.cmp(&y.to)));
        cycles
    }
}

/// Resolve a relative specifier against the importing file's directory.
///
/// Tries the literal path, then each module extension, then `index.<ext>`.
/// Package-style and absolute specifiers never resolve.
pub fn resolve_specifier(from: &str, specifier: &str, known: &HashSet<&str>) -> Option<String> {
    let is_relative = specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../");
    if !is_relative {
        return None;
    }

    let base = match from.rfind('/') {
        Some(idx) => &from[..idx],
        None => "",
    };
    let joined = normalize_posix(&format!("{base}/{specifier}"))?;

    if known.contains(joined.as_str()) {
        return Some(joined);
    }
    for ext in MODULE_EXTENSIONS {
        let candidate = format!("{joined}.{ext}");
        if known.contains(candidate.as_str()) {
            return Some(candidate);
        }
    }
    for ext in MODULE_EXTENSIONS {
        let candidate = if joined.is_empty() {
            format!("index.{ext}")
        } else {
            format!("{joined}/index.{ext}")
        };
        if known.contains(candidate.as_str()) {
            return Some(candidate);
        }
    }
    None
}

/// Collapse `.` and `..` segments; `None` when the path escapes the root.
fn normalize_posix(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
