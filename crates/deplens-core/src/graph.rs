use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::types::AnalysisResult;

/// Extensions probed when a relative specifier omits one, in resolution order.
const RESOLVE_EXTENSIONS: [&str; 4] = ["ts", "tsx", "js", "jsx"];

/// Node in the file dependency graph: an analyzed file, or a dangling
/// resolution target that nothing traverses further.
#[derive(Debug, Clone)]
pub struct FileNode {
    pub path: PathBuf,
    pub analyzed: bool,
}

/// Edge metadata: the import that created the dependency.
#[derive(Debug, Clone)]
pub struct ImportEdge {
    pub specifier: String,
    pub line: usize,
}

/// Directed graph of intra-project file dependencies. Only relative imports
/// produce edges; package and alias specifiers never appear.
pub struct DependencyGraph {
    graph: DiGraph<FileNode, ImportEdge>,
    index: HashMap<PathBuf, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Build the full graph from the complete per-file result set. Nodes for
    /// analyzed files are added first in sorted order so that traversal (and
    /// therefore cycle reporting) is reproducible for identical input.
    pub fn build(results: &BTreeMap<PathBuf, AnalysisResult>) -> Self {
        let mut graph = Self::new();
        let analyzed: HashSet<&Path> = results.keys().map(|p| p.as_path()).collect();

        for path in results.keys() {
            graph.ensure_node(path, true);
        }

        for (path, result) in results {
            let Some(dir) = path.parent() else { continue };
            for import in &result.imports {
                if !import.import_path.starts_with('.') {
                    continue;
                }
                let target = resolve_relative(dir, &import.import_path, &analyzed);
                let target_analyzed = analyzed.contains(target.as_path());
                let from = graph.ensure_node(path, true);
                let to = graph.ensure_node(&target, target_analyzed);
                graph.graph.add_edge(
                    from,
                    to,
                    ImportEdge {
                        specifier: import.import_path.clone(),
                        line: import.position.line,
                    },
                );
            }
        }

        graph
    }

    fn ensure_node(&mut self, path: &Path, analyzed: bool) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(FileNode {
            path: path.to_path_buf(),
            analyzed,
        });
        self.index.insert(path.to_path_buf(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    /// Forward adjacency for one file, in import order.
    pub fn dependencies_of(&self, path: &Path) -> Vec<&Path> {
        let Some(&idx) = self.index.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<&Path> = self
            .graph
            .edges(idx)
            .map(|e| self.graph[e.target()].path.as_path())
            .collect();
        // petgraph iterates edges most-recent-first
        out.reverse();
        out
    }

    /// Reverse adjacency for one file (who imports it), in edge order.
    pub fn dependents_of(&self, path: &Path) -> Vec<&Path> {
        let Some(&idx) = self.index.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<&Path> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].path.as_path())
            .collect();
        out.reverse();
        out
    }

    /// The forward graph as a plain map, for reporting and tests.
    pub fn forward_map(&self) -> BTreeMap<PathBuf, Vec<PathBuf>> {
        let mut forward: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for node in self.graph.node_weights() {
            if node.analyzed {
                forward.entry(node.path.clone()).or_default();
            }
        }
        for edge in self.graph.edge_references() {
            let from = self.graph[edge.source()].path.clone();
            let to = self.graph[edge.target()].path.clone();
            forward.entry(from).or_default().push(to);
        }
        forward
    }

    /// The exact transpose of the forward graph, built in a second pass.
    pub fn transpose(&self) -> BTreeMap<PathBuf, Vec<PathBuf>> {
        let mut reverse: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for edge in self.graph.edge_references() {
            let from = self.graph[edge.source()].path.clone();
            let to = self.graph[edge.target()].path.clone();
            reverse.entry(to).or_default().push(from);
        }
        reverse
    }

    /// Outgoing neighbors in edge-insertion order.
    fn ordered_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        neighbors.reverse();
        neighbors
    }

    /// Find circular dependencies with a recursive DFS over every node in
    /// discovery order. Cycles are reported as they are found, closed on
    /// their first element; rotations reached from different roots are not
    /// deduplicated.
    ///
    /// Recursion depth is bounded by the longest dependency chain, which is
    /// fine for project-sized trees; `find_cycles_iterative` covers
    /// pathologically deep graphs.
    pub fn find_cycles(&self) -> Vec<Vec<PathBuf>> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut on_stack: HashSet<NodeIndex> = HashSet::new();
        let mut stack: Vec<NodeIndex> = Vec::new();
        let mut cycles: Vec<Vec<PathBuf>> = Vec::new();

        for idx in self.graph.node_indices() {
            if !visited.contains(&idx) {
                self.dfs(idx, &mut visited, &mut on_stack, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    fn dfs(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        stack: &mut Vec<NodeIndex>,
        cycles: &mut Vec<Vec<PathBuf>>,
    ) {
        stack.push(node);
        on_stack.insert(node);

        for next in self.ordered_neighbors(node) {
            if on_stack.contains(&next) {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<PathBuf> = stack[start..]
                    .iter()
                    .map(|&n| self.graph[n].path.clone())
                    .collect();
                cycle.push(self.graph[next].path.clone());
                cycles.push(cycle);
            } else if !visited.contains(&next) {
                self.dfs(next, visited, on_stack, stack, cycles);
            }
        }

        stack.pop();
        on_stack.remove(&node);
        visited.insert(node);
    }

    /// Explicit-stack variant of `find_cycles` for graphs deep enough to
    /// threaten the call stack. Produces the same cycles on the same input.
    pub fn find_cycles_iterative(&self) -> Vec<Vec<PathBuf>> {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut cycles: Vec<Vec<PathBuf>> = Vec::new();

        for root in self.graph.node_indices() {
            if visited.contains(&root) {
                continue;
            }
            let mut on_stack: HashSet<NodeIndex> = HashSet::new();
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> =
                vec![(root, self.ordered_neighbors(root), 0)];
            on_stack.insert(root);

            while let Some(top) = stack.len().checked_sub(1) {
                let advance = {
                    let frame = &mut stack[top];
                    if frame.2 < frame.1.len() {
                        let next = frame.1[frame.2];
                        frame.2 += 1;
                        Some(next)
                    } else {
                        None
                    }
                };

                match advance {
                    Some(next) => {
                        if on_stack.contains(&next) {
                            let start =
                                stack.iter().position(|frame| frame.0 == next).unwrap_or(0);
                            let mut cycle: Vec<PathBuf> = stack[start..]
                                .iter()
                                .map(|frame| self.graph[frame.0].path.clone())
                                .collect();
                            cycle.push(self.graph[next].path.clone());
                            cycles.push(cycle);
                        } else if !visited.contains(&next) {
                            on_stack.insert(next);
                            let neighbors = self.ordered_neighbors(next);
                            stack.push((next, neighbors, 0));
                        }
                    }
                    None => {
                        if let Some((node, _, _)) = stack.pop() {
                            on_stack.remove(&node);
                            visited.insert(node);
                        }
                    }
                }
            }
        }
        cycles
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Lexically join `specifier` onto `dir`, folding `.` and `..` segments.
/// No filesystem access; unresolvable traversal past the root is kept as-is.
pub fn join_normalized(dir: &Path, specifier: &str) -> PathBuf {
    let joined = dir.join(specifier);
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolve a relative specifier: the exact joined path first, then the
/// extension and index-file conventions against the analyzed set. Targets
/// that resolve to nothing keep the bare joined path (a dangling node).
fn resolve_relative(dir: &Path, specifier: &str, analyzed: &HashSet<&Path>) -> PathBuf {
    let base = join_normalized(dir, specifier);
    if analyzed.contains(base.as_path()) {
        return base;
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{ext}", base.display()));
        if analyzed.contains(candidate.as_path()) {
            return candidate;
        }
    }
    for ext in RESOLVE_EXTENSIONS {
        let candidate = base.join(format!("index.{ext}"));
        if analyzed.contains(candidate.as_path()) {
            return candidate;
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImportRecord, RiskLevel, SourcePosition};

    fn import(file: &str, path: &str) -> ImportRecord {
        ImportRecord {
            file: PathBuf::from(file),
            import_path: path.to_string(),
            resolved_path: None,
            imported_names: vec!["x".to_string()],
            is_type_only: false,
            is_default: false,
            is_namespace: false,
            is_dynamic: false,
            position: SourcePosition { line: 1, column: 1 },
            is_framework_essential: false,
            risk_level: RiskLevel::Low,
            is_used: true,
        }
    }

    fn results(files: &[(&str, &[&str])]) -> BTreeMap<PathBuf, AnalysisResult> {
        let mut map = BTreeMap::new();
        for (file, imports) in files {
            let mut result = AnalysisResult::new(PathBuf::from(file));
            result.imports = imports.iter().map(|p| import(file, p)).collect();
            map.insert(PathBuf::from(*file), result);
        }
        map
    }

    #[test]
    fn test_join_normalized_folds_segments() {
        assert_eq!(
            join_normalized(Path::new("/p/src/ui"), "../lib/util"),
            PathBuf::from("/p/src/lib/util")
        );
        assert_eq!(
            join_normalized(Path::new("/p/src"), "./a/./b"),
            PathBuf::from("/p/src/a/b")
        );
    }

    #[test]
    fn test_relative_import_resolves_to_analyzed_file() {
        let map = results(&[("/p/a.ts", &["./b"]), ("/p/b.ts", &[])]);
        let graph = DependencyGraph::build(&map);

        let deps = graph.dependencies_of(Path::new("/p/a.ts"));
        assert_eq!(deps, vec![Path::new("/p/b.ts")]);
    }

    #[test]
    fn test_package_imports_are_excluded() {
        let map = results(&[("/p/a.ts", &["react", "@/lib/db", "./b"]), ("/p/b.ts", &[])]);
        let graph = DependencyGraph::build(&map);

        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.contains(Path::new("react")));
        let deps = graph.dependencies_of(Path::new("/p/a.ts"));
        assert_eq!(deps, vec![Path::new("/p/b.ts")]);
    }

    #[test]
    fn test_dangling_edge_kept_but_not_analyzed() {
        let map = results(&[("/p/a.ts", &["./missing"])]);
        let graph = DependencyGraph::build(&map);

        let deps = graph.dependencies_of(Path::new("/p/a.ts"));
        assert_eq!(deps, vec![Path::new("/p/missing")]);
        assert_eq!(graph.node_count(), 2);
        // Dangling targets contribute no further traversal and no cycles
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn test_index_file_resolution() {
        let map = results(&[("/p/a.ts", &["./ui"]), ("/p/ui/index.ts", &[])]);
        let graph = DependencyGraph::build(&map);

        let deps = graph.dependencies_of(Path::new("/p/a.ts"));
        assert_eq!(deps, vec![Path::new("/p/ui/index.ts")]);
    }

    #[test]
    fn test_triangle_cycle_detected_once() {
        let map = results(&[
            ("/p/a.ts", &["./b"]),
            ("/p/b.ts", &["./c"]),
            ("/p/c.ts", &["./a"]),
        ]);
        let graph = DependencyGraph::build(&map);

        let forward = graph.forward_map();
        assert_eq!(forward[Path::new("/p/a.ts")], vec![PathBuf::from("/p/b.ts")]);
        assert_eq!(forward[Path::new("/p/b.ts")], vec![PathBuf::from("/p/c.ts")]);
        assert_eq!(forward[Path::new("/p/c.ts")], vec![PathBuf::from("/p/a.ts")]);

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1, "one cycle from one DFS root: {cycles:?}");
        let cycle = &cycles[0];
        assert_eq!(cycle.first(), cycle.last(), "cycle closes on its start");
        assert_eq!(cycle.len(), 4);
        for file in ["/p/a.ts", "/p/b.ts", "/p/c.ts"] {
            assert!(cycle.contains(&PathBuf::from(file)), "missing {file}");
        }
    }

    #[test]
    fn test_cycle_edges_are_sound() {
        let map = results(&[
            ("/p/a.ts", &["./b"]),
            ("/p/b.ts", &["./c", "./a"]),
            ("/p/c.ts", &["./a"]),
            ("/p/d.ts", &["./a"]),
        ]);
        let graph = DependencyGraph::build(&map);

        for cycle in graph.find_cycles() {
            for pair in cycle.windows(2) {
                let deps = graph.dependencies_of(&pair[0]);
                assert!(
                    deps.contains(&pair[1].as_path()),
                    "cycle edge {:?} -> {:?} missing from forward graph",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn test_disconnected_components_are_covered() {
        let map = results(&[
            ("/p/a.ts", &["./b"]),
            ("/p/b.ts", &["./a"]),
            ("/p/x.ts", &["./y"]),
            ("/p/y.ts", &["./x"]),
        ]);
        let graph = DependencyGraph::build(&map);

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 2, "both components report a cycle");
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let map = results(&[("/p/a.ts", &["./a"])]);
        let graph = DependencyGraph::build(&map);

        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0],
            vec![PathBuf::from("/p/a.ts"), PathBuf::from("/p/a.ts")]
        );
    }

    #[test]
    fn test_iterative_matches_recursive() {
        let map = results(&[
            ("/p/a.ts", &["./b"]),
            ("/p/b.ts", &["./c"]),
            ("/p/c.ts", &["./a", "./d"]),
            ("/p/d.ts", &[]),
            ("/p/x.ts", &["./x"]),
        ]);
        let graph = DependencyGraph::build(&map);

        assert_eq!(graph.find_cycles(), graph.find_cycles_iterative());
    }

    #[test]
    fn test_transpose_is_exact_reverse() {
        let map = results(&[
            ("/p/a.ts", &["./shared"]),
            ("/p/b.ts", &["./shared"]),
            ("/p/shared.ts", &[]),
        ]);
        let graph = DependencyGraph::build(&map);

        let reverse = graph.transpose();
        let dependents = &reverse[Path::new("/p/shared.ts")];
        assert_eq!(dependents.len(), 2);
        assert!(dependents.contains(&PathBuf::from("/p/a.ts")));
        assert!(dependents.contains(&PathBuf::from("/p/b.ts")));
        assert_eq!(
            graph.dependents_of(Path::new("/p/shared.ts")).len(),
            2,
            "per-node reverse query agrees with the transpose"
        );
    }
}
