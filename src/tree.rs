//! Arena-backed coverage tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. A child
//! stores the index of its parent, so there are no reference cycles and the
//! parent lookup is a plain index.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{CoverageError, Result};
use crate::fraction::Fraction;
use crate::metric::Metric;
use crate::mutation::Mutation;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Level-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container,
    Module { sources: Vec<String> },
    Package,
    File(FileData),
    Class,
    Method { signature: String, line: u32 },
}

impl NodeKind {
    pub fn metric(&self) -> Metric {
        match self {
            NodeKind::Container => Metric::Container,
            NodeKind::Module { .. } => Metric::Module,
            NodeKind::Package => Metric::Package,
            NodeKind::File(_) => Metric::File,
            NodeKind::Class => Metric::Class,
            NodeKind::Method { .. } => Metric::Method,
        }
    }
}

/// Per-line counters of a source file plus the mutations found in it.
///
/// `lines`, `covered` and `missed` are parallel arrays sorted by line number.
#[derive(Debug, Clone, PartialEq)]
pub struct FileData {
    relative_path: Arc<str>,
    lines: Vec<u32>,
    covered: Vec<u32>,
    missed: Vec<u32>,
    mutations: Vec<Mutation>,
}

impl FileData {
    pub fn new(relative_path: Arc<str>) -> Self {
        Self {
            relative_path,
            lines: Vec::new(),
            covered: Vec::new(),
            missed: Vec::new(),
            mutations: Vec::new(),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Insert the counters for `line`, replacing any previous entry.
    pub fn add_counters(&mut self, line: u32, covered: u32, missed: u32) {
        match self.lines.binary_search(&line) {
            Ok(index) => {
                self.covered[index] = covered;
                self.missed[index] = missed;
            }
            Err(index) => {
                self.lines.insert(index, line);
                self.covered.insert(index, covered);
                self.missed.insert(index, missed);
            }
        }
    }

    /// Covered items on `line`; 0 when the line carries no information.
    pub fn covered(&self, line: u32) -> u32 {
        self.lines
            .binary_search(&line)
            .map(|index| self.covered[index])
            .unwrap_or(0)
    }

    /// Missed items on `line`; 0 when the line carries no information.
    pub fn missed(&self, line: u32) -> u32 {
        self.lines
            .binary_search(&line)
            .map(|index| self.missed[index])
            .unwrap_or(0)
    }

    pub fn has_coverage_for(&self, line: u32) -> bool {
        self.lines.binary_search(&line).is_ok()
    }

    /// Line numbers with counters, ascending.
    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    /// `(line, covered, missed)` for every line with counters.
    pub fn counters(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.lines
            .iter()
            .zip(&self.covered)
            .zip(&self.missed)
            .map(|((line, covered), missed)| (*line, *covered, *missed))
    }

    /// Lines whose counters show nothing covered.
    pub fn missed_lines(&self) -> Vec<u32> {
        self.counters()
            .filter(|(_, covered, missed)| *covered == 0 && *missed > 0)
            .map(|(line, _, _)| line)
            .collect()
    }

    /// Lines with some but not all items covered.
    pub fn partially_covered_lines(&self) -> Vec<u32> {
        self.counters()
            .filter(|(_, covered, missed)| *covered > 0 && *missed > 0)
            .map(|(line, _, _)| line)
            .collect()
    }

    pub fn add_mutation(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    values: BTreeMap<Metric, Value>,
}

impl Node {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn metric(&self) -> Metric {
        self.kind.metric()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Values stored directly on this node, in metric order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    pub fn stored_value(&self, metric: Metric) -> Option<&Value> {
        self.values.get(&metric)
    }

    pub fn file(&self) -> Option<&FileData> {
        match &self.kind {
            NodeKind::File(data) => Some(data),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Method { signature, .. } => Some(signature),
            _ => None,
        }
    }

    /// Source line of a method, 0 when unknown or not a method.
    pub fn line_number(&self) -> u32 {
        match &self.kind {
            NodeKind::Method { line, .. } => *line,
            _ => 0,
        }
    }

    fn matches(&self, metric: Metric, name: &str) -> bool {
        self.metric() == metric && self.name == name
    }
}

/// A parsed report: a single root (module or container) and its subtree.
#[derive(Debug, Clone)]
pub struct CoverageTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl CoverageTree {
    pub fn new_module(name: impl Into<String>) -> Self {
        Self::with_root(Node::new(name, NodeKind::Module { sources: Vec::new() }))
    }

    pub fn new_container(name: impl Into<String>) -> Self {
        Self::with_root(Node::new(name, NodeKind::Container))
    }

    fn with_root(root: Node) -> Self {
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn metric(&self, id: NodeId) -> Metric {
        self.node(id).metric()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.node(id).children.is_empty()
    }

    /// A tree without any node below the root.
    pub fn is_empty(&self) -> bool {
        !self.has_children(self.root)
    }

    /// Create a node and append it to `parent`'s children.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name, kind));
        self.attach(parent, id);
        id
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Unlink and return every child of `parent` with the given metric,
    /// keeping the order of the remaining children.
    pub(crate) fn detach_children(&mut self, parent: NodeId, metric: Metric) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.node_mut(parent).children);
        let (detached, kept): (Vec<NodeId>, Vec<NodeId>) = children
            .into_iter()
            .partition(|child| self.nodes[child.0].metric() == metric);
        self.node_mut(parent).children = kept;
        for child in &detached {
            self.node_mut(*child).parent = None;
        }
        detached
    }

    pub(crate) fn rename(&mut self, id: NodeId, name: impl Into<String>) {
        self.node_mut(id).name = name.into();
    }

    /// Fold `source` into `target`: values are added per metric and the
    /// children of `source` are appended to those of `target`. `source` is
    /// left detached and empty.
    pub(crate) fn merge_into(&mut self, target: NodeId, source: NodeId) -> Result<()> {
        let values = std::mem::take(&mut self.node_mut(source).values);
        for value in values.into_values() {
            self.add_value(target, value)?;
        }
        let children = std::mem::take(&mut self.node_mut(source).children);
        for child in children {
            self.attach(target, child);
        }
        self.node_mut(source).parent = None;
        Ok(())
    }

    /// First child of `parent` with the given metric and name.
    pub fn find_child(&self, parent: NodeId, metric: Metric, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.node(*child).matches(metric, name))
    }

    fn find_or_create(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        match self.find_child(parent, kind.metric(), name) {
            Some(existing) => existing,
            None => self.add_child(parent, name, kind),
        }
    }

    pub fn find_or_create_module(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.find_or_create(parent, name, NodeKind::Module { sources: Vec::new() })
    }

    pub fn find_or_create_package(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.find_or_create(parent, name, NodeKind::Package)
    }

    pub fn find_or_create_file(
        &mut self,
        parent: NodeId,
        name: &str,
        relative_path: Arc<str>,
    ) -> NodeId {
        self.find_or_create(parent, name, NodeKind::File(FileData::new(relative_path)))
    }

    pub fn find_or_create_class(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.find_or_create(parent, name, NodeKind::Class)
    }

    /// Methods are identified by name and signature, so overloads stay apart.
    pub fn find_or_create_method(
        &mut self,
        parent: NodeId,
        name: &str,
        signature: &str,
        line: u32,
    ) -> NodeId {
        let existing = self.children(parent).iter().copied().find(|child| {
            let node = self.node(*child);
            node.matches(Metric::Method, name) && node.signature() == Some(signature)
        });
        match existing {
            Some(id) => id,
            None => self.add_child(
                parent,
                name,
                NodeKind::Method {
                    signature: signature.to_string(),
                    line,
                },
            ),
        }
    }

    /// Set the source line of a method that does not know it yet.
    pub(crate) fn set_method_line(&mut self, id: NodeId, line: u32) {
        if let NodeKind::Method { line: current, .. } = &mut self.node_mut(id).kind {
            if *current == 0 {
                *current = line;
            }
        }
    }

    /// Store `value`, or add it to the value already stored for its metric.
    pub fn add_value(&mut self, id: NodeId, value: Value) -> Result<()> {
        if !has_expected_kind(&value) {
            return Err(CoverageError::IncompatibleValues {
                left: value.metric().to_string(),
                right: value.to_string(),
            });
        }
        let values = &mut self.node_mut(id).values;
        let combined = match values.get(&value.metric()) {
            Some(existing) => existing.add(&value)?,
            None => value,
        };
        values.insert(combined.metric(), combined);
        Ok(())
    }

    pub fn add_source(&mut self, module: NodeId, path: impl Into<String>) {
        if let NodeKind::Module { sources } = &mut self.node_mut(module).kind {
            let path = path.into();
            if !sources.contains(&path) {
                sources.push(path);
            }
        }
    }

    pub fn sources(&self, module: NodeId) -> &[String] {
        match &self.node(module).kind {
            NodeKind::Module { sources } => sources,
            _ => &[],
        }
    }

    pub fn file(&self, id: NodeId) -> Option<&FileData> {
        self.node(id).file()
    }

    pub fn file_mut(&mut self, id: NodeId) -> Option<&mut FileData> {
        match &mut self.node_mut(id).kind {
            NodeKind::File(data) => Some(data),
            _ => None,
        }
    }

    /// Record counters on a file node; ignored for any other kind of node.
    pub fn add_counters(&mut self, file: NodeId, line: u32, covered: u32, missed: u32) {
        match self.file_mut(file) {
            Some(data) => data.add_counters(line, covered, missed),
            None => log::warn!("ignoring counters for line {line} on non-file node"),
        }
    }

    /// `id` followed by all its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Every reachable node of the given level.
    pub fn all(&self, metric: Metric) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.metric(*id) == metric)
            .collect()
    }

    pub fn all_files(&self) -> Vec<NodeId> {
        self.all(Metric::File)
    }

    /// First reachable node with the given level and name.
    pub fn find(&self, metric: Metric, name: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.node(*id).matches(metric, name))
    }

    pub fn find_file(&self, relative_path: &str) -> Option<NodeId> {
        self.all_files()
            .into_iter()
            .find(|id| self.file(*id).is_some_and(|f| f.relative_path() == relative_path))
    }

    /// Dotted path for packages, relative path for files, `Parent.name`
    /// style for classes and methods; modules and containers use their name.
    pub fn path(&self, id: NodeId) -> String {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Container | NodeKind::Module { .. } => node.name.clone(),
            NodeKind::File(data) => data.relative_path().to_string(),
            NodeKind::Package => match node.parent.filter(|p| self.metric(*p) == Metric::Package) {
                Some(parent) => format!("{}.{}", self.path(parent), node.name),
                None => node.name.clone(),
            },
            NodeKind::Class | NodeKind::Method { .. } => match node.parent {
                Some(parent) if matches!(self.metric(parent), Metric::Class | Metric::Method) => {
                    format!("{}#{}", self.path(parent), node.name)
                }
                _ => node.name.clone(),
            },
        }
    }

    /// Value of `metric` for the subtree at `id`.
    ///
    /// A value stored on the node wins. Otherwise node levels count covered
    /// descendants of that level, `LOC` counts lines with counters,
    /// `COMPLEXITY_DENSITY` divides complexity by `LOC`, and every other
    /// metric is the sum over the children.
    pub fn value(&self, id: NodeId, metric: Metric) -> Option<Value> {
        let node = self.node(id);
        if let Some(stored) = node.values.get(&metric) {
            return Some(*stored);
        }
        match metric {
            m if m.is_node_level() => self.node_coverage(id, m),
            Metric::Loc => match node.file() {
                Some(data) if !data.lines().is_empty() => {
                    Some(Value::integer(Metric::Loc, data.lines().len() as u64))
                }
                _ => self.sum_children(id, metric),
            },
            Metric::ComplexityDensity => {
                let complexity = self.value(id, Metric::Complexity)?.as_integer()?;
                let loc = self.value(id, Metric::Loc)?.as_integer()?;
                (loc > 0).then(|| Value::fraction(metric, Fraction::from_ratio(complexity, loc)))
            }
            _ => self.sum_children(id, metric),
        }
    }

    fn sum_children(&self, id: NodeId, metric: Metric) -> Option<Value> {
        // add_value only admits each metric's own variant, so sums never mix kinds
        self.children(id)
            .iter()
            .filter_map(|child| self.value(*child, metric))
            .reduce(|total, value| total.add(&value).unwrap_or(total))
    }

    fn node_coverage(&self, id: NodeId, metric: Metric) -> Option<Value> {
        let (covered, missed) = self
            .descendants(id)
            .into_iter()
            .filter(|candidate| self.metric(*candidate) == metric)
            .fold((0, 0), |(covered, missed), candidate| {
                if self.is_covered(candidate) {
                    (covered + 1, missed)
                } else {
                    (covered, missed + 1)
                }
            });
        (covered + missed > 0).then(|| Value::coverage(metric, covered, missed))
    }

    /// Whether the first available of line, instruction or mutation coverage
    /// reports anything covered.
    fn is_covered(&self, id: NodeId) -> bool {
        [Metric::Line, Metric::Instruction, Metric::Mutation]
            .into_iter()
            .find_map(|metric| self.value(id, metric))
            .and_then(|value| value.as_coverage().map(|c| c.covered() > 0))
            .unwrap_or(false)
    }

    /// Every metric that has a value somewhere in the subtree at `id`.
    pub fn metrics(&self, id: NodeId) -> BTreeSet<Metric> {
        let mut metrics = BTreeSet::new();
        for node_id in self.descendants(id) {
            let node = self.node(node_id);
            metrics.insert(node.metric());
            metrics.extend(node.values.keys().copied());
            if node.file().is_some_and(|f| !f.lines().is_empty()) {
                metrics.insert(Metric::Loc);
            }
        }
        if metrics.contains(&Metric::Complexity) && metrics.contains(&Metric::Loc) {
            metrics.insert(Metric::ComplexityDensity);
        }
        metrics
    }

    /// One value per metric present in the subtree, in metric order.
    pub fn aggregate_values(&self, id: NodeId) -> Vec<Value> {
        self.metrics(id)
            .into_iter()
            .filter_map(|metric| self.value(id, metric))
            .collect()
    }
}

fn has_expected_kind(value: &Value) -> bool {
    match value.metric() {
        Metric::Complexity | Metric::Loc => matches!(value, Value::Integer(_)),
        Metric::ComplexityDensity => matches!(value, Value::Fraction(_)),
        _ => matches!(value, Value::Coverage(_)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (CoverageTree, NodeId, NodeId) {
        let mut tree = CoverageTree::new_module("module");
        let root = tree.root();
        let package = tree.find_or_create_package(root, "pkg");
        let file = tree.find_or_create_file(package, "C.java", Arc::from("a/b/C.java"));
        (tree, package, file)
    }

    #[test]
    fn find_or_create_reuses_existing_children() {
        let (mut tree, package, file) = sample();
        let root = tree.root();
        assert_eq!(tree.find_or_create_package(root, "pkg"), package);
        assert_eq!(tree.find_or_create_file(package, "C.java", Arc::from("a/b/C.java")), file);
        assert_eq!(tree.children(root).len(), 1);
        assert_eq!(tree.parent(file), Some(package));
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn methods_are_told_apart_by_signature() {
        let (mut tree, _, file) = sample();
        let class = tree.find_or_create_class(file, "C");
        let a = tree.find_or_create_method(class, "run", "()V", 3);
        let b = tree.find_or_create_method(class, "run", "(I)V", 9);
        assert_ne!(a, b);
        assert_eq!(tree.find_or_create_method(class, "run", "()V", 0), a);
        assert_eq!(tree.node(b).line_number(), 9);
    }

    #[test]
    fn add_value_accumulates() {
        let (mut tree, package, _) = sample();
        tree.add_value(package, Value::coverage(Metric::Line, 1, 0)).unwrap();
        tree.add_value(package, Value::coverage(Metric::Line, 0, 1)).unwrap();
        assert_eq!(
            tree.node(package).stored_value(Metric::Line),
            Some(&Value::coverage(Metric::Line, 1, 1))
        );
    }

    #[test]
    fn add_value_rejects_wrong_variant() {
        let (mut tree, package, _) = sample();
        let result = tree.add_value(package, Value::coverage(Metric::Complexity, 1, 0));
        assert!(matches!(result, Err(CoverageError::IncompatibleValues { .. })));
    }

    #[test]
    fn counters_stay_sorted() {
        let mut data = FileData::new(Arc::from("F.java"));
        for (line, covered, missed) in [(10, 1, 0), (2, 0, 1), (7, 2, 2), (2, 1, 0)] {
            data.add_counters(line, covered, missed);
        }
        assert_eq!(data.lines(), &[2, 7, 10]);
        assert_eq!(data.covered(2), 1);
        assert_eq!(data.missed(2), 0);
        assert_eq!(data.covered(5), 0);
        assert_eq!(data.missed(5), 0);
        assert!(!data.has_coverage_for(5));
        assert_eq!(data.partially_covered_lines(), vec![7]);
        assert!(data.missed_lines().is_empty());
    }

    #[test]
    fn aggregation_prefers_stored_values() {
        let (mut tree, package, file) = sample();
        let class = tree.find_or_create_class(file, "C");
        let method = tree.find_or_create_method(class, "m", "()V", 0);
        tree.add_value(class, Value::coverage(Metric::Line, 3, 1)).unwrap();
        tree.add_value(method, Value::coverage(Metric::Line, 1, 0)).unwrap();
        tree.add_value(class, Value::integer(Metric::Complexity, 2)).unwrap();
        for line in 1..=4 {
            tree.add_counters(file, line, u32::from(line != 4), u32::from(line == 4));
        }

        let root = tree.root();
        assert_eq!(tree.value(root, Metric::Line), Some(Value::coverage(Metric::Line, 3, 1)));
        assert_eq!(
            tree.value(package, Metric::Method),
            Some(Value::coverage(Metric::Method, 1, 0))
        );
        assert_eq!(tree.value(root, Metric::Loc), Some(Value::integer(Metric::Loc, 4)));
        assert_eq!(
            tree.value(root, Metric::ComplexityDensity),
            Some(Value::fraction(Metric::ComplexityDensity, Fraction::new(1, 2).unwrap()))
        );

        let metrics: Vec<Metric> = tree.aggregate_values(root).iter().map(Value::metric).collect();
        assert_eq!(
            metrics,
            vec![
                Metric::Module,
                Metric::Package,
                Metric::File,
                Metric::Class,
                Metric::Method,
                Metric::Line,
                Metric::Complexity,
                Metric::ComplexityDensity,
                Metric::Loc,
            ]
        );
    }

    #[test]
    fn paths() {
        let (mut tree, package, file) = sample();
        let inner = tree.find_or_create_package(package, "inner");
        let class = tree.find_or_create_class(file, "C");
        let method = tree.find_or_create_method(class, "m", "()V", 0);
        assert_eq!(tree.path(inner), "pkg.inner");
        assert_eq!(tree.path(file), "a/b/C.java");
        assert_eq!(tree.path(method), "C#m");
        assert_eq!(tree.find_file("a/b/C.java"), Some(file));
        assert_eq!(tree.find(Metric::Method, "m"), Some(method));
        assert_eq!(tree.all(Metric::Package), vec![package, inner]);
    }
}
