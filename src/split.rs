//! Restructuring of flat package lists into a package hierarchy.

use crate::error::Result;
use crate::metric::Metric;
use crate::tree::{CoverageTree, NodeId};

impl CoverageTree {
    /// Replace every dotted package directly below `module` (`a.b.c`) with a
    /// chain of single-segment packages (`a` → `b` → `c`).
    ///
    /// The original node becomes the last link of its chain and keeps its
    /// children and values. A package whose name collides with an existing
    /// sibling is merged into it: values are added per metric and children
    /// are appended after the existing ones. Running this again on a split
    /// module changes nothing.
    pub fn split_packages(&mut self, module: NodeId) -> Result<()> {
        let packages = self.detach_children(module, Metric::Package);
        log::debug!("splitting {} packages of '{}'", packages.len(), self.name(module));
        for package in packages {
            let name = self.name(package).to_string();
            let segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
            let mut parent = module;
            if let Some((leaf, prefix)) = segments.split_last() {
                for segment in prefix {
                    parent = self.find_or_create_package(parent, segment);
                }
                self.rename(package, *leaf);
            }
            self.merge_single_package(parent, package)?;
        }
        Ok(())
    }

    /// Split the packages of every module in the tree.
    pub fn split_all_packages(&mut self) -> Result<()> {
        for module in self.all(Metric::Module) {
            self.split_packages(module)?;
        }
        Ok(())
    }

    fn merge_single_package(&mut self, parent: NodeId, package: NodeId) -> Result<()> {
        let existing = self.find_child(parent, Metric::Package, self.name(package));
        match existing {
            Some(existing) => self.merge_into(existing, package),
            None => {
                self.attach(parent, package);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metric::Metric;
    use crate::tree::CoverageTree;
    use crate::value::Value;

    fn names(tree: &CoverageTree, ids: &[crate::tree::NodeId]) -> Vec<String> {
        ids.iter().map(|id| tree.name(*id).to_string()).collect()
    }

    #[test]
    fn shared_prefix_becomes_one_package() {
        let mut tree = CoverageTree::new_module("m");
        let root = tree.root();
        tree.find_or_create_package(root, "a.b");
        tree.find_or_create_package(root, "a.c");

        tree.split_packages(root).unwrap();

        assert_eq!(names(&tree, tree.children(root)), vec!["a"]);
        let a = tree.children(root)[0];
        assert_eq!(names(&tree, tree.children(a)), vec!["b", "c"]);
        assert_eq!(tree.path(tree.children(a)[1]), "a.c");
    }

    #[test]
    fn collisions_merge_values_and_children() {
        let mut tree = CoverageTree::new_module("m");
        let root = tree.root();
        let dotted = tree.find_or_create_package(root, "a.b");
        tree.find_or_create_file(dotted, "X.java", Arc::from("a/b/X.java"));
        tree.add_value(dotted, Value::coverage(Metric::Line, 1, 1)).unwrap();
        let plain = tree.find_or_create_package(root, "a");
        let inner = tree.add_child(plain, "b", crate::tree::NodeKind::Package);
        tree.find_or_create_file(inner, "Y.java", Arc::from("a/b/Y.java"));
        tree.add_value(plain, Value::coverage(Metric::Branch, 2, 0)).unwrap();

        tree.split_packages(root).unwrap();

        assert_eq!(names(&tree, tree.children(root)), vec!["a"]);
        let a = tree.children(root)[0];
        assert_eq!(
            tree.node(a).stored_value(Metric::Branch),
            Some(&Value::coverage(Metric::Branch, 2, 0))
        );
        // the existing "b" below "a" keeps its children, the merged "b"
        // from the original plain package is appended after
        let b_nodes: Vec<_> = tree
            .children(a)
            .iter()
            .copied()
            .filter(|id| tree.name(*id) == "b")
            .collect();
        assert_eq!(b_nodes.len(), 2);
        assert_eq!(tree.all_files().len(), 2);
    }

    #[test]
    fn splitting_is_idempotent() {
        let mut tree = CoverageTree::new_module("m");
        let root = tree.root();
        for name in ["com.example.app", "com.example.util", "org", "com"] {
            let package = tree.find_or_create_package(root, name);
            let path = Arc::from(format!("{name}/F.java").as_str());
            tree.find_or_create_file(package, "F.java", path);
        }

        tree.split_packages(root).unwrap();
        let once: Vec<String> = tree.descendants(root).iter().map(|id| tree.path(*id)).collect();
        tree.split_packages(root).unwrap();
        let twice: Vec<String> = tree.descendants(root).iter().map(|id| tree.path(*id)).collect();

        assert_eq!(once, twice);
        assert_eq!(tree.all_files().len(), 4);
        assert_eq!(names(&tree, tree.children(root)), vec!["com", "org"]);
    }
}
