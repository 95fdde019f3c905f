mod common;

use covtree::diagnostics::FilteredLog;
use covtree::error::CoverageError;
use covtree::interner::PathInterner;
use covtree::metric::Metric;
use covtree::parsers::cobertura::{self, CoberturaParser};
use covtree::parsers::{CoverageParser, ProcessingMode};
use covtree::value::Value;

#[test]
fn single_class_document() {
    let xml = br#"<?xml version="1.0"?>
<coverage>
  <packages>
    <package name="pkg">
      <classes>
        <class name="C" filename="a/b/C.java">
          <lines>
            <line number="1" hits="1"/>
            <line number="2" hits="0"/>
          </lines>
        </class>
      </classes>
    </package>
  </packages>
</coverage>"#;
    let tree = cobertura::parse(xml).unwrap();

    assert_eq!(tree.all(Metric::Package).len(), 1);
    assert_eq!(tree.all_files().len(), 1);
    let file = tree.find_file("a/b/C.java").unwrap();
    assert_eq!(common::counts(&tree, file, Metric::Line), (1, 1));
    assert_eq!(common::counts(&tree, tree.root(), Metric::Line), (1, 1));
}

#[test]
fn absolute_file_names_become_relative() {
    let xml = br#"<coverage>
  <sources><source>/work/src/</source></sources>
  <packages><package name="p"><classes>
    <class name="p.C" filename="/p//C.java"><lines><line number="1" hits="1"/></lines></class>
  </classes></package></packages>
</coverage>"#;
    let tree = cobertura::parse(xml).unwrap();

    assert_eq!(tree.sources(tree.root()), ["/work/src".to_string()]);
    let file = tree.find_file("p/C.java").unwrap();
    assert_eq!(tree.file(file).unwrap().relative_path(), "p/C.java");
}

#[test]
fn document_without_packages_has_no_data() {
    let xml = br#"<?xml version="1.0"?><coverage><sources><source>src</source></sources><packages/></coverage>"#;
    let err = cobertura::parse(xml).unwrap_err();
    assert!(matches!(err, CoverageError::NoData { .. }));
    assert_eq!(err.to_string(), "No coverage information found in the report");
}

#[test]
fn ignore_errors_returns_empty_tree() {
    let xml = b"<coverage><packages/></coverage>";
    let mut log = FilteredLog::default();
    let tree = CoberturaParser::new(ProcessingMode::IgnoreErrors)
        .parse(&mut &xml[..], &mut PathInterner::new(), &mut log)
        .unwrap();
    assert!(tree.is_empty());
    assert_eq!(log.error_count(), 1);
}

#[test]
fn fixture_values() {
    let tree = cobertura::parse(common::COBERTURA).unwrap();
    let root = tree.root();

    assert_eq!(tree.sources(root), ["/home/build/project/src/main/java".to_string()]);
    assert_eq!(common::counts(&tree, root, Metric::Line), (6, 3));
    assert_eq!(common::counts(&tree, root, Metric::Branch), (2, 2));
    assert_eq!(common::counts(&tree, root, Metric::Method), (2, 0));
    assert_eq!(common::counts(&tree, root, Metric::Package), (2, 0));
    assert_eq!(tree.value(root, Metric::Complexity), Some(Value::integer(Metric::Complexity, 5)));
    assert_eq!(tree.value(root, Metric::Loc), Some(Value::integer(Metric::Loc, 9)));
    assert_eq!(
        tree.value(root, Metric::ComplexityDensity).unwrap().to_string(),
        "COMPLEXITY_DENSITY: 5/9"
    );

    let find = tree.find(Metric::Method, "find").unwrap();
    assert_eq!(tree.node(find).line_number(), 20);
    assert_eq!(common::counts(&tree, find, Metric::Line), (1, 1));
    assert_eq!(tree.value(find, Metric::Complexity), Some(Value::integer(Metric::Complexity, 3)));
    assert_eq!(tree.path(find), "edu.hm.hafner.coverage.Node#find");
}

#[test]
fn file_counters_come_from_class_lines() {
    let tree = cobertura::parse(common::COBERTURA).unwrap();
    let file = tree.find_file("edu/hm/hafner/coverage/Node.java").unwrap();
    let data = tree.file(file).unwrap();

    assert_eq!(data.lines(), &[10, 20, 21, 22, 23]);
    assert_eq!((data.covered(20), data.missed(20)), (1, 1));
    assert_eq!(data.missed_lines(), vec![21, 23]);
    assert_eq!(data.partially_covered_lines(), vec![20]);
    assert_eq!((data.covered(99), data.missed(99)), (0, 0));
}

#[test]
fn line_totals_match_file_counters() {
    // without branches, every counter entry is one line
    let xml = br#"<coverage><packages>
        <package name="a"><classes>
            <class name="a.A" filename="a/A.java"><lines>
                <line number="1" hits="2"/><line number="2" hits="0"/><line number="5" hits="1"/>
            </lines></class>
        </classes></package>
        <package name="b"><classes>
            <class name="b.B" filename="b/B.java"><lines>
                <line number="3" hits="0"/><line number="4" hits="0"/>
            </lines></class>
        </classes></package>
    </packages></coverage>"#;
    let tree = cobertura::parse(xml).unwrap();

    let (covered, missed) = tree
        .all_files()
        .into_iter()
        .flat_map(|file| tree.file(file).unwrap().counters().collect::<Vec<_>>())
        .fold((0u64, 0u64), |(c, m), (_, covered, missed)| {
            (c + u64::from(covered), m + u64::from(missed))
        });
    assert_eq!(common::counts(&tree, tree.root(), Metric::Line), (covered, missed));
}

#[test]
fn large_branch_counts_saturate() {
    let xml = br#"<coverage><packages>
        <package name="p"><classes>
            <class name="p.Big" filename="p/Big.java"><lines>
                <line number="1" hits="18446744073709551615" branch="true"
                      condition-coverage="100% (18446744073709551615/18446744073709551615)"/>
                <line number="4294967295" hits="1" branch="true" condition-coverage="100% (1/1)"/>
            </lines></class>
        </classes></package>
    </packages></coverage>"#;
    let tree = cobertura::parse(xml).unwrap();

    let class = tree.find(Metric::Class, "p.Big").unwrap();
    assert_eq!(common::counts(&tree, class, Metric::Line), (2, 0));
    assert_eq!(common::counts(&tree, class, Metric::Branch), (u64::MAX, 0));
    assert_eq!(common::counts(&tree, tree.root(), Metric::Branch), (u64::MAX, 0));

    // per-line counters are 32 bit
    let data = tree.file(tree.find_file("p/Big.java").unwrap()).unwrap();
    assert_eq!((data.covered(1), data.missed(1)), (u32::MAX, 0));
    assert_eq!((data.covered(u32::MAX), data.missed(u32::MAX)), (1, 0));
}

#[test]
fn malformed_xml_fails_with_position() {
    let xml = b"<coverage><packages><package name=\"p\"></packages></coverage>";
    let err = cobertura::parse(xml).unwrap_err();
    assert!(matches!(err, CoverageError::Xml { .. }), "unexpected error {err:?}");
}
