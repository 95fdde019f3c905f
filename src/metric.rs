//! The closed set of coverage and quality dimensions a tree can carry.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoverageError;

/// Whether growth of a metric is an improvement or a regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tendency {
    LargerIsBetter,
    SmallerIsBetter,
}

/// A coverage dimension. The declaration order is the total order used for
/// sorting: node levels first, then counters, then software metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    Container,
    Module,
    Package,
    File,
    Class,
    Method,
    Line,
    Branch,
    Instruction,
    Mutation,
    Complexity,
    ComplexityDensity,
    Loc,
}

struct MetricInfo {
    metric: Metric,
    key: &'static str,
    display: &'static str,
    tendency: Tendency,
}

const METRICS: [MetricInfo; 13] = [
    MetricInfo {
        metric: Metric::Container,
        key: "CONTAINER",
        display: "Container Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Module,
        key: "MODULE",
        display: "Module Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Package,
        key: "PACKAGE",
        display: "Package Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::File,
        key: "FILE",
        display: "File Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Class,
        key: "CLASS",
        display: "Class Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Method,
        key: "METHOD",
        display: "Method Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Line,
        key: "LINE",
        display: "Line Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Branch,
        key: "BRANCH",
        display: "Branch Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Instruction,
        key: "INSTRUCTION",
        display: "Instruction Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Mutation,
        key: "MUTATION",
        display: "Mutation Coverage",
        tendency: Tendency::LargerIsBetter,
    },
    MetricInfo {
        metric: Metric::Complexity,
        key: "COMPLEXITY",
        display: "Cyclomatic Complexity",
        tendency: Tendency::SmallerIsBetter,
    },
    MetricInfo {
        metric: Metric::ComplexityDensity,
        key: "COMPLEXITY_DENSITY",
        display: "Complexity Density",
        tendency: Tendency::SmallerIsBetter,
    },
    MetricInfo {
        metric: Metric::Loc,
        key: "LOC",
        display: "Lines of Code",
        tendency: Tendency::SmallerIsBetter,
    },
];

impl Metric {
    /// Every metric, in order.
    pub fn all() -> impl Iterator<Item = Metric> {
        METRICS.iter().map(|info| info.metric)
    }

    fn info(self) -> &'static MetricInfo {
        &METRICS[self as usize]
    }

    pub fn tendency(self) -> Tendency {
        self.info().tendency
    }

    /// Stable upper-case key used in the textual value form.
    pub fn key(self) -> &'static str {
        self.info().key
    }

    /// Human readable label.
    pub fn display_name(self) -> &'static str {
        self.info().display
    }

    /// Metrics that name a level of the tree rather than a measured counter.
    pub fn is_node_level(self) -> bool {
        matches!(
            self,
            Metric::Container
                | Metric::Module
                | Metric::Package
                | Metric::File
                | Metric::Class
                | Metric::Method
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = CoverageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        METRICS
            .iter()
            .find(|info| info.key == wanted)
            .map(|info| info.metric)
            .ok_or_else(|| CoverageError::InvalidValue(s.to_string()))
    }
}
