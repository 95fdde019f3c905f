use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoverageError;

/// Outcome PIT reports for a single mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationStatus {
    Killed,
    Survived,
    NoCoverage,
    NonViable,
    TimedOut,
    MemoryError,
    RunError,
}

const STATUS_NAMES: [(MutationStatus, &str); 7] = [
    (MutationStatus::Killed, "KILLED"),
    (MutationStatus::Survived, "SURVIVED"),
    (MutationStatus::NoCoverage, "NO_COVERAGE"),
    (MutationStatus::NonViable, "NON_VIABLE"),
    (MutationStatus::TimedOut, "TIMED_OUT"),
    (MutationStatus::MemoryError, "MEMORY_ERROR"),
    (MutationStatus::RunError, "RUN_ERROR"),
];

impl MutationStatus {
    pub fn as_str(self) -> &'static str {
        STATUS_NAMES[self as usize].1
    }

    /// Non-viable mutants never ran, so they say nothing about the tests.
    pub fn is_valid(self) -> bool {
        self != MutationStatus::NonViable
    }
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationStatus {
    type Err = CoverageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        STATUS_NAMES
            .iter()
            .find(|(_, name)| *name == s.trim())
            .map(|(status, _)| *status)
            .ok_or_else(|| CoverageError::UnknownMutationStatus(s.to_string()))
    }
}

/// One mutation from a PIT report, attached to the file it mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mutation {
    pub detected: bool,
    pub status: MutationStatus,
    pub line: u32,
    pub mutator: String,
    pub description: String,
    pub killing_test: String,
    pub mutated_class: String,
    pub mutated_method: String,
    pub method_signature: String,
}

impl Mutation {
    pub fn new(detected: bool, status: MutationStatus, line: u32) -> Self {
        Self {
            detected,
            status,
            line,
            mutator: String::new(),
            description: String::new(),
            killing_test: String::new(),
            mutated_class: String::new(),
            mutated_method: String::new(),
            method_signature: String::new(),
        }
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }
}
