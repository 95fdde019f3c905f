//! Diagnostic sink handed to every parse.
//!
//! Messages are kept for the caller and mirrored to the `log` facade.

use std::fmt;

const DEFAULT_MAX_ERRORS: usize = 20;

#[derive(Debug, Clone)]
pub struct FilteredLog {
    title: String,
    max_errors: usize,
    infos: Vec<String>,
    errors: Vec<String>,
    skipped_errors: usize,
}

impl FilteredLog {
    /// `title` heads the error section, e.g. "Errors while parsing coverage:".
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_max_errors(title, DEFAULT_MAX_ERRORS)
    }

    pub fn with_max_errors(title: impl Into<String>, max_errors: usize) -> Self {
        Self {
            title: title.into(),
            max_errors,
            infos: Vec::new(),
            errors: Vec::new(),
            skipped_errors: 0,
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.infos.push(message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        if self.errors.len() < self.max_errors {
            self.errors.push(message);
        } else {
            self.skipped_errors += 1;
        }
    }

    pub fn info_messages(&self) -> &[String] {
        &self.infos
    }

    /// Stored errors, headed by the title and followed by a note about
    /// errors that exceeded the cap.
    pub fn error_messages(&self) -> Vec<String> {
        if self.errors.is_empty() {
            return Vec::new();
        }
        let mut messages = Vec::with_capacity(self.errors.len() + 2);
        messages.push(self.title.clone());
        messages.extend(self.errors.iter().cloned());
        if self.skipped_errors > 0 {
            messages.push(format!(
                "  ... skipped logging of {} additional errors ...",
                self.skipped_errors
            ));
        }
        messages
    }

    pub fn error_count(&self) -> usize {
        self.errors.len() + self.skipped_errors
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

impl Default for FilteredLog {
    fn default() -> Self {
        Self::new("Errors while parsing report:")
    }
}

impl fmt::Display for FilteredLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.infos.iter().chain(self.error_messages().iter()) {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
