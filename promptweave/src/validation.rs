//! Validation report types shared by static workflow checks

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    /// Blocking structural problem; the workflow must not run
    Error,
    /// Advisory finding; execution is still permitted
    Warning,
}

/// Collected findings from a validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Blocking problems
    pub errors: Vec<String>,
    /// Advisory findings
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the validated workflow may be executed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record an error
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a warning
    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a finding at the given level
    pub fn push(&mut self, level: ValidationLevel, message: impl Into<String>) {
        match level {
            ValidationLevel::Error => self.error(message),
            ValidationLevel::Warning => self.warning(message),
        }
    }
}
