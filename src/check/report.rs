//! Health report types for structured quality reporting.
//!
//! A [`HealthReport`] carries the issues found by the checks plus the
//! dataset statistics gathered along the way, so one pass over the
//! document serves both the pass/fail decision and the summary output.

use std::fmt;

use crate::coco::CategoryId;

/// The result of health-checking a document.
#[derive(Clone, Debug)]
pub struct HealthReport {
    /// All issues found, in check order.
    pub issues: Vec<HealthIssue>,

    /// Dataset statistics gathered during the checks.
    pub stats: HealthStats,
}

impl HealthReport {
    /// Creates an issue-free report around the gathered statistics.
    pub fn new(stats: HealthStats) -> Self {
        Self {
            issues: Vec::new(),
            stats,
        }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: HealthIssue) {
        self.issues.push(issue);
    }

    /// Returns the number of errors in the report.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Returns the number of warnings in the report.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(
            f,
            "{} image(s), {} annotation(s), {} categorie(s)",
            stats.image_count, stats.annotation_count, stats.category_count
        )?;
        for (id, name, count) in &stats.category_counts {
            writeln!(f, "  category {id} ({name}): {count} annotation(s)")?;
        }
        writeln!(f, "  multipolygon annotations: {}", stats.multipolygon_count)?;
        if let Some((min, max, avg)) = stats.annotations_per_image {
            writeln!(
                f,
                "  annotations per image: min {min}, max {max}, avg {avg:.1}"
            )?;
        }

        if self.issues.is_empty() {
            return writeln!(f, "Health check passed: no issues found");
        }

        writeln!(
            f,
            "Health check found {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// A single health issue (error or warning).
#[derive(Clone, Debug)]
pub struct HealthIssue {
    /// The severity of the issue.
    pub severity: Severity,

    /// A stable code for the issue type.
    pub code: IssueCode,

    /// A human-readable description of the issue.
    pub message: String,

    /// Context about where the issue occurred.
    pub context: IssueContext,
}

impl HealthIssue {
    /// Creates a new error.
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a new warning.
    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a health issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Suspicious but usable data.
    Warning,
    /// Data no downstream consumer can interpret sensibly.
    Error,
}

/// A stable code identifying the type of health issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueCode {
    /// A category is defined but no annotation references it.
    UnusedCategory,
    /// An image carries no annotations.
    ImageWithoutAnnotations,
    /// A bounding box has zero or negative width or height.
    InvalidBBoxArea,
    /// A bounding box origin lies outside the raster.
    NegativeBBoxOrigin,
    /// A bounding box has non-finite coordinates.
    BBoxNotFinite,
}

/// Context about where a health issue occurred.
#[derive(Clone, Debug)]
pub enum IssueContext {
    /// Issue with a specific image.
    Image { id: u64 },
    /// Issue with a specific annotation.
    Annotation { id: u64 },
    /// Issue with a specific category.
    Category { id: u64 },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Image { id } => write!(f, "image {id}"),
            IssueContext::Annotation { id } => write!(f, "annotation {id}"),
            IssueContext::Category { id } => write!(f, "category {id}"),
        }
    }
}

/// Dataset statistics gathered by the health checks.
#[derive(Clone, Debug)]
pub struct HealthStats {
    pub image_count: usize,
    pub annotation_count: usize,
    pub category_count: usize,

    /// `(id, name, annotation count)` per category, sorted by id.
    pub category_counts: Vec<(CategoryId, String, usize)>,

    /// Annotations whose segmentation holds more than one ring.
    pub multipolygon_count: usize,

    /// `(min, max, avg)` annotations per image; `None` without images.
    pub annotations_per_image: Option<(usize, usize, f64)>,
}
