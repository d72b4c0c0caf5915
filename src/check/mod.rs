//! Document health checks.
//!
//! A loaded [`Document`] is already structurally sound (unique ids, no
//! dangling references), so the checks here cover the quality layer on
//! top: categories nothing uses, images nothing annotates, degenerate
//! bounding boxes, and dataset-level statistics such as per-category
//! annotation counts and multipolygon frequency.

mod report;

pub use report::{HealthIssue, HealthReport, HealthStats, IssueCode, IssueContext, Severity};

use std::collections::{HashMap, HashSet};

use crate::coco::{CategoryId, Document, ImageId, Segmentation};

/// Options for health check behavior.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    /// If true, treat warnings as failures.
    pub strict: bool,
}

/// Runs every health check over `document` and returns the report.
///
/// Unused categories and annotation-less images are warnings; a bounding
/// box that cannot describe a region (zero area, negative origin,
/// non-finite values) is an error.
pub fn check_document(document: &Document) -> HealthReport {
    let mut report = HealthReport::new(gather_stats(document));

    check_unused_categories(document, &mut report);
    check_images_without_annotations(document, &mut report);
    check_bboxes(document, &mut report);

    report
}

fn gather_stats(document: &Document) -> HealthStats {
    let mut per_category: HashMap<CategoryId, usize> =
        document.categories().iter().map(|c| (c.id, 0)).collect();
    let mut per_image: HashMap<ImageId, usize> =
        document.images().iter().map(|i| (i.id, 0)).collect();
    let mut multipolygon_count = 0usize;

    for annotation in document.annotations() {
        if let Some(count) = per_category.get_mut(&annotation.category_id) {
            *count += 1;
        }
        if let Some(count) = per_image.get_mut(&annotation.image_id) {
            *count += 1;
        }
        if let Segmentation::Polygons(rings) = &annotation.segmentation {
            if rings.len() > 1 {
                multipolygon_count += 1;
            }
        }
    }

    let mut category_counts: Vec<(CategoryId, String, usize)> = document
        .categories()
        .iter()
        .map(|c| (c.id, c.name.clone(), per_category[&c.id]))
        .collect();
    category_counts.sort_by_key(|&(id, _, _)| id);

    let annotations_per_image = if per_image.is_empty() {
        None
    } else {
        let counts: Vec<usize> = per_image.values().copied().collect();
        let min = counts.iter().copied().min().unwrap_or(0);
        let max = counts.iter().copied().max().unwrap_or(0);
        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        Some((min, max, avg))
    };

    HealthStats {
        image_count: document.images().len(),
        annotation_count: document.annotations().len(),
        category_count: document.categories().len(),
        category_counts,
        multipolygon_count,
        annotations_per_image,
    }
}

/// Flags categories that no annotation references.
fn check_unused_categories(document: &Document, report: &mut HealthReport) {
    let used: HashSet<CategoryId> = document
        .annotations()
        .iter()
        .map(|a| a.category_id)
        .collect();

    for category in document.categories() {
        if !used.contains(&category.id) {
            report.add(HealthIssue::warning(
                IssueCode::UnusedCategory,
                format!("Category '{}' is defined but never used", category.name),
                IssueContext::Category {
                    id: category.id.as_u64(),
                },
            ));
        }
    }
}

/// Flags images that carry no annotations.
fn check_images_without_annotations(document: &Document, report: &mut HealthReport) {
    let annotated: HashSet<ImageId> = document.annotations().iter().map(|a| a.image_id).collect();

    for image in document.images() {
        if !annotated.contains(&image.id) {
            report.add(HealthIssue::warning(
                IssueCode::ImageWithoutAnnotations,
                format!("Image '{}' has no annotations", image.file_name),
                IssueContext::Image {
                    id: image.id.as_u64(),
                },
            ));
        }
    }
}

/// Flags bounding boxes that cannot describe a pixel region.
fn check_bboxes(document: &Document, report: &mut HealthReport) {
    for annotation in document.annotations() {
        let [x, y, w, h] = annotation.bbox;
        let context = IssueContext::Annotation {
            id: annotation.id.as_u64(),
        };

        if !x.is_finite() || !y.is_finite() || !w.is_finite() || !h.is_finite() {
            report.add(HealthIssue::error(
                IssueCode::BBoxNotFinite,
                format!("Non-finite bbox [{x}, {y}, {w}, {h}]"),
                context,
            ));
            continue;
        }
        if w <= 0.0 || h <= 0.0 {
            report.add(HealthIssue::error(
                IssueCode::InvalidBBoxArea,
                format!("Invalid dimensions: w={w}, h={h}"),
                context,
            ));
        } else if x < 0.0 || y < 0.0 {
            report.add(HealthIssue::error(
                IssueCode::NegativeBBoxOrigin,
                format!("Negative coordinates: x={x}, y={y}"),
                context,
            ));
        }
    }
}
