//! Annotation building: labeled masks to COCO annotations.
//!
//! One annotation is built per distinct positive label; a label whose
//! region falls into several blobs (or has holes) still yields a single
//! annotation with multiple rings. Labels are processed in ascending
//! numeric order so output ordering is stable across runs.

use std::collections::BTreeMap;
use std::fmt;

use crate::coco::{
    Annotation, AnnotationId, CategoryId, CategorySet, Document, Image, ImageId, Info,
    Segmentation,
};
use crate::error::CocomaskError;
use crate::geometry;
use crate::mask::Mask;

/// Options for mask conversion.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    /// Connected components smaller than this many pixels are dropped.
    /// 0 (the default) keeps everything and preserves exact round-trips.
    pub min_area: usize,
}

/// Builds the annotations for every labeled instance in `mask`.
///
/// `category_map` maps mask labels to category ids; a label without an
/// entry fails the whole mask with [`CocomaskError::UnknownCategory`]
/// rather than being silently dropped. Annotation ids are assigned
/// sequentially starting at `next_annotation_id`.
pub fn build_annotations(
    mask: &Mask,
    image_id: ImageId,
    category_map: &BTreeMap<u32, CategoryId>,
    next_annotation_id: u64,
    options: &ConvertOptions,
) -> Result<Vec<Annotation>, CocomaskError> {
    let mut annotations = Vec::new();
    let mut annotation_id = next_annotation_id;

    for label in mask.labels() {
        let category_id = *category_map
            .get(&label)
            .ok_or(CocomaskError::UnknownCategory { label })?;

        let rings = geometry::extract_filtered(mask, label, options.min_area)?;
        if rings.is_empty() {
            // Every component fell under the min_area threshold.
            continue;
        }

        let bbox = geometry::bbox(&rings);
        let area = geometry::polygon_area(&rings);
        let segmentation =
            Segmentation::Polygons(rings.iter().map(geometry::Ring::to_flat).collect());

        annotations.push(Annotation::new(
            AnnotationId::new(annotation_id),
            image_id,
            category_id,
            segmentation,
            bbox,
            area,
        ));
        annotation_id += 1;
    }

    Ok(annotations)
}

/// The outcome of converting one mask within a batch.
#[derive(Debug)]
pub struct ConvertUnit {
    pub file_name: String,
    pub result: Result<usize, CocomaskError>,
}

/// Per-unit results of a batch conversion.
#[derive(Debug, Default)]
pub struct ConvertReport {
    pub units: Vec<ConvertUnit>,
}

impl ConvertReport {
    pub fn failed_count(&self) -> usize {
        self.units.iter().filter(|u| u.result.is_err()).count()
    }

    pub fn is_ok(&self) -> bool {
        self.failed_count() == 0
    }

    /// Total annotations across successful units.
    pub fn annotation_count(&self) -> usize {
        self.units
            .iter()
            .filter_map(|u| u.result.as_ref().ok())
            .sum()
    }
}

impl fmt::Display for ConvertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            match &unit.result {
                Ok(count) => writeln!(f, "ok   {}: {} annotation(s)", unit.file_name, count)?,
                Err(e) => writeln!(f, "FAIL {}: {}", unit.file_name, e)?,
            }
        }
        writeln!(
            f,
            "{} mask(s) converted, {} failed, {} annotation(s) total",
            self.units.len() - self.failed_count(),
            self.failed_count(),
            self.annotation_count()
        )
    }
}

/// A converted batch: the assembled document plus the per-unit report.
#[derive(Debug)]
pub struct ConvertOutcome {
    pub document: Document,
    pub report: ConvertReport,
}

/// Converts a batch of named masks into one COCO document.
///
/// Mask labels are taken as category ids directly (the label-value-derived
/// mapping); labels outside the category set fail their mask's unit.
/// Image ids follow input order starting at 1; a failed mask keeps its
/// slot so sibling ids are unaffected. Annotation ids are contiguous
/// across the batch in unit order.
pub fn convert_masks(
    masks: &[(String, Mask)],
    categories: &CategorySet,
    options: &ConvertOptions,
) -> Result<ConvertOutcome, CocomaskError> {
    let mut images = Vec::new();
    let mut annotations = Vec::new();
    let mut report = ConvertReport::default();
    let mut next_annotation_id = 1u64;

    for (index, (file_name, mask)) in masks.iter().enumerate() {
        let image_id = ImageId::new(index as u64 + 1);
        let category_map: BTreeMap<u32, CategoryId> = mask
            .labels()
            .into_iter()
            .filter(|&label| categories.contains_id(CategoryId::new(label as u64)))
            .map(|label| (label, CategoryId::new(label as u64)))
            .collect();

        let result = build_annotations(mask, image_id, &category_map, next_annotation_id, options);
        match result {
            Ok(mask_annotations) => {
                let count = mask_annotations.len();
                next_annotation_id += count as u64;
                images.push(Image::new(
                    image_id,
                    file_name.clone(),
                    mask.width(),
                    mask.height(),
                ));
                annotations.extend(mask_annotations);
                report.units.push(ConvertUnit {
                    file_name: file_name.clone(),
                    result: Ok(count),
                });
            }
            Err(e) => {
                report.units.push(ConvertUnit {
                    file_name: file_name.clone(),
                    result: Err(e),
                });
            }
        }
    }

    let info = Info {
        description: Some("Converted Dataset".to_string()),
        version: Some("1.0".to_string()),
        contributor: Some("cocomask".to_string()),
        ..Info::default()
    };
    let document = Document::new(info, images, annotations, categories.categories().to_vec())?;

    Ok(ConvertOutcome { document, report })
}
