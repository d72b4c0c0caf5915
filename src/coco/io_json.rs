//! COCO JSON reader and writer.
//!
//! The wire schema is the standard COCO subset: a top-level object with
//! `images`, `annotations`, and `categories` arrays plus an optional
//! `info` block. Parsing is permissive about optional fields, then the
//! result is funneled through [`Document::new`] so structural problems
//! surface here, once, instead of deep inside a conversion.
//!
//! # Deterministic Output
//!
//! The writer sorts every list by ID. This ensures reproducible output
//! and meaningful diffs. Because reconstruction composites annotations
//! in document order, sorting also means that for an externally-authored
//! file whose annotation order differs from its id order, a write/read
//! cycle re-establishes id order as the painter's order. Documents
//! produced by this crate always assign ids in document order, so the
//! sort is a no-op for them.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{Annotation, Category, Document, Image, Info, Segmentation};
use super::{AnnotationId, CategoryId, ImageId};
use crate::error::CocomaskError;

// ============================================================================
// Wire Schema Types (internal to this module)
// ============================================================================

/// Top-level COCO document structure as found on disk.
#[derive(Debug, Serialize, Deserialize)]
struct WireDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<Info>,

    /// Accepted on read for schema compatibility; always written empty.
    #[serde(default)]
    licenses: Vec<serde_json::Value>,

    images: Vec<Image>,

    annotations: Vec<WireAnnotation>,

    categories: Vec<Category>,
}

/// COCO annotation entry with the optional fields real-world files omit.
#[derive(Debug, Serialize, Deserialize)]
struct WireAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    #[serde(default = "empty_polygons")]
    segmentation: Segmentation,

    bbox: [f64; 4],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    iscrowd: Option<u8>,
}

fn empty_polygons() -> Segmentation {
    Segmentation::Polygons(Vec::new())
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a validated document from a COCO JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the
/// document violates a structural invariant (duplicate ids, dangling
/// references).
pub fn read_coco_json(path: &Path) -> Result<Document, CocomaskError> {
    let file = File::open(path).map_err(CocomaskError::Io)?;
    let reader = BufReader::new(file);

    let wire: WireDocument =
        serde_json::from_reader(reader).map_err(|source| CocomaskError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    wire_to_document(wire)
}

/// Writes a document to a COCO JSON file.
///
/// The output is deterministic: all lists are sorted by ID.
pub fn write_coco_json(path: &Path, document: &Document) -> Result<(), CocomaskError> {
    let file = File::create(path).map_err(CocomaskError::Io)?;
    let writer = BufWriter::new(file);

    let wire = document_to_wire(document);

    serde_json::to_writer_pretty(writer, &wire).map_err(|source| CocomaskError::CocoJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a validated document from a COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_str(json: &str) -> Result<Document, CocomaskError> {
    let wire: WireDocument =
        serde_json::from_str(json).map_err(|source| CocomaskError::CocoJsonParse {
            path: "<string>".into(),
            source,
        })?;
    wire_to_document(wire)
}

/// Writes a document to a COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn to_coco_string(document: &Document) -> Result<String, serde_json::Error> {
    let wire = document_to_wire(document);
    serde_json::to_string_pretty(&wire)
}

// ============================================================================
// Conversion: wire <-> model
// ============================================================================

fn wire_to_document(wire: WireDocument) -> Result<Document, CocomaskError> {
    let annotations = wire
        .annotations
        .into_iter()
        .map(|ann| {
            // Missing area falls back to the bbox area, the closest
            // consistent value available without rasterizing.
            let area = ann.area.unwrap_or(ann.bbox[2] * ann.bbox[3]);
            Annotation {
                id: AnnotationId::new(ann.id),
                image_id: ImageId::new(ann.image_id),
                category_id: CategoryId::new(ann.category_id),
                segmentation: ann.segmentation,
                area,
                bbox: ann.bbox,
                iscrowd: ann.iscrowd.unwrap_or(0),
            }
        })
        .collect();

    Document::new(
        wire.info.unwrap_or_default(),
        wire.images,
        annotations,
        wire.categories,
    )
}

fn document_to_wire(document: &Document) -> WireDocument {
    let mut images = document.images().to_vec();
    images.sort_by_key(|i| i.id);

    let mut categories = document.categories().to_vec();
    categories.sort_by_key(|c| c.id);

    let mut annotations: Vec<WireAnnotation> = document
        .annotations()
        .iter()
        .map(|ann| WireAnnotation {
            id: ann.id.as_u64(),
            image_id: ann.image_id.as_u64(),
            category_id: ann.category_id.as_u64(),
            segmentation: ann.segmentation.clone(),
            bbox: ann.bbox,
            area: Some(ann.area),
            iscrowd: Some(ann.iscrowd),
        })
        .collect();
    annotations.sort_by_key(|a| a.id);

    WireDocument {
        info: Some(document.info().clone()),
        licenses: Vec::new(),
        images,
        annotations,
        categories,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_coco_json() -> &'static str {
        r#"{
            "info": {
                "description": "Converted Dataset",
                "version": "1.0",
                "year": 2024
            },
            "licenses": [],
            "images": [
                {"id": 1, "width": 16, "height": 16, "file_name": "mask001.png"}
            ],
            "categories": [
                {"id": 1, "name": "cell", "supercategory": "tissue"}
            ],
            "annotations": [
                {
                    "id": 1,
                    "image_id": 1,
                    "category_id": 1,
                    "segmentation": [[2.0, 2.0, 6.0, 2.0, 6.0, 6.0, 2.0, 6.0]],
                    "bbox": [2.0, 2.0, 4.0, 4.0],
                    "area": 16.0,
                    "iscrowd": 0
                }
            ]
        }"#
    }

    #[test]
    fn test_parse_basic() {
        let doc = from_coco_str(sample_coco_json()).expect("parse failed");

        assert_eq!(doc.images().len(), 1);
        assert_eq!(doc.categories().len(), 1);
        assert_eq!(doc.annotations().len(), 1);
        assert_eq!(doc.info().version.as_deref(), Some("1.0"));

        let img = &doc.images()[0];
        assert_eq!(img.id.as_u64(), 1);
        assert_eq!(img.file_name, "mask001.png");
        assert_eq!(img.width, 16);

        let cat = &doc.categories()[0];
        assert_eq!(cat.name, "cell");
        assert_eq!(cat.supercategory.as_deref(), Some("tissue"));

        let ann = &doc.annotations()[0];
        assert_eq!(ann.area, 16.0);
        assert_eq!(ann.bbox, [2.0, 2.0, 4.0, 4.0]);
        assert_eq!(ann.segmentation.polygons().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_area_and_iscrowd_default() {
        let json = r#"{
            "images": [{"id": 1, "width": 8, "height": 8, "file_name": "m.png"}],
            "categories": [{"id": 1, "name": "cell"}],
            "annotations": [{
                "id": 1, "image_id": 1, "category_id": 1,
                "segmentation": [[0.0, 0.0, 2.0, 0.0, 2.0, 3.0, 0.0, 3.0]],
                "bbox": [0.0, 0.0, 2.0, 3.0]
            }]
        }"#;
        let doc = from_coco_str(json).unwrap();
        let ann = &doc.annotations()[0];
        assert_eq!(ann.area, 6.0);
        assert_eq!(ann.iscrowd, 0);
    }

    #[test]
    fn test_rle_segmentation_passthrough() {
        let json = r#"{
            "images": [{"id": 1, "width": 4, "height": 4, "file_name": "m.png"}],
            "categories": [{"id": 1, "name": "crowd"}],
            "annotations": [{
                "id": 1, "image_id": 1, "category_id": 1,
                "segmentation": {"size": [4, 4], "counts": [0, 16]},
                "bbox": [0.0, 0.0, 4.0, 4.0],
                "area": 16.0,
                "iscrowd": 1
            }]
        }"#;
        let doc = from_coco_str(json).unwrap();
        let ann = &doc.annotations()[0];
        assert!(ann.segmentation.polygons().is_none());
        assert_eq!(ann.iscrowd, 1);

        // Round-trip keeps the RLE object intact.
        let out = to_coco_string(&doc).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["annotations"][0]["segmentation"]["counts"][1], 16);
    }

    #[test]
    fn test_dangling_reference_rejected_on_load() {
        let json = r#"{
            "images": [{"id": 1, "width": 8, "height": 8, "file_name": "m.png"}],
            "categories": [{"id": 1, "name": "cell"}],
            "annotations": [{
                "id": 1, "image_id": 99, "category_id": 1,
                "segmentation": [],
                "bbox": [0.0, 0.0, 1.0, 1.0],
                "area": 1.0
            }]
        }"#;
        let err = from_coco_str(json).unwrap_err();
        assert!(matches!(
            err,
            CocomaskError::DanglingReference { referenced_id: 99, .. }
        ));
    }

    #[test]
    fn test_deterministic_output_sorted_by_id() {
        use crate::coco::model::Segmentation;

        let doc = Document::new(
            Info::default(),
            vec![
                Image::new(3u64, "c.png", 4, 4),
                Image::new(1u64, "a.png", 4, 4),
                Image::new(2u64, "b.png", 4, 4),
            ],
            vec![
                Annotation::new(
                    2u64,
                    1u64,
                    1u64,
                    Segmentation::Polygons(vec![]),
                    [0.0, 0.0, 1.0, 1.0],
                    1.0,
                ),
                Annotation::new(
                    1u64,
                    1u64,
                    1u64,
                    Segmentation::Polygons(vec![]),
                    [0.0, 0.0, 1.0, 1.0],
                    1.0,
                ),
            ],
            vec![Category::new(2u64, "b"), Category::new(1u64, "a")],
        )
        .unwrap();

        let json = to_coco_string(&doc).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["images"][0]["id"], 1);
        assert_eq!(parsed["images"][1]["id"], 2);
        assert_eq!(parsed["images"][2]["id"], 3);
        assert_eq!(parsed["categories"][0]["id"], 1);
        assert_eq!(parsed["categories"][1]["id"], 2);
        assert_eq!(parsed["annotations"][0]["id"], 1);
        assert_eq!(parsed["annotations"][1]["id"], 2);
    }

    #[test]
    fn test_roundtrip_preserves_annotations() {
        let original = from_coco_str(sample_coco_json()).unwrap();
        let json = to_coco_string(&original).unwrap();
        let restored = from_coco_str(&json).unwrap();

        assert_eq!(original.annotations().len(), restored.annotations().len());
        assert_eq!(original.annotations()[0], restored.annotations()[0]);
        assert_eq!(original.images()[0], restored.images()[0]);
        assert_eq!(original.categories()[0], restored.categories()[0]);
    }
}
