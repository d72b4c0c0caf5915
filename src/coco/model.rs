//! Core COCO document model.
//!
//! Unlike the loosely-typed JSON it is parsed from, a [`Document`] is
//! validated once at construction time: unique IDs per collection and no
//! dangling annotation references. Everything downstream (reconstruction,
//! merging, splitting) can then rely on those invariants instead of
//! re-checking them ad hoc.

use serde::{Deserialize, Serialize};

use super::ids::{AnnotationId, CategoryId, ImageId};
use crate::error::CocomaskError;

/// Metadata about the document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

/// An image record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

impl Image {
    /// Creates a new image record.
    pub fn new(id: impl Into<ImageId>, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
        }
    }
}

/// A category (class label).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
}

impl Category {
    /// Creates a new category.
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
        }
    }

    /// Creates a new category with a supercategory.
    pub fn with_supercategory(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: Some(supercategory.into()),
        }
    }
}

/// Per-instance segmentation geometry: either a list of flat polygon
/// rings (`[x1, y1, x2, y2, ...]` each) or an RLE object.
///
/// RLE segmentations are carried through reads, merges, and splits
/// verbatim; the reconstructor does not rasterize them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    Polygons(Vec<Vec<f64>>),
    Rle(RleSeg),
}

/// An RLE segmentation kept as opaque pass-through data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RleSeg {
    pub size: [u32; 2],
    pub counts: serde_json::Value,
}

impl Segmentation {
    /// The polygon rings, if this is a polygon segmentation.
    pub fn polygons(&self) -> Option<&[Vec<f64>]> {
        match self {
            Segmentation::Polygons(rings) => Some(rings),
            Segmentation::Rle(_) => None,
        }
    }
}

/// A single instance annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub segmentation: Segmentation,

    /// Polygon area (shoelace over the rings, holes subtracted).
    pub area: f64,

    /// COCO bbox format: [x, y, width, height], (x, y) top-left.
    pub bbox: [f64; 4],

    #[serde(default)]
    pub iscrowd: u8,
}

impl Annotation {
    /// Creates a new polygon annotation with `iscrowd = 0`.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        segmentation: Segmentation,
        bbox: [f64; 4],
        area: f64,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            segmentation,
            area,
            bbox,
            iscrowd: 0,
        }
    }
}

/// A validated COCO document.
///
/// Construction through [`Document::new`] is the only way to obtain one,
/// so holding a `Document` is proof that IDs are unique and references
/// resolve. Collections keep their input order; that order is the
/// painter's order during reconstruction.
#[derive(Clone, Debug, Default)]
pub struct Document {
    info: Info,
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    categories: Vec<Category>,
}

impl Document {
    /// Builds a document, checking its structural invariants.
    ///
    /// # Errors
    /// [`CocomaskError::DuplicateId`] if two images, annotations, or
    /// categories share an id; [`CocomaskError::DanglingReference`] if an
    /// annotation references a missing image or category.
    pub fn new(
        info: Info,
        images: Vec<Image>,
        annotations: Vec<Annotation>,
        categories: Vec<Category>,
    ) -> Result<Self, CocomaskError> {
        use std::collections::HashSet;

        let mut image_ids = HashSet::with_capacity(images.len());
        for image in &images {
            if !image_ids.insert(image.id) {
                return Err(CocomaskError::DuplicateId {
                    kind: "image",
                    id: image.id.as_u64(),
                });
            }
        }

        let mut category_ids = HashSet::with_capacity(categories.len());
        for category in &categories {
            if !category_ids.insert(category.id) {
                return Err(CocomaskError::DuplicateId {
                    kind: "category",
                    id: category.id.as_u64(),
                });
            }
        }

        let mut annotation_ids = HashSet::with_capacity(annotations.len());
        for annotation in &annotations {
            if !annotation_ids.insert(annotation.id) {
                return Err(CocomaskError::DuplicateId {
                    kind: "annotation",
                    id: annotation.id.as_u64(),
                });
            }
            if !image_ids.contains(&annotation.image_id) {
                return Err(CocomaskError::DanglingReference {
                    annotation_id: annotation.id.as_u64(),
                    kind: "image",
                    referenced_id: annotation.image_id.as_u64(),
                });
            }
            if !category_ids.contains(&annotation.category_id) {
                return Err(CocomaskError::DanglingReference {
                    annotation_id: annotation.id.as_u64(),
                    kind: "category",
                    referenced_id: annotation.category_id.as_u64(),
                });
            }
        }

        Ok(Self {
            info,
            images,
            annotations,
            categories,
        })
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Annotations referencing `image_id`, in document order.
    pub fn annotations_for(&self, image_id: ImageId) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.image_id == image_id)
    }

    /// Decomposes the document into its collections.
    pub fn into_parts(self) -> (Info, Vec<Image>, Vec<Annotation>, Vec<Category>) {
        (self.info, self.images, self.annotations, self.categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon_seg() -> Segmentation {
        Segmentation::Polygons(vec![vec![0.0, 0.0, 2.0, 0.0, 2.0, 2.0, 0.0, 2.0]])
    }

    fn valid_parts() -> (Vec<Image>, Vec<Annotation>, Vec<Category>) {
        (
            vec![Image::new(1u64, "a.png", 8, 8)],
            vec![Annotation::new(
                1u64,
                1u64,
                1u64,
                polygon_seg(),
                [0.0, 0.0, 2.0, 2.0],
                4.0,
            )],
            vec![Category::new(1u64, "cell")],
        )
    }

    #[test]
    fn test_valid_document_builds() {
        let (images, annotations, categories) = valid_parts();
        let doc = Document::new(Info::default(), images, annotations, categories).unwrap();
        assert_eq!(doc.images().len(), 1);
        assert_eq!(doc.annotations_for(ImageId(1)).count(), 1);
        assert_eq!(doc.annotations_for(ImageId(2)).count(), 0);
    }

    #[test]
    fn test_duplicate_image_id_rejected() {
        let (mut images, annotations, categories) = valid_parts();
        images.push(Image::new(1u64, "b.png", 8, 8));
        let err = Document::new(Info::default(), images, annotations, categories).unwrap_err();
        assert!(matches!(err, CocomaskError::DuplicateId { kind: "image", id: 1 }));
    }

    #[test]
    fn test_duplicate_annotation_id_rejected() {
        let (images, mut annotations, categories) = valid_parts();
        annotations.push(Annotation::new(
            1u64,
            1u64,
            1u64,
            polygon_seg(),
            [0.0, 0.0, 1.0, 1.0],
            1.0,
        ));
        let err = Document::new(Info::default(), images, annotations, categories).unwrap_err();
        assert!(matches!(
            err,
            CocomaskError::DuplicateId { kind: "annotation", id: 1 }
        ));
    }

    #[test]
    fn test_dangling_image_reference_rejected() {
        let (images, mut annotations, categories) = valid_parts();
        annotations.push(Annotation::new(
            2u64,
            99u64,
            1u64,
            polygon_seg(),
            [0.0, 0.0, 1.0, 1.0],
            1.0,
        ));
        let err = Document::new(Info::default(), images, annotations, categories).unwrap_err();
        assert!(matches!(
            err,
            CocomaskError::DanglingReference {
                annotation_id: 2,
                kind: "image",
                referenced_id: 99
            }
        ));
    }

    #[test]
    fn test_dangling_category_reference_rejected() {
        let (images, mut annotations, categories) = valid_parts();
        annotations.push(Annotation::new(
            2u64,
            1u64,
            42u64,
            polygon_seg(),
            [0.0, 0.0, 1.0, 1.0],
            1.0,
        ));
        let err = Document::new(Info::default(), images, annotations, categories).unwrap_err();
        assert!(matches!(
            err,
            CocomaskError::DanglingReference {
                annotation_id: 2,
                kind: "category",
                referenced_id: 42
            }
        ));
    }

    #[test]
    fn test_segmentation_polygons_accessor() {
        let seg = polygon_seg();
        assert_eq!(seg.polygons().unwrap().len(), 1);
        let rle = Segmentation::Rle(RleSeg {
            size: [4, 4],
            counts: serde_json::json!([0, 16]),
        });
        assert!(rle.polygons().is_none());
    }
}
