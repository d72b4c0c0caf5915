//! Merging two COCO documents into one.
//!
//! Categories are unified by name: the first document's table is kept
//! verbatim, the second document's categories are matched against it by
//! name and only genuinely new names receive fresh ids. Images from the
//! second document are renumbered to follow the first document's, and
//! annotation ids are reissued contiguously so the merged document never
//! carries id collisions forward.

use std::collections::HashMap;

use crate::coco::{Annotation, AnnotationId, Category, CategoryId, Document, ImageId};
use crate::error::CocomaskError;

/// Merges `second` into `first`, producing a new validated document.
///
/// The first document's category ids and image ids are kept as they are.
/// A category in `second` whose name already exists in `first` is mapped
/// onto the existing id; if both sides declare a supercategory and they
/// disagree, the merge fails with [`CocomaskError::IncompatibleCategory`].
/// Annotation ids are renumbered 1..=N in first-then-second order.
pub fn merge(first: &Document, second: &Document) -> Result<Document, CocomaskError> {
    let (categories, category_remap) = unify_categories(first, second)?;

    // Second-document images follow the first document's id range.
    let mut images = first.images().to_vec();
    let mut next_image_id = first
        .images()
        .iter()
        .map(|i| i.id.as_u64())
        .max()
        .unwrap_or(0)
        + 1;
    let mut image_remap: HashMap<ImageId, ImageId> = HashMap::new();
    for image in second.images() {
        let new_id = ImageId::new(next_image_id);
        next_image_id += 1;
        image_remap.insert(image.id, new_id);
        let mut image = image.clone();
        image.id = new_id;
        images.push(image);
    }

    let mut annotations = Vec::with_capacity(first.annotations().len() + second.annotations().len());
    let mut next_annotation_id = 1u64;
    for annotation in first.annotations() {
        let mut annotation = annotation.clone();
        annotation.id = AnnotationId::new(next_annotation_id);
        next_annotation_id += 1;
        annotations.push(annotation);
    }
    for annotation in second.annotations() {
        annotations.push(remap_annotation(
            annotation,
            AnnotationId::new(next_annotation_id),
            &image_remap,
            &category_remap,
        )?);
        next_annotation_id += 1;
    }

    Document::new(first.info().clone(), images, annotations, categories)
}

/// Builds the unified category table plus the id remap for the second
/// document's categories.
fn unify_categories(
    first: &Document,
    second: &Document,
) -> Result<(Vec<Category>, HashMap<CategoryId, CategoryId>), CocomaskError> {
    let mut categories = first.categories().to_vec();
    let mut by_name: HashMap<String, usize> = categories
        .iter()
        .enumerate()
        .map(|(index, c)| (c.name.clone(), index))
        .collect();
    let mut next_id = categories.iter().map(|c| c.id.as_u64()).max().unwrap_or(0) + 1;

    let mut remap = HashMap::new();
    for category in second.categories() {
        match by_name.get(&category.name) {
            Some(&index) => {
                let existing = &mut categories[index];
                match (&existing.supercategory, &category.supercategory) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(CocomaskError::IncompatibleCategory {
                            name: category.name.clone(),
                            detail: format!("supercategory '{a}' vs '{b}'"),
                        });
                    }
                    (None, Some(b)) => existing.supercategory = Some(b.clone()),
                    _ => {}
                }
                remap.insert(category.id, existing.id);
            }
            None => {
                let new_id = CategoryId::new(next_id);
                next_id += 1;
                remap.insert(category.id, new_id);
                let mut category = category.clone();
                category.id = new_id;
                by_name.insert(category.name.clone(), categories.len());
                categories.push(category);
            }
        }
    }

    Ok((categories, remap))
}

fn remap_annotation(
    annotation: &Annotation,
    new_id: AnnotationId,
    image_remap: &HashMap<ImageId, ImageId>,
    category_remap: &HashMap<CategoryId, CategoryId>,
) -> Result<Annotation, CocomaskError> {
    let mut annotation = annotation.clone();
    let image_id = *image_remap.get(&annotation.image_id).ok_or(
        CocomaskError::DanglingReference {
            annotation_id: annotation.id.as_u64(),
            kind: "image",
            referenced_id: annotation.image_id.as_u64(),
        },
    )?;
    let category_id = *category_remap.get(&annotation.category_id).ok_or(
        CocomaskError::DanglingReference {
            annotation_id: annotation.id.as_u64(),
            kind: "category",
            referenced_id: annotation.category_id.as_u64(),
        },
    )?;
    annotation.id = new_id;
    annotation.image_id = image_id;
    annotation.category_id = category_id;
    Ok(annotation)
}
