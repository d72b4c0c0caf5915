//! Splitting a COCO document into one document per image.
//!
//! Each output document keeps its image's original ids so the fragments
//! can be traced back to (or merged back into) the source dataset. Only
//! the categories an image's annotations actually reference are carried
//! into its fragment.

use std::collections::HashSet;

use crate::coco::{Category, Document, Image};
use crate::error::CocomaskError;

/// One per-image fragment of a split document.
#[derive(Debug)]
pub struct SplitUnit {
    pub image: Image,
    pub document: Document,
}

/// Splits `document` into one single-image document per image, in
/// document image order. Ids are preserved verbatim.
pub fn split(document: &Document) -> Result<Vec<SplitUnit>, CocomaskError> {
    let mut units = Vec::with_capacity(document.images().len());

    for image in document.images() {
        let annotations: Vec<_> = document.annotations_for(image.id).cloned().collect();

        let referenced: HashSet<_> = annotations.iter().map(|a| a.category_id).collect();
        let categories: Vec<Category> = document
            .categories()
            .iter()
            .filter(|c| referenced.contains(&c.id))
            .cloned()
            .collect();

        let fragment = Document::new(
            document.info().clone(),
            vec![image.clone()],
            annotations,
            categories,
        )?;
        units.push(SplitUnit {
            image: image.clone(),
            document: fragment,
        });
    }

    Ok(units)
}
