//! Mask reconstruction: COCO annotations back to labeled rasters.
//!
//! Each image is reconstructed independently: its annotations are
//! rasterized in document order and composited painter's-style, later
//! annotations overwriting earlier ones where they overlap. The painted
//! value is the annotation's `category_id`. RLE-segmented annotations
//! are passed over, not rasterized.

use rayon::prelude::*;

use crate::coco::{Document, Image, ImageId, Segmentation};
use crate::error::CocomaskError;
use crate::geometry::{self, Ring};
use crate::mask::Mask;

/// The reconstruction outcome for a single image.
#[derive(Debug)]
pub struct ImageMaskResult {
    pub image_id: ImageId,
    pub file_name: String,
    pub result: Result<Mask, CocomaskError>,
}

/// Reconstructs one mask per image in `document`.
///
/// `workers` bounds the parallelism: 0 uses all available cores, 1 runs
/// strictly sequentially, N uses a fixed pool of N threads. Results come
/// back in document image order and are bit-identical for any worker
/// count; a failing image is reported in its slot without disturbing
/// sibling images.
pub fn reconstruct(document: &Document, workers: usize) -> Vec<ImageMaskResult> {
    let images = document.images();
    if workers == 1 {
        return images
            .iter()
            .map(|image| reconstruct_image(document, image))
            .collect();
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build();
    match pool {
        Ok(pool) => pool.install(|| {
            images
                .par_iter()
                .map(|image| reconstruct_image(document, image))
                .collect()
        }),
        // A pool that cannot be spawned degrades to sequential work.
        Err(_) => images
            .iter()
            .map(|image| reconstruct_image(document, image))
            .collect(),
    }
}

/// Rasterizes and composites all annotations of one image.
fn reconstruct_image(document: &Document, image: &Image) -> ImageMaskResult {
    ImageMaskResult {
        image_id: image.id,
        file_name: image.file_name.clone(),
        result: paint_annotations(document, image),
    }
}

fn paint_annotations(document: &Document, image: &Image) -> Result<Mask, CocomaskError> {
    let w = image.width as usize;
    let mut data = vec![0u32; w * image.height as usize];

    for annotation in document.annotations_for(image.id) {
        let rings = match &annotation.segmentation {
            Segmentation::Polygons(flat_rings) if !flat_rings.is_empty() => flat_rings
                .iter()
                .map(|flat| Ring::from_flat(flat))
                .collect::<Result<Vec<_>, _>>()?,
            // Empty polygon lists and RLE pass-throughs paint nothing.
            _ => continue,
        };

        let layer = geometry::rasterize(&rings, image.width, image.height)?;
        let label = u32::try_from(annotation.category_id.as_u64()).map_err(|_| {
            CocomaskError::Geometry(format!(
                "category id {} exceeds the paintable label range",
                annotation.category_id
            ))
        })?;
        for (slot, &covered) in data.iter_mut().zip(layer.iter()) {
            if covered != 0 {
                *slot = label;
            }
        }
    }

    Ok(Mask::from_vec(image.width, image.height, data))
}
