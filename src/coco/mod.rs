//! The COCO document model and its boundary I/O.
//!
//! A [`Document`] is the validated, typed form of a COCO JSON file.
//! Everything that enters the crate as loose JSON goes through
//! [`io_json`] (documents) or [`categories`] (category definition
//! files), both of which validate once at the boundary.

pub mod categories;
mod ids;
pub mod io_json;
mod model;

pub use categories::CategorySet;
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{Annotation, Category, Document, Image, Info, RleSeg, Segmentation};
