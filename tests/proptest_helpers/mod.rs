#![allow(dead_code)]

use cocomask::coco::{CategorySet, Document};
use cocomask::convert::{convert_masks, ConvertOptions};
use cocomask::mask::Mask;
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A random labeled mask with labels in `0..=max_label`.
pub fn arb_mask(max_dim: usize, max_label: u32) -> impl Strategy<Value = Mask> {
    (1..=max_dim, 1..=max_dim).prop_flat_map(move |(w, h)| {
        proptest::collection::vec(0..=max_label, w * h)
            .prop_map(move |data| Mask::from_vec(w as u32, h as u32, data))
    })
}

/// The category set matching `arb_mask`'s label range.
pub fn category_set(max_label: u32) -> CategorySet {
    let entries: Vec<String> = (1..=max_label)
        .map(|id| format!(r#"{{"id": {id}, "name": "class_{id}"}}"#))
        .collect();
    let json = format!("[{}]", entries.join(", "));
    CategorySet::from_slice(json.as_bytes()).expect("valid category set")
}

/// A random valid document, built by converting random masks. Every
/// document produced this way satisfies the structural invariants by
/// construction.
pub fn arb_document(max_images: usize, max_dim: usize, max_label: u32) -> impl Strategy<Value = Document> {
    proptest::collection::vec(arb_mask(max_dim, max_label), 1..=max_images).prop_map(move |masks| {
        let named: Vec<(String, Mask)> = masks
            .into_iter()
            .enumerate()
            .map(|(i, m)| (format!("mask{i:03}.png"), m))
            .collect();
        let categories = category_set(max_label);
        convert_masks(&named, &categories, &ConvertOptions::default())
            .expect("conversion of in-range masks succeeds")
            .document
    })
}
