//! Labeled raster masks.
//!
//! A [`Mask`] is a 2D integer grid: 0 is background, positive values are
//! instance labels. Labels need not be contiguous. Masks are replaced,
//! never edited, once built.

/// A 2D labeled raster, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl Mask {
    /// Creates a mask from row-major pixel data.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<u32>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "mask data length must equal width * height"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Creates an all-background mask of the given dimensions.
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The label at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Row-major pixel data.
    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// The distinct positive labels present, in ascending order.
    pub fn labels(&self) -> Vec<u32> {
        let mut labels: Vec<u32> = self.data.iter().copied().filter(|&v| v > 0).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// True if `label` occurs at least once.
    pub fn contains_label(&self, label: u32) -> bool {
        self.data.iter().any(|&v| v == label)
    }

    /// Number of pixels carrying `label`.
    pub fn count_label(&self, label: u32) -> usize {
        self.data.iter().filter(|&&v| v == label).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_sorted_and_deduped() {
        let mask = Mask::from_vec(3, 2, vec![0, 5, 2, 5, 2, 0]);
        assert_eq!(mask.labels(), vec![2, 5]);
    }

    #[test]
    fn test_zeros_has_no_labels() {
        let mask = Mask::zeros(4, 4);
        assert!(mask.labels().is_empty());
        assert!(!mask.contains_label(1));
    }

    #[test]
    fn test_get_row_major() {
        let mask = Mask::from_vec(2, 2, vec![1, 2, 3, 4]);
        assert_eq!(mask.get(0, 0), 1);
        assert_eq!(mask.get(1, 0), 2);
        assert_eq!(mask.get(0, 1), 3);
        assert_eq!(mask.get(1, 1), 4);
    }

    #[test]
    #[should_panic(expected = "width * height")]
    fn test_from_vec_length_mismatch_panics() {
        let _ = Mask::from_vec(2, 2, vec![0; 3]);
    }
}
