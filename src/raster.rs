//! Mask raster I/O.
//!
//! Masks travel as grayscale PNGs: 8-bit when every label fits in a
//! byte, 16-bit otherwise. Color and palette images are rejected rather
//! than converted, since a channel conversion would silently remap
//! label values.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, Luma};
use walkdir::WalkDir;

use crate::error::CocomaskError;
use crate::mask::Mask;

/// Reads a labeled mask from a grayscale PNG.
pub fn read_mask(path: &Path) -> Result<Mask, CocomaskError> {
    let decoded = image::open(path).map_err(|e| CocomaskError::RasterRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let (width, height, data) = match decoded {
        DynamicImage::ImageLuma8(img) => {
            let (w, h) = img.dimensions();
            (w, h, img.into_raw().into_iter().map(u32::from).collect())
        }
        DynamicImage::ImageLuma16(img) => {
            let (w, h) = img.dimensions();
            (w, h, img.into_raw().into_iter().map(u32::from).collect())
        }
        other => {
            return Err(CocomaskError::RasterRead {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported color type {:?}, expected 8-bit or 16-bit grayscale",
                    other.color()
                ),
            })
        }
    };

    Ok(Mask::from_vec(width, height, data))
}

/// Writes a labeled mask as a grayscale PNG.
///
/// The bit depth is chosen from the largest label present; labels above
/// the 16-bit range cannot be stored losslessly and fail the write.
pub fn write_mask(path: &Path, mask: &Mask) -> Result<(), CocomaskError> {
    let write_err = |message: String| CocomaskError::RasterWrite {
        path: path.to_path_buf(),
        message,
    };
    let max = mask.data().iter().copied().max().unwrap_or(0);

    if max <= u32::from(u8::MAX) {
        let raw: Vec<u8> = mask.data().iter().map(|&v| v as u8).collect();
        let img: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(mask.width(), mask.height(), raw)
                .ok_or_else(|| write_err("pixel buffer does not match dimensions".to_string()))?;
        img.save(path).map_err(|e| write_err(e.to_string()))
    } else if max <= u32::from(u16::MAX) {
        let raw: Vec<u16> = mask.data().iter().map(|&v| v as u16).collect();
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(mask.width(), mask.height(), raw)
                .ok_or_else(|| write_err("pixel buffer does not match dimensions".to_string()))?;
        img.save(path).map_err(|e| write_err(e.to_string()))
    } else {
        Err(write_err(format!("label {max} exceeds the 16-bit range")))
    }
}

/// Collects every PNG under `dir`, recursively, in sorted path order.
///
/// # Errors
/// [`CocomaskError::NoInputs`] if the walk finds no PNG files.
pub fn find_mask_files(dir: &Path) -> Result<Vec<PathBuf>, CocomaskError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            CocomaskError::Io(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, message)),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(CocomaskError::NoInputs {
            path: dir.to_path_buf(),
        });
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_mask_roundtrip_8bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.png");
        let mask = Mask::from_vec(3, 2, vec![0, 1, 2, 0, 255, 7]);

        write_mask(&path, &mask).unwrap();
        let restored = read_mask(&path).unwrap();
        assert_eq!(restored, mask);
    }

    #[test]
    fn test_mask_roundtrip_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.png");
        let mask = Mask::from_vec(2, 2, vec![0, 300, 65535, 1]);

        write_mask(&path, &mask).unwrap();
        let restored = read_mask(&path).unwrap();
        assert_eq!(restored, mask);
    }

    #[test]
    fn test_label_beyond_16bit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.png");
        let mask = Mask::from_vec(1, 1, vec![70_000]);
        let err = write_mask(&path, &mask).unwrap_err();
        assert!(matches!(err, CocomaskError::RasterWrite { .. }));
    }

    #[test]
    fn test_find_mask_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sub");
        fs::create_dir(&nested).unwrap();

        write_mask(&dir.path().join("b.png"), &Mask::from_vec(1, 1, vec![0])).unwrap();
        write_mask(&dir.path().join("a.PNG"), &Mask::from_vec(1, 1, vec![0])).unwrap();
        write_mask(&nested.join("c.png"), &Mask::from_vec(1, 1, vec![0])).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = find_mask_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.png", "c.png"]);
    }

    #[test]
    fn test_empty_directory_is_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_mask_files(dir.path()).unwrap_err();
        assert!(matches!(err, CocomaskError::NoInputs { .. }));
    }
}
