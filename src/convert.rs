use crate::array::{Element, NdArray};
use crate::error::{Error, Result};
use image::{DynamicImage, GrayImage};
use nalgebra::DMatrix;
use std::path::Path;

impl<T: Element> NdArray<T> {
    /// Copies a 2-D array into a matrix. 1-D and 3-D arrays are rejected.
    pub fn to_mat(&self) -> Result<DMatrix<f64>> {
        match *self.shape() {
            [nrows, ncols] => {
                let values: Vec<f64> = self.as_slice().iter().map(|&e| e.to_f64()).collect();
                Ok(DMatrix::from_row_slice(nrows, ncols, &values))
            }
            _ => Err(Error::UnsupportedDims(self.ndim())),
        }
    }
}

impl<'a> From<&'a DMatrix<f64>> for NdArray<f64> {
    fn from(mat: &'a DMatrix<f64>) -> Self {
        // nalgebra is column major, the transpose is laid out row major
        let data = mat.transpose().as_slice().to_vec();
        NdArray::from_parts(vec![mat.nrows(), mat.ncols()], data)
    }
}

impl From<DMatrix<f64>> for NdArray<f64> {
    fn from(mat: DMatrix<f64>) -> Self {
        NdArray::from(&mat)
    }
}

/// Operands that can be handed to a matrix routine without an explicit
/// conversion step at the call site.
pub trait IntoMat {
    fn into_mat(self) -> Result<DMatrix<f64>>;
}

impl IntoMat for DMatrix<f64> {
    fn into_mat(self) -> Result<DMatrix<f64>> {
        Ok(self)
    }
}

impl<'a> IntoMat for &'a DMatrix<f64> {
    fn into_mat(self) -> Result<DMatrix<f64>> {
        Ok(self.clone())
    }
}

impl<T: Element> IntoMat for NdArray<T> {
    fn into_mat(self) -> Result<DMatrix<f64>> {
        self.to_mat()
    }
}

impl<'a, T: Element> IntoMat for &'a NdArray<T> {
    fn into_mat(self) -> Result<DMatrix<f64>> {
        self.to_mat()
    }
}

/// Grey images become `(height, width)` frames, everything else
/// `(height, width, 3)` RGB frames. Intensities are kept in `0..=255`.
pub fn frame_from_image(image: &DynamicImage) -> NdArray<f64> {
    if image.color().channel_count() <= 2 {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        let data = gray.pixels().map(|p| p.0[0] as f64).collect();
        NdArray::from_parts(vec![height as usize, width as usize], data)
    } else {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let data = rgb.pixels().flat_map(|p| p.0.to_vec()).map(|c| c as f64).collect();
        NdArray::from_parts(vec![height as usize, width as usize, 3], data)
    }
}

pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<NdArray<f64>> {
    let image = image::open(path)?;
    Ok(frame_from_image(&image))
}

pub fn mask_to_image(mask: &NdArray<u8>) -> Result<GrayImage> {
    match *mask.shape() {
        [rows, cols] => GrayImage::from_raw(cols as u32, rows as u32, mask.as_slice().to_vec())
            .ok_or_else(|| Error::ShapeMismatch { shape: mask.shape().to_vec(), len: mask.len() }),
        _ => Err(Error::UnsupportedDims(mask.ndim())),
    }
}
