use ndarray::ArrayView3;

#[cfg(test)]
use crate::shared::bounding_box::BoundingBox;

/// A decoded still image: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at the decode boundary only; detection and
/// embedding treat pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// RGB value at `(x, y)`, clamped to the frame edges.
    pub fn pixel_clamped(&self, x: i64, y: i64) -> [u8; 3] {
        let cx = x.clamp(0, self.width as i64 - 1) as usize;
        let cy = y.clamp(0, self.height as i64 - 1) as usize;
        let offset = (cy * self.width as usize + cx) * CHANNELS;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    #[cfg(test)]
    pub(crate) fn bounds(&self) -> BoundingBox {
        BoundingBox::new(0, 0, self.width as i32, self.height as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_pixel_clamped_inside() {
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let frame = Frame::new(data, 2, 2);
        assert_eq!(frame.pixel_clamped(0, 1), [255, 0, 0]);
    }

    #[test]
    fn test_pixel_clamped_outside_uses_edge() {
        let mut data = vec![0u8; 12];
        data[9] = 7; // row=1, col=1, R
        let frame = Frame::new(data, 2, 2);
        assert_eq!(frame.pixel_clamped(10, 10), [7, 0, 0]);
        assert_eq!(frame.pixel_clamped(-3, -3), [0, 0, 0]);
    }

    #[test]
    fn test_bounds_cover_frame() {
        let frame = Frame::new(vec![0u8; 30 * 20 * 3], 30, 20);
        assert_eq!(frame.bounds(), BoundingBox::new(0, 0, 30, 20));
    }
}
