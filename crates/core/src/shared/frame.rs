use ndarray::ArrayView3;
use thiserror::Error;

/// Bytes per pixel: red, green, blue, alpha.
pub const CHANNELS: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// A single video/image frame: contiguous RGBA bytes in row-major order.
///
/// The detector only ever reads a frame. Format conversion happens at the
/// I/O boundary (see [`Frame::from_rgb`]).
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
    timestamp_ms: Option<u64>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Result<Self, FrameError> {
        let expected = (width as usize) * (height as usize) * CHANNELS;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            index,
            timestamp_ms: None,
        })
    }

    /// Builds an RGBA frame from packed RGB bytes, with alpha fixed at 255.
    pub fn from_rgb(rgb: &[u8], width: u32, height: u32, index: usize) -> Result<Self, FrameError> {
        let pixels = (width as usize) * (height as usize);
        if rgb.len() != pixels * 3 {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected: pixels * 3,
                actual: rgb.len(),
            });
        }
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for px in rgb.chunks_exact(3) {
            data.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Self::new(data, width, height, index)
    }

    pub fn with_timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
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

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp_ms(&self) -> Option<u64> {
        self.timestamp_ms
    }

    /// True when the frame has no pixels to scan.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGB channels of the pixel at `(x, y)`. Caller guarantees bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = ((y as usize) * (self.width as usize) + x as usize) * CHANNELS;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length is checked on construction")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
