// SPDX-License-Identifier: MPL-2.0
//! The in-memory frame representation shared by all processors.
//!
//! A [`Frame`] is one decoded raster image (a still image or one extracted
//! video frame): a dense `height x width x 3` buffer of 8-bit RGB samples.
//! Frames carry no identity beyond their buffer; a transform either mutates
//! a frame wholesale or hands back the input untouched.

/// Number of interleaved channels per pixel.
pub const CHANNELS: usize = 3;

/// One decoded raster frame: interleaved RGB8 pixel data.
///
/// # Example
///
/// ```
/// use frame_forge::domain::Frame;
///
/// let pixels = vec![255u8; 100 * 100 * 3]; // 100x100 RGB
/// let frame = Frame::from_rgb(100, 100, pixels);
///
/// assert_eq!(frame.width(), 100);
/// assert_eq!(frame.height(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// RGB pixel data (3 bytes per pixel, row-major).
    rgb_bytes: Vec<u8>,
}

impl Frame {
    /// Creates a new `Frame` from dimensions and RGB pixel data.
    ///
    /// A buffer of the wrong length is a contract violation by the caller,
    /// not a runtime failure: every decode path produces a consistent buffer,
    /// so this can only be hit by constructing a frame by hand.
    ///
    /// # Panics
    ///
    /// Panics if the pixel data length doesn't match `width * height * 3`.
    #[must_use]
    pub fn from_rgb(width: u32, height: u32, rgb_bytes: Vec<u8>) -> Self {
        let expected_len = (width as usize) * (height as usize) * CHANNELS;
        assert_eq!(
            rgb_bytes.len(),
            expected_len,
            "RGB data length mismatch: expected {expected_len}, got {}",
            rgb_bytes.len()
        );

        Self {
            width,
            height,
            rgb_bytes,
        }
    }

    /// Creates a frame from a decoded [`image_rs::RgbImage`].
    #[must_use]
    pub fn from_image(image: image_rs::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            rgb_bytes: image.into_raw(),
        }
    }

    /// Converts the frame into an [`image_rs::RgbImage`] for encoding.
    #[must_use]
    pub fn into_image(self) -> image_rs::RgbImage {
        // from_raw only fails on a length mismatch, which from_rgb rules out.
        image_rs::RgbImage::from_raw(self.width, self.height, self.rgb_bytes)
            .unwrap_or_else(|| image_rs::RgbImage::new(0, 0))
    }

    /// Returns a borrowed [`image_rs::RgbImage`] view by cloning the buffer.
    #[must_use]
    pub fn to_image(&self) -> image_rs::RgbImage {
        self.clone().into_image()
    }

    /// Returns the frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns a reference to the RGB pixel data.
    #[must_use]
    pub fn rgb_bytes(&self) -> &[u8] {
        &self.rgb_bytes
    }

    /// Returns a mutable reference to the RGB pixel data.
    pub fn rgb_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.rgb_bytes
    }

    /// Returns the total number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.rgb_bytes == other.rgb_bytes
    }
}

impl Eq for Frame {}
