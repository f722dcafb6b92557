//! Camera frames as policy inputs.

use image::imageops::{self, FilterType};
use image::RgbImage;
use sim::{PixelFormat, RawImage};

use crate::error::EnvError;

pub const OBS_WIDTH: u32 = 84;
pub const OBS_HEIGHT: u32 = 84;
pub const OBS_CHANNELS: usize = 3;

const OBS_LEN: usize = OBS_WIDTH as usize * OBS_HEIGHT as usize * OBS_CHANNELS;

/// An 84×84 RGB image, row-major, one byte per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    frame: Option<u64>,
    pixels: Vec<u8>,
}

impl Observation {
    /// All-black observation used before the first camera frame.
    #[must_use]
    pub fn zeroed() -> Self {
        Self { frame: None, pixels: vec![0; OBS_LEN] }
    }

    #[must_use]
    pub const fn shape() -> [usize; 3] {
        [OBS_HEIGHT as usize, OBS_WIDTH as usize, OBS_CHANNELS]
    }

    /// Simulator frame this observation was decoded from, `None` if zeroed.
    #[must_use]
    pub fn frame(&self) -> Option<u64> {
        self.frame
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGB value at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the 84×84 grid.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        assert!(x < OBS_WIDTH as usize && y < OBS_HEIGHT as usize, "pixel ({x}, {y}) out of bounds");
        let i = (y * OBS_WIDTH as usize + x) * OBS_CHANNELS;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }
}

/// Drops alpha, converts to RGB order and resizes to 84×84 (bilinear).
///
/// # Errors
/// Returns [`EnvError::Decode`] if the buffer length does not match the
/// declared dimensions or the image is empty.
pub fn decode(image: &RawImage) -> Result<Observation, EnvError> {
    let fail = |reason: String| EnvError::Decode { frame: image.frame, reason };
    if image.width == 0 || image.height == 0 {
        return Err(fail(format!("empty image {}x{}", image.width, image.height)));
    }
    if image.raw_data.len() != image.expected_len() {
        return Err(fail(format!(
            "expected {} bytes for {}x{}, got {}",
            image.expected_len(),
            image.width,
            image.height,
            image.raw_data.len()
        )));
    }

    let stride = image.format.bytes_per_pixel();
    let mut rgb = Vec::with_capacity(image.width as usize * image.height as usize * OBS_CHANNELS);
    for px in image.raw_data.chunks_exact(stride) {
        match image.format {
            PixelFormat::Bgra8 => rgb.extend_from_slice(&[px[2], px[1], px[0]]),
            PixelFormat::Rgba8 => rgb.extend_from_slice(&px[..3]),
        }
    }
    let full = RgbImage::from_raw(image.width, image.height, rgb)
        .ok_or_else(|| fail("buffer does not fit dimensions".to_owned()))?;

    let pixels = if image.width == OBS_WIDTH && image.height == OBS_HEIGHT {
        full.into_raw()
    } else {
        imageops::resize(&full, OBS_WIDTH, OBS_HEIGHT, FilterType::Triangle).into_raw()
    };
    Ok(Observation { frame: Some(image.frame), pixels })
}
