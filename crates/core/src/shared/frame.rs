use image::{GrayImage, RgbImage};

/// A single camera frame: contiguous pixel bytes in row-major order.
///
/// Color frames carry 3 channels (RGB); normalized frames used for
/// detection, tracking and recognition carry a single luma channel.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 1)
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3)
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

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// A frame with no pixels, as produced by a camera hiccup.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Copies the frame into a luma image, averaging color channels.
    pub fn to_gray_image(&self) -> GrayImage {
        match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, self.data.clone())
                .unwrap_or_else(|| GrayImage::new(self.width, self.height)),
            _ => {
                let rgb = self.to_rgb_image();
                image::imageops::grayscale(&rgb)
            }
        }
    }

    /// Copies the frame into an RGB image, replicating luma when needed.
    pub fn to_rgb_image(&self) -> RgbImage {
        match self.channels {
            3 => RgbImage::from_raw(self.width, self.height, self.data.clone())
                .unwrap_or_else(|| RgbImage::new(self.width, self.height)),
            channels => {
                let step = channels.max(1) as usize;
                let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
                for px in self.data.chunks_exact(step) {
                    rgb.extend_from_slice(&[px[0], px[0], px[0]]);
                }
                RgbImage::from_raw(self.width, self.height, rgb)
                    .unwrap_or_else(|| RgbImage::new(self.width, self.height))
            }
        }
    }
}
