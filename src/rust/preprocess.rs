use std::fmt;
use std::str::FromStr;

use image::imageops::FilterType;
use ndarray::Array4;

use crate::classifier::CropDocError;

/// Default square input resolution of the crop disease model.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Memory layout of the batched input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
    /// `[1, height, width, 3]`, channels last (Keras exports)
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`, channels first
    Nchw,
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nhwc => write!(f, "nhwc"),
            Self::Nchw => write!(f, "nchw"),
        }
    }
}

impl FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nhwc" => Ok(Self::Nhwc),
            "nchw" => Ok(Self::Nchw),
            other => Err(format!("unknown tensor layout '{}' (expected nhwc or nchw)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreprocessConfig {
    pub size: u32,
    pub layout: TensorLayout,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_INPUT_SIZE,
            layout: TensorLayout::Nhwc,
        }
    }
}

/// Turns encoded image bytes into the model's input tensor.
///
/// The image is decoded, converted to RGB, resized to `size`x`size` without
/// preserving aspect ratio, scaled from 0-255 to 0.0-1.0 and given a batch
/// dimension of 1.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    config: PreprocessConfig,
}

impl ImageNormalizer {
    pub fn new(config: PreprocessConfig) -> Result<Self, CropDocError> {
        if config.size == 0 {
            return Err(CropDocError::Validation("Input size must be greater than zero".into()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> PreprocessConfig {
        self.config
    }

    /// Shape of the tensors produced by [`normalize`](Self::normalize).
    pub fn input_shape(&self) -> [usize; 4] {
        let size = self.config.size as usize;
        match self.config.layout {
            TensorLayout::Nhwc => [1, size, size, 3],
            TensorLayout::Nchw => [1, 3, size, size],
        }
    }

    pub fn normalize(&self, bytes: &[u8]) -> Result<Array4<f32>, CropDocError> {
        if bytes.is_empty() {
            return Err(CropDocError::Decode("image payload is empty".into()));
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| CropDocError::Decode(e.to_string()))?;

        let size = self.config.size;
        let resized = img.resize_exact(size, size, FilterType::Triangle).to_rgb8();

        let mut tensor = Array4::<f32>::zeros(self.input_shape());
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for channel in 0..3 {
                let value = pixel[channel] as f32 / 255.0;
                match self.config.layout {
                    TensorLayout::Nhwc => tensor[[0, y, x, channel]] = value,
                    TensorLayout::Nchw => tensor[[0, channel, y, x]] = value,
                }
            }
        }

        Ok(tensor)
    }
}
