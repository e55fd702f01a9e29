//! Encoder parameter types and the compression-level mapping.
//!
//! These describe *how hard* to compress, not *how* to do it. The
//! [`backend`](super::backend) turns them into codec settings and the
//! [`optimizer`](super::optimizer) into command-line arguments.
//!
//! | format | low | medium | high |
//! |---|---|---|---|
//! | jpeg / webp | quality 90 | quality 70 | quality 50 |
//! | png | compress-level 1 | compress-level 6 | compress-level 9 |
//!
//! Level `none` maps to [`EncodeOptions::Defaults`].

use crate::types::{CompressionLevel, TargetFormat};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// zlib-style PNG compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngCompressLevel(pub u8);

impl PngCompressLevel {
    pub fn new(value: u8) -> Self {
        Self(value.min(9))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Quality range handed to `pngquant --quality`.
    ///
    /// Stronger compression accepts a lower quality floor.
    pub fn quant_range(self) -> &'static str {
        match self.0 {
            0..=3 => "80-100",
            4..=6 => "60-80",
            _ => "40-60",
        }
    }
}

/// Settings for one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeOptions {
    /// Codec defaults, no tuning.
    #[default]
    Defaults,
    /// Lossy quality for JPEG and WebP.
    Lossy { quality: Quality },
    /// PNG deflate effort, with adaptive filtering enabled.
    Png { compress_level: PngCompressLevel },
}

impl EncodeOptions {
    pub fn is_defaults(self) -> bool {
        self == EncodeOptions::Defaults
    }
}

/// Map a user-facing compression tier onto encoder settings for `format`.
pub fn compression_params(format: TargetFormat, level: CompressionLevel) -> EncodeOptions {
    match format {
        TargetFormat::Jpeg | TargetFormat::Webp => match level {
            CompressionLevel::None => EncodeOptions::Defaults,
            CompressionLevel::Low => EncodeOptions::Lossy {
                quality: Quality::new(90),
            },
            CompressionLevel::Medium => EncodeOptions::Lossy {
                quality: Quality::new(70),
            },
            CompressionLevel::High => EncodeOptions::Lossy {
                quality: Quality::new(50),
            },
        },
        TargetFormat::Png => match level {
            CompressionLevel::None => EncodeOptions::Defaults,
            CompressionLevel::Low => EncodeOptions::Png {
                compress_level: PngCompressLevel::new(1),
            },
            CompressionLevel::Medium => EncodeOptions::Png {
                compress_level: PngCompressLevel::new(6),
            },
            CompressionLevel::High => EncodeOptions::Png {
                compress_level: PngCompressLevel::new(9),
            },
        },
    }
}
