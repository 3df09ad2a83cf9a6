//! Images embedded in JSON bodies as base64 text, with or without a data-URL prefix.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use image::ImageFormat;
use thiserror::Error;

/// Standard alphabet, padding optional. Mobile encoders are inconsistent about `=`.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum ImageDataError {
    #[error("image payload is empty")]
    Empty,

    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage<'a> {
    mime_type: Option<&'a str>,
    payload: &'a str,
}

impl<'a> EmbeddedImage<'a> {
    /// Splits off a `data:<mime>;base64,` prefix when there is one.
    pub fn parse(input: &'a str) -> Self {
        let input = input.trim();
        if let Some(rest) = input.strip_prefix("data:") {
            if let Some((header, payload)) = rest.split_once(',') {
                if let Some(mime) = header.strip_suffix(";base64") {
                    return Self {
                        mime_type: Some(mime).filter(|m| !m.is_empty()),
                        payload,
                    };
                }
            }
        }
        Self {
            mime_type: None,
            payload: input,
        }
    }

    pub fn declared_mime_type(&self) -> Option<&'a str> {
        self.mime_type
    }

    #[cfg(test)]
    pub fn payload(&self) -> &'a str {
        self.payload
    }

    pub fn decode(&self) -> Result<Vec<u8>, ImageDataError> {
        let compact: String = self
            .payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if compact.is_empty() {
            return Err(ImageDataError::Empty);
        }
        Ok(LENIENT.decode(compact)?)
    }
}

/// Canonical base64 for forwarding decoded bytes upstream.
pub fn encode(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// What the bytes look like, for content types and file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

impl ImageKind {
    pub const JPEG: Self = Self {
        mime_type: "image/jpeg",
        extension: "jpeg",
    };

    /// Falls back to JPEG, which is what the camera produces.
    pub fn sniff(bytes: &[u8]) -> Self {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => Self {
                mime_type: "image/png",
                extension: "png",
            },
            Ok(ImageFormat::Gif) => Self {
                mime_type: "image/gif",
                extension: "gif",
            },
            Ok(ImageFormat::WebP) => Self {
                mime_type: "image/webp",
                extension: "webp",
            },
            Ok(ImageFormat::Bmp) => Self {
                mime_type: "image/bmp",
                extension: "bmp",
            },
            Ok(ImageFormat::Tiff) => Self {
                mime_type: "image/tiff",
                extension: "tiff",
            },
            _ => Self::JPEG,
        }
    }
}
