//! Program image format.
//!
//! An image is a big-endian byte stream:
//! - bytes 0..2: origin address, where the first word is stored
//! - bytes 2..: words stored at consecutive addresses from the origin
//!
//! A trailing odd byte is not a complete word and is dropped.

use crate::cpu::Memory;
use std::path::Path;
use thiserror::Error;

/// A parsed program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    /// Load address of the first word.
    pub origin: u16,
    /// Program words in load order.
    pub words: Vec<u16>,
    /// True if the stream ended with an incomplete word.
    pub trailing_byte: bool,
}

impl ProgramImage {
    /// Parse an image from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, LoadError> {
        let (header, body) = match bytes {
            [hi, lo, rest @ ..] => (u16::from_be_bytes([*hi, *lo]), rest),
            _ => return Err(LoadError::Truncated { len: bytes.len() }),
        };

        let chunks = body.chunks_exact(2);
        let trailing_byte = !chunks.remainder().is_empty();
        let words = chunks.map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();

        Ok(Self {
            origin: header,
            words,
            trailing_byte,
        })
    }

    /// Number of program words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the image carries no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address of the last word, if any. Wraps past 0xFFFF.
    pub fn end(&self) -> Option<u16> {
        match self.words.len() {
            0 => None,
            n => Some(self.origin.wrapping_add((n - 1) as u16)),
        }
    }

    /// Store the words in memory starting at the origin.
    ///
    /// Only the addressed region is overwritten.
    pub fn load_into(&self, mem: &mut Memory) {
        if self.words.len() > usize::from(u16::MAX - self.origin) + 1 {
            log::warn!(
                "image at {:#06x} with {} words wraps past the top of memory",
                self.origin,
                self.words.len()
            );
        }
        if self.trailing_byte {
            log::warn!("image has a trailing odd byte, ignored");
        }
        mem.load_words(self.origin, &self.words);
        log::info!("loaded {} words at {:#06x}", self.words.len(), self.origin);
    }

    /// Serialize back to the big-endian image format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }
}

/// Parse `bytes` and store the image in `mem`.
pub fn load(mem: &mut Memory, bytes: &[u8]) -> Result<ProgramImage, LoadError> {
    let image = ProgramImage::parse(bytes)?;
    image.load_into(mem);
    Ok(image)
}

/// Read and parse an image file.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    log::info!("read {} bytes from {}", bytes.len(), path.display());
    ProgramImage::parse(&bytes)
}

/// Errors that can occur while loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("image too short: {len} bytes, need at least 2 for the origin")]
    Truncated { len: usize },

    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}
