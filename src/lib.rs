//! # HTJ2K byte-buffer bridge.
//!
//! Moves images between interleaved byte buffers (one or two bytes per
//! sample) and a JPEG 2000 / HTJ2K codec that works one scanline of 32-bit
//! samples at a time.  The compression engine is pluggable through the
//! [`Codec`] trait; the `openjpeg-sys` feature provides [`OpenJpeg`].
//!
//! ## Example: Decode a codestream at half resolution.
//!
//! ```rust,no_run
//! use htj2k_bridge::*;
//!
//! fn main() -> anyhow::Result<()> {
//!   let bytes = std::fs::read("./assets/example.j2k")?;
//!
//!   let mut decoder = Decoder::new(OpenJpeg);
//!   decoder.set_encoded_bytes(bytes);
//!   let header = decoder.read_header()?;
//!   println!("{:?}", header.frame_info);
//!
//!   let size = decoder.calculate_size_at_decomposition_level(1)?;
//!   decoder.decode_to_level(1)?;
//!   println!("{}x{}: {} bytes", size.width, size.height, decoder.decoded_buffer().len());
//!   Ok(())
//! }
//! ```

pub mod error;
pub use error::*;

mod types;
pub use types::*;

mod sample;
pub use sample::*;

mod geometry;
pub use geometry::*;

mod params;
pub use params::*;

/// Codec abstraction.
pub mod codec;
pub use codec::*;

mod encoded_buffer;
pub use encoded_buffer::*;

mod decoder;
pub use decoder::*;

mod encoder;
pub use encoder::*;

#[cfg(feature = "openjpeg-sys")]
mod openjpeg;
#[cfg(feature = "openjpeg-sys")]
pub use openjpeg::{j2k_detect_format, J2KFormat, OpenJpeg};

/// Convert the last decoded frame into a `image::DynamicImage`.
#[cfg(feature = "image")]
impl<C: Codec> Decoder<C> {
  pub fn to_dynamic_image(&self) -> Result<::image::DynamicImage> {
    use ::image::*;
    let frame = self.frame_info();
    if frame.is_signed {
      return Err(Error::Other(anyhow::anyhow!("signed samples have no image equivalent")));
    }
    let components = frame.component_count as usize;
    let pixels = self.decoded_buffer();
    let size = self.decoded_size();
    let (width, height) = (size.width, size.height);
    let too_short = || Error::BufferSizeError {
      required: frame.buffer_len(size),
      actual: pixels.len(),
    };

    let img = if frame.bytes_per_sample() == 1 {
      let pixels = pixels.to_vec();
      match components {
        1 => DynamicImage::ImageLuma8(GrayImage::from_vec(width, height, pixels).ok_or_else(too_short)?),
        2 => DynamicImage::ImageLumaA8(
          GrayAlphaImage::from_vec(width, height, pixels).ok_or_else(too_short)?,
        ),
        3 => DynamicImage::ImageRgb8(RgbImage::from_vec(width, height, pixels).ok_or_else(too_short)?),
        4 => DynamicImage::ImageRgba8(RgbaImage::from_vec(width, height, pixels).ok_or_else(too_short)?),
        n => return Err(Error::Other(anyhow::anyhow!("unsupported component count {n}"))),
      }
    } else {
      let pixels: Vec<u16> = pixels
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();
      match components {
        1 => DynamicImage::ImageLuma16(
          ImageBuffer::from_vec(width, height, pixels).ok_or_else(too_short)?,
        ),
        2 => DynamicImage::ImageLumaA16(
          ImageBuffer::from_vec(width, height, pixels).ok_or_else(too_short)?,
        ),
        3 => DynamicImage::ImageRgb16(ImageBuffer::from_vec(width, height, pixels).ok_or_else(too_short)?),
        4 => DynamicImage::ImageRgba16(
          ImageBuffer::from_vec(width, height, pixels).ok_or_else(too_short)?,
        ),
        n => return Err(Error::Other(anyhow::anyhow!("unsupported component count {n}"))),
      }
    };
    Ok(img)
  }
}
