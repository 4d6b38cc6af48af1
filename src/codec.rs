//! The seam between the bridges and the compression engine.
//!
//! A [`Codec`] parses headers, hands out one scanline of 32-bit samples per
//! [`LineSource::pull`] when decoding, and takes one scanline per
//! [`LineSink::push`] when encoding.  Everything about wavelets, block coding
//! and codestream syntax stays behind these traits.

use super::*;

/// Options for opening a decode session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
  /// Number of highest resolution levels to skip.  `0` decodes full size.
  pub level: u32,
  /// Pull every line of component 0, then component 1, ... instead of
  /// cycling through the components on each row.
  pub planar: bool,
}

/// One decoded scanline.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
  pub component: usize,
  pub samples: &'a [i32],
}

/// Pull side of a decode session.
pub trait LineSource {
  /// Next scanline.  The sequence holds each component plane's rows, in
  /// order, once.
  fn pull(&mut self) -> Result<Line<'_>>;
}

/// Push side of an encode session.
pub trait LineSink {
  /// Hand over the next scanline of `component`.
  fn push(&mut self, component: usize, samples: &[i32]) -> Result<()>;

  /// Finish the codestream after the last line.
  fn flush(self: Box<Self>) -> Result<()>;
}

/// A compression engine the bridges can drive.
pub trait Codec {
  /// Read the main header of `bytes`.
  ///
  /// Fails with [`Error::MalformedCodestream`] when `bytes` does not start
  /// with a valid header.
  fn parse_header(&self, bytes: &[u8]) -> Result<CodestreamHeader>;

  /// Start decoding `bytes`, whose header is `header`.
  fn open_decoder<'a>(
    &'a self,
    bytes: &'a [u8],
    header: &CodestreamHeader,
    options: DecodeOptions,
  ) -> Result<Box<dyn LineSource + 'a>>;

  /// Start encoding an image described by `header` into `out`.
  ///
  /// The main header may be written right away; the remaining bytes follow
  /// from pushes and the final flush.
  fn open_encoder<'a>(
    &'a self,
    header: &CodestreamHeader,
    out: &'a mut EncodedBuffer,
  ) -> Result<Box<dyn LineSink + 'a>>;
}

impl<C: Codec + ?Sized> Codec for &C {
  fn parse_header(&self, bytes: &[u8]) -> Result<CodestreamHeader> {
    (**self).parse_header(bytes)
  }

  fn open_decoder<'a>(
    &'a self,
    bytes: &'a [u8],
    header: &CodestreamHeader,
    options: DecodeOptions,
  ) -> Result<Box<dyn LineSource + 'a>> {
    (**self).open_decoder(bytes, header, options)
  }

  fn open_encoder<'a>(
    &'a self,
    header: &CodestreamHeader,
    out: &'a mut EncodedBuffer,
  ) -> Result<Box<dyn LineSink + 'a>> {
    (**self).open_encoder(header, out)
  }
}
