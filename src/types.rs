use std::fmt;

use super::*;

/// Pixel format of one image frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameInfo {
  /// Width of the image, range [1, 65535].
  pub width: u32,
  /// Height of the image, range [1, 65535].
  pub height: u32,
  /// Number of bits per sample, range [2, 16].
  pub bits_per_sample: u8,
  /// Number of components contained in the frame, range [1, 255].
  pub component_count: u32,
  /// true if samples are signed.
  pub is_signed: bool,
  /// true if the multi-component (color) transform is used.
  pub is_using_color_transform: bool,
}

impl FrameInfo {
  pub fn new(width: u32, height: u32, bits_per_sample: u8, component_count: u32, is_signed: bool) -> Self {
    Self {
      width,
      height,
      bits_per_sample,
      component_count,
      is_signed,
      is_using_color_transform: false,
    }
  }

  /// Bytes used by one sample in a byte buffer.
  pub fn bytes_per_sample(&self) -> usize {
    if self.bits_per_sample <= 8 { 1 } else { 2 }
  }

  /// Full resolution size.
  pub fn size(&self) -> Size {
    Size::new(self.width, self.height)
  }

  /// Size in bytes of an interleaved buffer holding a `size` image of this format.
  pub fn buffer_len(&self, size: Size) -> usize {
    size.width as usize * size.height as usize * self.component_count as usize * self.bytes_per_sample()
  }

  pub fn validate(&self) -> Result<()> {
    if !(1..=65535).contains(&self.width) || !(1..=65535).contains(&self.height) {
      return Err(Error::encode(format!(
        "image size {}x{} outside [1, 65535]", self.width, self.height
      )));
    }
    if !(2..=16).contains(&self.bits_per_sample) {
      return Err(Error::encode(format!(
        "bits per sample {} outside [2, 16]", self.bits_per_sample
      )));
    }
    if !(1..=255).contains(&self.component_count) {
      return Err(Error::encode(format!(
        "component count {} outside [1, 255]", self.component_count
      )));
    }
    Ok(())
  }
}

/// Pixel offset or per-component subsampling factor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
  pub x: u32,
  pub y: u32,
}

impl Point {
  pub const fn new(x: u32, y: u32) -> Self {
    Self { x, y }
  }
}

/// Width/height of an image, tile, code-block or precinct.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
  pub width: u32,
  pub height: u32,
}

impl Size {
  pub const fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  pub fn is_zero(&self) -> bool {
    self.width == 0 && self.height == 0
  }

  /// Size after `level` wavelet decompositions.
  ///
  /// Each level ceiling-halves both dimensions; `level == 0` is the full size.
  pub fn at_decomposition_level(self, level: u32) -> Self {
    (0..level).fold(self, |size, _| Size {
      width: ceil_div(size.width, 2),
      height: ceil_div(size.height, 2),
    })
  }
}

pub(crate) fn ceil_div(value: u32, divisor: u32) -> u32 {
  value / divisor + u32::from(value % divisor != 0)
}

/// Codestream progression order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgressionOrder {
  Lrcp = 0,
  Rlcp = 1,
  #[default]
  Rpcl = 2,
  Pcrl = 3,
  Cprl = 4,
}

impl ProgressionOrder {
  pub const ALL: [ProgressionOrder; 5] = [
    ProgressionOrder::Lrcp,
    ProgressionOrder::Rlcp,
    ProgressionOrder::Rpcl,
    ProgressionOrder::Pcrl,
    ProgressionOrder::Cprl,
  ];

  pub fn index(self) -> u32 {
    self as u32
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Lrcp => "LRCP",
      Self::Rlcp => "RLCP",
      Self::Rpcl => "RPCL",
      Self::Pcrl => "PCRL",
      Self::Cprl => "CPRL",
    }
  }
}

impl TryFrom<u32> for ProgressionOrder {
  type Error = Error;

  fn try_from(index: u32) -> Result<Self> {
    Self::ALL
      .get(index as usize)
      .copied()
      .ok_or_else(|| Error::encode(format!("unknown progression order index {index}")))
  }
}

impl std::str::FromStr for ProgressionOrder {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .iter()
      .copied()
      .find(|order| order.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| Error::encode(format!("unknown progression order {s:?}")))
  }
}

impl fmt::Display for ProgressionOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
