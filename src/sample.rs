//! Conversion between 32-bit codec samples and fixed-width buffer samples.
//!
//! A [`SampleFormat`] is picked once per buffer from the frame's bit depth and
//! signedness.  The per-line loops below are monomorphized per format, so the
//! byte width never has to be re-checked per pixel.

use super::*;

/// Storage type of one sample in a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
  /// One byte, `[0, 255]`.
  U8,
  /// Two bytes little-endian, `[0, 65535]`.
  U16,
  /// Two bytes little-endian, `[-32768, 32767]`.
  I16,
}

impl SampleFormat {
  pub fn new(bits_per_sample: u8, is_signed: bool) -> Self {
    match (bits_per_sample <= 8, is_signed) {
      (true, _) => Self::U8,
      (false, false) => Self::U16,
      (false, true) => Self::I16,
    }
  }

  pub fn from_frame_info(info: &FrameInfo) -> Self {
    Self::new(info.bits_per_sample, info.is_signed)
  }

  pub fn bytes_per_sample(self) -> usize {
    match self {
      Self::U8 => 1,
      Self::U16 | Self::I16 => 2,
    }
  }

  /// Inclusive range of values the format can store.
  pub fn range(self) -> (i32, i32) {
    match self {
      Self::U8 => (0, u8::MAX as i32),
      Self::U16 => (0, u16::MAX as i32),
      Self::I16 => (i16::MIN as i32, i16::MAX as i32),
    }
  }

  pub fn clamp(self, value: i32) -> i32 {
    let (min, max) = self.range();
    value.clamp(min, max)
  }

  /// Write `values` for one component into an interleaved row.
  ///
  /// Value `x` lands on pixel `x`.  Writing stops at whichever runs out
  /// first, the values or the pixels of `row`.  Every value is clamped.
  pub fn store<I>(self, values: I, row: &mut [u8], component: usize, components: usize)
  where
    I: IntoIterator<Item = i32>,
  {
    match self {
      Self::U8 => scatter::<1, _>(values, row, component, components, |v| {
        [v.clamp(0, u8::MAX as i32) as u8]
      }),
      Self::U16 => scatter::<2, _>(values, row, component, components, |v| {
        (v.clamp(0, u16::MAX as i32) as u16).to_le_bytes()
      }),
      Self::I16 => scatter::<2, _>(values, row, component, components, |v| {
        (v.clamp(i16::MIN as i32, i16::MAX as i32) as i16).to_le_bytes()
      }),
    }
  }

  /// Read one component of an interleaved row into `out`.
  ///
  /// `out[i]` receives the sample of pixel `columns[i]`; with `columns` of
  /// `None` it receives pixel `i`.
  pub fn load(
    self,
    row: &[u8],
    component: usize,
    components: usize,
    columns: Option<&[usize]>,
    out: &mut [i32],
  ) {
    match columns {
      Some(columns) => self.load_from(row, component, components, columns.iter().copied(), out),
      None => self.load_from(row, component, components, 0.., out),
    }
  }

  fn load_from<I>(self, row: &[u8], component: usize, components: usize, columns: I, out: &mut [i32])
  where
    I: Iterator<Item = usize>,
  {
    match self {
      Self::U8 => gather::<1, _>(row, component, components, columns, out, |b| b[0] as i32),
      Self::U16 => gather::<2, _>(row, component, components, columns, out, |b| {
        u16::from_le_bytes(b) as i32
      }),
      Self::I16 => gather::<2, _>(row, component, components, columns, out, |b| {
        i16::from_le_bytes(b) as i32
      }),
    }
  }
}

fn scatter<const N: usize, I>(
  values: I,
  row: &mut [u8],
  component: usize,
  components: usize,
  encode: impl Fn(i32) -> [u8; N],
) where
  I: IntoIterator<Item = i32>,
{
  let offset = component * N;
  for (pixel, value) in row.chunks_exact_mut(components * N).zip(values) {
    pixel[offset..offset + N].copy_from_slice(&encode(value));
  }
}

fn gather<const N: usize, I>(
  row: &[u8],
  component: usize,
  components: usize,
  columns: I,
  out: &mut [i32],
  decode: impl Fn([u8; N]) -> i32,
) where
  I: Iterator<Item = usize>,
{
  let stride = components * N;
  let offset = component * N;
  let mut bytes = [0u8; N];
  for (sample, x) in out.iter_mut().zip(columns) {
    let start = x * stride + offset;
    bytes.copy_from_slice(&row[start..start + N]);
    *sample = decode(bytes);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn format_selection() {
    assert_eq!(SampleFormat::new(8, false), SampleFormat::U8);
    assert_eq!(SampleFormat::new(8, true), SampleFormat::U8);
    assert_eq!(SampleFormat::new(12, false), SampleFormat::U16);
    assert_eq!(SampleFormat::new(16, true), SampleFormat::I16);
    assert_eq!(SampleFormat::I16.bytes_per_sample(), 2);
  }

  #[test]
  fn store_clamps_u8() {
    let mut row = [0u8; 4];
    SampleFormat::U8.store([-5, 300, 17, 255], &mut row, 0, 1);
    assert_eq!(row, [0, 255, 17, 255]);
  }

  #[test]
  fn store_clamps_16bit() {
    let mut row = [0u8; 6];
    SampleFormat::I16.store([-40000, 40000, -2], &mut row, 0, 1);
    assert_eq!(i16::from_le_bytes([row[0], row[1]]), i16::MIN);
    assert_eq!(i16::from_le_bytes([row[2], row[3]]), i16::MAX);
    assert_eq!(i16::from_le_bytes([row[4], row[5]]), -2);

    SampleFormat::U16.store([-1, 70000, 1234], &mut row, 0, 1);
    assert_eq!(u16::from_le_bytes([row[0], row[1]]), 0);
    assert_eq!(u16::from_le_bytes([row[2], row[3]]), u16::MAX);
    assert_eq!(u16::from_le_bytes([row[4], row[5]]), 1234);
  }

  #[test]
  fn store_interleaves_components() {
    // 2 pixels, 3 components.
    let mut row = [0u8; 6];
    SampleFormat::U8.store([1, 2], &mut row, 0, 3);
    SampleFormat::U8.store([10, 20], &mut row, 1, 3);
    SampleFormat::U8.store([100, 200], &mut row, 2, 3);
    assert_eq!(row, [1, 10, 100, 2, 20, 200]);
  }

  #[test]
  fn load_extends_by_signedness() {
    let row = [0xff, 0xff, 0x01, 0x00];
    let mut out = [0i32; 2];
    SampleFormat::I16.load(&row, 0, 1, None, &mut out);
    assert_eq!(out, [-1, 1]);
    SampleFormat::U16.load(&row, 0, 1, None, &mut out);
    assert_eq!(out, [65535, 1]);
    SampleFormat::U8.load(&row, 1, 2, None, &mut out);
    assert_eq!(out, [0xff, 0x00]);
  }

  #[test]
  fn load_selected_columns() {
    let row = [0u8, 1, 2, 3, 4, 5, 6, 7];
    let mut out = [0i32; 3];
    SampleFormat::U8.load(&row, 0, 2, Some(&[0, 2, 3]), &mut out);
    assert_eq!(out, [0, 4, 6]);
  }
}
