use super::*;

pub(crate) const J2K_CODESTREAM_MAGIC: &[u8] = &[0xFF, 0x4F, 0xFF, 0x51];
pub(crate) const JP2_RFC3745_MAGIC: &[u8] = &[
  0x00, 0x00, 0x00, 0x0c, 0x6a, 0x50, 0x20, 0x20, 0x0d, 0x0a, 0x87, 0x0a,
];
pub(crate) const JP2_MAGIC: &[u8] = &[0x0d, 0x0a, 0x87, 0x0a];

/// Container of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum J2KFormat {
  /// JP2 file format boxes around a codestream.
  JP2,
  /// Raw codestream (`.j2k`, `.j2c`, `.jph`).
  J2K,
}

/// Detect the container from the leading signature of `buf`.
pub fn j2k_detect_format(buf: &[u8]) -> Result<J2KFormat> {
  if buf.starts_with(J2K_CODESTREAM_MAGIC) {
    Ok(J2KFormat::J2K)
  } else if buf.starts_with(JP2_RFC3745_MAGIC) || buf.starts_with(JP2_MAGIC) {
    Ok(J2KFormat::JP2)
  } else {
    Err(Error::malformed(format!(
      "unknown signature {:02x?}",
      &buf[..buf.len().min(4)]
    )))
  }
}
