use super::*;

const SOC: u16 = 0xFF4F;
const SOT: u16 = 0xFF90;
const COD: u16 = 0xFF52;

/// Raw codestream inside `bytes`, unwrapping the `jp2c` box of a JP2 file.
fn codestream(bytes: &[u8]) -> Result<&[u8]> {
  if j2k_detect_format(bytes)? == J2KFormat::J2K {
    return Ok(bytes);
  }
  let mut pos = 0;
  while pos + 8 <= bytes.len() {
    let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]) as u64;
    let kind = &bytes[pos + 4..pos + 8];
    let (header, len) = match len {
      0 => (8, (bytes.len() - pos) as u64),
      1 => {
        let ext = bytes
          .get(pos + 8..pos + 16)
          .ok_or_else(|| Error::malformed("truncated JP2 box"))?;
        let mut word = [0u8; 8];
        word.copy_from_slice(ext);
        (16, u64::from_be_bytes(word))
      }
      len => (8, len),
    };
    if len < header as u64 || pos as u64 + len > bytes.len() as u64 {
      return Err(Error::malformed("JP2 box runs past the end of the file"));
    }
    let end = pos + len as usize;
    if kind == b"jp2c" {
      return Ok(&bytes[pos + header..end]);
    }
    pos = end;
  }
  Err(Error::malformed("JP2 file has no codestream box"))
}

/// Precinct exponent bytes of the main header COD segment, lowest
/// resolution first.  Empty when precincts are not signalled.
///
/// Each byte holds PPx in the low nibble and PPy in the high nibble.
pub(crate) fn main_header_precincts(bytes: &[u8]) -> Result<Vec<u8>> {
  let cs = codestream(bytes)?;
  let marker = |pos: usize| cs.get(pos..pos + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));
  if marker(0) != Some(SOC) {
    return Err(Error::malformed("missing SOC marker"));
  }
  let mut pos = 2;
  loop {
    let code = marker(pos).ok_or_else(|| Error::malformed("main header is truncated"))?;
    if code == SOT {
      return Err(Error::malformed("main header has no COD marker"));
    }
    let len = marker(pos + 2).ok_or_else(|| Error::malformed("main header is truncated"))? as usize;
    let body = cs
      .get(pos + 4..pos + 2 + len)
      .ok_or_else(|| Error::malformed("marker segment runs past the end of the codestream"))?;
    if code == COD {
      // Scod, SGcod (4 bytes) and the fixed part of SPcod (5 bytes).
      if body.len() < 10 {
        return Err(Error::malformed("COD marker is too short"));
      }
      if body[0] & 0x01 == 0 {
        return Ok(Vec::new());
      }
      let resolutions = body[5] as usize + 1;
      let precincts = body
        .get(10..10 + resolutions)
        .ok_or_else(|| Error::malformed("COD marker is missing precinct sizes"))?;
      return Ok(precincts.to_vec());
    }
    pos += 2 + len;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const COD_WITH_PRECINCTS: &[u8] = &[
    0xFF, 0x52, 0x00, 0x0F, 0x01, 0x02, 0x00, 0x01, 0x00, 0x02, 0x03, 0x03, 0x00, 0x01, 0x44, 0x55,
    0x55,
  ];

  fn main_header(cod: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0x4F, 0xFF, 0x51, 0x00, 0x04, 0xAA, 0xBB];
    bytes.extend_from_slice(cod);
    bytes.extend_from_slice(&[0xFF, 0x90, 0x00, 0x0A]);
    bytes
  }

  #[test]
  fn reads_precincts_from_cod() {
    let bytes = main_header(COD_WITH_PRECINCTS);
    assert_eq!(main_header_precincts(&bytes).unwrap(), vec![0x44, 0x55, 0x55]);
  }

  #[test]
  fn reads_precincts_inside_jp2() {
    let cs = main_header(COD_WITH_PRECINCTS);
    let mut bytes = JP2_RFC3745_MAGIC.to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 8]);
    bytes.extend_from_slice(b"free");
    bytes.extend_from_slice(&((cs.len() + 8) as u32).to_be_bytes());
    bytes.extend_from_slice(b"jp2c");
    bytes.extend_from_slice(&cs);
    assert_eq!(main_header_precincts(&bytes).unwrap(), vec![0x44, 0x55, 0x55]);
  }

  #[test]
  fn default_precincts_are_empty() {
    let mut cod = COD_WITH_PRECINCTS[..14].to_vec();
    cod[3] = 0x0C;
    cod[4] = 0x00;
    assert!(main_header_precincts(&main_header(&cod)).unwrap().is_empty());
  }

  #[test]
  fn truncated_segments_are_malformed() {
    let bytes = main_header(COD_WITH_PRECINCTS);
    assert!(matches!(
      main_header_precincts(&bytes[..16]),
      Err(Error::MalformedCodestream(_))
    ));
    assert!(matches!(
      main_header_precincts(&main_header(&[])),
      Err(Error::MalformedCodestream(_))
    ));
  }
}
