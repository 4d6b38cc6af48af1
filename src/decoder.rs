use log::{debug, trace};

use super::*;

/// Decodes a codestream held in an owned buffer into interleaved samples.
///
/// Copy the encoded bytes in through [`Decoder::encoded_buffer_mut`] (or
/// [`Decoder::set_encoded_bytes`]), optionally call
/// [`Decoder::read_header`] to size things up, then [`Decoder::decode`] or
/// [`Decoder::decode_to_level`] and read [`Decoder::decoded_buffer`].
#[derive(Debug)]
pub struct Decoder<C> {
  codec: C,
  encoded: Vec<u8>,
  decoded: Vec<u8>,
  decoded_size: Size,
  header: Option<CodestreamHeader>,
}

impl<C: Codec + Default> Default for Decoder<C> {
  fn default() -> Self {
    Self::new(C::default())
  }
}

impl<C: Codec> Decoder<C> {
  pub fn new(codec: C) -> Self {
    Self {
      codec,
      encoded: Vec::new(),
      decoded: Vec::new(),
      decoded_size: Size::default(),
      header: None,
    }
  }

  pub fn codec(&self) -> &C {
    &self.codec
  }

  /// Resize the encoded buffer to `size` bytes and return it for filling.
  ///
  /// Previous contents are discarded.
  pub fn encoded_buffer_mut(&mut self, size: usize) -> &mut [u8] {
    self.encoded.clear();
    self.encoded.resize(size, 0);
    &mut self.encoded
  }

  /// The encoded buffer itself.
  pub fn encoded_bytes_mut(&mut self) -> &mut Vec<u8> {
    &mut self.encoded
  }

  pub fn set_encoded_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
    self.encoded = bytes.into();
  }

  pub fn encoded_bytes(&self) -> &[u8] {
    &self.encoded
  }

  /// Decoded samples from the last decode.
  pub fn decoded_buffer(&self) -> &[u8] {
    &self.decoded
  }

  /// Image size of [`Decoder::decoded_buffer`].
  pub fn decoded_size(&self) -> Size {
    self.decoded_size
  }

  pub fn take_decoded(&mut self) -> Vec<u8> {
    self.decoded_size = Size::default();
    std::mem::take(&mut self.decoded)
  }

  /// Parse the header of the encoded buffer.
  pub fn read_header(&mut self) -> Result<&CodestreamHeader> {
    self.header = None;
    let header = self.codec.parse_header(&self.encoded)?;
    let frame = &header.frame_info;
    debug!(
      "header: {}x{} comps={} bits={} signed={} decompositions={} reversible={} order={}",
      frame.width,
      frame.height,
      frame.component_count,
      frame.bits_per_sample,
      frame.is_signed,
      header.coding.decompositions,
      header.coding.reversible,
      header.coding.progression_order,
    );
    Ok(&*self.header.insert(header))
  }

  /// Image size after skipping `level` resolution levels.
  pub fn calculate_size_at_decomposition_level(&self, level: u32) -> Result<Size> {
    let header = self.parsed_header()?;
    Ok(header.frame_info.size().at_decomposition_level(level))
  }

  /// Decode at full resolution.
  pub fn decode(&mut self) -> Result<()> {
    self.decode_to_level(0)
  }

  /// Decode with `level` resolution levels skipped.
  ///
  /// The header is parsed again on every call, so the encoded buffer may be
  /// replaced between calls.
  pub fn decode_to_level(&mut self, level: u32) -> Result<()> {
    let header = self.read_header()?.clone();
    let size = Self::check_level(&header, level)?;
    let required = header.frame_info.buffer_len(size);
    let mut decoded = std::mem::take(&mut self.decoded);
    decoded.clear();
    decoded.resize(required, 0);
    let res = self.decode_frame(&header, level, size, &mut decoded);
    self.decoded = decoded;
    self.decoded_size = size;
    res
  }

  /// Decode with `level` resolution levels skipped into `out`.
  ///
  /// `out` must hold at least `width * height * components * bytes per
  /// sample` bytes of the reduced image; nothing is written otherwise.
  /// Returns the decoded size.
  pub fn decode_into(&mut self, level: u32, out: &mut [u8]) -> Result<Size> {
    let header = self.read_header()?.clone();
    let size = Self::check_level(&header, level)?;
    let required = header.frame_info.buffer_len(size);
    if out.len() < required {
      return Err(Error::BufferSizeError {
        required,
        actual: out.len(),
      });
    }
    self.decode_frame(&header, level, size, &mut out[..required])?;
    Ok(size)
  }

  fn check_level(header: &CodestreamHeader, level: u32) -> Result<Size> {
    if level > header.coding.decompositions {
      return Err(Error::decode(format!(
        "decomposition level {level} exceeds the {} levels in the codestream",
        header.coding.decompositions
      )));
    }
    if let Some(problem) = header.coding.geometry_problem(&header.frame_info) {
      return Err(Error::decode(problem));
    }
    Ok(header.frame_info.size().at_decomposition_level(level))
  }

  fn decode_frame(
    &self,
    header: &CodestreamHeader,
    level: u32,
    size: Size,
    out: &mut [u8],
  ) -> Result<()> {
    let frame = &header.frame_info;
    let format = SampleFormat::from_frame_info(frame);
    let components = frame.component_count as usize;
    let stride = size.width as usize * components * format.bytes_per_sample();
    let planar = !frame.is_using_color_transform;

    let mut planes: Vec<PlaneWriter> = (0..components)
      .map(|c| PlaneWriter::new(header.coding.component_plane(frame, c, level), size))
      .collect();
    let total_lines: usize = planes.iter().map(|p| p.plane.size.height as usize).sum();
    debug!(
      "decode level={level} size={}x{} planar={planar} lines={total_lines}",
      size.width, size.height
    );

    let mut source = self.codec.open_decoder(
      &self.encoded,
      header,
      DecodeOptions { level, planar },
    )?;
    for _ in 0..total_lines {
      let line = source.pull()?;
      let plane = planes.get_mut(line.component).ok_or_else(|| {
        Error::decode(format!("codec returned line for unknown component {}", line.component))
      })?;
      plane.write_line(format, line, out, stride, components)?;
    }
    trace!("decoded {total_lines} lines");
    Ok(())
  }

  fn parsed_header(&self) -> Result<&CodestreamHeader> {
    self
      .header
      .as_ref()
      .ok_or_else(|| Error::malformed("header has not been read"))
  }

  /// Header of the last parsed codestream.
  pub fn header(&self) -> Option<&CodestreamHeader> {
    self.header.as_ref()
  }

  /// Frame info of the parsed codestream.  Default before a header is read.
  pub fn frame_info(&self) -> FrameInfo {
    self.header.as_ref().map(|h| h.frame_info).unwrap_or_default()
  }

  fn coding(&self) -> Option<&CodingParameters> {
    self.header.as_ref().map(|h| &h.coding)
  }

  /// Number of wavelet decompositions.
  pub fn num_decompositions(&self) -> u32 {
    self.coding().map(|c| c.decompositions).unwrap_or_default()
  }

  /// true if the image is lossless, false if lossy.
  pub fn is_reversible(&self) -> bool {
    self.coding().map(|c| c.reversible).unwrap_or_default()
  }

  /// Progression order (0 = LRCP, 1 = RLCP, 2 = RPCL, 3 = PCRL, 4 = CPRL).
  pub fn progression_order(&self) -> ProgressionOrder {
    self.coding().map(|c| c.progression_order).unwrap_or_default()
  }

  pub fn down_sample(&self, component: usize) -> Option<Point> {
    self.coding().and_then(|c| c.down_samples.get(component).copied())
  }

  pub fn image_offset(&self) -> Point {
    self.coding().map(|c| c.image_offset).unwrap_or_default()
  }

  pub fn tile_size(&self) -> Size {
    self.coding().map(|c| c.tile_size).unwrap_or_default()
  }

  pub fn tile_offset(&self) -> Point {
    self.coding().map(|c| c.tile_offset).unwrap_or_default()
  }

  pub fn block_dimensions(&self) -> Size {
    self.coding().map(|c| c.block_dimensions).unwrap_or_default()
  }

  /// Precinct size of resolution `level`, lowest resolution first.
  pub fn precinct(&self, level: usize) -> Option<Size> {
    self.coding().and_then(|c| c.precincts.get(level).copied())
  }

  pub fn num_layers(&self) -> u32 {
    self.coding().map(|c| c.num_layers).unwrap_or_default()
  }

  pub fn is_using_color_transform(&self) -> bool {
    self.frame_info().is_using_color_transform
  }
}

/// Writes the rows of one component plane into the interleaved output.
struct PlaneWriter {
  plane: ComponentPlane,
  /// Plane column for each output pixel, `None` when they coincide.
  columns: Option<Vec<usize>>,
  /// Plane row of each output row.
  rows: Vec<u32>,
  next_row: u32,
  next_y: usize,
}

impl PlaneWriter {
  fn new(plane: ComponentPlane, size: Size) -> Self {
    let columns = if plane.is_full_grid() {
      None
    } else {
      Some((0..size.width).map(|x| plane.sample_column(x) as usize).collect())
    };
    let rows = (0..size.height).map(|y| plane.sample_row(y)).collect();
    Self {
      plane,
      columns,
      rows,
      next_row: 0,
      next_y: 0,
    }
  }

  fn write_line(
    &mut self,
    format: SampleFormat,
    line: Line<'_>,
    out: &mut [u8],
    stride: usize,
    components: usize,
  ) -> Result<()> {
    let width = self.plane.size.width as usize;
    if self.next_row >= self.plane.size.height {
      return Err(Error::decode(format!(
        "codec returned too many lines for component {}",
        line.component
      )));
    }
    if line.samples.len() < width {
      return Err(Error::decode(format!(
        "component {} line has {} samples, expected {width}",
        line.component,
        line.samples.len()
      )));
    }
    let samples = &line.samples[..width];

    while self.next_y < self.rows.len() && self.rows[self.next_y] == self.next_row {
      let start = self.next_y * stride;
      let row = &mut out[start..start + stride];
      match &self.columns {
        None => format.store(samples.iter().copied(), row, line.component, components),
        Some(columns) => format.store(
          columns.iter().map(|&i| samples[i]),
          row,
          line.component,
          components,
        ),
      }
      self.next_y += 1;
    }
    self.next_row += 1;
    Ok(())
  }
}
