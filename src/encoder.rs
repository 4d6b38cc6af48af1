use log::{debug, trace};

use super::*;

/// Encodes interleaved samples held in an owned buffer into a codestream.
///
/// Provision the sample buffer with [`Encoder::decoded_buffer_mut`], copy the
/// pixels in, adjust the settings and call [`Encoder::encode`].  The result
/// is available from [`Encoder::encoded_buffer`].
#[derive(Debug)]
pub struct Encoder<C> {
  codec: C,
  decoded: Vec<u8>,
  encoded: EncodedBuffer,
  frame_info: FrameInfo,
  params: EncodeParameters,
}

impl<C: Codec + Default> Default for Encoder<C> {
  fn default() -> Self {
    Self::new(C::default())
  }
}

impl<C: Codec> Encoder<C> {
  pub fn new(codec: C) -> Self {
    Self {
      codec,
      decoded: Vec::new(),
      encoded: EncodedBuffer::new(),
      frame_info: FrameInfo::default(),
      params: EncodeParameters::default(),
    }
  }

  pub fn codec(&self) -> &C {
    &self.codec
  }

  /// Size the sample buffer for `frame_info` and return it for filling.
  ///
  /// Samples are interleaved, one byte each up to 8 bits per sample and two
  /// little-endian bytes otherwise.  Resets the downsampling of every
  /// component to `(1, 1)`.
  pub fn decoded_buffer_mut(&mut self, frame_info: FrameInfo) -> Result<&mut [u8]> {
    frame_info.validate()?;
    self.frame_info = frame_info;
    self.params.set_color_transform(frame_info.is_using_color_transform);
    self.params.reset_down_samples(frame_info.component_count);
    let size = frame_info.buffer_len(frame_info.size());
    self.decoded.clear();
    self.decoded.resize(size, 0);
    Ok(&mut self.decoded)
  }

  /// The sample buffer itself.
  pub fn decoded_bytes_mut(&mut self) -> &mut Vec<u8> {
    &mut self.decoded
  }

  pub fn frame_info(&self) -> FrameInfo {
    FrameInfo {
      is_using_color_transform: self.params.is_using_color_transform(),
      ..self.frame_info
    }
  }

  /// Codestream produced by the last [`Encoder::encode`].
  pub fn encoded_buffer(&self) -> &[u8] {
    self.encoded.data()
  }

  pub fn take_encoded(&mut self) -> Vec<u8> {
    std::mem::take(&mut self.encoded).into_inner()
  }

  pub fn parameters(&self) -> &EncodeParameters {
    &self.params
  }

  pub fn set_parameters(&mut self, params: EncodeParameters) {
    self.params = params;
  }

  /// Sets the number of wavelet decompositions.  Clears any precincts.
  pub fn set_decompositions(&mut self, decompositions: u32) {
    self.params.set_decompositions(decompositions);
  }

  /// Lossless, or lossy with `quantization_step`.  The step is ignored when
  /// `lossless` is true.
  pub fn set_quality(&mut self, lossless: bool, quantization_step: f32) {
    self.params.set_quality(lossless, quantization_step);
  }

  /// Sets the progression order
  /// 0 = LRCP
  /// 1 = RLCP
  /// 2 = RPCL
  /// 3 = PCRL
  /// 4 = CPRL
  pub fn set_progression_order(&mut self, order: ProgressionOrder) {
    self.params.coding_mut().progression_order = order;
  }

  pub fn set_down_sample(&mut self, component: usize, factor: Point) {
    self.params.set_down_sample(component, factor);
  }

  pub fn set_image_offset(&mut self, offset: Point) {
    self.params.coding_mut().image_offset = offset;
  }

  pub fn set_tile_size(&mut self, size: Size) {
    self.params.coding_mut().tile_size = size;
  }

  pub fn set_tile_offset(&mut self, offset: Point) {
    self.params.coding_mut().tile_offset = offset;
  }

  pub fn set_block_dimensions(&mut self, size: Size) {
    self.params.coding_mut().block_dimensions = size;
  }

  /// One precinct size per decomposition level, lowest resolution first.
  pub fn set_precincts(&mut self, precincts: Vec<Size>) {
    self.params.coding_mut().precincts = precincts;
  }

  pub fn set_color_transform(&mut self, enabled: bool) {
    self.params.set_color_transform(enabled);
  }

  pub fn set_tlm_marker(&mut self, enabled: bool) {
    self.params.coding_mut().tlm_marker = enabled;
  }

  pub fn set_tile_parts_at_resolutions(&mut self, enabled: bool) {
    self.params.coding_mut().tile_parts_at_resolutions = enabled;
  }

  pub fn set_tile_parts_at_components(&mut self, enabled: bool) {
    self.params.coding_mut().tile_parts_at_components = enabled;
  }

  /// Encode the sample buffer.
  pub fn encode(&mut self) -> Result<()> {
    let header = self.params.build(&self.frame_info)?;
    let frame = header.frame_info;
    let required = frame.buffer_len(frame.size());
    if self.decoded.len() < required {
      return Err(Error::BufferSizeError {
        required,
        actual: self.decoded.len(),
      });
    }

    let format = SampleFormat::from_frame_info(&frame);
    let components = frame.component_count as usize;
    let stride = frame.width as usize * components * format.bytes_per_sample();
    let mut planes: Vec<PlaneReader> = (0..components)
      .map(|c| PlaneReader::new(header.coding.component_plane(&frame, c, 0), frame.size()))
      .collect();
    let mut line = vec![0i32; frame.width as usize];
    debug!(
      "encode {}x{} comps={} bits={} signed={} decompositions={} reversible={} order={}",
      frame.width,
      frame.height,
      frame.component_count,
      frame.bits_per_sample,
      frame.is_signed,
      header.coding.decompositions,
      header.coding.reversible,
      header.coding.progression_order,
    );

    self.encoded.open(DEFAULT_INITIAL_SIZE);
    let mut sink = self.codec.open_encoder(&header, &mut self.encoded)?;
    let mut pushed = 0usize;
    for y in 0..frame.height {
      let row = &self.decoded[y as usize * stride..(y as usize + 1) * stride];
      for (c, plane) in planes.iter_mut().enumerate() {
        while let Some(samples) = plane.read_line(y, format, row, c, components, &mut line) {
          sink.push(c, samples)?;
          pushed += 1;
        }
      }
    }
    sink.flush()?;
    trace!("pushed {pushed} lines, {} bytes", self.encoded.len());
    Ok(())
  }
}

/// Extracts the rows of one component plane from interleaved input.
struct PlaneReader {
  plane: ComponentPlane,
  /// Source pixel of each plane column, `None` when they coincide.
  columns: Option<Vec<usize>>,
  image_height: u32,
  next_row: u32,
}

impl PlaneReader {
  fn new(plane: ComponentPlane, image: Size) -> Self {
    let columns = if plane.is_full_grid() {
      None
    } else {
      Some(
        (0..plane.size.width)
          .map(|i| plane.pixel_column(i, image.width) as usize)
          .collect(),
      )
    };
    Self {
      plane,
      columns,
      image_height: image.height,
      next_row: 0,
    }
  }

  /// Next plane row sampled from pixel row `y`, if any.
  fn read_line<'a>(
    &mut self,
    y: u32,
    format: SampleFormat,
    row: &[u8],
    component: usize,
    components: usize,
    line: &'a mut [i32],
  ) -> Option<&'a [i32]> {
    let height = self.plane.size.height;
    if self.next_row >= height || self.plane.pixel_row(self.next_row, self.image_height) != y {
      return None;
    }
    self.next_row += 1;
    let line = &mut line[..self.plane.size.width as usize];
    format.load(row, component, components, self.columns.as_deref(), line);
    Some(&*line)
  }
}
