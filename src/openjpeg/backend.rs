use log::debug;

use super::*;

/// [`Codec`] backed by the OpenJPEG library.
///
/// Decodes raw codestreams and JP2 files and writes raw codestreams.  Two
/// encoder settings have no OpenJPEG counterpart: tile-parts are split on
/// one axis only, and the quantization step only selects the irreversible
/// path.  Both are reported with a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenJpeg;

impl OpenJpeg {
  pub fn new() -> Self {
    Self
  }
}

fn read_codestream_header(bytes: &[u8], image: &Image, info: &CodestreamInfo) -> Result<CodestreamHeader> {
  let comps = image.components();
  let first = comps
    .first()
    .ok_or_else(|| Error::malformed("codestream has no components"))?;
  let cs = info.info();
  let tile = &cs.m_default_tile_info;
  let style = info
    .component_style()
    .ok_or_else(|| Error::malformed("missing coding style"))?;

  let size = image.size();
  let frame_info = FrameInfo {
    width: size.width,
    height: size.height,
    bits_per_sample: first.prec as u8,
    component_count: comps.len() as u32,
    is_signed: first.sgnd == 1,
    is_using_color_transform: tile.mct != 0,
  };

  let progression_order = u32::try_from(tile.prg as i32)
    .ok()
    .and_then(|order| ProgressionOrder::try_from(order).ok())
    .ok_or_else(|| Error::malformed("unknown progression order"))?;
  let decompositions = style.numresolutions.saturating_sub(1);
  // `tccp_info` only carries the first few precinct sizes, read them from
  // the COD marker instead.
  let precincts = if style.csty & 0x01 != 0 {
    main_header_precincts(bytes)?
      .iter()
      .take(decompositions as usize)
      .map(|&pp| Size::new(1 << (pp & 0x0F), 1 << (pp >> 4)))
      .collect()
  } else {
    Vec::new()
  };

  let coding = CodingParameters {
    decompositions,
    reversible: style.qmfbid == 1,
    quantization_step: -1.0,
    progression_order,
    down_samples: comps.iter().map(|c| Point::new(c.dx, c.dy)).collect(),
    image_offset: image.offset(),
    tile_size: Size::new(cs.tdx, cs.tdy),
    tile_offset: Point::new(cs.tx0, cs.ty0),
    block_dimensions: Size::new(1 << style.cblkw, 1 << style.cblkh),
    precincts,
    num_layers: tile.numlayers,
    tlm_marker: false,
    tile_parts_at_resolutions: false,
    tile_parts_at_components: false,
  };
  Ok(CodestreamHeader { frame_info, coding })
}

impl Codec for OpenJpeg {
  fn parse_header(&self, bytes: &[u8]) -> Result<CodestreamHeader> {
    let format = j2k_detect_format(bytes)?;
    let decoder = Decompressor::new(Stream::from_bytes(bytes)?, format)?;
    decoder.setup(DecodeParameters::default())?;
    let image = decoder.read_header()?;
    let info = decoder.codestream_info()?;
    read_codestream_header(bytes, &image, &info)
  }

  fn open_decoder<'a>(
    &'a self,
    bytes: &'a [u8],
    header: &CodestreamHeader,
    options: DecodeOptions,
  ) -> Result<Box<dyn LineSource + 'a>> {
    let format = j2k_detect_format(bytes)?;
    let decoder = Decompressor::new(Stream::from_bytes(bytes)?, format)?;
    decoder.setup(DecodeParameters::default().reduce(options.level))?;
    let image = decoder.read_header()?;
    decoder.decode(&image)?;
    Ok(Box::new(DecodedLines::new(image, header, options)))
  }

  fn open_encoder<'a>(
    &'a self,
    header: &CodestreamHeader,
    out: &'a mut EncodedBuffer,
  ) -> Result<Box<dyn LineSink + 'a>> {
    let image = Image::create(header)?;
    let encoder = Compressor::new(Stream::to_buffer(out)?)?;
    encoder.setup(CompressParameters::from_header(header), &image)?;
    let rows = vec![0; image.components().len()];
    Ok(Box::new(CompressSession {
      encoder,
      image,
      rows,
    }))
  }
}

/// Serves the rows of a fully decoded image.
struct DecodedLines {
  image: Image,
  /// Plane size of each component expected by the caller.
  widths: Vec<usize>,
  order: std::vec::IntoIter<(usize, u32)>,
  line: Vec<i32>,
}

impl DecodedLines {
  fn new(image: Image, header: &CodestreamHeader, options: DecodeOptions) -> Self {
    let frame = &header.frame_info;
    let planes: Vec<ComponentPlane> = (0..frame.component_count as usize)
      .map(|c| header.coding.component_plane(frame, c, options.level))
      .collect();
    let order: Vec<(usize, u32)> = if options.planar {
      planes
        .iter()
        .enumerate()
        .flat_map(|(c, plane)| (0..plane.size.height).map(move |row| (c, row)))
        .collect()
    } else {
      let height = planes.iter().map(|p| p.size.height).max().unwrap_or(0);
      (0..height)
        .flat_map(|row| {
          planes
            .iter()
            .enumerate()
            .filter(move |(_, plane)| row < plane.size.height)
            .map(move |(c, _)| (c, row))
        })
        .collect()
    };
    debug!(
      "OpenJPEG decoded {:?}, serving {} lines planar={}",
      image,
      order.len(),
      options.planar
    );
    Self {
      image,
      widths: planes.iter().map(|p| p.size.width as usize).collect(),
      order: order.into_iter(),
      line: Vec::new(),
    }
  }
}

impl LineSource for DecodedLines {
  fn pull(&mut self) -> Result<Line<'_>> {
    let (component, row) = self
      .order
      .next()
      .ok_or_else(|| Error::decode("all lines have been read"))?;
    let comp = self
      .image
      .components()
      .get(component)
      .ok_or_else(|| Error::decode(format!("decoded image lacks component {component}")))?;
    let (w, h) = (comp.w as usize, comp.h as usize);
    if w == 0 || h == 0 {
      return Err(Error::decode(format!("component {component} decoded empty")));
    }
    let data = self.image.data(component)?;
    let start = (row as usize).min(h - 1) * w;
    let src = &data[start..start + w];

    // Reduced planes with an odd offset may come out one sample short of
    // the ceiling-halved size; repeat the edge sample.
    let width = self.widths[component];
    self.line.clear();
    self.line.extend_from_slice(&src[..w.min(width)]);
    let edge = src[w - 1];
    self.line.resize(width, edge);
    Ok(Line {
      component,
      samples: &self.line,
    })
  }
}

/// Collects pushed rows into an OpenJPEG image and compresses it on flush.
struct CompressSession<'a> {
  encoder: Compressor<'a>,
  image: Image,
  rows: Vec<u32>,
}

impl LineSink for CompressSession<'_> {
  fn push(&mut self, component: usize, samples: &[i32]) -> Result<()> {
    let (w, h) = match self.image.components().get(component) {
      Some(comp) => (comp.w as usize, comp.h),
      None => return Err(Error::encode(format!("no component {component}"))),
    };
    let row = self.rows[component];
    if row >= h {
      return Err(Error::encode(format!("too many lines for component {component}")));
    }
    if samples.len() < w {
      return Err(Error::encode(format!(
        "component {component} line has {} samples, expected {w}",
        samples.len()
      )));
    }
    let start = row as usize * w;
    self.image.data_mut(component)?[start..start + w].copy_from_slice(&samples[..w]);
    self.rows[component] += 1;
    Ok(())
  }

  fn flush(self: Box<Self>) -> Result<()> {
    let missing = self
      .image
      .components()
      .iter()
      .zip(&self.rows)
      .position(|(comp, &rows)| rows < comp.h);
    if let Some(component) = missing {
      return Err(Error::encode(format!("component {component} is missing lines")));
    }
    self.encoder.encode(&self.image)?;
    debug!("OpenJPEG encoded {:?}", self.image);
    Ok(())
  }
}
