#![allow(dead_code)]

use std::cell::Cell;
use std::io::Write;

use htj2k_bridge::*;

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

const MAGIC: &[u8; 4] = b"RAWC";

/// Lossless in-memory codec.
///
/// Writes the header fields followed by every component plane at full
/// resolution.  Decoding at level `L` keeps every `2^L`-th sample of each
/// plane.  Records the options of the last decode session.
#[derive(Debug, Default)]
pub struct RawCodec {
  /// Overrides the pull order asked for by the bridge.
  pub force_planar: Option<bool>,
  pub last_options: Cell<Option<DecodeOptions>>,
}

impl RawCodec {
  pub fn with_order(planar: bool) -> Self {
    Self {
      force_planar: Some(planar),
      ..Default::default()
    }
  }
}

struct Reader<'a> {
  bytes: &'a [u8],
}

impl<'a> Reader<'a> {
  fn take(&mut self, n: usize) -> Result<&'a [u8]> {
    if self.bytes.len() < n {
      return Err(Error::MalformedCodestream("truncated raw codestream".into()));
    }
    let (head, tail) = self.bytes.split_at(n);
    self.bytes = tail;
    Ok(head)
  }

  fn u32(&mut self) -> Result<u32> {
    let b = self.take(4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
  }

  fn bool_word(&mut self) -> Result<bool> {
    Ok(self.u32()? != 0)
  }

  fn point(&mut self) -> Result<Point> {
    Ok(Point::new(self.u32()?, self.u32()?))
  }

  fn size(&mut self) -> Result<Size> {
    Ok(Size::new(self.u32()?, self.u32()?))
  }
}

fn write_header(out: &mut EncodedBuffer, header: &CodestreamHeader) -> std::io::Result<()> {
  let frame = &header.frame_info;
  let coding = &header.coding;
  out.write_all(MAGIC)?;
  let mut words = vec![
    frame.width,
    frame.height,
    frame.bits_per_sample as u32,
    frame.component_count,
    frame.is_signed as u32,
    frame.is_using_color_transform as u32,
    coding.decompositions,
    coding.reversible as u32,
    coding.progression_order.index(),
    coding.image_offset.x,
    coding.image_offset.y,
    coding.tile_size.width,
    coding.tile_size.height,
    coding.tile_offset.x,
    coding.tile_offset.y,
    coding.block_dimensions.width,
    coding.block_dimensions.height,
    coding.num_layers,
  ];
  words.extend(coding.down_samples.iter().flat_map(|p| [p.x, p.y]));
  words.push(coding.precincts.len() as u32);
  words.extend(coding.precincts.iter().flat_map(|s| [s.width, s.height]));
  for word in words {
    out.write_all(&word.to_le_bytes())?;
  }
  Ok(())
}

fn read_header(bytes: &[u8]) -> Result<(CodestreamHeader, &[u8])> {
  if !bytes.starts_with(MAGIC) {
    return Err(Error::MalformedCodestream("missing RAWC signature".into()));
  }
  let mut r = Reader { bytes: &bytes[4..] };
  let mut frame_info = FrameInfo::new(r.u32()?, r.u32()?, r.u32()? as u8, r.u32()?, r.bool_word()?);
  frame_info.is_using_color_transform = r.bool_word()?;
  let mut coding = CodingParameters {
    decompositions: r.u32()?,
    reversible: r.bool_word()?,
    progression_order: ProgressionOrder::try_from(r.u32()?)?,
    image_offset: r.point()?,
    tile_size: r.size()?,
    tile_offset: r.point()?,
    block_dimensions: r.size()?,
    num_layers: r.u32()?,
    ..Default::default()
  };
  coding.down_samples = (0..frame_info.component_count)
    .map(|_| r.point())
    .collect::<Result<_>>()?;
  let precincts = r.u32()?;
  coding.precincts = (0..precincts).map(|_| r.size()).collect::<Result<_>>()?;
  Ok((CodestreamHeader { frame_info, coding }, r.bytes))
}

/// Rows of every component, in the order the codec serves them.
fn line_order(planes: &[ComponentPlane], planar: bool) -> Vec<(usize, u32)> {
  if planar {
    planes
      .iter()
      .enumerate()
      .flat_map(|(c, p)| (0..p.size.height).map(move |r| (c, r)))
      .collect()
  } else {
    let height = planes.iter().map(|p| p.size.height).max().unwrap_or(0);
    (0..height)
      .flat_map(|r| {
        planes
          .iter()
          .enumerate()
          .filter(move |(_, p)| r < p.size.height)
          .map(move |(c, _)| (c, r))
      })
      .collect()
  }
}

struct RawLines {
  planes: Vec<Vec<i32>>,
  full: Vec<ComponentPlane>,
  reduced: Vec<ComponentPlane>,
  level: u32,
  order: std::vec::IntoIter<(usize, u32)>,
  line: Vec<i32>,
}

impl LineSource for RawLines {
  fn pull(&mut self) -> Result<Line<'_>> {
    let (c, r) = self
      .order
      .next()
      .ok_or_else(|| Error::DecodeError("no more lines".into()))?;
    let full = self.full[c].size;
    let width = self.reduced[c].size.width;
    let src_row = (r << self.level).min(full.height - 1) as usize;
    let plane = &self.planes[c];
    self.line.clear();
    self.line.extend((0..width).map(|i| {
      let src_col = (i << self.level).min(full.width - 1) as usize;
      plane[src_row * full.width as usize + src_col]
    }));
    Ok(Line {
      component: c,
      samples: &self.line,
    })
  }
}

struct RawSink<'a> {
  out: &'a mut EncodedBuffer,
  planes: Vec<ComponentPlane>,
  data: Vec<Vec<i32>>,
}

impl LineSink for RawSink<'_> {
  fn push(&mut self, component: usize, samples: &[i32]) -> Result<()> {
    let plane = self
      .planes
      .get(component)
      .ok_or_else(|| Error::EncodeError(format!("no component {component}")))?;
    let width = plane.size.width as usize;
    let data = &mut self.data[component];
    if data.len() + width > plane.sample_count() {
      return Err(Error::EncodeError(format!("too many lines for component {component}")));
    }
    if samples.len() != width {
      return Err(Error::EncodeError(format!(
        "line of {} samples for a plane {width} wide",
        samples.len()
      )));
    }
    data.extend_from_slice(samples);
    Ok(())
  }

  fn flush(self: Box<Self>) -> Result<()> {
    let RawSink { out, planes, data } = *self;
    for (plane, data) in planes.iter().zip(&data) {
      if data.len() != plane.sample_count() {
        return Err(Error::EncodeError("missing lines".into()));
      }
      for v in data {
        out.write_all(&v.to_le_bytes()).map_err(anyhow::Error::from)?;
      }
    }
    Ok(())
  }
}

impl Codec for RawCodec {
  fn parse_header(&self, bytes: &[u8]) -> Result<CodestreamHeader> {
    read_header(bytes).map(|(header, _)| header)
  }

  fn open_decoder<'a>(
    &'a self,
    bytes: &'a [u8],
    header: &CodestreamHeader,
    options: DecodeOptions,
  ) -> Result<Box<dyn LineSource + 'a>> {
    self.last_options.set(Some(options));
    let (_, mut body) = read_header(bytes)?;
    let frame = &header.frame_info;
    let full: Vec<ComponentPlane> = (0..frame.component_count as usize)
      .map(|c| header.coding.component_plane(frame, c, 0))
      .collect();
    let reduced: Vec<ComponentPlane> = (0..frame.component_count as usize)
      .map(|c| header.coding.component_plane(frame, c, options.level))
      .collect();
    let mut planes = Vec::new();
    for plane in &full {
      let n = plane.sample_count() * 4;
      if body.len() < n {
        return Err(Error::DecodeError("truncated plane".into()));
      }
      let (head, tail) = body.split_at(n);
      planes.push(
        head
          .chunks_exact(4)
          .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
          .collect(),
      );
      body = tail;
    }
    let planar = self.force_planar.unwrap_or(options.planar);
    let order = line_order(&reduced, planar);
    Ok(Box::new(RawLines {
      planes,
      full,
      reduced,
      level: options.level,
      order: order.into_iter(),
      line: Vec::new(),
    }))
  }

  fn open_encoder<'a>(
    &'a self,
    header: &CodestreamHeader,
    out: &'a mut EncodedBuffer,
  ) -> Result<Box<dyn LineSink + 'a>> {
    write_header(out, header).map_err(anyhow::Error::from)?;
    let frame = &header.frame_info;
    let planes: Vec<ComponentPlane> = (0..frame.component_count as usize)
      .map(|c| header.coding.component_plane(frame, c, 0))
      .collect();
    let data = planes.iter().map(|p| Vec::with_capacity(p.sample_count())).collect();
    Ok(Box::new(RawSink { out, planes, data }))
  }
}

/// Serves `header` and lines filled with `values`, cycled.
#[derive(Debug, Clone)]
pub struct ScriptedCodec {
  pub header: CodestreamHeader,
  pub values: Vec<i32>,
  /// Samples per line, the plane width when `None`.
  pub line_len: Option<usize>,
  /// Component index reported on every line, the real one when `None`.
  pub component: Option<usize>,
}

impl ScriptedCodec {
  pub fn new(frame_info: FrameInfo, values: Vec<i32>) -> Self {
    let coding = CodingParameters {
      down_samples: vec![Point::new(1, 1); frame_info.component_count as usize],
      ..Default::default()
    };
    Self {
      header: CodestreamHeader { frame_info, coding },
      values,
      line_len: None,
      component: None,
    }
  }
}

struct ScriptedLines {
  order: std::vec::IntoIter<(usize, u32)>,
  widths: Vec<usize>,
  values: Vec<i32>,
  line_len: Option<usize>,
  component: Option<usize>,
  next: usize,
  line: Vec<i32>,
}

impl LineSource for ScriptedLines {
  fn pull(&mut self) -> Result<Line<'_>> {
    let (c, _) = self
      .order
      .next()
      .ok_or_else(|| Error::DecodeError("no more lines".into()))?;
    let len = self.line_len.unwrap_or(self.widths[c]);
    self.line.clear();
    for _ in 0..len {
      self.line.push(self.values[self.next % self.values.len()]);
      self.next += 1;
    }
    Ok(Line {
      component: self.component.unwrap_or(c),
      samples: &self.line,
    })
  }
}

impl Codec for ScriptedCodec {
  fn parse_header(&self, bytes: &[u8]) -> Result<CodestreamHeader> {
    if bytes.is_empty() {
      return Err(Error::MalformedCodestream("empty".into()));
    }
    Ok(self.header.clone())
  }

  fn open_decoder<'a>(
    &'a self,
    _bytes: &'a [u8],
    header: &CodestreamHeader,
    options: DecodeOptions,
  ) -> Result<Box<dyn LineSource + 'a>> {
    let frame = &header.frame_info;
    let planes: Vec<ComponentPlane> = (0..frame.component_count as usize)
      .map(|c| header.coding.component_plane(frame, c, options.level))
      .collect();
    Ok(Box::new(ScriptedLines {
      order: line_order(&planes, options.planar).into_iter(),
      widths: planes.iter().map(|p| p.size.width as usize).collect(),
      values: self.values.clone(),
      line_len: self.line_len,
      component: self.component,
      next: 0,
      line: Vec::new(),
    }))
  }

  fn open_encoder<'a>(
    &'a self,
    _header: &CodestreamHeader,
    _out: &'a mut EncodedBuffer,
  ) -> Result<Box<dyn LineSink + 'a>> {
    Err(Error::EncodeError("scripted codec only decodes".into()))
  }
}

/// Deterministic 16-bit signed test pattern, `width * height` samples.
pub fn signed_ramp(width: u32, height: u32) -> Vec<i16> {
  (0..width * height)
    .map(|i| {
      let (x, y) = ((i % width) as i32, (i / width) as i32);
      ((x * 131 + y * 71) % 65536 - 32768) as i16
    })
    .collect()
}
