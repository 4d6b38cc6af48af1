use super::*;

/// Most decomposition levels a codestream can signal.
pub const MAX_DECOMPOSITIONS: u32 = 32;

/// Validated coding configuration shared with the codec.
///
/// Built from [`EncodeParameters`] before an encode, or filled in by
/// [`Codec::parse_header`] on decode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodingParameters {
  pub decompositions: u32,
  pub reversible: bool,
  /// Irreversible quantization step.  Unused on the reversible path.
  pub quantization_step: f32,
  pub progression_order: ProgressionOrder,
  /// Subsampling factor of each component.
  pub down_samples: Vec<Point>,
  pub image_offset: Point,
  /// Zero means the image is a single tile.
  pub tile_size: Size,
  pub tile_offset: Point,
  pub block_dimensions: Size,
  /// Precinct size per resolution level, lowest resolution first.  Empty
  /// lets the codec use its default (maximal) precincts.
  pub precincts: Vec<Size>,
  pub num_layers: u32,
  pub tlm_marker: bool,
  pub tile_parts_at_resolutions: bool,
  pub tile_parts_at_components: bool,
}

impl Default for CodingParameters {
  fn default() -> Self {
    Self {
      decompositions: 5,
      reversible: true,
      quantization_step: -1.0,
      progression_order: ProgressionOrder::Rpcl,
      down_samples: Vec::new(),
      image_offset: Point::default(),
      tile_size: Size::default(),
      tile_offset: Point::default(),
      block_dimensions: Size::new(64, 64),
      precincts: Vec::new(),
      num_layers: 1,
      tlm_marker: false,
      tile_parts_at_resolutions: false,
      tile_parts_at_components: false,
    }
  }
}

impl CodingParameters {
  /// Subsampling of `component`, `(1, 1)` when not recorded.
  pub fn down_sample(&self, component: usize) -> Point {
    self.down_samples.get(component).copied().unwrap_or(Point::new(1, 1))
  }

  /// Plane geometry of `component` at decomposition `level`.
  pub fn component_plane(&self, frame: &FrameInfo, component: usize, level: u32) -> ComponentPlane {
    ComponentPlane::new(frame.size(), self.image_offset, self.down_sample(component), level)
  }

  /// Reason the image area of `frame` cannot be laid out on the reference
  /// grid, if any.
  pub(crate) fn geometry_problem(&self, frame: &FrameInfo) -> Option<String> {
    let offset = self.image_offset;
    if offset.x.checked_add(frame.width).is_none() || offset.y.checked_add(frame.height).is_none() {
      return Some(format!(
        "image offset ({}, {}) plus size {}x{} overflows the reference grid",
        offset.x, offset.y, frame.width, frame.height
      ));
    }
    if frame.width == 0 || frame.height == 0 {
      return None;
    }
    (0..frame.component_count as usize).find_map(|c| {
      let plane = self.component_plane(frame, c, 0);
      (plane.sample_count() == 0).then(|| {
        format!(
          "component {c} subsampled by {}x{} has no samples",
          plane.down_sample.x, plane.down_sample.y
        )
      })
    })
  }
}

/// Frame description plus coding parameters of one codestream.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CodestreamHeader {
  pub frame_info: FrameInfo,
  pub coding: CodingParameters,
}

/// Encoder settings.
///
/// Setters only store values.  [`EncodeParameters::build`] checks them
/// against the frame and produces the [`CodingParameters`] handed to the
/// codec.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncodeParameters {
  coding: CodingParameters,
  color_transform: bool,
}

impl EncodeParameters {
  pub fn new() -> Self {
    Default::default()
  }

  /// Sets the number of wavelet decompositions.
  ///
  /// Clears any precincts; they have to be given again for the new count.
  pub fn decompositions(mut self, decompositions: u32) -> Self {
    self.set_decompositions(decompositions);
    self
  }

  /// Selects lossless coding, or lossy coding with `quantization_step`.
  pub fn quality(mut self, lossless: bool, quantization_step: f32) -> Self {
    self.set_quality(lossless, quantization_step);
    self
  }

  pub fn progression_order(mut self, order: ProgressionOrder) -> Self {
    self.coding.progression_order = order;
    self
  }

  pub fn image_offset(mut self, offset: Point) -> Self {
    self.coding.image_offset = offset;
    self
  }

  pub fn tile_size(mut self, size: Size) -> Self {
    self.coding.tile_size = size;
    self
  }

  pub fn tile_offset(mut self, offset: Point) -> Self {
    self.coding.tile_offset = offset;
    self
  }

  pub fn block_dimensions(mut self, size: Size) -> Self {
    self.coding.block_dimensions = size;
    self
  }

  /// One precinct size per decomposition level, lowest resolution first.
  pub fn precincts(mut self, precincts: Vec<Size>) -> Self {
    self.coding.precincts = precincts;
    self
  }

  pub fn color_transform(mut self, enabled: bool) -> Self {
    self.color_transform = enabled;
    self
  }

  pub fn tlm_marker(mut self, enabled: bool) -> Self {
    self.coding.tlm_marker = enabled;
    self
  }

  pub fn tile_parts_at_resolutions(mut self, enabled: bool) -> Self {
    self.coding.tile_parts_at_resolutions = enabled;
    self
  }

  pub fn tile_parts_at_components(mut self, enabled: bool) -> Self {
    self.coding.tile_parts_at_components = enabled;
    self
  }

  pub(crate) fn set_decompositions(&mut self, decompositions: u32) {
    self.coding.decompositions = decompositions;
    self.coding.precincts.clear();
  }

  pub(crate) fn set_quality(&mut self, lossless: bool, quantization_step: f32) {
    self.coding.reversible = lossless;
    self.coding.quantization_step = quantization_step;
  }

  pub(crate) fn coding_mut(&mut self) -> &mut CodingParameters {
    &mut self.coding
  }

  pub(crate) fn set_color_transform(&mut self, enabled: bool) {
    self.color_transform = enabled;
  }

  pub(crate) fn reset_down_samples(&mut self, components: u32) {
    self.coding.down_samples = vec![Point::new(1, 1); components as usize];
  }

  pub(crate) fn set_down_sample(&mut self, component: usize, factor: Point) {
    if self.coding.down_samples.len() <= component {
      self.coding.down_samples.resize(component + 1, Point::new(1, 1));
    }
    self.coding.down_samples[component] = factor;
  }

  pub fn get_decompositions(&self) -> u32 {
    self.coding.decompositions
  }

  pub fn is_lossless(&self) -> bool {
    self.coding.reversible
  }

  pub fn get_quantization_step(&self) -> f32 {
    self.coding.quantization_step
  }

  pub fn get_progression_order(&self) -> ProgressionOrder {
    self.coding.progression_order
  }

  pub fn get_precincts(&self) -> &[Size] {
    &self.coding.precincts
  }

  pub fn get_down_samples(&self) -> &[Point] {
    &self.coding.down_samples
  }

  pub fn is_using_color_transform(&self) -> bool {
    self.color_transform
  }

  /// Validate the settings against `frame` and freeze them.
  ///
  /// The returned header carries `frame` with the color transform flag
  /// folded in.  A missing downsampling list defaults to `(1, 1)` for every
  /// component.
  pub fn build(&self, frame: &FrameInfo) -> Result<CodestreamHeader> {
    frame.validate()?;
    let mut coding = self.coding.clone();
    if coding.down_samples.is_empty() {
      coding.down_samples = vec![Point::new(1, 1); frame.component_count as usize];
    }

    if coding.decompositions > MAX_DECOMPOSITIONS {
      return Err(Error::encode(format!(
        "{} decompositions exceeds the maximum of {MAX_DECOMPOSITIONS}",
        coding.decompositions
      )));
    }
    if !coding.precincts.is_empty() && coding.precincts.len() != coding.decompositions as usize {
      return Err(Error::encode(format!(
        "{} precincts given for {} decompositions",
        coding.precincts.len(),
        coding.decompositions
      )));
    }
    for precinct in &coding.precincts {
      if !precinct.width.is_power_of_two() || !precinct.height.is_power_of_two() {
        return Err(Error::encode(format!(
          "precinct {}x{} is not a power of two",
          precinct.width, precinct.height
        )));
      }
    }

    let block = coding.block_dimensions;
    let valid_side = |side: u32| side.is_power_of_two() && (4..=1024).contains(&side);
    if !valid_side(block.width) || !valid_side(block.height) || block.width * block.height > 4096 {
      return Err(Error::encode(format!(
        "invalid code-block dimensions {}x{}",
        block.width, block.height
      )));
    }

    if (coding.tile_size.width == 0) != (coding.tile_size.height == 0) {
      return Err(Error::encode(format!(
        "invalid tile size {}x{}",
        coding.tile_size.width, coding.tile_size.height
      )));
    }

    if coding.down_samples.len() != frame.component_count as usize {
      return Err(Error::encode(format!(
        "{} downsampling factors given for {} components",
        coding.down_samples.len(),
        frame.component_count
      )));
    }
    if let Some(bad) = coding
      .down_samples
      .iter()
      .find(|ds| !(1..=255).contains(&ds.x) || !(1..=255).contains(&ds.y))
    {
      return Err(Error::encode(format!("invalid downsampling factor {}x{}", bad.x, bad.y)));
    }

    if let Some(problem) = coding.geometry_problem(frame) {
      return Err(Error::encode(problem));
    }

    if !coding.reversible && !(coding.quantization_step > 0.0) {
      return Err(Error::encode(format!(
        "lossy coding needs a positive quantization step, got {}",
        coding.quantization_step
      )));
    }

    if self.color_transform && frame.component_count < 3 {
      return Err(Error::encode(format!(
        "color transform needs at least 3 components, got {}",
        frame.component_count
      )));
    }

    let frame_info = FrameInfo {
      is_using_color_transform: self.color_transform,
      ..*frame
    };
    Ok(CodestreamHeader { frame_info, coding })
  }
}
