use super::*;

/// Geometry of one component plane at a decomposition level.
///
/// A component subsampled by `(dx, dy)` covers the reference grid from the
/// image offset to the image extent, so its plane is
/// `ceil((ox + w) / dx) - ceil(ox / dx)` samples wide (likewise for the
/// height).  Each decomposition level ceiling-halves the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentPlane {
  pub size: Size,
  pub down_sample: Point,
  offset: Point,
}

impl ComponentPlane {
  pub fn new(image_size: Size, image_offset: Point, down_sample: Point, level: u32) -> Self {
    let dx = down_sample.x.max(1);
    let dy = down_sample.y.max(1);
    let full = Size::new(
      axis_len(image_offset.x, image_size.width, dx),
      axis_len(image_offset.y, image_size.height, dy),
    );
    let offset = Size::new(image_offset.x, image_offset.y).at_decomposition_level(level);
    Self {
      size: full.at_decomposition_level(level),
      down_sample: Point::new(dx, dy),
      offset: Point::new(offset.width, offset.height),
    }
  }

  /// One sample per pixel.
  pub fn is_full_grid(&self) -> bool {
    self.down_sample == Point::new(1, 1)
  }

  /// Number of plane samples, over all rows.
  pub fn sample_count(&self) -> usize {
    self.size.width as usize * self.size.height as usize
  }

  /// Plane column holding pixel column `x`.
  pub fn sample_column(&self, x: u32) -> u32 {
    axis_sample(x, self.offset.x, self.down_sample.x, self.size.width)
  }

  /// Plane row holding pixel row `y`.
  pub fn sample_row(&self, y: u32) -> u32 {
    axis_sample(y, self.offset.y, self.down_sample.y, self.size.height)
  }

  /// Pixel column that plane column `i` is sampled from.
  pub fn pixel_column(&self, i: u32, image_width: u32) -> u32 {
    axis_pixel(i, self.offset.x, self.down_sample.x, image_width)
  }

  /// Pixel row that plane row `r` is sampled from.
  pub fn pixel_row(&self, r: u32, image_height: u32) -> u32 {
    axis_pixel(r, self.offset.y, self.down_sample.y, image_height)
  }
}

fn axis_len(offset: u32, len: u32, factor: u32) -> u32 {
  ceil_div(offset.saturating_add(len), factor) - ceil_div(offset, factor)
}

fn axis_sample(pixel: u32, offset: u32, factor: u32, samples: u32) -> u32 {
  (pixel.saturating_add(offset) / factor)
    .saturating_sub(ceil_div(offset, factor))
    .min(samples.saturating_sub(1))
}

fn axis_pixel(sample: u32, offset: u32, factor: u32, pixels: u32) -> u32 {
  ceil_div(offset, factor)
    .saturating_add(sample)
    .saturating_mul(factor)
    .saturating_sub(offset)
    .min(pixels.saturating_sub(1))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_grid_is_identity() {
    let plane = ComponentPlane::new(Size::new(5, 3), Point::new(0, 0), Point::new(1, 1), 0);
    assert!(plane.is_full_grid());
    assert_eq!(plane.size, Size::new(5, 3));
    for x in 0..5 {
      assert_eq!(plane.sample_column(x), x);
      assert_eq!(plane.pixel_column(x, 5), x);
    }
  }

  #[test]
  fn subsampled_plane_size() {
    let plane = ComponentPlane::new(Size::new(5, 3), Point::new(0, 0), Point::new(2, 2), 0);
    assert_eq!(plane.size, Size::new(3, 2));
    assert_eq!(plane.sample_count(), 6);
    // Pixels 0,1 -> sample 0; 2,3 -> 1; 4 -> 2.
    let columns: Vec<u32> = (0..5).map(|x| plane.sample_column(x)).collect();
    assert_eq!(columns, [0, 0, 1, 1, 2]);
    let pixels: Vec<u32> = (0..3).map(|i| plane.pixel_column(i, 5)).collect();
    assert_eq!(pixels, [0, 2, 4]);
  }

  #[test]
  fn subsampled_plane_with_offset() {
    // Reference grid columns 1..6, samples at grid columns 2 and 4.
    let plane = ComponentPlane::new(Size::new(5, 1), Point::new(1, 0), Point::new(2, 1), 0);
    assert_eq!(plane.size.width, 3 - 1);
    let pixels: Vec<u32> = (0..2).map(|i| plane.pixel_column(i, 5)).collect();
    assert_eq!(pixels, [1, 3]);
    for (i, pixel) in pixels.into_iter().enumerate() {
      assert_eq!(plane.sample_column(pixel), i as u32);
    }
  }

  #[test]
  fn reduced_plane_is_ceiling_halved() {
    let plane = ComponentPlane::new(Size::new(2559, 99), Point::new(0, 0), Point::new(1, 1), 3);
    assert_eq!(plane.size, Size::new(320, 13));
  }
}
