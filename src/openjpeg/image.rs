use std::ptr;

use super::*;

/// An OpenJPEG image.
pub(crate) struct Image {
  img: ptr::NonNull<sys::opj_image_t>,
}

impl Drop for Image {
  fn drop(&mut self) {
    unsafe {
      sys::opj_image_destroy(self.img.as_ptr());
    }
  }
}

impl std::fmt::Debug for Image {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let img = self.image();
    f.debug_struct("Image")
      .field("x0", &img.x0)
      .field("y0", &img.y0)
      .field("x1", &img.x1)
      .field("y1", &img.y1)
      .field("numcomps", &img.numcomps)
      .finish()
  }
}

impl Image {
  pub(crate) fn new(ptr: *mut sys::opj_image_t) -> Result<Self> {
    let img =
      ptr::NonNull::new(ptr).ok_or(Error::NullPointerError("Image: NULL `opj_image_t`"))?;
    Ok(Self { img })
  }

  /// Allocate an image with the component planes of `header`.
  pub(crate) fn create(header: &CodestreamHeader) -> Result<Self> {
    let frame = &header.frame_info;
    let coding = &header.coding;
    let mut params = (0..frame.component_count as usize)
      .map(|c| {
        let plane = coding.component_plane(frame, c, 0);
        let mut param = unsafe { std::mem::zeroed::<sys::opj_image_cmptparm_t>() };
        param.dx = plane.down_sample.x;
        param.dy = plane.down_sample.y;
        param.w = plane.size.width;
        param.h = plane.size.height;
        param.x0 = ceil_div(coding.image_offset.x, plane.down_sample.x);
        param.y0 = ceil_div(coding.image_offset.y, plane.down_sample.y);
        param.prec = frame.bits_per_sample as u32;
        param.sgnd = frame.is_signed as u32;
        param
      })
      .collect::<Vec<_>>();
    let color_space = if frame.component_count >= 3 {
      sys::COLOR_SPACE::OPJ_CLRSPC_SRGB
    } else {
      sys::COLOR_SPACE::OPJ_CLRSPC_GRAY
    };

    let ptr =
      unsafe { sys::opj_image_create(frame.component_count, params.as_mut_ptr(), color_space) };
    let mut image = Self::new(ptr)?;
    let img = image.image_mut();
    img.x0 = coding.image_offset.x;
    img.y0 = coding.image_offset.y;
    img.x1 = coding
      .image_offset
      .x
      .checked_add(frame.width)
      .ok_or_else(|| Error::encode("image extent overflows"))?;
    img.y1 = coding
      .image_offset
      .y
      .checked_add(frame.height)
      .ok_or_else(|| Error::encode("image extent overflows"))?;
    Ok(image)
  }

  fn image(&self) -> &sys::opj_image_t {
    unsafe { self.img.as_ref() }
  }

  fn image_mut(&mut self) -> &mut sys::opj_image_t {
    unsafe { self.img.as_mut() }
  }

  pub(crate) fn as_ptr(&self) -> *mut sys::opj_image_t {
    self.img.as_ptr()
  }

  /// Reference grid offset.
  pub(crate) fn offset(&self) -> Point {
    let img = self.image();
    Point::new(img.x0, img.y0)
  }

  /// Size on the reference grid.
  pub(crate) fn size(&self) -> Size {
    let img = self.image();
    Size::new(img.x1 - img.x0, img.y1 - img.y0)
  }

  pub(crate) fn components(&self) -> &[sys::opj_image_comp_t] {
    let img = self.image();
    if img.comps.is_null() {
      return &[];
    }
    unsafe { std::slice::from_raw_parts(img.comps, img.numcomps as usize) }
  }

  fn component(&self, component: usize) -> Result<&sys::opj_image_comp_t> {
    self
      .components()
      .get(component)
      .ok_or_else(|| Error::Other(anyhow::anyhow!("no image component {component}")))
  }

  /// Samples of `component`, `w * h` values row by row.
  pub(crate) fn data(&self, component: usize) -> Result<&[i32]> {
    let comp = self.component(component)?;
    if comp.data.is_null() {
      return Err(Error::NullPointerError("ImageComponent: NULL data"));
    }
    let len = comp.w as usize * comp.h as usize;
    Ok(unsafe { std::slice::from_raw_parts(comp.data, len) })
  }

  pub(crate) fn data_mut(&mut self, component: usize) -> Result<&mut [i32]> {
    let comp = self.component(component)?;
    if comp.data.is_null() {
      return Err(Error::NullPointerError("ImageComponent: NULL data"));
    }
    let len = comp.w as usize * comp.h as usize;
    Ok(unsafe { std::slice::from_raw_parts_mut(comp.data, len) })
  }
}
