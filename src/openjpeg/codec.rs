use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr;

use log::{log_enabled, warn, Level};

use super::*;

/// OpenJPEG decompression parameters.
pub(crate) struct DecodeParameters {
  params: sys::opj_dparameters,
}

impl Default for DecodeParameters {
  fn default() -> Self {
    let params = unsafe {
      let mut ptr = std::mem::zeroed::<sys::opj_dparameters>();
      sys::opj_set_default_decoder_parameters(&mut ptr as *mut _);
      ptr
    };
    Self { params }
  }
}

impl DecodeParameters {
  /// Skip `reduce` resolution levels.
  pub(crate) fn reduce(mut self, reduce: u32) -> Self {
    self.params.cp_reduce = reduce;
    self
  }

  pub(crate) fn as_ptr(&mut self) -> &mut sys::opj_dparameters {
    &mut self.params
  }
}

/// OpenJPEG compression parameters derived from a [`CodestreamHeader`].
pub(crate) struct CompressParameters {
  params: sys::opj_cparameters,
  /// Set through the encoder's extra options, `opj_cparameters` has no field.
  tlm_marker: bool,
}

impl CompressParameters {
  pub(crate) fn from_header(header: &CodestreamHeader) -> Self {
    let coding = &header.coding;
    let mut params = unsafe {
      let mut ptr = std::mem::zeroed::<sys::opj_cparameters>();
      sys::opj_set_default_encoder_parameters(&mut ptr as *mut _);
      ptr
    };

    // A single quality layer at rate 0 keeps every coding pass.
    params.tcp_numlayers = 1;
    params.tcp_rates[0] = 0.0;
    params.cp_disto_alloc = 1;

    let resolutions = coding.decompositions + 1;
    params.numresolution = resolutions as i32;
    params.irreversible = if coding.reversible { 0 } else { 1 };
    if !coding.reversible {
      warn!(
        "quantization step {} is not configurable with OpenJPEG, using its irreversible defaults",
        coding.quantization_step
      );
    }
    params.prog_order = coding.progression_order.into();
    params.cblockw_init = coding.block_dimensions.width as i32;
    params.cblockh_init = coding.block_dimensions.height as i32;

    if let Some(last) = coding.precincts.len().checked_sub(1) {
      // OpenJPEG lists precincts from the highest resolution down.
      params.csty |= 0x01;
      params.res_spec = resolutions as i32;
      for p in 0..resolutions as usize {
        let res = resolutions as usize - 1 - p;
        let size = coding.precincts[res.min(last)];
        params.prcw_init[p] = size.width as i32;
        params.prch_init[p] = size.height as i32;
      }
    }

    if !coding.tile_size.is_zero() {
      params.tile_size_on = 1;
      params.cp_tx0 = coding.tile_offset.x as i32;
      params.cp_ty0 = coding.tile_offset.y as i32;
      params.cp_tdx = coding.tile_size.width as i32;
      params.cp_tdy = coding.tile_size.height as i32;
    }

    match (coding.tile_parts_at_resolutions, coding.tile_parts_at_components) {
      (true, both) => {
        if both {
          warn!("OpenJPEG splits tile-parts on one axis only, using resolutions");
        }
        params.tp_on = 1;
        params.tp_flag = b'R' as _;
      }
      (false, true) => {
        params.tp_on = 1;
        params.tp_flag = b'C' as _;
      }
      (false, false) => (),
    }

    params.tcp_mct = if header.frame_info.is_using_color_transform { 1 } else { 0 };
    Self {
      params,
      tlm_marker: coding.tlm_marker,
    }
  }
}

pub(crate) struct CodecHandle {
  codec: ptr::NonNull<sys::opj_codec_t>,
}

impl Drop for CodecHandle {
  fn drop(&mut self) {
    unsafe {
      sys::opj_destroy_codec(self.codec.as_ptr());
    }
  }
}

extern "C" fn log_info(msg: *const c_char, _data: *mut c_void) {
  unsafe {
    log::info!("{:?}", CStr::from_ptr(msg).to_string_lossy());
  }
}

extern "C" fn log_warn(msg: *const c_char, _data: *mut c_void) {
  unsafe {
    log::warn!("{:?}", CStr::from_ptr(msg).to_string_lossy());
  }
}

extern "C" fn log_error(msg: *const c_char, _data: *mut c_void) {
  unsafe {
    log::error!("{:?}", CStr::from_ptr(msg).to_string_lossy());
  }
}

impl CodecHandle {
  fn new(fmt: J2KFormat, is_decoder: bool) -> Result<Self> {
    let format: sys::CODEC_FORMAT = fmt.into();
    let ptr = unsafe {
      if is_decoder {
        ptr::NonNull::new(sys::opj_create_decompress(format))
      } else {
        ptr::NonNull::new(sys::opj_create_compress(format))
      }
    };
    let ptr = ptr.ok_or(Error::NullPointerError("Codec: NULL `opj_codec_t`"))?;
    let null = ptr::null_mut();
    unsafe {
      if log_enabled!(Level::Info) {
        sys::opj_set_info_handler(ptr.as_ptr(), Some(log_info), null);
      }
      if log_enabled!(Level::Warn) {
        sys::opj_set_warning_handler(ptr.as_ptr(), Some(log_warn), null);
      }
      sys::opj_set_error_handler(ptr.as_ptr(), Some(log_error), null);
    }
    Ok(Self { codec: ptr })
  }

  pub(crate) fn as_ptr(&self) -> *mut sys::opj_codec_t {
    self.codec.as_ptr()
  }
}

/// Main header details that `opj_image_t` does not carry.
pub(crate) struct CodestreamInfo {
  info: ptr::NonNull<sys::opj_codestream_info_v2_t>,
}

impl Drop for CodestreamInfo {
  fn drop(&mut self) {
    let mut ptr = self.info.as_ptr();
    unsafe {
      sys::opj_destroy_cstr_info(&mut ptr);
    }
  }
}

impl CodestreamInfo {
  pub(crate) fn info(&self) -> &sys::opj_codestream_info_v2_t {
    unsafe { self.info.as_ref() }
  }

  /// Coding style of the first component in the default tile.
  pub(crate) fn component_style(&self) -> Option<&sys::opj_tccp_info_t> {
    unsafe { self.info().m_default_tile_info.tccp_info.as_ref() }
  }
}

pub(crate) struct Decompressor<'a> {
  codec: CodecHandle,
  stream: Stream<'a>,
}

impl<'a> Decompressor<'a> {
  pub(crate) fn new(stream: Stream<'a>, fmt: J2KFormat) -> Result<Self> {
    let codec = CodecHandle::new(fmt, true)?;
    Ok(Self { codec, stream })
  }

  pub(crate) fn setup(&self, mut params: DecodeParameters) -> Result<()> {
    let res = unsafe { sys::opj_setup_decoder(self.as_ptr(), params.as_ptr()) };
    if res == 1 {
      Ok(())
    } else {
      Err(Error::decode("failed to setup decoder with parameters"))
    }
  }

  /// Read the main header.  Failures mean the codestream is malformed.
  pub(crate) fn read_header(&self) -> Result<Image> {
    let mut img: *mut sys::opj_image_t = ptr::null_mut();

    let res = unsafe { sys::opj_read_header(self.stream.as_ptr(), self.as_ptr(), &mut img) };
    // Wrap the image before checking `res`, it may have been allocated anyway.
    let img = Image::new(img);
    if res == 1 {
      img
    } else {
      Err(Error::malformed("failed to read codestream header"))
    }
  }

  pub(crate) fn codestream_info(&self) -> Result<CodestreamInfo> {
    let info = unsafe { sys::opj_get_cstr_info(self.as_ptr()) };
    let info = ptr::NonNull::new(info)
      .ok_or(Error::NullPointerError("CodestreamInfo: NULL `opj_codestream_info_v2_t`"))?;
    Ok(CodestreamInfo { info })
  }

  pub(crate) fn decode(&self, img: &Image) -> Result<()> {
    let res = unsafe {
      sys::opj_decode(self.as_ptr(), self.stream.as_ptr(), img.as_ptr()) == 1
        && sys::opj_end_decompress(self.as_ptr(), self.stream.as_ptr()) == 1
    };
    if res {
      Ok(())
    } else {
      Err(Error::decode("failed to decode codestream"))
    }
  }

  pub(crate) fn as_ptr(&self) -> *mut sys::opj_codec_t {
    self.codec.as_ptr()
  }
}

const TLM_OPTION: &[u8] = b"TLM=YES\0";

pub(crate) struct Compressor<'a> {
  codec: CodecHandle,
  stream: Stream<'a>,
}

impl<'a> Compressor<'a> {
  pub(crate) fn new(stream: Stream<'a>) -> Result<Self> {
    let codec = CodecHandle::new(J2KFormat::J2K, false)?;
    Ok(Self { codec, stream })
  }

  pub(crate) fn setup(&self, mut params: CompressParameters, img: &Image) -> Result<()> {
    let res = unsafe { sys::opj_setup_encoder(self.as_ptr(), &mut params.params, img.as_ptr()) };
    if res != 1 {
      return Err(Error::encode("failed to setup encoder with parameters"));
    }
    if params.tlm_marker {
      let options: [*const c_char; 2] = [TLM_OPTION.as_ptr() as *const c_char, ptr::null()];
      let res = unsafe { sys::opj_encoder_set_extra_options(self.as_ptr(), options.as_ptr()) };
      if res != 1 {
        return Err(Error::encode("failed to enable TLM markers"));
      }
    }
    Ok(())
  }

  /// Compress `img`.  OpenJPEG takes over the component data.
  pub(crate) fn encode(&self, img: &Image) -> Result<()> {
    let res = unsafe {
      sys::opj_start_compress(self.as_ptr(), img.as_ptr(), self.stream.as_ptr()) == 1
        && sys::opj_encode(self.as_ptr(), self.stream.as_ptr()) == 1
        && sys::opj_end_compress(self.as_ptr(), self.stream.as_ptr()) == 1
    };
    if res {
      Ok(())
    } else {
      Err(Error::encode("failed to encode image"))
    }
  }

  pub(crate) fn as_ptr(&self) -> *mut sys::opj_codec_t {
    self.codec.as_ptr()
  }
}
