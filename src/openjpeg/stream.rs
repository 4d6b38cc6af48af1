use std::io::{Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::os::raw::c_void;
use std::ptr;

use super::*;

struct WrappedSlice<'a> {
  offset: usize,
  buf: &'a [u8],
}

impl<'a> WrappedSlice<'a> {
  fn new(buf: &'a [u8]) -> Box<Self> {
    Box::new(Self { offset: 0, buf })
  }

  fn remaining(&self) -> usize {
    self.buf.len() - self.offset
  }

  fn seek(&mut self, new_offset: usize) -> usize {
    self.offset = std::cmp::min(self.buf.len(), new_offset);
    self.offset
  }

  fn consume(&mut self, n_bytes: usize) -> usize {
    let offset = self.offset.saturating_add(n_bytes);
    self.offset = std::cmp::min(self.buf.len(), offset);
    self.offset
  }

  fn read_into(&mut self, out_buffer: &mut [u8]) -> Option<usize> {
    let remaining = self.remaining();
    if remaining == 0 {
      return None;
    }

    let n_read = std::cmp::min(remaining, out_buffer.len());
    let offset = self.offset;
    let end_off = self.consume(n_read);
    out_buffer[0..n_read].copy_from_slice(&self.buf[offset..end_off]);

    Some(n_read)
  }
}

extern "C" fn buf_read_stream_free_fn(p_data: *mut c_void) {
  let ptr = p_data as *mut WrappedSlice;
  drop(unsafe { Box::from_raw(ptr) })
}

extern "C" fn buf_read_stream_read_fn(
  p_buffer: *mut c_void,
  nb_bytes: usize,
  p_data: *mut c_void,
) -> usize {
  if p_buffer.is_null() || nb_bytes == 0 {
    return 0;
  }

  let slice = unsafe { &mut *(p_data as *mut WrappedSlice) };
  let out_buf = unsafe { std::slice::from_raw_parts_mut(p_buffer as *mut u8, nb_bytes) };
  // `(OPJ_SIZE_T)-1` marks the end of the stream.
  slice.read_into(out_buf).unwrap_or(usize::MAX)
}

extern "C" fn buf_read_stream_skip_fn(nb_bytes: i64, p_data: *mut c_void) -> i64 {
  let slice = unsafe { &mut *(p_data as *mut WrappedSlice) };
  let start = slice.offset;
  let end = slice.consume(nb_bytes.max(0) as usize);
  (end - start) as i64
}

extern "C" fn buf_read_stream_seek_fn(nb_bytes: i64, p_data: *mut c_void) -> i32 {
  let slice = unsafe { &mut *(p_data as *mut WrappedSlice) };
  let seek_offset = nb_bytes.max(0) as usize;
  let new_offset = slice.seek(seek_offset);

  if seek_offset == new_offset {
    1
  } else {
    0
  }
}

extern "C" fn buf_write_stream_write_fn(
  p_buffer: *mut c_void,
  nb_bytes: usize,
  p_data: *mut c_void,
) -> usize {
  if p_buffer.is_null() || nb_bytes == 0 {
    return 0;
  }

  let out = unsafe { &mut *(p_data as *mut EncodedBuffer) };
  let bytes = unsafe { std::slice::from_raw_parts(p_buffer as *const u8, nb_bytes) };
  match out.write_all(bytes) {
    Ok(()) => nb_bytes,
    Err(_) => usize::MAX,
  }
}

extern "C" fn buf_write_stream_skip_fn(nb_bytes: i64, p_data: *mut c_void) -> i64 {
  let out = unsafe { &mut *(p_data as *mut EncodedBuffer) };
  match out.seek(SeekFrom::Current(nb_bytes)) {
    Ok(_) => nb_bytes,
    Err(_) => -1,
  }
}

extern "C" fn buf_write_stream_seek_fn(nb_bytes: i64, p_data: *mut c_void) -> i32 {
  let out = unsafe { &mut *(p_data as *mut EncodedBuffer) };
  match u64::try_from(nb_bytes).map(|pos| out.seek(SeekFrom::Start(pos))) {
    Ok(Ok(_)) => 1,
    _ => 0,
  }
}

/// OpenJPEG stream over a borrowed byte slice or an [`EncodedBuffer`].
pub(crate) struct Stream<'a> {
  stream: ptr::NonNull<sys::opj_stream_t>,
  is_input: bool,
  _buf: PhantomData<&'a mut [u8]>,
}

impl Drop for Stream<'_> {
  fn drop(&mut self) {
    unsafe {
      sys::opj_stream_destroy(self.stream.as_ptr());
    }
  }
}

impl std::fmt::Debug for Stream<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Stream")
      .field("is_input", &self.is_input)
      .finish()
  }
}

impl<'a> Stream<'a> {
  fn new(is_input: bool) -> Result<Self> {
    let stream = unsafe { sys::opj_stream_default_create(if is_input { 1 } else { 0 }) };
    let stream =
      ptr::NonNull::new(stream).ok_or(Error::NullPointerError("Stream: NULL `opj_stream_t`"))?;
    Ok(Self {
      stream,
      is_input,
      _buf: PhantomData,
    })
  }

  /// Input stream reading `buf`.
  pub(crate) fn from_bytes(buf: &'a [u8]) -> Result<Self> {
    let stream = Self::new(true)?;
    let len = buf.len();
    let data = WrappedSlice::new(buf);
    unsafe {
      let ptr = stream.as_ptr();
      let p_data = Box::into_raw(data) as *mut c_void;
      sys::opj_stream_set_read_function(ptr, Some(buf_read_stream_read_fn));
      sys::opj_stream_set_skip_function(ptr, Some(buf_read_stream_skip_fn));
      sys::opj_stream_set_seek_function(ptr, Some(buf_read_stream_seek_fn));
      sys::opj_stream_set_user_data_length(ptr, len as u64);
      sys::opj_stream_set_user_data(ptr, p_data, Some(buf_read_stream_free_fn));
    }
    Ok(stream)
  }

  /// Output stream writing into `out`.
  pub(crate) fn to_buffer(out: &'a mut EncodedBuffer) -> Result<Self> {
    let stream = Self::new(false)?;
    unsafe {
      let ptr = stream.as_ptr();
      let p_data = out as *mut EncodedBuffer as *mut c_void;
      sys::opj_stream_set_write_function(ptr, Some(buf_write_stream_write_fn));
      sys::opj_stream_set_skip_function(ptr, Some(buf_write_stream_skip_fn));
      sys::opj_stream_set_seek_function(ptr, Some(buf_write_stream_seek_fn));
      sys::opj_stream_set_user_data(ptr, p_data, None);
    }
    Ok(stream)
  }

  pub(crate) fn as_ptr(&self) -> *mut sys::opj_stream_t {
    self.stream.as_ptr()
  }
}
