use std::io::{self, Seek, SeekFrom, Write};

/// Default capacity reserved by [`EncodedBuffer::open`].
pub const DEFAULT_INITIAL_SIZE: usize = 65536;

/// Growable in-memory destination for an encoded codestream.
///
/// Writes at the end append; writes after a backwards seek overwrite the
/// bytes already there (codecs use this to patch marker lengths).
#[derive(Debug, Default, Clone)]
pub struct EncodedBuffer {
  buffer: Vec<u8>,
  position: usize,
}

impl EncodedBuffer {
  pub fn new() -> Self {
    Default::default()
  }

  /// Drop any previous contents and reserve `initial_size` bytes.
  pub fn open(&mut self, initial_size: usize) {
    self.buffer.clear();
    self.buffer.reserve(initial_size);
    self.position = 0;
  }

  /// Current write position.
  pub fn tell(&self) -> u64 {
    self.position as u64
  }

  pub fn data(&self) -> &[u8] {
    &self.buffer
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn into_inner(self) -> Vec<u8> {
    self.buffer
  }
}

impl Write for EncodedBuffer {
  fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
    let end = self.position + bytes.len();
    if self.position == self.buffer.len() {
      self.buffer.extend_from_slice(bytes);
    } else {
      if end > self.buffer.len() {
        self.buffer.resize(end, 0);
      }
      self.buffer[self.position..end].copy_from_slice(bytes);
    }
    self.position = end;
    Ok(bytes.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl Seek for EncodedBuffer {
  fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
    let target = match pos {
      SeekFrom::Start(offset) => Some(offset as i64),
      SeekFrom::Current(delta) => (self.position as i64).checked_add(delta),
      SeekFrom::End(delta) => (self.buffer.len() as i64).checked_add(delta),
    };
    match target {
      Some(target) if target >= 0 => {
        // Seeking past the end leaves a gap that the next write zero-fills.
        self.position = target as usize;
        Ok(target as u64)
      }
      _ => Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "seek before start of encoded buffer",
      )),
    }
  }
}
