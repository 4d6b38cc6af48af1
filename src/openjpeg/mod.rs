pub(crate) use openjpeg_sys as sys;

use super::*;

impl From<J2KFormat> for sys::CODEC_FORMAT {
  fn from(format: J2KFormat) -> Self {
    match format {
      J2KFormat::JP2 => sys::CODEC_FORMAT::OPJ_CODEC_JP2,
      J2KFormat::J2K => sys::CODEC_FORMAT::OPJ_CODEC_J2K,
    }
  }
}

impl From<ProgressionOrder> for sys::PROG_ORDER {
  fn from(order: ProgressionOrder) -> Self {
    match order {
      ProgressionOrder::Lrcp => sys::PROG_ORDER::OPJ_LRCP,
      ProgressionOrder::Rlcp => sys::PROG_ORDER::OPJ_RLCP,
      ProgressionOrder::Rpcl => sys::PROG_ORDER::OPJ_RPCL,
      ProgressionOrder::Pcrl => sys::PROG_ORDER::OPJ_PCRL,
      ProgressionOrder::Cprl => sys::PROG_ORDER::OPJ_CPRL,
    }
  }
}

pub(crate) mod backend;
pub(crate) mod codec;
pub(crate) mod format;
pub(crate) mod image;
pub(crate) mod marker;
pub(crate) mod stream;

pub use backend::*;
pub(crate) use codec::*;
pub use format::*;
pub(crate) use marker::*;
pub(crate) use stream::*;

pub(crate) use self::image::*;
