use std::env;

use anyhow::{anyhow, Result};

use htj2k_bridge::*;

fn arg<T: std::str::FromStr>(n: usize, name: &str) -> Result<T> {
  env::args()
    .nth(n)
    .ok_or_else(|| anyhow!("missing {name}"))?
    .parse::<T>()
    .map_err(|_| anyhow!("invalid {name}"))
}

fn setting<T: std::str::FromStr>(key: &str) -> Option<T> {
  env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Usage: encode_raw <in.raw> <width> <height> <bits> <components> <out.j2k>
///
/// Settings come from the environment (or `.env`): `HTJ2K_DECOMPOSITIONS`,
/// `HTJ2K_PROGRESSION`, `HTJ2K_SIGNED`, `HTJ2K_COLOR_TRANSFORM`,
/// `HTJ2K_QUANTIZATION_STEP` (lossy when set).
fn main() -> Result<()> {
  dotenv::dotenv().ok();
  env_logger::init();

  let raw_filename: String = arg(1, "input file")?;
  let mut frame = FrameInfo::new(
    arg(2, "width")?,
    arg(3, "height")?,
    arg(4, "bits per sample")?,
    arg(5, "component count")?,
    setting("HTJ2K_SIGNED").unwrap_or(false),
  );
  let savename = env::args().nth(6).unwrap_or_else(|| "test.j2k".to_string());

  let mut params = EncodeParameters::new()
    .color_transform(setting("HTJ2K_COLOR_TRANSFORM").unwrap_or(false));
  if let Some(decompositions) = setting("HTJ2K_DECOMPOSITIONS") {
    params = params.decompositions(decompositions);
  }
  if let Some(order) = setting::<ProgressionOrder>("HTJ2K_PROGRESSION") {
    params = params.progression_order(order);
  }
  if let Some(step) = setting::<f32>("HTJ2K_QUANTIZATION_STEP") {
    params = params.quality(false, step);
  }
  frame.is_using_color_transform = params.is_using_color_transform();

  let raw = std::fs::read(&raw_filename)?;
  let mut encoder = Encoder::new(OpenJpeg);
  let buf = encoder.decoded_buffer_mut(frame)?;
  if raw.len() != buf.len() {
    return Err(anyhow!("expected {} bytes of samples, got {}", buf.len(), raw.len()));
  }
  buf.copy_from_slice(&raw);
  encoder.set_parameters(params);
  encoder.encode()?;

  std::fs::write(&savename, encoder.encoded_buffer())?;
  println!("Saved {} bytes to: {}", encoder.encoded_buffer().len(), savename);
  Ok(())
}
