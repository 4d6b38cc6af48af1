use std::env;

use anyhow::Result;

use htj2k_bridge::*;

fn main() -> Result<()> {
  dotenv::dotenv().ok();
  env_logger::init();

  let j2k_filename = env::args().nth(1).unwrap_or_else(|| "test.j2k".to_string());
  let savename = env::args().nth(2).unwrap_or_else(|| "test.raw".to_string());
  let level = env::args()
    .nth(3)
    .unwrap_or_else(|| "0".to_string())
    .parse::<u32>()
    .expect("Level must be an integer.");

  let mut decoder = Decoder::new(OpenJpeg);
  decoder.set_encoded_bytes(std::fs::read(&j2k_filename)?);

  let header = decoder.read_header()?;
  println!("header: {:#?}", header);

  let size = decoder.calculate_size_at_decomposition_level(level)?;
  decoder.decode_to_level(level)?;
  println!(
    "decoded: width={}, height={}, bytes={}",
    size.width,
    size.height,
    decoder.decoded_buffer().len()
  );

  #[cfg(feature = "image")]
  if savename.ends_with(".png") {
    decoder.to_dynamic_image()?.save(&savename)?;
    println!("Saved to: {}", savename);
    return Ok(());
  }

  std::fs::write(&savename, decoder.decoded_buffer())?;
  println!("Saved to: {}", savename);
  Ok(())
}
