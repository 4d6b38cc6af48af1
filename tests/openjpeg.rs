#![cfg(feature = "openjpeg-sys")]

mod common;

use common::*;
use htj2k_bridge::*;

fn encode(frame: FrameInfo, pixels: &[u8], setup: impl FnOnce(&mut Encoder<OpenJpeg>)) -> Vec<u8> {
  let mut encoder = Encoder::new(OpenJpeg);
  encoder.decoded_buffer_mut(frame).unwrap().copy_from_slice(pixels);
  setup(&mut encoder);
  encoder.encode().unwrap();
  encoder.take_encoded()
}

#[test]
fn lossless_signed_round_trip() {
  init_logger();
  let frame = FrameInfo::new(512, 512, 16, 1, true);
  let pixels: Vec<u8> = signed_ramp(512, 512).iter().flat_map(|s| s.to_le_bytes()).collect();
  let encoded = encode(frame, &pixels, |e| e.set_progression_order(ProgressionOrder::Rpcl));
  assert_eq!(j2k_detect_format(&encoded).unwrap(), J2KFormat::J2K);

  let mut decoder = Decoder::new(OpenJpeg);
  decoder.set_encoded_bytes(encoded);
  let header = decoder.read_header().unwrap();
  assert_eq!(header.frame_info, frame);
  assert_eq!(header.coding.decompositions, 5);
  assert!(header.coding.reversible);
  assert_eq!(header.coding.progression_order, ProgressionOrder::Rpcl);
  assert_eq!(header.coding.block_dimensions, Size::new(64, 64));
  // Untiled streams carry one tile covering the image.
  assert_eq!(header.coding.tile_size, Size::new(512, 512));

  decoder.decode().unwrap();
  assert_eq!(decoder.decoded_buffer().len(), 524288);
  assert!(decoder.decoded_buffer() == &pixels[..]);
}

#[test]
fn reduced_decode() {
  init_logger();
  let frame = FrameInfo::new(512, 512, 16, 1, true);
  let pixels: Vec<u8> = signed_ramp(512, 512).iter().flat_map(|s| s.to_le_bytes()).collect();
  let mut decoder = Decoder::new(OpenJpeg);
  decoder.set_encoded_bytes(encode(frame, &pixels, |_| ()));
  decoder.decode_to_level(1).unwrap();
  assert_eq!(decoder.decoded_size(), Size::new(256, 256));
  assert_eq!(decoder.decoded_buffer().len(), 256 * 256 * 2);
}

#[test]
fn rgb_with_color_transform() {
  init_logger();
  let frame = FrameInfo::new(33, 17, 8, 3, false);
  let pixels: Vec<u8> = (0..frame.buffer_len(frame.size())).map(|i| (i * 7 % 251) as u8).collect();
  let encoded = encode(frame, &pixels, |e| {
    e.set_color_transform(true);
    e.set_decompositions(2);
    e.set_block_dimensions(Size::new(32, 32));
    e.set_precincts(vec![Size::new(16, 16), Size::new(32, 32)]);
  });

  let mut decoder = Decoder::new(OpenJpeg);
  decoder.set_encoded_bytes(encoded);
  decoder.decode().unwrap();
  assert!(decoder.is_using_color_transform());
  assert_eq!(decoder.num_decompositions(), 2);
  assert_eq!(decoder.precinct(0), Some(Size::new(16, 16)));
  assert_eq!(decoder.precinct(1), Some(Size::new(32, 32)));
  assert!(decoder.decoded_buffer() == &pixels[..]);
}

#[test]
fn garbage_is_malformed() {
  let mut decoder = Decoder::new(OpenJpeg);
  decoder.set_encoded_bytes(vec![0x42; 64]);
  assert!(matches!(decoder.read_header(), Err(Error::MalformedCodestream(_))));

  let mut truncated = encode(FrameInfo::new(16, 16, 8, 1, false), &[1; 256], |e| {
    e.set_decompositions(2)
  });
  truncated.truncate(8);
  decoder.set_encoded_bytes(truncated);
  assert!(decoder.read_header().is_err());
}

#[test]
fn tiles_and_tlm_markers() {
  init_logger();
  let frame = FrameInfo::new(40, 24, 8, 1, false);
  let pixels: Vec<u8> = (0..40 * 24).map(|i| (i % 256) as u8).collect();
  let encoded = encode(frame, &pixels, |e| {
    e.set_decompositions(2);
    e.set_tile_size(Size::new(16, 16));
    e.set_tlm_marker(true);
  });
  assert!(encoded.windows(2).any(|m| m == [0xFF, 0x55]), "no TLM marker");

  let mut decoder = Decoder::new(OpenJpeg);
  decoder.set_encoded_bytes(encoded);
  decoder.decode().unwrap();
  assert_eq!(decoder.tile_size(), Size::new(16, 16));
  assert_eq!(decoder.precinct(0), None);
  assert!(decoder.decoded_buffer() == &pixels[..]);
}
