mod common;

use common::pattern_bytes;
use icy_tile_engine::{
    codec::{BitplaneCodec, BitplaneFormat, PackedIndexedCodec, PlaneDescriptor},
    codec::{builtin_packed_formats, DirectCodec, GraphicsCodec, IndexedCodec, LinearDirectCodec},
    CodecFactory, ColorRgba32, DefaultCodecFactory, ElementCodec, EngineError, Size,
};
use pretty_assertions::assert_eq;

fn default_codec(factory: &DefaultCodecFactory, name: &str) -> ElementCodec {
    let size = factory.default_size(name).unwrap();
    factory.get_codec(name, size).unwrap()
}

#[test]
fn indexed_codecs_round_trip_indices() {
    let factory = DefaultCodecFactory::new();
    for name in factory.codec_names() {
        let ElementCodec::Indexed(mut codec) = default_codec(&factory, &name) else {
            continue;
        };
        if codec.storage_size() == 0 {
            continue;
        }
        let pixels = codec.width() * codec.height();
        let max = 1usize << codec.color_depth().min(8);
        let native: Vec<u8> = pattern_bytes(pixels, 7).iter().map(|b| (*b as usize % max) as u8).collect();

        let encoded = codec.encode_element(&native).unwrap().to_vec();
        assert_eq!(encoded.len() * 8, codec.storage_size(), "{name}");
        let decoded = codec.decode_element(&encoded).unwrap();
        assert_eq!(decoded, native.as_slice(), "{name}");
    }
}

#[test]
fn indexed_codecs_round_trip_bytes() {
    let factory = DefaultCodecFactory::new();
    for name in factory.codec_names() {
        let ElementCodec::Indexed(mut codec) = default_codec(&factory, &name) else {
            continue;
        };
        if codec.storage_size() == 0 {
            continue;
        }
        let bytes = pattern_bytes(codec.storage_size() / 8, 3);
        let native = codec.decode_element(&bytes).unwrap().to_vec();
        assert_eq!(codec.encode_element(&native).unwrap(), bytes.as_slice(), "{name}");
    }
}

#[test]
fn direct_codecs_round_trip_bytes() {
    let mut rgba = LinearDirectCodec::rgba32(4, 4).unwrap();
    let bytes = pattern_bytes(64, 11);
    let colors = rgba.decode_element(&bytes).unwrap().to_vec();
    assert_eq!(rgba.encode_element(&colors).unwrap(), bytes.as_slice());

    // the top bit of a 15 bit color is not stored
    let mut bgr = LinearDirectCodec::bgr15(4, 4).unwrap();
    let bytes: Vec<u8> = pattern_bytes(32, 5).iter().enumerate().map(|(i, b)| if i % 2 == 1 { b & 0x7F } else { *b }).collect();
    let colors = bgr.decode_element(&bytes).unwrap().to_vec();
    assert_eq!(bgr.encode_element(&colors).unwrap(), bytes.as_slice());
}

#[test]
fn psx_4bpp_zero_element() {
    let format = builtin_packed_formats().into_iter().find(|f| f.name == "PSX 4bpp").unwrap();
    let mut codec = PackedIndexedCodec::with_size(format, 64, 64).unwrap();
    let zeros = vec![0u8; 2048];

    let decoded = codec.decode_element(&zeros).unwrap().to_vec();
    assert_eq!(decoded, vec![0u8; 64 * 64]);
    assert_eq!(codec.encode_element(&decoded).unwrap(), zeros.as_slice());
}

#[test]
fn nes_2bpp_planes_are_eight_bytes_apart() {
    let factory = DefaultCodecFactory::new();
    let ElementCodec::Indexed(mut codec) = default_codec(&factory, "NES 2bpp") else {
        panic!("NES 2bpp is indexed");
    };
    let mut tile = vec![0u8; 16];
    tile[0] = 0b1000_0000;
    tile[8] = 0b1100_0000;
    let decoded = codec.decode_element(&tile).unwrap();
    assert_eq!(&decoded[..3], &[3, 2, 0]);
}

#[test]
fn snes_4bpp_upper_planes_follow_lower_pairs() {
    let factory = DefaultCodecFactory::new();
    let ElementCodec::Indexed(mut codec) = default_codec(&factory, "SNES 4bpp") else {
        panic!("SNES 4bpp is indexed");
    };
    let mut tile = vec![0u8; 32];
    // row 1: plane 0 and plane 3 set for the first pixel
    tile[2] = 0x80;
    tile[19] = 0x80;
    let decoded = codec.decode_element(&tile).unwrap();
    assert_eq!(decoded[8], 0b1001);
    assert_eq!(decoded.iter().filter(|i| **i != 0).count(), 1);
}

#[test]
fn custom_bitplane_format() {
    // 2bpp with whole planes stored one after the other
    let format = BitplaneFormat::new("Planar 2bpp", 8, 8, vec![PlaneDescriptor::new(0, 1, 0), PlaneDescriptor::new(8, 1, 1)]);
    let mut codec = BitplaneCodec::new(format.clone()).unwrap();
    let native: Vec<u8> = (0..64).map(|i| (i % 4) as u8).collect();
    let encoded = codec.encode_element(&native).unwrap().to_vec();
    assert_eq!(encoded[0], 0b0101_0101);
    assert_eq!(encoded[8], 0b0011_0011);

    let mut factory = DefaultCodecFactory::new();
    factory.register_bitplane_format(format).unwrap();
    assert!(factory.codec_names().contains(&"Planar 2bpp".to_string()));
}

#[test]
fn decode_rejects_short_input() {
    let factory = DefaultCodecFactory::new();
    let ElementCodec::Indexed(mut codec) = default_codec(&factory, "SNES 4bpp") else {
        panic!("SNES 4bpp is indexed");
    };
    let err = codec.decode_element(&[0; 31]).unwrap_err();
    assert!(matches!(err, EngineError::EncodedSizeMismatch { expected: 256, actual: 248, .. }));
}

#[test]
fn encode_rejects_wrong_dimensions() {
    let factory = DefaultCodecFactory::new();
    let ElementCodec::Indexed(mut codec) = default_codec(&factory, "1bpp") else {
        panic!("1bpp is indexed");
    };
    assert!(matches!(codec.encode_element(&[0; 63]), Err(EngineError::NativeSizeMismatch { .. })));

    let ElementCodec::Direct(mut direct) = default_codec(&factory, "RGBA32") else {
        panic!("RGBA32 is direct");
    };
    assert!(matches!(direct.encode_element(&[ColorRgba32::TRANSPARENT; 3]), Err(EngineError::NativeSizeMismatch { .. })));
}

#[test]
fn decode_reuses_native_buffer() {
    let factory = DefaultCodecFactory::new();
    let ElementCodec::Indexed(mut codec) = default_codec(&factory, "GBA 4bpp") else {
        panic!("GBA 4bpp is indexed");
    };
    let first = codec.decode_element(&pattern_bytes(32, 1)).unwrap().as_ptr();
    let second = codec.decode_element(&pattern_bytes(32, 2)).unwrap().as_ptr();
    assert_eq!(first, second);
}

#[test]
fn resize_changes_storage_size() {
    let factory = DefaultCodecFactory::new();
    let mut codec = factory.get_codec("PSX 8bpp", Size::new(64, 64)).unwrap();
    assert!(codec.can_resize());
    let ElementCodec::Indexed(indexed) = &mut codec else {
        panic!("PSX 8bpp is indexed");
    };
    indexed.decode_element(&vec![0u8; 64 * 64]).unwrap();

    codec.resize(32, 16).unwrap();
    assert_eq!(codec.storage_size(), 32 * 16 * 8);
    let ElementCodec::Indexed(indexed) = &mut codec else {
        panic!("PSX 8bpp is indexed");
    };
    let encoded = pattern_bytes(32 * 16, 5);
    let decoded = indexed.decode_element(&encoded).unwrap().to_vec();
    assert_eq!(decoded.len(), 32 * 16);
    assert_eq!(indexed.encode_element(&decoded).unwrap(), encoded.as_slice());

    let mut direct = LinearDirectCodec::rgba32(8, 8).unwrap();
    direct.decode_element(&[0; 256]).unwrap();
    direct.resize(4, 2).unwrap();
    let encoded = pattern_bytes(32, 9);
    let colors = direct.decode_element(&encoded).unwrap().to_vec();
    assert_eq!(colors.len(), 8);
    assert_eq!(direct.encode_element(&colors).unwrap(), encoded.as_slice());

    let mut fixed = factory.get_codec("SNES 2bpp", Size::new(8, 8)).unwrap();
    assert!(matches!(fixed.resize(16, 16), Err(EngineError::CodecNotResizable { .. })));
}
