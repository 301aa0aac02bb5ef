//! Benchmarks for element transcoding and full image rendering.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use icy_tile_engine::{
    codec::{GraphicsCodec, IndexedCodec},
    Arranger, CodecFactory, ColorRgba32, DataFile, DefaultCodecFactory, ElementCodec, FileBitAddress, IndexedImage, Palette, Size,
};
use std::hint::black_box;

fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(73) ^ (i >> 3)) as u8).collect()
}

fn bench_codec(c: &mut Criterion, name: &str, size: Size) {
    let factory = DefaultCodecFactory::new();
    let ElementCodec::Indexed(mut codec) = factory.get_codec(name, size).unwrap() else {
        panic!("{name} is not an indexed codec");
    };
    let encoded = sample_bytes(codec.storage_size() / 8);
    let native = codec.decode_element(&encoded).unwrap().to_vec();

    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("decode", |b| b.iter(|| black_box(codec.decode_element(black_box(&encoded)).unwrap().len())));
    group.bench_function("encode", |b| b.iter(|| black_box(codec.encode_element(black_box(&native)).unwrap().len())));
    group.finish();
}

fn bench_snes_4bpp(c: &mut Criterion) {
    bench_codec(c, "SNES 4bpp", Size::new(8, 8));
}

fn bench_psx_4bpp(c: &mut Criterion) {
    bench_codec(c, "PSX 4bpp", Size::new(64, 64));
}

fn bench_render_sequential(c: &mut Criterion) {
    let factory = DefaultCodecFactory::new();
    let codec = factory.get_codec("SNES 4bpp", Size::new(8, 8)).unwrap();
    let df = DataFile::from_bytes("rom", sample_bytes(32 * 32 * 32)).into_ref();
    let colors = (0..16u8).map(|i| ColorRgba32::opaque(i * 16, 0, 255 - i * 16)).collect();
    let palette = Palette::from_colors("Bench", colors, true).unwrap().into_ref();
    let arranger = Arranger::new_sequential("Bench", Size::new(32, 32), df, FileBitAddress::default(), codec, Some(palette))
        .unwrap()
        .into_ref();
    let mut image = IndexedImage::new(arranger, None).unwrap();

    c.bench_function("render_32x32_tiles", |b| {
        b.iter(|| {
            image.render().unwrap();
            black_box(image.pixels().len())
        })
    });
}

criterion_group!(benches, bench_snes_4bpp, bench_psx_4bpp, bench_render_sequential);
criterion_main!(benches);
