use std::{fs::File, io::BufWriter, path::Path};

/// Nearest neighbour upscale of a flat RGBA buffer.
pub fn scale_rgba(rgba: &[u8], width: usize, height: usize, scale: usize) -> Vec<u8> {
    if scale <= 1 {
        return rgba.to_vec();
    }
    let mut result = Vec::with_capacity(rgba.len() * scale * scale);
    for y in 0..height {
        let line = &rgba[y * width * 4..(y + 1) * width * 4];
        let mut scaled_line = Vec::with_capacity(line.len() * scale);
        for pixel in line.chunks_exact(4) {
            for _ in 0..scale {
                scaled_line.extend_from_slice(pixel);
            }
        }
        for _ in 0..scale {
            result.extend_from_slice(&scaled_line);
        }
    }
    result
}

pub fn write_png(path: &Path, width: usize, height: usize, rgba: &[u8]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width as u32, height as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Best);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scale_rgba() {
        let rgba = [1, 2, 3, 4, 5, 6, 7, 8];
        let scaled = scale_rgba(&rgba, 2, 1, 2);
        assert_eq!(scaled.len(), 32);
        assert_eq!(&scaled[0..8], &[1, 2, 3, 4, 1, 2, 3, 4]);
        assert_eq!(&scaled[16..24], &[1, 2, 3, 4, 1, 2, 3, 4]);
    }
}
