use anyhow::{Result, anyhow};
use image::{DynamicImage, ImageFormat, RgbaImage, imageops};

const BYTES_PER_PIXEL: u32 = 4;

/// Fallback composite used when no generation backend is available: the
/// garment is scaled to 35% of the person's width and alpha-blended into
/// the bottom-right corner with a small margin.
pub fn overlay_garment(
    person: &[u8],
    person_mime: &str,
    garment: &[u8],
    garment_mime: &str,
) -> Result<Vec<u8>> {
    let base = decode_rgba(person, person_mime)?;
    let garment_img = decode_rgba(garment, garment_mime)?;
    let (base_w, base_h) = (base.width(), base.height());
    if base_w == 0 || base_h == 0 || garment_img.width() == 0 || garment_img.height() == 0 {
        return Err(anyhow!("cannot composite empty image"));
    }

    let target_w = ((base_w as f32) * 0.35).round().max(1.0) as u32;
    let target_h = ((garment_img.height() as f32) * (target_w as f32 / garment_img.width() as f32))
        .round()
        .max(1.0) as u32;
    let garment_img = imageops::resize(&garment_img, target_w, target_h, imageops::FilterType::Triangle);

    let padding = ((base_w.min(base_h) as f32) * 0.02) as u32;
    let offset_x = base_w.saturating_sub(target_w + padding).max(padding);
    let offset_y = base_h.saturating_sub(target_h + padding).max(padding);

    let mut composite = base;
    for y in 0..target_h {
        for x in 0..target_w {
            let dst_x = offset_x + x;
            let dst_y = offset_y + y;
            if dst_x >= base_w || dst_y >= base_h {
                continue;
            }
            let src = garment_img.get_pixel(x, y).0;
            let alpha = src[3] as u32;
            if alpha == 0 {
                continue;
            }
            let dst = composite.get_pixel_mut(dst_x, dst_y);
            for channel in 0..(BYTES_PER_PIXEL as usize - 1) {
                let blended =
                    (src[channel] as u32 * alpha + dst.0[channel] as u32 * (255 - alpha)) / 255;
                dst.0[channel] = blended as u8;
            }
            dst.0[3] = 255;
        }
    }

    encode_png(&composite)
}

pub fn decode_rgba(bytes: &[u8], mime_type: &str) -> Result<RgbaImage> {
    let format = mime_to_format(mime_type)?;
    Ok(image::load_from_memory_with_format(bytes, format)
        .map_err(|err| anyhow!("decode image failed: {err}"))?
        .to_rgba8())
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|err| anyhow!("encode png failed: {err}"))?;
    Ok(output)
}

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

pub fn mime_to_format(mime_type: &str) -> Result<ImageFormat> {
    match mime_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        "image/gif" => Ok(ImageFormat::Gif),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/bmp" => Ok(ImageFormat::Bmp),
        _ => Err(anyhow!("unsupported mime type: {mime_type}")),
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}
