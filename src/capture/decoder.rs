use image::RgbImage;
use jpeg_decoder::Decoder;

use super::frame::{PixelFormat, RawFrame};
use crate::error::PipelineError;

/// Convert a dequeued device buffer into a packed RGB image.
pub fn decode_frame(raw: &RawFrame) -> Result<RgbImage, PipelineError> {
    match raw.format {
        PixelFormat::Mjpeg => decode_jpeg(&raw.data),
        PixelFormat::Rgb24 => repack(raw, |px, out| out.extend_from_slice(px)),
        PixelFormat::Bgr24 => repack(raw, |px, out| out.extend_from_slice(&[px[2], px[1], px[0]])),
        PixelFormat::Yuyv4 => repack(raw, |px, out| {
            let (y0, u, y1, v) = (px[0], px[1], px[2], px[3]);
            out.extend_from_slice(&yuv_to_rgb(y0, u, v));
            out.extend_from_slice(&yuv_to_rgb(y1, u, v));
        }),
    }
}

fn decode_jpeg(data: &[u8]) -> Result<RgbImage, PipelineError> {
    let fail = |reason: String| PipelineError::Decode {
        format: PixelFormat::Mjpeg,
        reason,
    };

    let mut decoder = Decoder::new(data);
    let pixels = decoder.decode().map_err(|e| fail(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| fail("missing image header".into()))?;

    let rgb = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => pixels,
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&l| [l, l, l]).collect(),
        other => return Err(fail(format!("unsupported JPEG pixel format {other:?}"))),
    };

    RgbImage::from_raw(info.width as u32, info.height as u32, rgb)
        .ok_or_else(|| fail("decoded buffer smaller than header dimensions".into()))
}

/// Walk a packed format row by row, honouring the device stride.
///
/// `convert` receives one group of source bytes (a pixel, or a YUYV macropixel)
/// and appends the RGB bytes it produces.
fn repack<F>(raw: &RawFrame, mut convert: F) -> Result<RgbImage, PipelineError>
where
    F: FnMut(&[u8], &mut Vec<u8>),
{
    let fail = |reason: String| PipelineError::Decode {
        format: raw.format,
        reason,
    };

    let bpp = raw.format.bytes_per_pixel().unwrap_or(3) as usize;
    let (width, height) = (raw.width as usize, raw.height as usize);
    let row_bytes = width * bpp;
    let stride = (raw.stride as usize).max(row_bytes);
    // YUYV packs two pixels into four bytes
    let group = if raw.format == PixelFormat::Yuyv4 { 4 } else { bpp };

    if raw.format == PixelFormat::Yuyv4 && width % 2 != 0 {
        return Err(fail(format!("odd YUYV width {width}")));
    }
    if height > 0 && raw.data.len() < stride * (height - 1) + row_bytes {
        return Err(fail(format!(
            "buffer of {} bytes too short for {}x{}",
            raw.data.len(),
            width,
            height
        )));
    }

    let mut rgb = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        let start = row * stride;
        for px in raw.data[start..start + row_bytes].chunks_exact(group) {
            convert(px, &mut rgb);
        }
    }

    RgbImage::from_raw(raw.width, raw.height, rgb)
        .ok_or_else(|| fail("converted buffer size mismatch".into()))
}

/// BT.601 limited-range YCbCr to RGB.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = 1.164 * (y as f32 - 16.0);
    let d = u as f32 - 128.0;
    let e = v as f32 - 128.0;

    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [
        clamp(c + 1.596 * e),
        clamp(c - 0.391 * d - 0.813 * e),
        clamp(c + 2.018 * d),
    ]
}
