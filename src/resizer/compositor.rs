//! # 画布合成与编码模块
//!
//! ## 设计思路
//!
//! 把“像素 → 画布 → 字节”的过程集中管理：
//! 1. 按背景策略分配画布（透明 / 白色 / 填充色）
//! 2. 只对绘制矩形中落在画布内的部分做高质量重采样，再以 alpha 混合贴到画布上
//! 3. 可选 3x3 锐化
//! 4. 按目标格式编码
//!
//! ## 实现思路
//!
//! - 重采样使用 `fast_image_resize` 卷积滤镜，并通过 `crop` 只处理可见区域，
//!   `cover` 模式下溢出部分不会被放大后再丢弃。
//! - `fast_image_resize` 失败时回退 `image::imageops`（同样是卷积滤镜）。
//! - 画布只在单个（图片, 尺寸）组合内存活，编码后即释放。

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage, Rgba, RgbaImage};

use super::geometry::Geometry;
use super::options::PadColor;
use super::source::RasterFormat;
use super::ResizeError;

/// 锐化强度：结果 = 卷积 * 0.2 + 原值 * 0.8。
const SHARPEN_MIX: f32 = 0.2;

/// 锐化卷积核中心权重（四邻域权重均为 -1）。
const SHARPEN_CENTER_WEIGHT: f32 = 5.0;

/// 按几何与背景策略合成画布。
pub(crate) fn compose(
    source: &RgbaImage,
    geometry: &Geometry,
    background: Option<PadColor>,
    sharpen: bool,
    filter: FilterType,
) -> Result<RgbaImage, ResizeError> {
    let fill = background.unwrap_or(PadColor::TRANSPARENT).rgba();
    let mut canvas = RgbaImage::from_pixel(geometry.canvas_width, geometry.canvas_height, fill);

    match geometry.visible_rect() {
        Some(rect) => {
            let scaled = resample_visible(source, geometry, rect, filter)?;
            imageops::overlay(&mut canvas, &scaled, rect.0 as i64, rect.1 as i64);
        }
        None => {
            log::warn!(
                "⚠️ 绘制区域在画布内为空，输出仅包含背景（canvas={}x{}, draw={:.3}x{:.3}）",
                geometry.canvas_width,
                geometry.canvas_height,
                geometry.draw_width,
                geometry.draw_height
            );
        }
    }

    if sharpen {
        apply_sharpen(&mut canvas);
    }

    Ok(canvas)
}

/// 将绘制矩形的可见部分重采样为 `rect` 大小的图像。
fn resample_visible(
    source: &RgbaImage,
    geometry: &Geometry,
    rect: (u32, u32, u32, u32),
    filter: FilterType,
) -> Result<RgbaImage, ResizeError> {
    let (x, y, width, height) = rect;
    let src_w = source.width() as f64;
    let src_h = source.height() as f64;

    // 画布坐标 → 源坐标
    let scale_x = src_w / geometry.draw_width;
    let scale_y = src_h / geometry.draw_height;
    let left = ((x as f64 - geometry.draw_x) * scale_x).clamp(0.0, src_w);
    let top = ((y as f64 - geometry.draw_y) * scale_y).clamp(0.0, src_h);
    let crop_w = (width as f64 * scale_x).min(src_w - left).max(f64::EPSILON);
    let crop_h = (height as f64 * scale_y).min(src_h - top).max(f64::EPSILON);

    match resize_with_fast_image_resize(source, (left, top, crop_w, crop_h), width, height, filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 重采样失败，回退 image::imageops：{}", err);

            let cx = left.floor() as u32;
            let cy = top.floor() as u32;
            let cw = ((left + crop_w).ceil() as u32).saturating_sub(cx).max(1);
            let ch = ((top + crop_h).ceil() as u32).saturating_sub(cy).max(1);
            let cropped = imageops::crop_imm(source, cx, cy, cw, ch).to_image();
            Ok(imageops::resize(&cropped, width, height, filter))
        }
    }
}

fn resize_with_fast_image_resize(
    source: &RgbaImage,
    crop: (f64, f64, f64, f64),
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, ResizeError> {
    let src_image = fr::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| ResizeError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let (left, top, width, height) = crop;
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)))
        .crop(left, top, width, height);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ResizeError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| ResizeError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

/// 3x3 锐化：中心 +5，上下左右 -1，与原值按 0.2 / 0.8 混合。
///
/// 只处理 RGB，alpha 保持不变；最外一圈像素不处理。
pub(crate) fn apply_sharpen(canvas: &mut RgbaImage) {
    let (width, height) = canvas.dimensions();
    if width < 3 || height < 3 {
        return;
    }

    let original = canvas.as_raw().clone();
    let stride = width as usize * 4;
    let data: &mut [u8] = canvas;

    for y in 1..height as usize - 1 {
        for x in 1..width as usize - 1 {
            let idx = y * stride + x * 4;
            for c in 0..3 {
                let center = original[idx + c] as f32;
                let convolved = center * SHARPEN_CENTER_WEIGHT
                    - original[idx - stride + c] as f32
                    - original[idx + stride + c] as f32
                    - original[idx - 4 + c] as f32
                    - original[idx + 4 + c] as f32;
                let mixed = convolved * SHARPEN_MIX + center * (1.0 - SHARPEN_MIX);
                data[idx + c] = mixed.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// 将画布编码为目标格式。
///
/// `opaque` 为真（或格式不支持 alpha）时先压平到白色，再丢弃 alpha 通道编码。
pub(crate) fn encode(
    canvas: RgbaImage,
    format: RasterFormat,
    opaque: bool,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ResizeError> {
    let image = if opaque || !format.supports_alpha() {
        DynamicImage::ImageRgb8(flatten_onto_white(&canvas))
    } else {
        DynamicImage::ImageRgba8(canvas)
    };

    let mut bytes = Vec::new();
    let result = match format {
        RasterFormat::Jpeg => {
            image.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, jpeg_quality))
        }
        RasterFormat::Png => image.write_with_encoder(PngEncoder::new_with_quality(
            &mut bytes,
            CompressionType::Default,
            PngFilterType::Adaptive,
        )),
        RasterFormat::WebP => image.write_with_encoder(WebPEncoder::new_lossless(&mut bytes)),
    };
    result.map_err(|e| ResizeError::Encode(format!("{} 编码失败：{}", format, e)))?;

    if bytes.is_empty() {
        return Err(ResizeError::Encode(format!("{} 编码结果为空", format)));
    }

    Ok(bytes)
}

/// 按 alpha 把像素混合到白色背景上；完全不透明的像素保持原值。
fn flatten_onto_white(canvas: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let [r, g, b, a] = canvas.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resizer::geometry::FitMode;
    use crate::resizer::source::Dimensions;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn assert_close(actual: [u8; 4], expected: [u8; 4]) {
        let close = actual
            .iter()
            .zip(expected.iter())
            .all(|(a, e)| a.abs_diff(*e) <= 2);
        assert!(close, "{actual:?} != {expected:?}");
    }

    fn geometry(src: (u32, u32), target: (u32, u32), mode: FitMode) -> Geometry {
        Geometry::resolve(
            Dimensions::new(src.0, src.1).expect("src"),
            Dimensions::new(target.0, target.1).expect("target"),
            mode,
        )
    }

    #[test]
    fn pad_fills_letterbox_with_pad_color() {
        let source = solid(100, 50, [255, 0, 0, 255]);
        let g = geometry((100, 50), (100, 100), FitMode::Pad);
        let canvas = compose(&source, &g, Some(PadColor([0, 0, 255, 255])), false, FilterType::Lanczos3)
            .expect("compose");

        assert_eq!(canvas.dimensions(), (100, 100));
        assert_eq!(canvas.get_pixel(50, 5).0, [0, 0, 255, 255]);
        assert_close(canvas.get_pixel(50, 50).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(50, 95).0, [0, 0, 255, 255]);
    }

    #[test]
    fn contain_keeps_letterbox_transparent_without_background() {
        let source = solid(100, 50, [0, 255, 0, 255]);
        let g = geometry((100, 50), (100, 100), FitMode::Contain);
        let canvas = compose(&source, &g, None, false, FilterType::Lanczos3).expect("compose");

        assert_eq!(canvas.get_pixel(10, 2).0[3], 0);
        assert_close(canvas.get_pixel(50, 50).0, [0, 255, 0, 255]);
    }

    #[test]
    fn cover_fills_whole_canvas() {
        let source = solid(300, 100, [10, 20, 30, 255]);
        let g = geometry((300, 100), (50, 50), FitMode::Cover);
        let canvas = compose(&source, &g, None, false, FilterType::Lanczos3).expect("compose");

        assert_eq!(canvas.dimensions(), (50, 50));
        canvas.pixels().for_each(|p| assert_close(p.0, [10, 20, 30, 255]));
    }

    #[test]
    fn stretch_distorts_to_exact_canvas() {
        let source = solid(10, 1000, [200, 100, 50, 255]);
        let g = geometry((10, 1000), (80, 40), FitMode::Stretch);
        let canvas = compose(&source, &g, None, false, FilterType::CatmullRom).expect("compose");
        canvas.pixels().for_each(|p| assert_close(p.0, [200, 100, 50, 255]));
    }

    #[test]
    fn sharpen_leaves_flat_regions_and_alpha_unchanged() {
        let mut canvas = solid(8, 8, [120, 60, 30, 77]);
        let before = canvas.clone();
        apply_sharpen(&mut canvas);
        assert_eq!(canvas, before);
    }

    #[test]
    fn sharpen_boosts_center_and_skips_border() {
        let mut canvas = solid(3, 3, [100, 100, 100, 255]);
        canvas.put_pixel(1, 1, Rgba([200, 200, 200, 128]));
        let border_before: Vec<[u8; 4]> = canvas
            .enumerate_pixels()
            .filter(|(x, y, _)| !(*x == 1 && *y == 1))
            .map(|(_, _, p)| p.0)
            .collect();

        apply_sharpen(&mut canvas);

        // 卷积 = 200*5 - 400 = 600；600*0.2 + 200*0.8 = 280 → 截断 255
        assert_eq!(canvas.get_pixel(1, 1).0, [255, 255, 255, 128]);
        let border_after: Vec<[u8; 4]> = canvas
            .enumerate_pixels()
            .filter(|(x, y, _)| !(*x == 1 && *y == 1))
            .map(|(_, _, p)| p.0)
            .collect();
        assert_eq!(border_after, border_before);
    }

    #[test]
    fn sharpen_blend_matches_formula() {
        let mut canvas = solid(3, 3, [50, 50, 50, 255]);
        canvas.put_pixel(1, 1, Rgba([60, 60, 60, 255]));
        apply_sharpen(&mut canvas);
        // 卷积 = 60*5 - 200 = 100；100*0.2 + 60*0.8 = 68
        assert_eq!(canvas.get_pixel(1, 1).0, [68, 68, 68, 255]);
    }

    #[test]
    fn encodes_each_format_to_decodable_bytes() {
        for format in [RasterFormat::Png, RasterFormat::Jpeg, RasterFormat::WebP] {
            let bytes = encode(solid(16, 12, [1, 2, 3, 255]), format, false, 95).expect("encode");
            let decoded = image::load_from_memory_with_format(&bytes, format.to_image_format())
                .expect("decode back");
            assert_eq!((decoded.width(), decoded.height()), (16, 12));
        }
    }

    #[test]
    fn png_keeps_alpha_unless_opaque() {
        let canvas = solid(4, 4, [0, 0, 0, 0]);
        let rgba = encode(canvas.clone(), RasterFormat::Png, false, 95).expect("encode");
        let rgb = encode(canvas, RasterFormat::Png, true, 95).expect("encode");

        let rgba = image::load_from_memory(&rgba).expect("decode");
        let rgb = image::load_from_memory(&rgb).expect("decode");
        assert!(rgba.color().has_alpha());
        assert!(!rgb.color().has_alpha());
    }

    #[test]
    fn translucent_pixels_are_flattened_onto_white() {
        let flat = flatten_onto_white(&solid(2, 2, [255, 0, 0, 128]));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 127, 127]);

        let opaque = flatten_onto_white(&solid(2, 2, [12, 34, 56, 255]));
        assert_eq!(opaque.get_pixel(1, 1).0, [12, 34, 56]);
    }

    #[test]
    fn jpeg_with_translucent_pad_is_blended() {
        let bytes = encode(solid(16, 16, [255, 0, 0, 128]), RasterFormat::Jpeg, false, 95)
            .expect("encode");
        let decoded = image::load_from_memory(&bytes).expect("decode").to_rgb8();
        let [r, g, b] = decoded.get_pixel(8, 8).0;
        assert!(r >= 250, "red channel {r}");
        assert!(g.abs_diff(127) <= 6 && b.abs_diff(127) <= 6, "got {g},{b}");
    }
}
