// 该文件是 Tehai （手牌） 项目的一部分。
// src/preprocess.rs - 灰度化、对比度拉伸与等比缩放填充
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{DynamicImage, GrayImage, Luma, imageops};
use tracing::debug;

use crate::{error::DetectError, frame::LetterboxFrame};

/// 记录缩放与填充参数，用于把检测框映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddingInfo {
  pub scale: f64,
  pub pad_x: u32,
  pub pad_y: u32,
  pub original_width: u32,
  pub original_height: u32,
}

/// 完整的预处理流程：灰度化、对比度拉伸、等比缩放并填充到 S×S
pub fn letterbox<const S: u32>(
  image: &DynamicImage,
) -> Result<(LetterboxFrame<S>, PaddingInfo), DetectError> {
  let gray = convert_to_grayscale(image);
  let stretched = stretch_contrast(gray);
  scale_and_pad(&stretched)
}

/// ITU-R 601-2 亮度转换，定点运算
pub fn convert_to_grayscale(image: &DynamicImage) -> GrayImage {
  match image {
    DynamicImage::ImageLuma8(gray) => gray.clone(),
    DynamicImage::ImageLumaA8(gray) => {
      GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y)[0]])
      })
    }
    _ => {
      let rgb = image.to_rgb8();
      GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let l = (r as u32) * 19595 + (g as u32) * 38470 + (b as u32) * 7471 + 0x8000;
        Luma([(l >> 16) as u8])
      })
    }
  }
}

/// 线性拉伸灰度范围，最暗像素映射为 0，最亮像素映射为 255
pub fn stretch_contrast(mut image: GrayImage) -> GrayImage {
  let Some((lo, hi)) = image
    .pixels()
    .map(|p| p[0])
    .fold(None, |acc: Option<(u8, u8)>, v| match acc {
      None => Some((v, v)),
      Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
  else {
    return image;
  };

  // 单一灰度的图像保持不变
  if hi <= lo {
    return image;
  }

  let scale = 255.0 / (hi - lo) as f64;
  let offset = -(lo as f64) * scale;
  let mut lut = [0u8; 256];
  for (ix, entry) in lut.iter_mut().enumerate() {
    *entry = ((ix as f64 * scale + offset) as i64).clamp(0, 255) as u8;
  }

  for pixel in image.pixels_mut() {
    pixel[0] = lut[pixel[0] as usize];
  }
  image
}

/// 等比缩放后居中放入黑色的 S×S 画布
pub fn scale_and_pad<const S: u32>(
  image: &GrayImage,
) -> Result<(LetterboxFrame<S>, PaddingInfo), DetectError> {
  let (original_width, original_height) = image.dimensions();
  if original_width == 0 || original_height == 0 {
    return Err(DetectError::InvalidImage {
      width: original_width,
      height: original_height,
    });
  }

  let scale = S as f64 / original_width.max(original_height) as f64;
  let scaled_width = ((original_width as f64 * scale) as u32).clamp(1, S);
  let scaled_height = ((original_height as f64 * scale) as u32).clamp(1, S);

  let pad_x = (S - scaled_width) / 2;
  let pad_y = (S - scaled_height) / 2;

  debug!(
    "缩放 {}x{} -> {}x{}, 比例 {:.4}, 填充 ({}, {})",
    original_width, original_height, scaled_width, scaled_height, scale, pad_x, pad_y
  );

  let scaled = imageops::resize(
    image,
    scaled_width,
    scaled_height,
    imageops::FilterType::Triangle,
  );

  let mut canvas = GrayImage::new(S, S);
  imageops::replace(&mut canvas, &scaled, pad_x as i64, pad_y as i64);

  let padding = PaddingInfo {
    scale,
    pad_x,
    pad_y,
    original_width,
    original_height,
  };

  Ok((LetterboxFrame::from_canvas(canvas), padding))
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn grayscale_uses_601_weights() {
    let mut rgb = RgbImage::new(3, 1);
    rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
    rgb.put_pixel(1, 0, Rgb([0, 255, 0]));
    rgb.put_pixel(2, 0, Rgb([255, 255, 255]));
    let gray = convert_to_grayscale(&DynamicImage::ImageRgb8(rgb));
    assert_eq!(gray.get_pixel(0, 0)[0], 76);
    assert_eq!(gray.get_pixel(1, 0)[0], 150);
    assert_eq!(gray.get_pixel(2, 0)[0], 255);
  }

  #[test]
  fn stretch_maps_extremes_to_full_range() {
    let image = GrayImage::from_raw(4, 1, vec![50, 100, 150, 200]).unwrap();
    let stretched = stretch_contrast(image);
    assert_eq!(stretched.as_raw(), &vec![0, 85, 170, 255]);
  }

  #[test]
  fn stretch_keeps_flat_image() {
    let image = GrayImage::from_raw(2, 2, vec![90; 4]).unwrap();
    assert_eq!(stretch_contrast(image).as_raw(), &vec![90; 4]);
  }

  #[test]
  fn landscape_image_is_padded_vertically() {
    let image = GrayImage::from_pixel(320, 240, Luma([255]));
    let (frame, padding) = scale_and_pad::<640>(&image).unwrap();

    assert_eq!(frame.as_gray().dimensions(), (640, 640));
    assert_eq!(padding.scale, 2.0);
    assert_eq!((padding.pad_x, padding.pad_y), (0, 80));
    assert_eq!((padding.original_width, padding.original_height), (320, 240));

    assert_eq!(frame.as_gray().get_pixel(320, 10)[0], 0);
    assert_eq!(frame.as_gray().get_pixel(320, 320)[0], 255);
    assert_eq!(frame.as_gray().get_pixel(320, 630)[0], 0);
  }

  #[test]
  fn padding_invariants_hold_for_many_shapes() {
    for (w, h) in [(1, 1), (7, 3), (3, 7), (640, 640), (1000, 333), (17, 1200), (2000, 1)] {
      let image = GrayImage::new(w, h);
      let (frame, padding) = scale_and_pad::<640>(&image).unwrap();
      assert_eq!(frame.as_gray().dimensions(), (640, 640));
      assert!(padding.scale > 0.0);
      assert!(padding.pad_x == 0 || padding.pad_y == 0, "{w}x{h}: {padding:?}");
      if w >= h {
        assert_eq!(padding.pad_x, 0);
      } else {
        assert_eq!(padding.pad_y, 0);
      }
    }
  }

  #[test]
  fn empty_image_is_rejected() {
    let image = GrayImage::new(0, 10);
    assert!(matches!(
      scale_and_pad::<640>(&image),
      Err(DetectError::InvalidImage { width: 0, height: 10 })
    ));
  }

  #[test]
  fn letterbox_accepts_color_input() {
    let rgb = RgbImage::from_pixel(64, 32, Rgb([10, 20, 30]));
    let (frame, padding) = letterbox::<128>(&DynamicImage::ImageRgb8(rgb)).unwrap();
    assert_eq!(frame.size(), 128);
    assert_eq!((padding.pad_x, padding.pad_y), (0, 32));
  }
}
