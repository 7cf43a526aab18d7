// 该文件是 Tehai （手牌） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{label::Tile, postprocess::DetectResult};

const BOX_THICKNESS: u32 = 2;
const MAX_BOX_THICKNESS: u32 = 64;
const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const HONOR_BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色

pub struct Draw {
  thickness: u32,
  color: [u8; 3],
  honor_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: BOX_THICKNESS,
      color: BOX_COLOR,
      honor_color: HONOR_BOX_COLOR,
    }
  }
}

impl Draw {
  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness.clamp(1, MAX_BOX_THICKNESS);
    self
  }

  // bbox 为原图像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &[u32; 4], color: [u8; 3]) {
    let (w, h) = image.dimensions();
    let x_min = bbox[0].min(w.saturating_sub(1));
    let y_min = bbox[1].min(h.saturating_sub(1));
    let x_max = bbox[2].min(w.saturating_sub(1));
    let y_max = bbox[3].min(h.saturating_sub(1));

    for t in 0..self.thickness {
      let (x0, y0) = (x_min.saturating_add(t), y_min.saturating_add(t));
      let (x1, y1) = (x_max.saturating_sub(t), y_max.saturating_sub(t));
      if x0 > x1 || y0 > y1 {
        break;
      }
      let rect = Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0 + 1, y1 - y0 + 1);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }

  pub fn draw_detection(&self, image: &DynamicImage, result: &DetectResult<Tile>) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for item in result.iter() {
      let color = if item.kind.is_honor() {
        self.honor_color
      } else {
        self.color
      };
      self.draw_bbox(&mut canvas, &item.bbox, color);
    }
    canvas
  }
}
