// 该文件是 Tehai （手牌） 项目的一部分。
// src/postprocess/remap.rs - 坐标映射回原图
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

use crate::preprocess::PaddingInfo;

/// 撤销缩放与填充，把模型输入空间的 [x1, y1, x2, y2] 映射到原图并截断为整数。
///
/// 计算使用单精度，先裁剪到 `[0, 原图宽/高]` 再截断。
pub fn remap(bbox: &[f32; 4], padding: &PaddingInfo) -> [u32; 4] {
  let scale = padding.scale as f32;
  let (pad_x, pad_y) = (padding.pad_x as f32, padding.pad_y as f32);
  let (max_x, max_y) = (
    padding.original_width as f32,
    padding.original_height as f32,
  );

  let map = |v: f32, pad: f32, max: f32| ((v - pad) / scale).clamp(0.0, max) as u32;

  let x1 = map(bbox[0], pad_x, max_x);
  let y1 = map(bbox[1], pad_y, max_y);
  let x2 = map(bbox[2], pad_x, max_x);
  let y2 = map(bbox[3], pad_y, max_y);

  // 负宽高的框交换角点
  [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]
}
