// 该文件是 Tehai （手牌） 项目的一部分。
// src/postprocess/assemble.rs - 按从左到右排序并映射标签
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

use crate::{error::DetectError, label::WithLabel, postprocess::Detection};

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem<T> {
  pub kind: T,
  pub score: f32,
  pub bbox: [u32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectResult<T> {
  pub items: Box<[DetectItem<T>]>,
}

impl<T> DetectResult<T> {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &DetectItem<T>> {
    self.items.iter()
  }
}

impl<T: WithLabel> DetectResult<T> {
  pub fn labels(&self) -> Vec<&'static str> {
    self.items.iter().map(|item| item.kind.to_label_str()).collect()
  }
}

/// 按 x1 升序稳定排序后映射为标签
pub fn assemble<T: WithLabel>(mut detections: Vec<Detection>) -> Result<DetectResult<T>, DetectError> {
  detections.sort_by_key(|d| d.x1);

  let items = detections
    .into_iter()
    .map(|d| {
      let kind = T::from_label_id(d.class_id).ok_or(DetectError::ClassIndexOutOfRange {
        class_id: d.class_id,
        labels: T::LABEL_NUM,
      })?;
      Ok(DetectItem {
        kind,
        score: d.confidence,
        bbox: d.bbox(),
      })
    })
    .collect::<Result<Vec<_>, DetectError>>()?;

  Ok(DetectResult {
    items: items.into_boxed_slice(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::label::Tile;

  fn detection(x1: u32, class_id: usize, confidence: f32) -> Detection {
    Detection {
      x1,
      y1: 0,
      x2: x1 + 10,
      y2: 10,
      class_id,
      confidence,
    }
  }

  #[test]
  fn labels_read_left_to_right() {
    let detections = vec![
      detection(300, 27, 0.9),
      detection(10, 0, 0.8),
      detection(150, 13, 0.7),
    ];
    let result = assemble::<Tile>(detections).unwrap();
    assert_eq!(result.labels(), vec!["1m", "5p", "chun"]);
    assert_eq!(result.items[0].bbox, [10, 0, 20, 10]);
    assert_eq!(result.items[2].score, 0.9);
  }

  #[test]
  fn equal_x1_keeps_selection_order() {
    let detections = vec![detection(50, 2, 0.9), detection(50, 1, 0.8), detection(20, 33, 0.6)];
    let result = assemble::<Tile>(detections).unwrap();
    assert_eq!(result.labels(), vec!["tou", "1s", "1p"]);

    let xs: Vec<u32> = result.iter().map(|item| item.bbox[0]).collect();
    assert!(xs.windows(2).all(|w| w[0] <= w[1]));
  }

  #[test]
  fn unknown_class_is_an_error() {
    let err = assemble::<Tile>(vec![detection(0, 34, 0.9)]).unwrap_err();
    assert!(matches!(
      err,
      DetectError::ClassIndexOutOfRange { class_id: 34, labels: 34 }
    ));
  }

  #[test]
  fn empty_input_yields_empty_result() {
    let result = assemble::<Tile>(Vec::new()).unwrap();
    assert!(result.is_empty());
    assert!(result.labels().is_empty());
  }
}
