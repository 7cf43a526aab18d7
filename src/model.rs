// 该文件是 Tehai （手牌） 项目的一部分。
// src/model.rs - 推理引擎接口与原始输出
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

use crate::{
  error::DetectError,
  frame::{InputKind, ModelInput, TARGET_SIZE},
};

/// 640×640 输入下检测头的锚点数
pub const ANCHOR_NUM: usize = 8400;

/// 推理引擎。
///
/// 每个实例只由一个工作线程持有，`infer` 通过 `&mut self` 调用，
/// 不要求实现 `Sync`。
pub trait Model {
  type Error: std::error::Error + Send + Sync + 'static;

  fn input_kind(&self) -> InputKind {
    InputKind::Float32
  }

  fn infer(&mut self, input: &ModelInput<TARGET_SIZE>) -> Result<RawOutput, Self::Error>;
}

impl<M: Model + ?Sized> Model for Box<M> {
  type Error = M::Error;

  fn input_kind(&self) -> InputKind {
    (**self).input_kind()
  }

  fn infer(&mut self, input: &ModelInput<TARGET_SIZE>) -> Result<RawOutput, Self::Error> {
    (**self).infer(input)
  }
}

impl<M: Model + ?Sized> Model for &mut M {
  type Error = M::Error;

  fn input_kind(&self) -> InputKind {
    (**self).input_kind()
  }

  fn infer(&mut self, input: &ModelInput<TARGET_SIZE>) -> Result<RawOutput, Self::Error> {
    (**self).infer(input)
  }
}

/// 检测头原始输出，形状为 [4 + 类别数, 锚点数]，按行存储
#[derive(Debug, Clone)]
pub struct RawOutput {
  rows: usize,
  anchors: usize,
  data: Box<[f32]>,
}

impl RawOutput {
  /// 接受 [1, R, A] 或 [R, A] 形状的扁平数据
  pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> Result<Self, DetectError> {
    let (rows, anchors) = match *shape {
      [1, rows, anchors] | [rows, anchors] => (rows, anchors),
      _ => return Err(DetectError::shape_mismatch("[1, R, A]", shape)),
    };

    if rows * anchors != data.len() {
      return Err(DetectError::shape_mismatch(
        format!("{} 个元素", data.len()),
        shape,
      ));
    }

    Ok(Self {
      rows,
      anchors,
      data: data.into_boxed_slice(),
    })
  }

  pub fn shape(&self) -> [usize; 2] {
    [self.rows, self.anchors]
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn anchors(&self) -> usize {
    self.anchors
  }

  pub fn row(&self, row: usize) -> &[f32] {
    &self.data[row * self.anchors..(row + 1) * self.anchors]
  }

  pub fn get(&self, row: usize, anchor: usize) -> f32 {
    self.data[row * self.anchors + anchor]
  }

  /// 检查锚点数量
  pub fn ensure_anchors(&self, expected: usize) -> Result<(), DetectError> {
    if self.anchors != expected {
      return Err(DetectError::shape_mismatch(
        format!("[{}, {}]", self.rows, expected),
        &self.shape(),
      ));
    }
    Ok(())
  }
}

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxModel, OnnxModelBuilder, OnnxModelError};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn raw_output_accepts_batched_shape() {
    let output = RawOutput::from_shape_vec(&[1, 2, 3], vec![0., 1., 2., 3., 4., 5.]).unwrap();
    assert_eq!(output.shape(), [2, 3]);
    assert_eq!(output.row(1), &[3., 4., 5.]);
    assert_eq!(output.get(0, 2), 2.);
  }

  #[test]
  fn raw_output_rejects_bad_shapes() {
    assert!(matches!(
      RawOutput::from_shape_vec(&[2, 2, 3], vec![0.; 12]),
      Err(DetectError::ShapeMismatch { .. })
    ));
    assert!(matches!(
      RawOutput::from_shape_vec(&[2, 3], vec![0.; 5]),
      Err(DetectError::ShapeMismatch { .. })
    ));
    assert!(matches!(
      RawOutput::from_shape_vec(&[6], vec![0.; 6]),
      Err(DetectError::ShapeMismatch { .. })
    ));
  }

  #[test]
  fn anchor_count_is_checked() {
    let output = RawOutput::from_shape_vec(&[1, 38, 5], vec![0.; 38 * 5]).unwrap();
    match output.ensure_anchors(ANCHOR_NUM) {
      Err(DetectError::ShapeMismatch { expected, actual }) => {
        assert_eq!(expected, "[38, 8400]");
        assert_eq!(actual, vec![38, 5]);
      }
      other => panic!("unexpected result: {other:?}"),
    }
    assert!(output.ensure_anchors(5).is_ok());
  }
}
