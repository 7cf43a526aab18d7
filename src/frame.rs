// 该文件是 Tehai （手牌） 项目的一部分。
// src/frame.rs - 画布与 NCHW 张量定义
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

use image::GrayImage;

use crate::error::DetectError;

/// 模型输入边长
pub const TARGET_SIZE: u32 = 640;

const RGB_CHANNELS: usize = 3;

/// 模型期望的输入元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
  /// 归一化到 [0, 1] 的浮点输入
  #[default]
  Float32,
  /// 量化模型使用的原始字节输入
  UInt8,
}

/// 填充后的正方形灰度画布
#[derive(Debug, Clone)]
pub struct LetterboxFrame<const S: u32> {
  image: GrayImage,
}

impl<const S: u32> LetterboxFrame<S> {
  pub(crate) fn from_canvas(image: GrayImage) -> Self {
    debug_assert_eq!(image.dimensions(), (S, S));
    Self { image }
  }

  pub fn size(&self) -> u32 {
    S
  }

  pub fn as_gray(&self) -> &GrayImage {
    &self.image
  }

  pub fn into_gray(self) -> GrayImage {
    self.image
  }
}

/// 带批次维度的 NCHW 张量，形状固定为 [1, 3, H, W]
#[derive(Debug, Clone)]
pub struct NchwTensor<T, const W: u32, const H: u32> {
  data: Box<[T]>,
}

pub type F32NchwTensor<const S: u32> = NchwTensor<f32, S, S>;
pub type U8NchwTensor<const S: u32> = NchwTensor<u8, S, S>;

impl<T, const W: u32, const H: u32> NchwTensor<T, W, H> {
  const LEN: usize = RGB_CHANNELS * W as usize * H as usize;

  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, H as usize, W as usize]
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_slice(&self) -> &[T] {
    &self.data
  }

  pub fn into_vec(self) -> Vec<T> {
    self.data.into_vec()
  }
}

impl<T: Default + Clone, const W: u32, const H: u32> Default for NchwTensor<T, W, H> {
  fn default() -> Self {
    Self {
      data: vec![T::default(); Self::LEN].into_boxed_slice(),
    }
  }
}

impl<T, const W: u32, const H: u32> TryFrom<Vec<T>> for NchwTensor<T, W, H> {
  type Error = DetectError;

  fn try_from(data: Vec<T>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(DetectError::shape_mismatch(
        format!("[1, {}, {}, {}]", RGB_CHANNELS, H, W),
        &[data.len()],
      ));
    }
    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<T, const W: u32, const H: u32> AsMut<[T]> for NchwTensor<T, W, H> {
  fn as_mut(&mut self) -> &mut [T] {
    &mut self.data
  }
}

impl<T: Default + Clone, const S: u32> NchwTensor<T, S, S> {
  /// 灰度值复制到 R、G、B 三个平面
  fn from_frame_with(frame: &LetterboxFrame<S>, f: impl Fn(u8) -> T) -> Self {
    let mut tensor = Self::default();
    let plane_size = (S as usize) * (S as usize);
    let slice = tensor.as_mut();

    for (idx, pixel) in frame.as_gray().pixels().enumerate() {
      let value = f(pixel[0]);
      for c in 0..RGB_CHANNELS {
        slice[c * plane_size + idx] = value.clone();
      }
    }
    tensor
  }
}

impl<const S: u32> From<&LetterboxFrame<S>> for F32NchwTensor<S> {
  fn from(frame: &LetterboxFrame<S>) -> Self {
    Self::from_frame_with(frame, |v| v as f32 / 255.0)
  }
}

impl<const S: u32> From<&LetterboxFrame<S>> for U8NchwTensor<S> {
  fn from(frame: &LetterboxFrame<S>) -> Self {
    Self::from_frame_with(frame, |v| v)
  }
}

/// 交给推理引擎的输入
#[derive(Debug, Clone)]
pub enum ModelInput<const S: u32> {
  Float32(F32NchwTensor<S>),
  UInt8(U8NchwTensor<S>),
}

impl<const S: u32> ModelInput<S> {
  pub fn build(frame: &LetterboxFrame<S>, kind: InputKind) -> Self {
    match kind {
      InputKind::Float32 => ModelInput::Float32(frame.into()),
      InputKind::UInt8 => ModelInput::UInt8(frame.into()),
    }
  }

  pub fn kind(&self) -> InputKind {
    match self {
      ModelInput::Float32(_) => InputKind::Float32,
      ModelInput::UInt8(_) => InputKind::UInt8,
    }
  }

  pub fn shape(&self) -> [usize; 4] {
    match self {
      ModelInput::Float32(tensor) => tensor.shape(),
      ModelInput::UInt8(tensor) => tensor.shape(),
    }
  }
}
