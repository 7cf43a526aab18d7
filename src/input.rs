// 该文件是 Tehai （手牌） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageReader, RgbImage};
use thiserror::Error;

use crate::{FromUrl, error::DetectError};

/// 可被检测的图像来源
#[derive(Debug, Clone)]
pub enum ImageSource {
  /// 编码后的图像字节（PNG、JPEG 等）
  Bytes(Vec<u8>),
  /// 图像文件路径
  Path(PathBuf),
  /// 已解码的图像
  Image(DynamicImage),
}

impl ImageSource {
  pub fn decode(self) -> Result<DynamicImage, DetectError> {
    let image = match self {
      ImageSource::Bytes(bytes) => image::load_from_memory(&bytes)?,
      ImageSource::Path(path) => ImageReader::open(&path)?.with_guessed_format()?.decode()?,
      ImageSource::Image(image) => image,
    };

    if image.width() == 0 || image.height() == 0 {
      return Err(DetectError::InvalidImage {
        width: image.width(),
        height: image.height(),
      });
    }
    Ok(image)
  }
}

impl From<Vec<u8>> for ImageSource {
  fn from(bytes: Vec<u8>) -> Self {
    ImageSource::Bytes(bytes)
  }
}

impl From<&[u8]> for ImageSource {
  fn from(bytes: &[u8]) -> Self {
    ImageSource::Bytes(bytes.to_vec())
  }
}

impl From<PathBuf> for ImageSource {
  fn from(path: PathBuf) -> Self {
    ImageSource::Path(path)
  }
}

impl From<&Path> for ImageSource {
  fn from(path: &Path) -> Self {
    ImageSource::Path(path.to_path_buf())
  }
}

impl From<DynamicImage> for ImageSource {
  fn from(image: DynamicImage) -> Self {
    ImageSource::Image(image)
  }
}

impl From<RgbImage> for ImageSource {
  fn from(image: RgbImage) -> Self {
    ImageSource::Image(DynamicImage::ImageRgb8(image))
  }
}

impl From<GrayImage> for ImageSource {
  fn from(image: GrayImage) -> Self {
    ImageSource::Image(DynamicImage::ImageLuma8(image))
  }
}

/// 一帧待检测图像
#[derive(Debug, Clone)]
pub struct InputFrame {
  pub name: String,
  pub image: DynamicImage,
}

/// 尚未解码的一帧，`load` 时才读取并解码图像
pub trait LoadFrame {
  type Error: std::error::Error + Send + Sync + 'static;
  fn load(self) -> Result<InputFrame, Self::Error>;
}

impl<E: std::error::Error + Send + Sync + 'static> LoadFrame for Result<InputFrame, E> {
  type Error = E;

  fn load(self) -> Result<InputFrame, E> {
    self
  }
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{
  DirectoryInput, ImageFileInput, ImageFileInputError, PendingImage,
};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "read_image_file")]
  Directory(DirectoryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        return Ok(InputWrapper::ReadImageFile(ImageFileInput::from_url(url)?));
      }
      if url.scheme() == DirectoryInput::SCHEME {
        return Ok(InputWrapper::Directory(DirectoryInput::from_url(url)?));
      }
    }
    let _ = url;
    Err(InputError::SchemeMismatch)
  }
}

#[cfg(feature = "read_image_file")]
impl InputWrapper {
  /// 只列出待读取的文件，解码留给调用方
  pub fn into_pending(self) -> std::vec::IntoIter<PendingImage> {
    match self {
      InputWrapper::ReadImageFile(input) => input.into_pending(),
      InputWrapper::Directory(input) => input.into_pending(),
    }
  }
}

impl Iterator for InputWrapper {
  type Item = Result<InputFrame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next().map(|r| r.map_err(InputError::from)),
      #[cfg(feature = "read_image_file")]
      InputWrapper::Directory(input) => input.next().map(|r| r.map_err(InputError::from)),
      #[cfg(not(feature = "read_image_file"))]
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, Luma};
  use std::io::Cursor;

  #[test]
  fn bytes_are_decoded() {
    let gray = GrayImage::from_pixel(5, 3, Luma([42]));
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(gray)
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();

    let image = ImageSource::from(bytes).decode().unwrap();
    assert_eq!((image.width(), image.height()), (5, 3));
  }

  #[test]
  fn garbage_bytes_are_rejected() {
    let err = ImageSource::from(&b"not an image"[..]).decode().unwrap_err();
    assert!(matches!(err, DetectError::Decode(_)));
  }

  #[test]
  fn empty_image_is_rejected() {
    let err = ImageSource::from(GrayImage::new(0, 0)).decode().unwrap_err();
    assert!(matches!(err, DetectError::InvalidImage { width: 0, height: 0 }));
  }
}
