// 该文件是 Tehai （手牌） 项目的一部分。
// src/input/read_image_file.rs - 图像文件与目录输入
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  error::DetectError,
  input::{ImageSource, InputFrame, LoadFrame},
};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误 {path}: {source}")]
  ImageLoadError {
    path: PathBuf,
    #[source]
    source: DetectError,
  },
}

fn check_scheme(url: &Url, expected: &'static str) -> Result<(), ImageFileInputError> {
  if url.scheme() != expected {
    error!(
      "URI scheme mismatch: expected '{}', found '{}'",
      expected,
      url.scheme()
    );
    return Err(ImageFileInputError::SchemeMismatch {
      expected,
      found: url.scheme().to_string(),
    });
  }
  Ok(())
}

fn load_frame(path: &Path) -> Result<InputFrame, ImageFileInputError> {
  let image = ImageSource::from(path)
    .decode()
    .map_err(|source| ImageFileInputError::ImageLoadError {
      path: path.to_path_buf(),
      source,
    })?;
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  debug!("读取图像 {}: {}x{}", name, image.width(), image.height());
  Ok(InputFrame { name, image })
}

/// 待解码的图像文件
#[derive(Debug, Clone)]
pub struct PendingImage {
  path: PathBuf,
}

impl PendingImage {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl LoadFrame for PendingImage {
  type Error = ImageFileInputError;

  fn load(self) -> Result<InputFrame, Self::Error> {
    load_frame(&self.path)
  }
}

/// 单张图像文件，`image:///path/to/hand.png`
pub struct ImageFileInput {
  path: Option<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    Ok(ImageFileInput {
      path: Some(PathBuf::from(url.path())),
    })
  }
}

impl ImageFileInput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }

  pub fn into_pending(self) -> std::vec::IntoIter<PendingImage> {
    let pending: Vec<PendingImage> = self.path.map(|path| PendingImage { path }).into_iter().collect();
    pending.into_iter()
  }
}

impl Iterator for ImageFileInput {
  type Item = Result<InputFrame, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.path.take().map(|path| load_frame(&path))
  }
}

/// 目录下的全部图像文件，按文件名排序，`folder:///path/to/dir`
pub struct DirectoryInput {
  paths: std::vec::IntoIter<PathBuf>,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    Self::open(url.path())
  }
}

impl DirectoryInput {
  pub fn open(directory: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory.as_ref())? {
      let path = entry?.path();
      let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
      if path.is_file() && is_image {
        paths.push(path);
      }
    }
    paths.sort();
    debug!("目录 {} 中找到 {} 张图像", directory.as_ref().display(), paths.len());

    Ok(DirectoryInput {
      paths: paths.into_iter(),
    })
  }

  pub fn remaining(&self) -> usize {
    self.paths.len()
  }

  pub fn into_pending(self) -> std::vec::IntoIter<PendingImage> {
    let pending: Vec<PendingImage> = self.paths.map(|path| PendingImage { path }).collect();
    pending.into_iter()
  }
}

impl Iterator for DirectoryInput {
  type Item = Result<InputFrame, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.paths.next().map(|path| load_frame(&path))
  }
}
