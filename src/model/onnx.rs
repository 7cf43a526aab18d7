// 该文件是 Tehai （手牌） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理后端
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

use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  tensor::TensorElementType,
  value::Tensor,
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  error::DetectError,
  frame::{InputKind, ModelInput, TARGET_SIZE},
  model::{ANCHOR_NUM, Model, RawOutput},
};

const DEFAULT_INTRA_THREADS: usize = 1;

#[derive(Error, Debug)]
pub enum OnnxModelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("模型参数错误: {0}")]
  InvalidParameter(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型输出错误: {0}")]
  OutputError(#[from] DetectError),
}

pub struct OnnxModelBuilder {
  model_path: String,
  intra_threads: usize,
  optimization: GraphOptimizationLevel,
  /// `None` 时接受任意锚点数
  anchors: Option<usize>,
}

impl FromUrlWithScheme for OnnxModelBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxModelBuilder {
  type Error = OnnxModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxModelError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut builder = OnnxModelBuilder {
      model_path: url.path().to_string(),
      intra_threads: DEFAULT_INTRA_THREADS,
      optimization: GraphOptimizationLevel::Level3,
      anchors: Some(ANCHOR_NUM),
    };

    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "threads" => {
          builder.intra_threads = v
            .parse()
            .map_err(|_| OnnxModelError::InvalidParameter(format!("threads={}", v)))?;
        }
        "opt" => {
          builder.optimization = match v.as_ref() {
            "0" => GraphOptimizationLevel::Disable,
            "1" => GraphOptimizationLevel::Level1,
            "2" => GraphOptimizationLevel::Level2,
            "3" => GraphOptimizationLevel::Level3,
            _ => return Err(OnnxModelError::InvalidParameter(format!("opt={}", v))),
          };
        }
        "anchors" => {
          builder.anchors = match v.as_ref() {
            "any" => None,
            n => Some(
              n.parse()
                .map_err(|_| OnnxModelError::InvalidParameter(format!("anchors={}", v)))?,
            ),
          };
        }
        _ => {}
      }
    }

    Ok(builder)
  }
}

impl OnnxModelBuilder {
  pub fn intra_threads(mut self, intra_threads: usize) -> Self {
    self.intra_threads = intra_threads;
    self
  }

  pub fn build(&self) -> Result<OnnxModel, OnnxModelError> {
    info!("加载模型文件: {}", self.model_path);
    let session = Session::builder()?
      .with_optimization_level(self.optimization)?
      .with_intra_threads(self.intra_threads)?
      .commit_from_file(&self.model_path)?;

    let input = session
      .inputs
      .first()
      .ok_or_else(|| OnnxModelError::ModelInvalid("模型没有输入".to_string()))?;
    if session.outputs.is_empty() {
      return Err(OnnxModelError::ModelInvalid("模型没有输出".to_string()));
    }

    let input_kind = match input.input_type.tensor_type() {
      Some(TensorElementType::Float32) => InputKind::Float32,
      Some(TensorElementType::Uint8) => InputKind::UInt8,
      other => {
        return Err(OnnxModelError::ModelInvalid(format!(
          "不支持的输入类型: {:?}",
          other
        )));
      }
    };
    let input_name = input.name.clone();

    debug!("模型输入: {} ({:?})", input_name, input_kind);
    info!("模型加载完成");

    Ok(OnnxModel {
      session,
      input_name,
      input_kind,
      anchors: self.anchors,
    })
  }
}

pub struct OnnxModel {
  session: Session,
  input_name: String,
  input_kind: InputKind,
  anchors: Option<usize>,
}

impl Model for OnnxModel {
  type Error = OnnxModelError;

  fn input_kind(&self) -> InputKind {
    self.input_kind
  }

  fn infer(&mut self, input: &ModelInput<TARGET_SIZE>) -> Result<RawOutput, Self::Error> {
    debug!("设置模型输入 {}", self.input_name);
    let shape = input.shape();
    let outputs = match input {
      ModelInput::Float32(tensor) => {
        let value = Tensor::from_array((shape, tensor.as_slice().to_vec()))?;
        self
          .session
          .run(ort::inputs![self.input_name.as_str() => value])?
      }
      ModelInput::UInt8(tensor) => {
        let value = Tensor::from_array((shape, tensor.as_slice().to_vec()))?;
        self
          .session
          .run(ort::inputs![self.input_name.as_str() => value])?
      }
    };

    let (out_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    let out_shape: Vec<usize> = out_shape.iter().map(|&d| d.max(0) as usize).collect();
    debug!("模型输出形状: {:?}", out_shape);

    let output = RawOutput::from_shape_vec(&out_shape, data.to_vec())?;
    if let Some(anchors) = self.anchors {
      output.ensure_anchors(anchors)?;
    }
    Ok(output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn builder(url: &str) -> Result<OnnxModelBuilder, OnnxModelError> {
    OnnxModelBuilder::from_url(&Url::parse(url).unwrap())
  }

  #[test]
  fn anchors_default_to_detection_head() {
    let builder = builder("onnx:///models/tehai.onnx?threads=2").unwrap();
    assert_eq!(builder.model_path, "/models/tehai.onnx");
    assert_eq!(builder.intra_threads, 2);
    assert_eq!(builder.anchors, Some(ANCHOR_NUM));
  }

  #[test]
  fn anchors_can_be_relaxed_or_overridden() {
    assert_eq!(builder("onnx:///m.onnx?anchors=any").unwrap().anchors, None);
    assert_eq!(builder("onnx:///m.onnx?anchors=2100").unwrap().anchors, Some(2100));
    assert!(matches!(
      builder("onnx:///m.onnx?anchors=lots"),
      Err(OnnxModelError::InvalidParameter(_))
    ));
    assert!(matches!(
      builder("file:///m.onnx"),
      Err(OnnxModelError::SchemeMismatch(_))
    ));
  }
}
