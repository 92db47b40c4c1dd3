//! [`InferenceSession`] backed by `candle-onnx`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use candle_core::{DType, Device};
use candle_onnx::onnx::tensor_shape_proto::dimension;
use candle_onnx::onnx::type_proto;
use candle_onnx::onnx::ModelProto;

use super::error::SessionError;
use super::session::{InferenceSession, TensorMap};
use super::tensor::{Tensor, TensorData};

/// CPU ONNX model evaluated with candle's graph interpreter.
pub struct CandleSession {
    model: Option<ModelProto>,
    inputs: HashMap<String, Vec<i64>>,
    device: Device,
}

impl CandleSession {
    /// Load a `.onnx` file and read its declared inputs.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let model = candle_onnx::read_file(path)
            .map_err(|e| SessionError::Load(format!("{}: {}", path.display(), e)))?;
        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| SessionError::Load(format!("{}: model has no graph", path.display())))?;

        // Initializers may be listed as inputs too; they are weights, not inputs.
        let weights: HashSet<&str> = graph.initializer.iter().map(|t| t.name.as_str()).collect();
        let inputs = graph
            .input
            .iter()
            .filter(|info| !weights.contains(info.name.as_str()))
            .map(|info| (info.name.clone(), declared_shape(info)))
            .collect::<HashMap<_, _>>();

        tracing::info!(path = %path.display(), inputs = inputs.len(), "ONNX model loaded");

        Ok(Self {
            model: Some(model),
            inputs,
            device: Device::Cpu,
        })
    }

    fn to_candle(&self, tensor: &Tensor) -> candle_core::Result<candle_core::Tensor> {
        let shape = tensor.shape().to_vec();
        match tensor.data() {
            TensorData::F32(v) => candle_core::Tensor::from_vec(v.clone(), shape, &self.device),
            TensorData::I64(v) => candle_core::Tensor::from_vec(v.clone(), shape, &self.device),
        }
    }
}

fn declared_shape(info: &candle_onnx::onnx::ValueInfoProto) -> Vec<i64> {
    let Some(type_proto::Value::TensorType(tensor)) =
        info.r#type.as_ref().and_then(|t| t.value.as_ref())
    else {
        return Vec::new();
    };
    tensor
        .shape
        .as_ref()
        .map(|shape| {
            shape
                .dim
                .iter()
                .map(|d| match &d.value {
                    Some(dimension::Value::DimValue(v)) => *v,
                    _ => -1,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn from_candle(tensor: &candle_core::Tensor) -> candle_core::Result<Tensor> {
    let shape = tensor.dims().to_vec();
    let flat = tensor.flatten_all()?;
    let data = match tensor.dtype() {
        DType::I64 => TensorData::I64(flat.to_vec1::<i64>()?),
        DType::U32 | DType::U8 => TensorData::I64(flat.to_dtype(DType::I64)?.to_vec1::<i64>()?),
        _ => TensorData::F32(flat.to_dtype(DType::F32)?.to_vec1::<f32>()?),
    };
    Tensor::new(shape, data).map_err(|e| candle_core::Error::Msg(e.to_string()))
}

impl InferenceSession for CandleSession {
    fn run(&mut self, inputs: &TensorMap) -> Result<TensorMap, SessionError> {
        let model = self.model.as_ref().ok_or(SessionError::Closed)?;
        let failure = |e: candle_core::Error| SessionError::InferenceFailure(e.to_string());

        let mut feed = HashMap::with_capacity(inputs.len());
        for (name, tensor) in inputs {
            feed.insert(name.clone(), self.to_candle(tensor).map_err(failure)?);
        }

        let outputs = candle_onnx::simple_eval(model, feed).map_err(failure)?;
        outputs
            .iter()
            .map(|(name, t)| Ok((name.clone(), Arc::new(from_candle(t).map_err(failure)?))))
            .collect()
    }

    fn input_names(&self) -> HashSet<String> {
        self.inputs.keys().cloned().collect()
    }

    fn input_shape(&self, name: &str) -> Option<Vec<i64>> {
        self.inputs.get(name).cloned()
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.model = None;
        Ok(())
    }
}
