//! KV-cache records and the tensor names used to exchange them.

use std::collections::HashSet;
use std::sync::Arc;

use super::error::GenerationError;
use super::session::{take_output, InferenceSession, TensorMap};
use super::tensor::Tensor;

/// Name templates for cache tensors; `{i}` is replaced by the layer index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNaming {
    pub past_key: String,
    pub past_value: String,
    pub present_key: String,
    pub present_value: String,
    /// Cross-attention names; `None` for decoder-only models.
    pub past_cross_key: Option<String>,
    pub past_cross_value: Option<String>,
    pub present_cross_key: Option<String>,
    pub present_cross_value: Option<String>,
}

impl CacheNaming {
    /// `past_key_values.{i}.key` / `present.{i}.key` layout.
    pub fn decoder_only() -> Self {
        Self {
            past_key: "past_key_values.{i}.key".into(),
            past_value: "past_key_values.{i}.value".into(),
            present_key: "present.{i}.key".into(),
            present_value: "present.{i}.value".into(),
            past_cross_key: None,
            past_cross_value: None,
            present_cross_key: None,
            present_cross_value: None,
        }
    }

    /// `past_key_values.{i}.decoder.key` / `present.{i}.encoder.value` layout.
    pub fn encoder_decoder() -> Self {
        Self {
            past_key: "past_key_values.{i}.decoder.key".into(),
            past_value: "past_key_values.{i}.decoder.value".into(),
            present_key: "present.{i}.decoder.key".into(),
            present_value: "present.{i}.decoder.value".into(),
            past_cross_key: Some("past_key_values.{i}.encoder.key".into()),
            past_cross_value: Some("past_key_values.{i}.encoder.value".into()),
            present_cross_key: Some("present.{i}.encoder.key".into()),
            present_cross_value: Some("present.{i}.encoder.value".into()),
        }
    }

    pub fn layer(template: &str, index: usize) -> String {
        template.replace("{i}", &index.to_string())
    }

    pub fn has_cross_attention(&self) -> bool {
        self.past_cross_key.is_some()
    }

    /// Layers are numbered from 0 with no gaps.
    pub fn count_layers(&self, input_names: &HashSet<String>) -> usize {
        (0..)
            .take_while(|&i| input_names.contains(&Self::layer(&self.past_key, i)))
            .count()
    }

    fn present_cross(&self) -> Result<(&str, &str), GenerationError> {
        match (&self.present_cross_key, &self.present_cross_value) {
            (Some(k), Some(v)) => Ok((k.as_str(), v.as_str())),
            _ => Err(GenerationError::Discovery(
                "cross-attention cache names are not configured".into(),
            )),
        }
    }
}

/// Attention geometry read from a cache input's static shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    pub num_layers: usize,
    pub num_heads: usize,
    pub head_dim: usize,
}

impl CacheGeometry {
    /// Count layers from the input names and read `[batch, heads, seq, head_dim]`
    /// from the first layer's past-key shape.
    pub fn discover(
        session: &dyn InferenceSession,
        naming: &CacheNaming,
    ) -> Result<Self, GenerationError> {
        let names = session.input_names();
        let num_layers = naming.count_layers(&names);
        if num_layers == 0 {
            return Err(GenerationError::Discovery(format!(
                "no input matches {}",
                naming.past_key
            )));
        }

        let first = CacheNaming::layer(&naming.past_key, 0);
        let shape = session
            .input_shape(&first)
            .ok_or_else(|| GenerationError::Discovery(format!("no shape for {}", first)))?;
        let static_dim = |axis: usize| {
            shape
                .get(axis)
                .copied()
                .filter(|&d| d > 0)
                .map(|d| d as usize)
                .ok_or_else(|| {
                    GenerationError::Discovery(format!(
                        "{} has no static dimension {} in {:?}",
                        first, axis, shape
                    ))
                })
        };

        Ok(Self {
            num_layers,
            num_heads: static_dim(1)?,
            head_dim: static_dim(3)?,
        })
    }
}

/// One layer's cached tensors.
#[derive(Debug, Clone)]
pub struct LayerCache {
    pub self_key: Arc<Tensor>,
    pub self_value: Arc<Tensor>,
    /// Encoder-derived, written once per prefill.
    pub cross_key: Option<Arc<Tensor>>,
    pub cross_value: Option<Arc<Tensor>>,
}

/// Per-layer cache plus the number of positions it covers.
#[derive(Debug, Clone, Default)]
pub struct KvCache {
    layers: Vec<LayerCache>,
    sequence_length: usize,
}

impl KvCache {
    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn is_empty(&self) -> bool {
        self.sequence_length == 0
    }

    pub fn layers(&self) -> &[LayerCache] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&LayerCache> {
        self.layers.get(index)
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.sequence_length = 0;
    }

    pub(crate) fn replace(&mut self, layers: Vec<LayerCache>, sequence_length: usize) {
        self.layers = layers;
        self.sequence_length = sequence_length;
    }

    /// Feed every cached tensor under its past-input name.
    pub(crate) fn write_inputs(&self, naming: &CacheNaming, inputs: &mut TensorMap) {
        for (i, layer) in self.layers.iter().enumerate() {
            inputs.insert(CacheNaming::layer(&naming.past_key, i), Arc::clone(&layer.self_key));
            inputs.insert(CacheNaming::layer(&naming.past_value, i), Arc::clone(&layer.self_value));
            if let (Some(k), Some(v), Some(key_name), Some(value_name)) = (
                &layer.cross_key,
                &layer.cross_value,
                &naming.past_cross_key,
                &naming.past_cross_value,
            ) {
                inputs.insert(CacheNaming::layer(key_name, i), Arc::clone(k));
                inputs.insert(CacheNaming::layer(value_name, i), Arc::clone(v));
            }
        }
    }

    /// Fresh self-attention tensors from `outputs`, keeping cross tensors
    /// from `previous` untouched.
    pub(crate) fn take_self_attention(
        outputs: &mut TensorMap,
        naming: &CacheNaming,
        num_layers: usize,
        previous: &[LayerCache],
    ) -> Result<Vec<LayerCache>, GenerationError> {
        (0..num_layers)
            .map(|i| {
                let prior = previous.get(i);
                Ok(LayerCache {
                    self_key: take_output(outputs, &CacheNaming::layer(&naming.present_key, i))?,
                    self_value: take_output(outputs, &CacheNaming::layer(&naming.present_value, i))?,
                    cross_key: prior.and_then(|p| p.cross_key.clone()),
                    cross_value: prior.and_then(|p| p.cross_value.clone()),
                })
            })
            .collect()
    }

    /// Self and cross tensors from the first decoder pass.
    pub(crate) fn take_with_cross(
        outputs: &mut TensorMap,
        naming: &CacheNaming,
        num_layers: usize,
    ) -> Result<Vec<LayerCache>, GenerationError> {
        let (present_cross_key, present_cross_value) = naming.present_cross()?;
        (0..num_layers)
            .map(|i| {
                Ok(LayerCache {
                    self_key: take_output(outputs, &CacheNaming::layer(&naming.present_key, i))?,
                    self_value: take_output(outputs, &CacheNaming::layer(&naming.present_value, i))?,
                    cross_key: Some(take_output(outputs, &CacheNaming::layer(present_cross_key, i))?),
                    cross_value: Some(take_output(
                        outputs,
                        &CacheNaming::layer(present_cross_value, i),
                    )?),
                })
            })
            .collect()
    }
}
