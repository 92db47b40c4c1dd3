//! Scripted in-memory inference sessions shared by the generation tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gg_text::generation::{InferenceSession, SessionError, Tensor, TensorMap};

pub const HEADS: usize = 2;
pub const HEAD_DIM: usize = 4;
pub const HIDDEN: usize = 8;
pub const VOCAB: usize = 16;

/// Which model of a generation pipeline the session pretends to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decoder-only model with `past_key_values.{i}.key` inputs.
    Decoder,
    Encoder,
    /// First encoder-decoder step; emits self and cross caches.
    FirstDecoder,
    /// Encoder-decoder step with past; also emits fresh cross tensors that
    /// must be ignored.
    DecoderWithPast,
}

/// What the session observed on one `run`.
#[derive(Debug, Clone)]
pub struct Call {
    pub input_ids: Vec<i64>,
    pub attention_mask_len: Option<usize>,
    pub position_ids: Option<Vec<i64>>,
    pub past_length: Option<usize>,
    pub inputs: TensorMap,
}

#[derive(Debug, Default)]
pub struct Shared {
    pub calls: Mutex<Vec<Call>>,
    pub closes: AtomicUsize,
}

pub struct ScriptedSession {
    role: Role,
    layers: usize,
    names: HashSet<String>,
    /// Token made most likely at step `n`; the last entry repeats.
    script: Vec<usize>,
    step: usize,
    fail_run_at: Option<usize>,
    fail_close: bool,
    closed: bool,
    pub shared: Arc<Shared>,
}

impl ScriptedSession {
    pub fn new(role: Role, layers: usize) -> Self {
        let mut names: HashSet<String> = ["input_ids"].iter().map(|s| s.to_string()).collect();
        match role {
            Role::Decoder => {
                names.insert("attention_mask".into());
                names.insert("position_ids".into());
                for i in 0..layers {
                    names.insert(format!("past_key_values.{}.key", i));
                    names.insert(format!("past_key_values.{}.value", i));
                }
            }
            Role::Encoder => {
                names.insert("attention_mask".into());
            }
            Role::FirstDecoder => {
                names.insert("encoder_hidden_states".into());
                names.insert("encoder_attention_mask".into());
            }
            Role::DecoderWithPast => {
                names.insert("encoder_attention_mask".into());
                for i in 0..layers {
                    for part in ["decoder.key", "decoder.value", "encoder.key", "encoder.value"] {
                        names.insert(format!("past_key_values.{}.{}", i, part));
                    }
                }
            }
        }

        Self {
            role,
            layers,
            names,
            script: vec![1],
            step: 0,
            fail_run_at: None,
            fail_close: false,
            closed: false,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn with_script(mut self, script: Vec<usize>) -> Self {
        self.script = script;
        self
    }

    pub fn without_position_ids(mut self) -> Self {
        self.names.remove("position_ids");
        self
    }

    pub fn failing_run_at(mut self, step: usize) -> Self {
        self.fail_run_at = Some(step);
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    fn logits(&self, positions: usize) -> Arc<Tensor> {
        let target = self.script[self.step.min(self.script.len() - 1)];
        let mut data = vec![0.0_f32; positions * VOCAB];
        data[(positions - 1) * VOCAB + target] = 10.0;
        Arc::new(Tensor::from_f32(vec![1, positions, VOCAB], data).unwrap())
    }

    fn cache(&self, length: usize) -> Arc<Tensor> {
        Arc::new(Tensor::zeros_f32(vec![1, HEADS, length, HEAD_DIM]))
    }
}

impl InferenceSession for ScriptedSession {
    fn run(&mut self, inputs: &TensorMap) -> Result<TensorMap, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if self.fail_run_at == Some(self.step) {
            return Err(SessionError::InferenceFailure("scripted failure".into()));
        }

        let input_ids = inputs["input_ids"].as_i64().unwrap().to_vec();
        let past_key = match self.role {
            Role::Decoder => Some("past_key_values.0.key"),
            Role::DecoderWithPast => Some("past_key_values.0.decoder.key"),
            _ => None,
        };
        let past_length = past_key.map(|name| inputs[name].dim(2).unwrap());
        self.shared.calls.lock().unwrap().push(Call {
            input_ids: input_ids.clone(),
            attention_mask_len: inputs.get("attention_mask").map(|t| t.len()),
            position_ids: inputs.get("position_ids").map(|t| t.as_i64().unwrap().to_vec()),
            past_length,
            inputs: inputs.clone(),
        });

        let n = input_ids.len();
        let mut out = TensorMap::new();
        match self.role {
            Role::Encoder => {
                out.insert(
                    "last_hidden_state".into(),
                    Arc::new(Tensor::zeros_f32(vec![1, n, HIDDEN])),
                );
            }
            Role::Decoder => {
                let total = past_length.unwrap_or(0) + n;
                out.insert("logits".into(), self.logits(n));
                for i in 0..self.layers {
                    out.insert(format!("present.{}.key", i), self.cache(total));
                    out.insert(format!("present.{}.value", i), self.cache(total));
                }
            }
            Role::FirstDecoder | Role::DecoderWithPast => {
                let source = inputs["encoder_attention_mask"].len();
                let total = past_length.unwrap_or(0) + n;
                out.insert("logits".into(), self.logits(n));
                for i in 0..self.layers {
                    out.insert(format!("present.{}.decoder.key", i), self.cache(total));
                    out.insert(format!("present.{}.decoder.value", i), self.cache(total));
                    out.insert(format!("present.{}.encoder.key", i), self.cache(source));
                    out.insert(format!("present.{}.encoder.value", i), self.cache(source));
                }
            }
        }

        self.step += 1;
        Ok(out)
    }

    fn input_names(&self) -> HashSet<String> {
        self.names.clone()
    }

    fn input_shape(&self, name: &str) -> Option<Vec<i64>> {
        if name.starts_with("past_key_values.") {
            Some(vec![-1, HEADS as i64, -1, HEAD_DIM as i64])
        } else if self.names.contains(name) {
            Some(vec![-1, -1])
        } else {
            None
        }
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        if self.fail_close {
            Err(SessionError::InferenceFailure("close failed".into()))
        } else {
            Ok(())
        }
    }
}

pub fn closes(shared: &Shared) -> usize {
    shared.closes.load(Ordering::SeqCst)
}
