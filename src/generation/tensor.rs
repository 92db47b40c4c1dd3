//! Minimal named-tensor boundary type exchanged with inference sessions.

use serde::Serialize;

use super::error::TensorError;

/// Element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    F32,
    I64,
}

/// Flat element buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    I64(Vec<i64>),
}

impl TensorData {
    fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::I64(v) => v.len(),
        }
    }

    fn dtype(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::F32,
            Self::I64(_) => DataType::I64,
        }
    }
}

/// Row-major tensor: element buffer plus shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Element count must equal the product of `shape`.
    pub fn new(shape: Vec<usize>, data: TensorData) -> Result<Self, TensorError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TensorError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn from_f32(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::F32(data))
    }

    pub fn from_i64(shape: Vec<usize>, data: Vec<i64>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::I64(data))
    }

    /// `[1, n]` int64 row.
    pub fn row_i64(values: Vec<i64>) -> Self {
        Self {
            shape: vec![1, values.len()],
            data: TensorData::I64(values),
        }
    }

    /// f32 tensor of zeros; any zero-sized dimension yields an empty buffer.
    pub fn zeros_f32(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: TensorData::F32(vec![0.0; len]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    pub fn dim(&self, axis: usize) -> Result<usize, TensorError> {
        self.shape
            .get(axis)
            .copied()
            .ok_or(TensorError::AxisOutOfRange { axis, rank: self.shape.len() })
    }

    pub fn as_f32(&self) -> Result<&[f32], TensorError> {
        match &self.data {
            TensorData::F32(v) => Ok(v),
            other => Err(TensorError::WrongType {
                expected: DataType::F32,
                actual: other.dtype(),
            }),
        }
    }

    pub fn as_i64(&self) -> Result<&[i64], TensorError> {
        match &self.data {
            TensorData::I64(v) => Ok(v),
            other => Err(TensorError::WrongType {
                expected: DataType::I64,
                actual: other.dtype(),
            }),
        }
    }

    /// Select `index` along `axis`, dropping that axis.
    pub fn select(&self, axis: usize, index: usize) -> Result<Tensor, TensorError> {
        let size = self.dim(axis)?;
        if index >= size {
            return Err(TensorError::IndexOutOfRange { index, size });
        }

        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let mut shape = self.shape.clone();
        shape.remove(axis);

        fn gather<T: Copy>(v: &[T], outer: usize, size: usize, inner: usize, index: usize) -> Vec<T> {
            let mut out = Vec::with_capacity(outer * inner);
            for o in 0..outer {
                let start = (o * size + index) * inner;
                out.extend_from_slice(&v[start..start + inner]);
            }
            out
        }

        let data = match &self.data {
            TensorData::F32(v) => TensorData::F32(gather(v, outer, size, inner, index)),
            TensorData::I64(v) => TensorData::I64(gather(v, outer, size, inner, index)),
        };
        Ok(Tensor { shape, data })
    }

    /// Logits of the last sequence position of a `[batch=1, seq, vocab]`
    /// (or `[seq, vocab]`) float tensor.
    pub fn last_position_logits(&self) -> Result<Vec<f32>, TensorError> {
        let rank = self.shape.len();
        if rank < 2 {
            return Err(TensorError::AxisOutOfRange { axis: 1, rank });
        }
        let seq_axis = rank - 2;
        let seq = self.dim(seq_axis)?;
        if seq == 0 {
            return Err(TensorError::IndexOutOfRange { index: 0, size: 0 });
        }
        let mut last = self.select(seq_axis, seq - 1)?;
        while last.shape.len() > 1 {
            last = last.select(0, 0)?;
        }
        match last.data {
            TensorData::F32(v) => Ok(v),
            other => Err(TensorError::WrongType {
                expected: DataType::F32,
                actual: other.dtype(),
            }),
        }
    }
}
