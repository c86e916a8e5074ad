//! Host-side mirror of every parameter buffer.
//!
//! Writes go through the parameter map into a `Vec<u32>` per buffer; floats
//! are stored by bit pattern so both numeric views alias the same words.

use crate::layout::{binding, BufferName, NumericView, ParameterBinding, ParameterId, ParameterValue, ValueShape};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("{id:?} is viewed as {expected:?}, got a {actual:?} value")]
    ViewMismatch {
        id: ParameterId,
        expected: NumericView,
        actual: NumericView,
    },
    #[error("{id:?} expects a {expected:?} value")]
    ShapeMismatch { id: ParameterId, expected: ValueShape },
    #[error("{id:?} holds {capacity} words, got {len}")]
    LengthOverflow { id: ParameterId, capacity: usize, len: usize },
}

pub struct BufferStore {
    words: Vec<Vec<u32>>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self {
            words: BufferName::ALL.iter().map(|b| vec![0; b.words()]).collect(),
        }
    }

    /// Write one parameter; returns the buffer that changed.
    ///
    /// Arrays shorter than their slot are zero-padded.
    pub fn write(&mut self, id: ParameterId, value: &ParameterValue) -> Result<BufferName, BindingError> {
        let b = binding(id);
        check(b, value)?;

        let slot = &mut self.words[b.buffer.index()][b.words()];
        slot.fill(0);
        match value {
            ParameterValue::F32(v) => slot[0] = v.to_bits(),
            ParameterValue::U32(v) => slot[0] = *v,
            ParameterValue::F32Array(vs) => {
                for (word, v) in slot.iter_mut().zip(vs) {
                    *word = v.to_bits();
                }
            }
            ParameterValue::U32Array(vs) => slot[..vs.len()].copy_from_slice(vs),
        }
        Ok(b.buffer)
    }

    pub fn bytes(&self, buffer: BufferName) -> &[u8] {
        bytemuck::cast_slice(&self.words[buffer.index()])
    }

    pub fn f32_view(&self, buffer: BufferName) -> &[f32] {
        bytemuck::cast_slice(&self.words[buffer.index()])
    }

    pub fn u32_view(&self, buffer: BufferName) -> &[u32] {
        &self.words[buffer.index()]
    }

    /// Current words of one parameter.
    pub fn read(&self, id: ParameterId) -> &[u32] {
        let b = binding(id);
        &self.words[b.buffer.index()][b.words()]
    }
}

impl Default for BufferStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check(b: &ParameterBinding, value: &ParameterValue) -> Result<(), BindingError> {
    if value.view() != b.view {
        return Err(BindingError::ViewMismatch {
            id: b.id,
            expected: b.view,
            actual: value.view(),
        });
    }
    if value.shape() != b.shape {
        return Err(BindingError::ShapeMismatch {
            id: b.id,
            expected: b.shape,
        });
    }
    let len = match value {
        ParameterValue::F32Array(vs) => vs.len(),
        ParameterValue::U32Array(vs) => vs.len(),
        _ => 1,
    };
    if len > b.len {
        return Err(BindingError::LengthOverflow {
            id: b.id,
            capacity: b.len,
            len,
        });
    }
    Ok(())
}
