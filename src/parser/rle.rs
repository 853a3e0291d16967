//! Run-length decoding of zero runs.
//!
//! A nonzero VarInt passes through unchanged. A zero is immediately followed
//! by a VarInt `extra`; the run stands for `extra + 1` zeros in total.

use super::buffer::VarIntSource;
use crate::utils::error::DecodeResult;

/// VarInt source that expands zero runs of an inner source
#[derive(Debug, Clone)]
pub struct RleReader<S> {
    inner: S,
    pending_zeros: u32,
}

impl<S: VarIntSource> RleReader<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending_zeros: 0,
        }
    }

    /// Zeros of the current run still to be emitted
    pub fn pending_zeros(&self) -> u32 {
        self.pending_zeros
    }
}

impl<S: VarIntSource> VarIntSource for RleReader<S> {
    fn next_var_int(&mut self) -> DecodeResult<u32> {
        if self.pending_zeros > 0 {
            self.pending_zeros -= 1;
            return Ok(0);
        }
        let value = self.inner.next_var_int()?;
        if value != 0 {
            return Ok(value);
        }
        self.pending_zeros = self.inner.next_var_int()?;
        Ok(0)
    }

    fn position(&self) -> usize {
        self.inner.position()
    }
}
