use crate::BLOCK_SIZE;

/// Assembles incoming mono samples into fixed-size blocks.
///
/// Samples arrive one at a time with gain already applied. When the buffer
/// fills, the completed block is handed back exactly once and the write index
/// resets, so back-to-back fills each yield their own block. Not safe for
/// concurrent writers; the capture path is the single producer.
pub struct SampleAccumulator {
    buffer: Vec<f32>,
    index: usize,
}

impl SampleAccumulator {
    pub fn new(block_size: usize) -> Self {
        Self {
            buffer: vec![0.0; block_size],
            index: 0,
        }
    }

    /// Append one sample. Returns the filled block when this sample completes it.
    pub fn push(&mut self, sample: f32) -> Option<&[f32]> {
        self.buffer[self.index] = sample;
        self.index += 1;

        if self.index >= self.buffer.len() {
            self.index = 0;
            return Some(&self.buffer);
        }

        None
    }

    pub fn fill_level(&self) -> usize {
        self.index
    }

    pub fn block_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

impl Default for SampleAccumulator {
    fn default() -> Self {
        Self::new(BLOCK_SIZE)
    }
}
