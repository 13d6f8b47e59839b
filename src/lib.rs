pub mod accumulator;
pub mod audio;
pub mod automap;
pub mod character;
pub mod classifier;
pub mod gate;
pub mod mapper;
pub mod node;
pub mod viseme;

// Critical constants - must match the OVR lip sync reference sizing
pub const BLOCK_SIZE: usize = 512; // samples per classification block
pub const VISEME_COUNT: usize = 15; // silence + 14 mouth shapes

// Host parameter ranges
pub const GAIN_RANGE: (f32, f32) = (0.0, 10.0);
pub const GATE_DB_RANGE: (f32, f32) = (-60.0, 0.0);
pub const HOLD_RANGE: (f32, f32) = (0.0, 10.0);
pub const SMOOTHING_RANGE: (i32, i32) = (1, 100);

pub use node::{LipSyncNode, NodeConfig};
