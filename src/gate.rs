/// RMS floor so silence does not hit a log10 domain error.
const MIN_RMS: f32 = 1e-9;

/// Root-mean-square of a sample block. Empty blocks report zero energy.
pub fn compute_rms(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }

    let sum: f64 = block.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / block.len() as f64).sqrt() as f32
}

pub fn rms_to_db(rms: f32) -> f32 {
    20.0 * rms.max(MIN_RMS).log10()
}

/// Noise gate with hold-open hysteresis.
///
/// The gate opens the moment the level meets the threshold and re-arms its
/// hold timer each time it does. Once the level drops, the gate stays open
/// until the timer runs out, which keeps the mouth from chattering shut
/// between syllables. A hold of zero tracks the instantaneous threshold.
#[derive(Debug, Default)]
pub struct EnergyGate {
    hold_remaining: f32,
}

impl EnergyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the hold timer by the host's frame delta, clamped at zero.
    pub fn tick(&mut self, delta_seconds: f32) {
        self.hold_remaining = (self.hold_remaining - delta_seconds).max(0.0);
    }

    /// Gate decision for the current level. Re-arms the hold timer whenever
    /// the instantaneous threshold condition holds, so calling this more than
    /// once per tick is harmless.
    pub fn is_open(&mut self, current_db: f32, threshold_db: f32, hold_seconds: f32) -> bool {
        if current_db >= threshold_db {
            self.hold_remaining = hold_seconds;
            return true;
        }

        self.hold_remaining > 0.0
    }
}
