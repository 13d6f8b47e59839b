use anyhow::{bail, Context, Result};
use log::debug;

use crate::gate::compute_rms;
use crate::viseme::{ProbabilityFrame, Viseme};
use crate::{SMOOTHING_RANGE, VISEME_COUNT};

/// Which engine variant to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    Original,
    #[default]
    Enhanced,
    EnhancedWithLaughter,
}

/// Opaque phoneme-probability engine.
///
/// Implementations own whatever native or model state they need; the node
/// only ever feeds blocks in and reads probabilities out. Contexts are never
/// shared between nodes.
pub trait ClassifierContext: Send {
    /// Set the engine's viseme smoothing strength (1-100).
    fn set_smoothing(&mut self, strength: i32) -> Result<()>;

    /// Classify one block of raw (post-gain, ungated) samples.
    fn process(&mut self, block: &[f32]) -> Result<ProbabilityFrame>;
}

/// Factory for classifier contexts.
pub trait ClassifierProvider {
    fn create(&self, kind: ProviderKind, acceleration: bool) -> Result<Box<dyn ClassifierContext>>;
}

/// Owns the context lifecycle and the latest probability frame.
///
/// `None` is the explicit "disabled" sentinel: a failed creation clears the
/// handle and per-block processing quietly no-ops until the next successful
/// reconfiguration. The previous frame stays readable throughout.
pub struct ClassifierAdapter {
    context: Option<Box<dyn ClassifierContext>>,
    frame: ProbabilityFrame,
}

impl ClassifierAdapter {
    pub fn new() -> Self {
        Self {
            context: None,
            frame: [0.0; VISEME_COUNT],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.context.is_some()
    }

    /// Tear down the old context, then build a new one. On failure the
    /// adapter is left disabled and the error is surfaced to the caller.
    pub fn reconfigure(
        &mut self,
        provider: &dyn ClassifierProvider,
        kind: ProviderKind,
        acceleration: bool,
    ) -> Result<()> {
        self.context = None;

        let context = provider
            .create(kind, acceleration)
            .context("failed to create classifier context")?;
        self.context = Some(context);

        Ok(())
    }

    pub fn disable(&mut self) {
        self.context = None;
    }

    /// Forward the smoothing strength to the live context. Out-of-range
    /// values are rejected without touching engine state; a disabled adapter
    /// accepts the value as a no-op.
    pub fn set_smoothing(&mut self, strength: i32) -> Result<()> {
        let (min, max) = SMOOTHING_RANGE;
        if strength < min || strength > max {
            bail!("invalid smoothing parameter: {strength}");
        }

        match &mut self.context {
            Some(context) => context.set_smoothing(strength),
            None => Ok(()),
        }
    }

    /// Run the engine on one filled block. Returns the fresh frame, or `None`
    /// when the adapter is disabled or the engine reports it is not ready;
    /// callers keep presenting the previous frame either way.
    pub fn process(&mut self, block: &[f32]) -> Option<&ProbabilityFrame> {
        let context = self.context.as_mut()?;

        match context.process(block) {
            Ok(frame) => {
                self.frame = frame;
                Some(&self.frame)
            }
            Err(err) => {
                debug!("classifier produced no frame: {err:#}");
                None
            }
        }
    }

    pub fn frame(&self) -> &ProbabilityFrame {
        &self.frame
    }
}

impl Default for ClassifierAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Amplitude-driven fallback engine.
///
/// Maps block loudness onto the open-vowel viseme, the rest of the
/// probability mass onto silence. Not a phoneme engine, but it lets the demo
/// binary and tests drive the whole pipeline without a native model. The
/// smoothing strength becomes an exponential moving average over blocks.
pub struct EnergyClassifier {
    smoothing: i32,
    open: f32,
}

/// Loudness scale picked so normal speech levels reach full mouth opening.
const ENERGY_SCALE: f32 = 8.0;

impl EnergyClassifier {
    pub fn new() -> Self {
        Self {
            smoothing: 70,
            open: 0.0,
        }
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierContext for EnergyClassifier {
    fn set_smoothing(&mut self, strength: i32) -> Result<()> {
        let (min, max) = SMOOTHING_RANGE;
        if strength < min || strength > max {
            bail!("invalid smoothing parameter: {strength}");
        }
        self.smoothing = strength;
        Ok(())
    }

    fn process(&mut self, block: &[f32]) -> Result<ProbabilityFrame> {
        let target = (compute_rms(block) * ENERGY_SCALE).min(1.0);

        // smoothing 1 tracks the block exactly, 100 is very sluggish
        let alpha = 1.0 / self.smoothing as f32;
        self.open += (target - self.open) * alpha;

        let mut frame = [0.0; VISEME_COUNT];
        frame[Viseme::AA.index()] = self.open;
        frame[Viseme::Sil.index()] = 1.0 - self.open;
        Ok(frame)
    }
}

/// Provider for [EnergyClassifier]. Ignores the engine kind and acceleration
/// flag, both of which only matter to real phoneme engines.
pub struct EnergyProvider;

impl ClassifierProvider for EnergyProvider {
    fn create(
        &self,
        _kind: ProviderKind,
        _acceleration: bool,
    ) -> Result<Box<dyn ClassifierContext>> {
        Ok(Box::new(EnergyClassifier::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BLOCK_SIZE;

    struct FailingProvider;

    impl ClassifierProvider for FailingProvider {
        fn create(
            &self,
            _kind: ProviderKind,
            _acceleration: bool,
        ) -> Result<Box<dyn ClassifierContext>> {
            bail!("engine library not present")
        }
    }

    #[test]
    fn test_disabled_adapter_no_ops() {
        let mut adapter = ClassifierAdapter::new();
        let block = vec![0.5f32; BLOCK_SIZE];

        assert!(!adapter.is_enabled());
        assert!(adapter.process(&block).is_none());
        // previous (zero) frame stays readable
        assert_eq!(adapter.frame(), &[0.0; VISEME_COUNT]);
        // smoothing on a disabled adapter is a quiet no-op
        assert!(adapter.set_smoothing(70).is_ok());
    }

    #[test]
    fn test_failed_creation_leaves_adapter_disabled() {
        let mut adapter = ClassifierAdapter::new();
        adapter
            .reconfigure(&EnergyProvider, ProviderKind::Enhanced, true)
            .unwrap();
        assert!(adapter.is_enabled());

        let result = adapter.reconfigure(&FailingProvider, ProviderKind::Enhanced, true);
        assert!(result.is_err());
        assert!(!adapter.is_enabled());
    }

    #[test]
    fn test_smoothing_range_is_enforced() {
        let mut adapter = ClassifierAdapter::new();
        adapter
            .reconfigure(&EnergyProvider, ProviderKind::Enhanced, true)
            .unwrap();

        assert!(adapter.set_smoothing(0).is_err());
        assert!(adapter.set_smoothing(101).is_err());
        assert!(adapter.set_smoothing(1).is_ok());
        assert!(adapter.set_smoothing(100).is_ok());
    }

    #[test]
    fn test_energy_classifier_tracks_loudness() {
        let mut engine = EnergyClassifier::new();
        engine.set_smoothing(1).unwrap();

        let silence = vec![0.0f32; BLOCK_SIZE];
        let frame = engine.process(&silence).unwrap();
        assert_eq!(frame[Viseme::AA.index()], 0.0);
        assert_eq!(frame[Viseme::Sil.index()], 1.0);

        let loud = vec![0.5f32; BLOCK_SIZE];
        let frame = engine.process(&loud).unwrap();
        assert!(frame[Viseme::AA.index()] > 0.9);
        assert!(frame[Viseme::Sil.index()] < 0.1);
    }

    #[test]
    fn test_energy_classifier_smooths_between_blocks() {
        let mut engine = EnergyClassifier::new();
        engine.set_smoothing(100).unwrap();

        let loud = vec![0.5f32; BLOCK_SIZE];
        let frame = engine.process(&loud).unwrap();
        // one sluggish step toward fully open
        assert!(frame[Viseme::AA.index()] > 0.0);
        assert!(frame[Viseme::AA.index()] < 0.05);
    }
}
