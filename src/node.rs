use std::fmt::Write as _;

use anyhow::Result;
use log::{info, warn};

use crate::accumulator::SampleAccumulator;
use crate::automap;
use crate::character::ShapeLibrary;
use crate::classifier::{ClassifierAdapter, ClassifierProvider, ProviderKind};
use crate::gate::{self, EnergyGate};
use crate::mapper::{OutputShapeMap, VisemeMapper};
use crate::viseme::{Viseme, VisemeBinding};
use crate::{GAIN_RANGE, GATE_DB_RANGE, HOLD_RANGE};

/// Host-tunable parameters, with the reference defaults.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Linear multiplier applied to each raw sample before accumulation.
    pub gain: f32,
    pub noise_gate_db: f32,
    pub hold_open: f32,
    /// Viseme smoothing strength forwarded to the classifier, 1-100.
    pub smoothing: i32,
    pub binarize: bool,
    pub acceleration: bool,
    pub provider: ProviderKind,
    pub show_debug: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            noise_gate_db: -40.0,
            hold_open: 0.5,
            smoothing: 70,
            binarize: false,
            acceleration: true,
            provider: ProviderKind::Enhanced,
            show_debug: false,
        }
    }
}

/// The lip sync node: mic samples in, named blend shape weights out.
///
/// The host feeds raw mono samples (from its capture callback or a drained
/// channel), calls [LipSyncNode::update] once per scheduling tick with the
/// frame delta, and pulls [LipSyncNode::pull_outputs] whenever the animation
/// side wants fresh weights. Everything runs on the caller's thread; the
/// capture side only ever hands over finished chunks.
pub struct LipSyncNode {
    config: NodeConfig,
    provider: Box<dyn ClassifierProvider>,
    adapter: ClassifierAdapter,
    accumulator: SampleAccumulator,
    gate: EnergyGate,
    mapper: VisemeMapper,
    bindings: Vec<VisemeBinding>,
    character: Option<ShapeLibrary>,
    output: OutputShapeMap,
    rms: f32,
    debug_output: String,
}

impl LipSyncNode {
    /// Build a node with a default (unconfigured) binding per viseme.
    ///
    /// A context creation failure is not fatal: the node comes up with
    /// classification disabled and produces no output until a provider
    /// change succeeds.
    pub fn new(provider: Box<dyn ClassifierProvider>, config: NodeConfig) -> Self {
        let mut adapter = ClassifierAdapter::new();

        match adapter.reconfigure(provider.as_ref(), config.provider, config.acceleration) {
            Ok(()) => {
                if let Err(err) = adapter.set_smoothing(config.smoothing) {
                    warn!("smoothing not applied: {err:#}");
                }
            }
            Err(err) => warn!("error initializing lip sync context: {err:#}"),
        }

        Self {
            config,
            provider,
            adapter,
            accumulator: SampleAccumulator::default(),
            gate: EnergyGate::new(),
            mapper: VisemeMapper::new(),
            bindings: VisemeBinding::default_set(),
            character: None,
            output: OutputShapeMap::new(),
            rms: 0.0,
            debug_output: String::new(),
        }
    }

    // ---- audio path ----

    /// Feed raw mono samples. Gain is applied here, then full blocks are
    /// measured for energy and handed to the classifier exactly once each.
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            if let Some(block) = self.accumulator.push(sample * self.config.gain) {
                self.rms = gate::compute_rms(block);
                self.adapter.process(block);
            }
        }
    }

    /// Advance the gate's hold timer and refresh the debug display. Call
    /// once per host scheduling tick.
    pub fn update(&mut self, delta_seconds: f32) {
        self.gate.tick(delta_seconds);

        if self.config.show_debug {
            self.rebuild_debug_output();
        } else {
            self.debug_output.clear();
        }
    }

    /// Rewrite and return the output shape map.
    pub fn pull_outputs(&mut self) -> &OutputShapeMap {
        let db = gate::rms_to_db(self.rms);
        let gate_open = self
            .gate
            .is_open(db, self.config.noise_gate_db, self.config.hold_open);

        self.mapper.produce_outputs(
            self.adapter.frame(),
            &mut self.bindings,
            self.character.as_ref(),
            gate_open,
            self.config.binarize,
            &mut self.output,
        );

        &self.output
    }

    pub fn rms(&self) -> f32 {
        self.rms
    }

    pub fn db(&self) -> f32 {
        gate::rms_to_db(self.rms)
    }

    pub fn debug_output(&self) -> &str {
        &self.debug_output
    }

    // ---- configuration ----

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.config.gain = gain.clamp(GAIN_RANGE.0, GAIN_RANGE.1);
    }

    pub fn set_noise_gate_db(&mut self, db: f32) {
        self.config.noise_gate_db = db.clamp(GATE_DB_RANGE.0, GATE_DB_RANGE.1);
    }

    pub fn set_hold_open(&mut self, seconds: f32) {
        self.config.hold_open = seconds.clamp(HOLD_RANGE.0, HOLD_RANGE.1);
    }

    pub fn set_binarize(&mut self, binarize: bool) {
        self.config.binarize = binarize;
    }

    pub fn set_show_debug(&mut self, show: bool) {
        self.config.show_debug = show;
    }

    /// Swap the classifier engine kind. The old context is torn down first;
    /// on failure the node is left with classification disabled and the
    /// error is returned for the host to surface.
    pub fn set_provider(&mut self, kind: ProviderKind) -> Result<()> {
        self.config.provider = kind;
        self.adapter
            .reconfigure(self.provider.as_ref(), kind, self.config.acceleration)?;
        self.adapter.set_smoothing(self.config.smoothing)?;
        Ok(())
    }

    /// Takes effect at the next provider reconfiguration.
    pub fn set_acceleration(&mut self, enabled: bool) {
        self.config.acceleration = enabled;
    }

    pub fn set_smoothing(&mut self, strength: i32) -> Result<()> {
        self.adapter.set_smoothing(strength)?;
        self.config.smoothing = strength;
        Ok(())
    }

    pub fn classifier_enabled(&self) -> bool {
        self.adapter.is_enabled()
    }

    // ---- character & bindings ----

    /// Swap the character. All bindings are invalidated so stale resolutions
    /// from the previous character cannot leak through.
    pub fn set_character(&mut self, library: Option<ShapeLibrary>) {
        self.character = library;
        for binding in &mut self.bindings {
            binding.invalidate();
        }
    }

    pub fn character(&self) -> Option<&ShapeLibrary> {
        self.character.as_ref()
    }

    pub fn bindings(&self) -> &[VisemeBinding] {
        &self.bindings
    }

    /// Mutable access for the host's binding table editor. Name and viseme
    /// edits clear the binding's cached resolution themselves.
    pub fn bindings_mut(&mut self) -> &mut [VisemeBinding] {
        &mut self.bindings
    }

    /// Replace every binding with the automapper's best guesses for the
    /// current character. Fails without touching the existing set when no
    /// character is selected.
    pub fn auto_map(&mut self) -> Result<()> {
        let bindings = automap::auto_map(self.character.as_ref())?;
        info!(
            "automapped {} visemes",
            bindings.iter().filter(|b| !b.shape().is_empty()).count()
        );
        self.bindings = bindings;
        Ok(())
    }

    // ---- debug display ----

    fn rebuild_debug_output(&mut self) {
        let db = gate::rms_to_db(self.rms);
        let gate_open = self
            .gate
            .is_open(db, self.config.noise_gate_db, self.config.hold_open);

        let mut out = String::new();
        let _ = writeln!(out, "Noise Gate Open: {gate_open}");
        let _ = writeln!(out, "Rms Db: {db:04.1}");

        if self.config.binarize {
            let _ = writeln!(out, "Active Viseme: {}", self.mapper.active_binary_shape());
        }

        let frame = self.adapter.frame();
        for viseme in Viseme::ALL {
            let percent = (frame[viseme.index()] * 100.0) as i32;
            let _ = writeln!(out, "{}: {}%", viseme.name(), percent);
        }

        self.debug_output = out;
    }
}
