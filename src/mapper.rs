use std::collections::HashMap;

use crate::character::{ShapeLibrary, ShapeResolver};
use crate::viseme::{ProbabilityFrame, VisemeBinding};

/// Blend shape name to weight, read by the animation system once per frame.
pub type OutputShapeMap = HashMap<String, f32>;

/// Turns the latest probability frame into named blend shape weights.
///
/// Every resolved shape is rewritten on every pull, zeros included, so a
/// shape that stops being active never keeps a stale weight. Unresolved
/// bindings are skipped silently.
#[derive(Default)]
pub struct VisemeMapper {
    resolver: ShapeResolver,
    active_binary_shape: String,
}

impl VisemeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolver(&self) -> &ShapeResolver {
        &self.resolver
    }

    /// Shape name of the last binarize winner, for the debug display.
    pub fn active_binary_shape(&self) -> &str {
        &self.active_binary_shape
    }

    pub fn produce_outputs(
        &mut self,
        frame: &ProbabilityFrame,
        bindings: &mut [VisemeBinding],
        library: Option<&ShapeLibrary>,
        gate_open: bool,
        binarize: bool,
        out: &mut OutputShapeMap,
    ) {
        if bindings.is_empty() {
            return;
        }

        if binarize {
            // Single dominant shape, fully on. Strict > keeps the first index
            // on ties, and an all-zero frame falls through to index 0
            // (silence). The gate is deliberately not consulted here, unlike
            // blended mode.
            let mut best = 0;
            let mut best_value = 0.0f32;
            for (i, binding) in bindings.iter().enumerate() {
                let value = frame[binding.viseme().index()];
                if value > best_value {
                    best = i;
                    best_value = value;
                }
            }

            for (i, binding) in bindings.iter_mut().enumerate() {
                let weight = if i == best { binding.weight() } else { 0.0 };
                write_shape(&mut self.resolver, binding, library, weight, out);
            }

            self.active_binary_shape = bindings[best].shape().to_string();
        } else {
            for binding in bindings.iter_mut() {
                let weight = if gate_open {
                    binding.weight() * frame[binding.viseme().index()]
                } else {
                    0.0
                };
                write_shape(&mut self.resolver, binding, library, weight, out);
            }
        }
    }
}

fn write_shape(
    resolver: &mut ShapeResolver,
    binding: &mut VisemeBinding,
    library: Option<&ShapeLibrary>,
    weight: f32,
    out: &mut OutputShapeMap,
) {
    if let Some(name) = resolver.resolve(binding, library) {
        let name = name.to_string();
        out.insert(name, weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::Viseme;
    use crate::VISEME_COUNT;

    fn full_setup() -> (ShapeLibrary, Vec<VisemeBinding>) {
        let mut lib = ShapeLibrary::new();
        let shapes: Vec<String> = Viseme::ALL
            .iter()
            .map(|v| format!("vrc/{}", v.name().to_lowercase()))
            .collect();
        lib.add_mesh("Face", shapes);

        let bindings = Viseme::ALL
            .iter()
            .map(|&v| VisemeBinding::with_shape(v, format!("vrc/{}", v.name().to_lowercase())))
            .collect();

        (lib, bindings)
    }

    #[test]
    fn test_blended_mode_scales_by_binding_weight() {
        let (lib, mut bindings) = full_setup();
        let mut mapper = VisemeMapper::new();
        let mut out = OutputShapeMap::new();

        let mut frame = [0.0f32; VISEME_COUNT];
        frame[Viseme::AA.index()] = 0.8;
        bindings[Viseme::AA.index()].set_weight(1.5);

        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), true, false, &mut out);

        assert!((out["vrc/aa"] - 1.2).abs() < 1e-6);
        assert_eq!(out["vrc/sil"], 0.0);
        assert_eq!(out.len(), VISEME_COUNT);
    }

    #[test]
    fn test_closed_gate_zeroes_everything() {
        let (lib, mut bindings) = full_setup();
        let mut mapper = VisemeMapper::new();
        let mut out = OutputShapeMap::new();

        let frame = [0.9f32; VISEME_COUNT];
        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), false, false, &mut out);

        assert_eq!(out.len(), VISEME_COUNT);
        for (_, weight) in &out {
            assert_eq!(*weight, 0.0);
        }
    }

    #[test]
    fn test_stale_weights_are_rewritten() {
        let (lib, mut bindings) = full_setup();
        let mut mapper = VisemeMapper::new();
        let mut out = OutputShapeMap::new();

        let mut frame = [0.0f32; VISEME_COUNT];
        frame[Viseme::OH.index()] = 1.0;
        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), true, false, &mut out);
        assert_eq!(out["vrc/oh"], 1.0);

        frame[Viseme::OH.index()] = 0.0;
        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), true, false, &mut out);
        assert_eq!(out["vrc/oh"], 0.0);
    }

    #[test]
    fn test_binarize_activates_exactly_one_shape() {
        let (lib, mut bindings) = full_setup();
        let mut mapper = VisemeMapper::new();
        let mut out = OutputShapeMap::new();

        let mut frame = [0.1f32; VISEME_COUNT];
        frame[Viseme::IH.index()] = 0.4;

        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), true, true, &mut out);

        let nonzero: Vec<_> = out.iter().filter(|(_, w)| **w > 0.0).collect();
        assert_eq!(nonzero.len(), 1);
        assert_eq!(nonzero[0].0, "vrc/ih");
        // winner is fully on regardless of its probability
        assert_eq!(out["vrc/ih"], 1.0);
        assert_eq!(mapper.active_binary_shape(), "vrc/ih");
    }

    #[test]
    fn test_binarize_ties_go_to_the_first_index() {
        let (lib, mut bindings) = full_setup();
        let mut mapper = VisemeMapper::new();
        let mut out = OutputShapeMap::new();

        let frame = [0.5f32; VISEME_COUNT];
        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), true, true, &mut out);

        assert_eq!(out["vrc/sil"], 1.0);
        assert_eq!(mapper.active_binary_shape(), "vrc/sil");
    }

    #[test]
    fn test_binarize_ignores_the_gate() {
        // documented quirk: binarize picks a winner even while the gate is
        // closed, unlike blended mode
        let (lib, mut bindings) = full_setup();
        let mut mapper = VisemeMapper::new();
        let mut out = OutputShapeMap::new();

        let mut frame = [0.0f32; VISEME_COUNT];
        frame[Viseme::OU.index()] = 0.7;

        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), false, true, &mut out);
        assert_eq!(out["vrc/ou"], 1.0);
    }

    #[test]
    fn test_unresolved_bindings_are_skipped() {
        let mut lib = ShapeLibrary::new();
        lib.add_mesh("Face", vec!["vrc/aa".into()]);

        let mut bindings = vec![
            VisemeBinding::with_shape(Viseme::AA, "vrc/aa"),
            VisemeBinding::with_shape(Viseme::OH, "not_on_this_character"),
            VisemeBinding::new(Viseme::Sil),
        ];

        let mut mapper = VisemeMapper::new();
        let mut out = OutputShapeMap::new();
        let frame = [0.5f32; VISEME_COUNT];

        mapper.produce_outputs(&frame, &mut bindings, Some(&lib), true, false, &mut out);

        assert_eq!(out.len(), 1);
        assert!(out.contains_key("vrc/aa"));
    }
}
