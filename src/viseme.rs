use crate::VISEME_COUNT;

/// Canonical phonetic mouth-shape categories, in OVR ordinal order.
///
/// The order is load-bearing: probability frames are indexed by it and the
/// default binding set is created in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Viseme {
    Sil,
    PP,
    FF,
    TH,
    DD,
    KK,
    CH,
    SS,
    NN,
    RR,
    AA,
    E,
    IH,
    OH,
    OU,
}

impl Viseme {
    pub const ALL: [Viseme; VISEME_COUNT] = [
        Viseme::Sil,
        Viseme::PP,
        Viseme::FF,
        Viseme::TH,
        Viseme::DD,
        Viseme::KK,
        Viseme::CH,
        Viseme::SS,
        Viseme::NN,
        Viseme::RR,
        Viseme::AA,
        Viseme::E,
        Viseme::IH,
        Viseme::OH,
        Viseme::OU,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Viseme::Sil => "SIL",
            Viseme::PP => "PP",
            Viseme::FF => "FF",
            Viseme::TH => "TH",
            Viseme::DD => "DD",
            Viseme::KK => "KK",
            Viseme::CH => "CH",
            Viseme::SS => "SS",
            Viseme::NN => "NN",
            Viseme::RR => "RR",
            Viseme::AA => "AA",
            Viseme::E => "E",
            Viseme::IH => "IH",
            Viseme::OH => "OH",
            Viseme::OU => "OU",
        }
    }
}

/// Per-viseme probabilities in [0, 1], overwritten in place each block.
pub type ProbabilityFrame = [f32; VISEME_COUNT];

/// One viseme's configured blend shape plus a weight multiplier.
///
/// `valid` caches a successful name resolution so the output path does not
/// re-scan the character's shape library every animation frame. Any edit to
/// the name or viseme clears it.
#[derive(Debug, Clone)]
pub struct VisemeBinding {
    viseme: Viseme,
    shape: String,
    weight: f32,
    valid: bool,
}

impl VisemeBinding {
    pub fn new(viseme: Viseme) -> Self {
        Self {
            viseme,
            shape: String::new(),
            weight: 1.0,
            valid: false,
        }
    }

    pub fn with_shape(viseme: Viseme, shape: impl Into<String>) -> Self {
        Self {
            viseme,
            shape: shape.into(),
            weight: 1.0,
            valid: false,
        }
    }

    /// One binding per viseme, canonical order, unconfigured.
    pub fn default_set() -> Vec<VisemeBinding> {
        Viseme::ALL.iter().map(|&v| VisemeBinding::new(v)).collect()
    }

    pub fn viseme(&self) -> Viseme {
        self.viseme
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_viseme(&mut self, viseme: Viseme) {
        self.viseme = viseme;
        self.valid = false;
    }

    pub fn set_shape(&mut self, shape: impl Into<String>) {
        self.shape = shape.into();
        self.valid = false;
    }

    /// Weight multiplier, clamped to the host's 0-2 slider range.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight.clamp(0.0, 2.0);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn mark_valid(&mut self) {
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_is_canonical() {
        let bindings = VisemeBinding::default_set();
        assert_eq!(bindings.len(), VISEME_COUNT);
        for (i, binding) in bindings.iter().enumerate() {
            assert_eq!(binding.viseme().index(), i);
            assert_eq!(binding.shape(), "");
            assert_eq!(binding.weight(), 1.0);
            assert!(!binding.is_valid());
        }
    }

    #[test]
    fn test_edits_clear_validity() {
        let mut binding = VisemeBinding::with_shape(Viseme::AA, "vrc/aa");
        binding.mark_valid();

        binding.set_shape("vrc/oh");
        assert!(!binding.is_valid());

        binding.mark_valid();
        binding.set_viseme(Viseme::OH);
        assert!(!binding.is_valid());
    }

    #[test]
    fn test_weight_clamped_to_slider_range() {
        let mut binding = VisemeBinding::new(Viseme::PP);
        binding.set_weight(5.0);
        assert_eq!(binding.weight(), 2.0);
        binding.set_weight(-1.0);
        assert_eq!(binding.weight(), 0.0);
    }
}
