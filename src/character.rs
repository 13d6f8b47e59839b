use crate::viseme::VisemeBinding;

/// Read-only view of a character's blend shapes: mesh id to ordered alias names.
///
/// Owned by the host's character asset; the node only ever scans it.
#[derive(Debug, Clone, Default)]
pub struct ShapeLibrary {
    meshes: Vec<(String, Vec<String>)>,
}

impl ShapeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, id: impl Into<String>, shapes: Vec<String>) {
        self.meshes.push((id.into(), shapes));
    }

    pub fn meshes(&self) -> &[(String, Vec<String>)] {
        &self.meshes
    }

    pub fn contains(&self, shape: &str) -> bool {
        self.meshes
            .iter()
            .any(|(_, shapes)| shapes.iter().any(|s| s == shape))
    }
}

/// Resolves a binding's configured shape name against the current character.
///
/// A successful exact-match scan marks the binding valid so later pulls skip
/// the scan entirely; without the cache every animation frame would walk every
/// mesh. An absent character or a name with no match is not an error, the
/// binding simply contributes nothing this frame.
#[derive(Debug, Default)]
pub struct ShapeResolver {
    scans: usize,
}

impl ShapeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<'b>(
        &mut self,
        binding: &'b mut VisemeBinding,
        library: Option<&ShapeLibrary>,
    ) -> Option<&'b str> {
        if binding.shape().is_empty() {
            return None;
        }

        if binding.is_valid() {
            return Some(binding.shape());
        }

        let library = library?;
        self.scans += 1;

        if library.contains(binding.shape()) {
            binding.mark_valid();
            Some(binding.shape())
        } else {
            None
        }
    }

    /// Number of full library scans performed so far.
    pub fn scan_count(&self) -> usize {
        self.scans
    }
}
