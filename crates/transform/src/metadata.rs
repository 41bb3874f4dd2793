/// Pixels added on each side of the image by a pad step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// What a geometric step recorded so its effect can be undone on boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepMetadata {
    /// Per-axis multipliers applied by a resize (`new / old`).
    ScaleFactors { x: f32, y: f32 },
    /// Border added by a pad.
    Padding(Padding),
}

/// Metadata recorded by one forward run, one slot per executed step.
///
/// Photometric steps push `None` so that slot `i` always belongs to the
/// `i`-th non-empty step. The trail is consumed by the inverse pass from its
/// tail and is not `Clone`: one trail belongs to one image.
#[derive(Debug, Default, PartialEq)]
pub struct MetadataTrail {
    entries: Vec<Option<StepMetadata>>,
}

impl MetadataTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: Option<StepMetadata>) {
        self.entries.push(entry);
    }

    /// Remove the entry of the most recently applied step.
    ///
    /// The outer `None` means the trail is exhausted; `Some(None)` is the
    /// placeholder of a photometric step.
    pub fn pop(&mut self) -> Option<Option<StepMetadata>> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Option<StepMetadata>> + '_ {
        self.entries.iter()
    }
}

impl From<Vec<Option<StepMetadata>>> for MetadataTrail {
    fn from(entries: Vec<Option<StepMetadata>>) -> Self {
        Self { entries }
    }
}
