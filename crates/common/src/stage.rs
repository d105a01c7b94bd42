use serde::{Deserialize, Serialize};

/// Pipeline stages, in execution order
///
/// Transitions are strictly forward and single-path; no stage is revisited.
/// A job that fails carries the stage it failed in, there is no separate
/// variant here because failure is terminal and modeled by the error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Received,
    Downloading,
    Extracting,
    Reconstructing,
    Training,
    Packaging,
    Uploading,
    Completed,
}

impl JobStage {
    /// Human-readable stage name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Reconstructing => "reconstructing",
            Self::Training => "training",
            Self::Packaging => "packaging",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
        }
    }

    /// Position in the fixed stage sequence
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The stage that follows this one, if any
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Downloading),
            Self::Downloading => Some(Self::Extracting),
            Self::Extracting => Some(Self::Reconstructing),
            Self::Reconstructing => Some(Self::Training),
            Self::Training => Some(Self::Packaging),
            Self::Packaging => Some(Self::Uploading),
            Self::Uploading => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Whether `next` is a legal successor of this stage
    #[must_use]
    pub fn can_advance_to(&self, next: Self) -> bool {
        self.next() == Some(next)
    }

    /// Coarse progress percentage reported on entering this stage
    ///
    /// Training refines the 20-95 band by iteration, see
    /// [`crate::training_progress`].
    #[must_use]
    pub fn base_progress(&self) -> u8 {
        match self {
            Self::Received | Self::Downloading => 0,
            Self::Extracting => 10,
            Self::Reconstructing | Self::Training => 20,
            Self::Packaging => 95,
            Self::Uploading => 97,
            Self::Completed => 100,
        }
    }
}
