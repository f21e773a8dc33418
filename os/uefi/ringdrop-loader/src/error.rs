//! Loader failure taxonomy.

use ringdrop_handoff::HandoffError;
use uefi::Status;

/// Everything that can go wrong between firmware init and the jump into
/// the kernel.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("boot volume access failed")]
    Volume(#[source] uefi::Error),
    #[error("image is not a regular file")]
    NotARegularFile,
    #[error("image read failed")]
    Read(#[source] uefi::Error),
    #[error("image size is inconsistent")]
    ImageSize,
    #[error("no usable graphics mode")]
    NoUsableVideoMode,
    #[error("graphics output protocol failed")]
    Graphics(#[source] uefi::Error),
    #[error("allocating {what} failed")]
    Allocation {
        what: &'static str,
        #[source]
        source: uefi::Error,
    },
    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

impl From<LoaderError> for Status {
    fn from(value: LoaderError) -> Self {
        match value {
            LoaderError::Volume(_) | LoaderError::NotARegularFile | LoaderError::Read(_) => {
                Self::NOT_FOUND
            }
            LoaderError::ImageSize => Self::LOAD_ERROR,
            LoaderError::NoUsableVideoMode | LoaderError::Graphics(_) => Self::UNSUPPORTED,
            LoaderError::Allocation { .. } => Self::OUT_OF_RESOURCES,
            LoaderError::Handoff(_) => Self::INVALID_PARAMETER,
        }
    }
}
