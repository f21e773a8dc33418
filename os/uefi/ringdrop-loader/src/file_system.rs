extern crate alloc;

use crate::error::LoaderError;
use alloc::vec;
use alloc::vec::Vec;
use uefi::proto::media::file::{File, FileAttribute, FileMode, RegularFile};
use uefi::{CStr16, boot};

/// Read a file on the boot volume fully into memory.
///
/// # Errors
/// [`LoaderError::Volume`] when the volume or path cannot be opened,
/// [`LoaderError::Read`] on a failed read, [`LoaderError::ImageSize`] when
/// the reported and read sizes disagree.
pub fn load_file(path: &CStr16) -> Result<Vec<u8>, LoaderError> {
    let mut fs =
        boot::get_image_file_system(boot::image_handle()).map_err(LoaderError::Volume)?;
    let mut volume = fs.open_volume().map_err(LoaderError::Volume)?;
    let handle = volume
        .open(path, FileMode::Read, FileAttribute::empty())
        .map_err(LoaderError::Volume)?;
    let mut file = handle
        .into_regular_file()
        .ok_or(LoaderError::NotARegularFile)?;

    file.set_position(RegularFile::END_OF_FILE)
        .map_err(LoaderError::Read)?;
    let size = file.get_position().map_err(LoaderError::Read)?;
    file.set_position(0).map_err(LoaderError::Read)?;
    let size = usize::try_from(size).map_err(|_| LoaderError::ImageSize)?;

    let mut buf = vec![0u8; size];
    let read = file.read(&mut buf).map_err(LoaderError::Read)?;
    if read != size {
        return Err(LoaderError::ImageSize);
    }

    Ok(buf)
}
