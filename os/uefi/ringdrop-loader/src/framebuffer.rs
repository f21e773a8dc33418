//! GOP mode negotiation for the kernel's framebuffer.

use crate::error::LoaderError;
use uefi::boot::{self, ScopedProtocol};
use uefi::proto::console::gop::{GraphicsOutput, Mode, PixelFormat};

/// The resolution negotiated for the kernel. Every QEMU GOP offers it; if
/// a different firmware does not, the largest direct-color mode wins.
const PREFERRED_RESOLUTION: (usize, usize) = (800, 600);

/// Pixel geometry handed to the kernel: a base pointer, width and height,
/// nothing else.
#[derive(Debug, Clone, Copy)]
pub struct Framebuffer {
    pub base: *mut u32,
    pub width: u32,
    pub height: u32,
}

/// Pick and activate a 32-bit graphics mode.
///
/// # Errors
/// [`LoaderError::Graphics`] when the protocol is unavailable or the mode
/// switch fails, [`LoaderError::NoUsableVideoMode`] when no direct-color
/// mode exists at all.
#[allow(clippy::cast_possible_truncation)]
pub fn negotiate_framebuffer() -> Result<Framebuffer, LoaderError> {
    let handle =
        boot::get_handle_for_protocol::<GraphicsOutput>().map_err(LoaderError::Graphics)?;
    let mut gop =
        boot::open_protocol_exclusive::<GraphicsOutput>(handle).map_err(LoaderError::Graphics)?;

    let mode = pick_mode(&gop).ok_or(LoaderError::NoUsableVideoMode)?;
    gop.set_mode(&mode).map_err(LoaderError::Graphics)?;

    let info = gop.current_mode_info();
    let (width, height) = info.resolution();
    let base = gop.frame_buffer().as_mut_ptr().cast::<u32>();
    Ok(Framebuffer {
        base,
        width: width as u32,
        height: height as u32,
    })
}

/// The preferred resolution if offered, otherwise the largest usable mode.
fn pick_mode(gop: &ScopedProtocol<GraphicsOutput>) -> Option<Mode> {
    let direct_color = |mode: &Mode| {
        matches!(
            mode.info().pixel_format(),
            PixelFormat::Bgr | PixelFormat::Rgb
        )
    };
    gop.modes()
        .filter(direct_color)
        .find(|mode| mode.info().resolution() == PREFERRED_RESOLUTION)
        .or_else(|| {
            gop.modes().filter(direct_color).max_by_key(|mode| {
                let (w, h) = mode.info().resolution();
                w * h
            })
        })
}
