//! Checkerboard shm buffer
//!
//! The window content never matters; it only keeps the surface mapped so
//! the compositor keeps sending input. Buffers are single-use: drawn,
//! attached, then destroyed when the server releases them.

use std::os::fd::AsFd;

use anyhow::{Context as _, Result};
use memmap2::MmapMut;
use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use nix::unistd::ftruncate;
use wayland_client::protocol::{wl_buffer::WlBuffer, wl_shm, wl_shm::WlShm};
use wayland_client::QueueHandle;

use crate::app::App;

const DARK: u32 = 0xFF66_6666;
const LIGHT: u32 = 0xFFEE_EEEE;

/// Allocate a `width`x`height` XRGB buffer from a fresh memfd and fill it
/// with an 8-pixel checkerboard.
pub(crate) fn draw_checkerboard(
    shm: &WlShm,
    qh: &QueueHandle<App>,
    width: i32,
    height: i32,
) -> Result<WlBuffer> {
    let stride = width * 4;
    let size = stride * height;

    let fd = memfd_create(c"waytrace-shm", MemFdCreateFlag::MFD_CLOEXEC)
        .context("failed to create shm buffer file")?;
    ftruncate(&fd, i64::from(size)).context("failed to size shm buffer file")?;
    let mut map = unsafe { MmapMut::map_mut(&fd) }.context("shm buffer mmap failed")?;

    let pool = shm.create_pool(fd.as_fd(), size, qh, ());
    let buffer = pool.create_buffer(0, width, height, stride, wl_shm::Format::Xrgb8888, qh, ());
    pool.destroy();

    for y in 0..height {
        for x in 0..width {
            let color = if (x + y / 8 * 8) % 16 < 8 { DARK } else { LIGHT };
            let offset = ((y * width + x) * 4) as usize;
            map[offset..offset + 4].copy_from_slice(&color.to_ne_bytes());
        }
    }

    Ok(buffer)
}
