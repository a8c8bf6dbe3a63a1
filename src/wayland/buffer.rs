//! Shared-memory `wl_buffer` creation.

use std::os::fd::AsFd;

use anyhow::Result;
use wayland_client::{
    protocol::{wl_buffer, wl_shm, wl_shm_pool},
    Dispatch, QueueHandle,
};

use crate::shm::{self, MappedRegion};

// 32-bit pixels, alpha byte ignored by the server.
const FORMAT: wl_shm::Format = wl_shm::Format::Xrgb8888;

/// One pixel buffer the display server can read: an anonymous file sized
/// `width * height * 4`, mapped for client writes and wrapped in a
/// single-buffer shm pool with stride `width * 4`.
pub struct ShmBuffer {
    buffer: wl_buffer::WlBuffer,
    pool: wl_shm_pool::WlShmPool,
    map: MappedRegion,
    width: u32,
    height: u32,
}

impl ShmBuffer {
    pub fn new<D>(shm: &wl_shm::WlShm, qh: &QueueHandle<D>, width: u32, height: u32) -> Result<Self>
    where
        D: Dispatch<wl_shm_pool::WlShmPool, ()> + Dispatch<wl_buffer::WlBuffer, ()> + 'static,
    {
        let stride = width * 4;
        let size = (stride * height) as usize;

        let fd = shm::create_anonymous_file(size)?;
        let map = MappedRegion::map(fd.as_fd(), size)?;

        let pool = shm.create_pool(fd.as_fd(), size as i32, qh, ());
        let buffer = pool.create_buffer(
            0,
            width as i32,
            height as i32,
            stride as i32,
            FORMAT,
            qh,
            (),
        );
        // fd drops here; the mapping and the server's reference to the pool
        // keep the memory alive.

        Ok(Self {
            buffer,
            pool,
            map,
            width,
            height,
        })
    }

    pub fn handle(&self) -> &wl_buffer::WlBuffer {
        &self.buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.width * 4
    }

    /// The mapped pixels. The server may be reading this memory; the
    /// protocol's commit/release signaling is the only coordination.
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        self.map.as_pixels_mut()
    }
}

impl Drop for ShmBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
        self.pool.destroy();
    }
}
