//! Anonymous shared-memory backing files and scoped mappings.
//!
//! The display server and this process share pixel memory through a plain
//! file descriptor: the file is created in the runtime directory, unlinked
//! before anything else touches it, sized with `ftruncate`, and mapped
//! `MAP_SHARED`. No name ever survives on the filesystem.

use std::env;
use std::ffi::c_void;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

const FILE_TEMPLATE: &str = "softblit-shared-XXXXXX";

#[derive(Debug, Error)]
pub enum ShmError {
    #[error("XDG_RUNTIME_DIR is not set")]
    RuntimeDirUnset,
    #[error("failed to create shm backing file in {dir:?}: {source}")]
    Create { dir: PathBuf, source: io::Error },
    #[error("failed to size shm backing file to {size} bytes: {source}")]
    Truncate { size: usize, source: io::Error },
    #[error("mmap of {len} bytes failed: {source}")]
    Map { len: usize, source: io::Error },
}

/// Creates an anonymous backing file of `size` bytes in the directory named
/// by `XDG_RUNTIME_DIR`.
pub fn create_anonymous_file(size: usize) -> Result<OwnedFd, ShmError> {
    let dir = env::var_os("XDG_RUNTIME_DIR").ok_or(ShmError::RuntimeDirUnset)?;
    create_anonymous_file_in(Path::new(&dir), size)
}

/// Creates a unique close-on-exec temp file in `dir`, unlinks it
/// immediately, then sizes it to `size` bytes. The file is reachable only
/// through the returned descriptor; any error path closes it.
pub fn create_anonymous_file_in(dir: &Path, size: usize) -> Result<OwnedFd, ShmError> {
    let mut template: Vec<u8> = dir.join(FILE_TEMPLATE).as_os_str().as_bytes().to_vec();
    template.push(0);

    let raw = unsafe {
        libc::mkostemp(template.as_mut_ptr() as *mut libc::c_char, libc::O_CLOEXEC)
    };
    if raw < 0 {
        return Err(ShmError::Create {
            dir: dir.to_path_buf(),
            source: io::Error::last_os_error(),
        });
    }
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };

    // Unlink before truncating: the descriptor must stay fully usable with
    // no name on disk.
    unsafe { libc::unlink(template.as_ptr() as *const libc::c_char) };

    if unsafe { libc::ftruncate(fd.as_raw_fd(), size as libc::off_t) } < 0 {
        return Err(ShmError::Truncate {
            size,
            source: io::Error::last_os_error(),
        });
    }

    debug!("created {size} byte anonymous file in {}", dir.display());
    Ok(fd)
}

/// A writable `MAP_SHARED` mapping over a descriptor, unmapped on drop.
pub struct MappedRegion {
    ptr: *mut u8,
    len: usize,
}

impl MappedRegion {
    pub fn map(fd: BorrowedFd<'_>, len: usize) -> Result<Self, ShmError> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(ShmError::Map {
                len,
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self {
            ptr: ptr as *mut u8,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole region as packed 32-bit pixels.
    pub fn as_pixels_mut(&mut self) -> &mut [u32] {
        // mmap returns page-aligned memory and the region is sized in whole
        // pixels, so the cast is sound.
        unsafe { std::slice::from_raw_parts_mut(self.ptr as *mut u32, self.len / 4) }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        if !self.ptr.is_null() && self.len > 0 {
            unsafe { libc::munmap(self.ptr as *mut c_void, self.len) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::fd::AsFd;

    #[test_log::test]
    fn backing_file_is_unlinked_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let _fd = create_anonymous_file_in(dir.path(), 4096).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test_log::test]
    fn unlinked_descriptor_still_truncates_and_maps() {
        let dir = tempfile::tempdir().unwrap();
        let (w, h) = (480usize, 360usize);
        let size = w * h * 4;
        let fd = create_anonymous_file_in(dir.path(), size).unwrap();

        let mut map = MappedRegion::map(fd.as_fd(), size).unwrap();
        assert_eq!(map.len(), 691_200);

        let pixels = map.as_pixels_mut();
        assert_eq!(pixels.len(), w * h);
        pixels[0] = 0xFF66_6666;
        pixels[w * h - 1] = 0xFFEE_EEEE;
        assert_eq!(pixels[0], 0xFF66_6666);
        assert_eq!(pixels[w * h - 1], 0xFFEE_EEEE);
    }

    #[test]
    fn mapped_len_matches_pixel_math() {
        let dir = tempfile::tempdir().unwrap();
        for (w, h) in [(1usize, 1usize), (64, 64), (480, 360)] {
            let size = w * h * 4;
            let fd = create_anonymous_file_in(dir.path(), size).unwrap();
            let map = MappedRegion::map(fd.as_fd(), size).unwrap();
            assert_eq!(map.len(), w * h * 4);
        }
    }

    #[test_log::test]
    fn shared_mapping_sees_writes_through_the_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let size = 4096;
        let fd = create_anonymous_file_in(dir.path(), size).unwrap();

        let mut writer = MappedRegion::map(fd.as_fd(), size).unwrap();
        let mut reader = MappedRegion::map(fd.as_fd(), size).unwrap();
        writer.as_pixels_mut()[10] = 0xABCD;
        assert_eq!(reader.as_pixels_mut()[10], 0xABCD);
    }
}
