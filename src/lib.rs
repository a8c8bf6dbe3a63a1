//! Minimal experiments in putting a software-rendered pixel buffer on
//! screen through two platform display stacks: a Win32 message-loop window
//! with a GDI bitmap blit, and Wayland shared-memory surfaces driven by the
//! registry/shm-pool/frame-callback pipeline.
//!
//! There is deliberately no abstraction layer over the platforms. Each demo
//! binary is a short, direct sequence of platform calls; the library only
//! factors out the pieces that are worth testing (pixel patterns, anonymous
//! shared memory, global discovery) and the per-connection window state.

pub mod framebuffer;
pub mod scene;

#[cfg(unix)]
pub mod shm;

#[cfg(unix)]
pub mod wayland;

#[cfg(windows)]
pub mod win32;
