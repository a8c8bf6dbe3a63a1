//! Single-window bootstrap and the frame-callback repaint loop.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error, info, trace};
use wayland_client::{
    protocol::{
        wl_buffer, wl_callback, wl_compositor, wl_registry, wl_shell, wl_shell_surface, wl_shm,
        wl_shm_pool, wl_surface,
    },
    Connection, Dispatch, QueueHandle,
};
use wayland_protocols::xdg::shell::client::{xdg_surface, xdg_toplevel, xdg_wm_base};

use super::buffer::ShmBuffer;
use super::globals::Globals;
use crate::scene::Paint;

const APP_ID: &str = "softblit";

/// Static description of the window a demo wants.
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Re-arm a frame callback on every redraw, producing a self-sustaining
    /// repaint cycle. When false the surface is painted exactly once.
    pub animate: bool,
}

/// Per-connection state: the bound globals, the one surface and its window
/// role, the one pixel buffer, and the repaint strategy.
pub struct WindowApp {
    qh: QueueHandle<WindowApp>,
    globals: Globals,
    config: WindowConfig,
    painter: Box<dyn Paint>,

    surface: Option<wl_surface::WlSurface>,
    xdg_surface: Option<xdg_surface::XdgSurface>,
    toplevel: Option<xdg_toplevel::XdgToplevel>,
    shell_surface: Option<wl_shell_surface::WlShellSurface>,
    buffer: Option<ShmBuffer>,
    frame_callback: Option<wl_callback::WlCallback>,
    configured: bool,
    running: bool,
}

/// Runs one demo window to completion: discovery, window bootstrap, then
/// the blocking dispatch loop until the window closes or the connection is
/// lost.
pub fn run(config: WindowConfig, painter: Box<dyn Paint>) -> Result<()> {
    let conn = Connection::connect_to_env().context("failed to connect to display")?;
    info!("connected to display");

    let mut queue = conn.new_event_queue::<WindowApp>();
    let qh = queue.handle();
    let _registry = conn.display().get_registry(&qh, ());

    let mut app = WindowApp::new(qh, config, painter);

    // Dispatch once, then force a roundtrip: every global the server had at
    // connect time is announced and bound before anything depends on it.
    queue
        .blocking_dispatch(&mut app)
        .context("initial dispatch failed")?;
    queue
        .roundtrip(&mut app)
        .context("registry roundtrip failed")?;

    if let Some(interface) = app.globals.missing() {
        bail!("{interface} not found");
    }

    app.setup_window()?;

    while app.running {
        if let Err(e) = queue.blocking_dispatch(&mut app) {
            // Losing the server ends the demo; it is not an error.
            info!("display connection closed: {e}");
            break;
        }
    }

    app.teardown();
    info!("disconnected from display");
    Ok(())
}

impl WindowApp {
    fn new(qh: QueueHandle<WindowApp>, config: WindowConfig, painter: Box<dyn Paint>) -> Self {
        Self {
            qh,
            globals: Globals::default(),
            config,
            painter,
            surface: None,
            xdg_surface: None,
            toplevel: None,
            shell_surface: None,
            buffer: None,
            frame_callback: None,
            configured: false,
            running: true,
        }
    }

    fn setup_window(&mut self) -> Result<()> {
        let compositor = self
            .globals
            .compositor
            .as_ref()
            .ok_or_else(|| anyhow!("wl_compositor not found"))?;
        let surface = compositor.create_surface(&self.qh, ());
        info!("created surface");

        if let Some(wm_base) = &self.globals.wm_base {
            let xdg_surface = wm_base.get_xdg_surface(&surface, &self.qh, ());
            let toplevel = xdg_surface.get_toplevel(&self.qh, ());
            toplevel.set_title(self.config.title.clone());
            toplevel.set_app_id(APP_ID.to_string());
            // Commit the bare role; the first attach waits for the
            // configure ack.
            surface.commit();

            self.surface = Some(surface);
            self.xdg_surface = Some(xdg_surface);
            self.toplevel = Some(toplevel);
            info!("created xdg toplevel");
        } else if let Some(shell) = &self.globals.shell {
            let shell_surface = shell.get_shell_surface(&surface, &self.qh, ());
            shell_surface.set_toplevel();

            self.surface = Some(surface);
            self.shell_surface = Some(shell_surface);
            info!("created shell surface");

            // The legacy role has no configure handshake, and no frame
            // callback exists before the first commit: draw the first frame
            // by hand.
            self.redraw()?;
        } else {
            bail!("no window role available");
        }
        Ok(())
    }

    /// One repaint cycle: write pixels into the shared buffer, attach,
    /// damage the full surface, re-arm the frame callback when animating,
    /// commit.
    fn redraw(&mut self) -> Result<()> {
        if self.buffer.is_none() {
            let shm = self
                .globals
                .shm
                .as_ref()
                .ok_or_else(|| anyhow!("wl_shm not found"))?;
            self.buffer = Some(ShmBuffer::new(
                shm,
                &self.qh,
                self.config.width,
                self.config.height,
            )?);
        }
        let (Some(buffer), Some(surface)) = (self.buffer.as_mut(), self.surface.as_ref()) else {
            bail!("redraw without a surface");
        };

        self.painter
            .paint(buffer.pixels_mut(), self.config.width, self.config.height);

        surface.attach(Some(buffer.handle()), 0, 0);
        surface.damage(0, 0, self.config.width as i32, self.config.height as i32);
        if self.config.animate {
            self.frame_callback = Some(surface.frame(&self.qh, ()));
        }
        surface.commit();
        Ok(())
    }

    /// Releases the window objects in reverse creation order. The buffer's
    /// pool, mapping and server handles go with it.
    fn teardown(&mut self) {
        drop(self.frame_callback.take());
        if let Some(toplevel) = self.toplevel.take() {
            toplevel.destroy();
        }
        if let Some(xdg_surface) = self.xdg_surface.take() {
            xdg_surface.destroy();
        }
        // wl_shell_surface has no destructor request; dropping the handle
        // is all there is.
        drop(self.shell_surface.take());
        if let Some(surface) = self.surface.take() {
            surface.destroy();
        }
        self.buffer = None;
    }
}

// --- Dispatch ---

impl Dispatch<wl_registry::WlRegistry, ()> for WindowApp {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => {
                info!("registry global: {interface} (name {name}, version {version})");
                state.globals.register(registry, name, &interface, version, qh);
            }
            wl_registry::Event::GlobalRemove { name } => {
                info!("registry global removed: name {name}");
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_compositor::WlCompositor, ()> for WindowApp {
    fn event(
        _: &mut Self,
        _: &wl_compositor::WlCompositor,
        _: wl_compositor::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_shm::WlShm, ()> for WindowApp {
    fn event(
        _: &mut Self,
        _: &wl_shm::WlShm,
        event: wl_shm::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        trace!("wl_shm event: {event:?}");
    }
}

impl Dispatch<wl_shm_pool::WlShmPool, ()> for WindowApp {
    fn event(
        _: &mut Self,
        _: &wl_shm_pool::WlShmPool,
        _: wl_shm_pool::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_buffer::WlBuffer, ()> for WindowApp {
    fn event(
        _: &mut Self,
        _: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        // The single buffer is reattached every frame; release is only
        // informational here.
        if let wl_buffer::Event::Release = event {
            trace!("buffer released");
        }
    }
}

impl Dispatch<wl_surface::WlSurface, ()> for WindowApp {
    fn event(
        _: &mut Self,
        _: &wl_surface::WlSurface,
        _: wl_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_callback::WlCallback, ()> for WindowApp {
    fn event(
        state: &mut Self,
        _: &wl_callback::WlCallback,
        event: wl_callback::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            state.frame_callback = None;
            if state.config.animate && state.running {
                if let Err(e) = state.redraw() {
                    error!("redraw failed: {e:#}");
                    state.running = false;
                }
            }
        }
    }
}

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for WindowApp {
    fn event(
        _: &mut Self,
        wm_base: &xdg_wm_base::XdgWmBase,
        event: xdg_wm_base::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            wm_base.pong(serial);
        }
    }
}

impl Dispatch<xdg_surface::XdgSurface, ()> for WindowApp {
    fn event(
        state: &mut Self,
        xdg_surface: &xdg_surface::XdgSurface,
        event: xdg_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            xdg_surface.ack_configure(serial);
            if !state.configured {
                state.configured = true;
                // No frame callback exists before the first commit; the
                // first frame is triggered by hand.
                if let Err(e) = state.redraw() {
                    error!("initial redraw failed: {e:#}");
                    state.running = false;
                }
            }
        }
    }
}

impl Dispatch<xdg_toplevel::XdgToplevel, ()> for WindowApp {
    fn event(
        state: &mut Self,
        _: &xdg_toplevel::XdgToplevel,
        event: xdg_toplevel::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                // The buffer keeps its creation size; resizes are out of
                // scope for the demos.
                trace!("toplevel configure: {width}x{height}");
            }
            xdg_toplevel::Event::Close => {
                info!("window closed");
                state.running = false;
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_shell::WlShell, ()> for WindowApp {
    fn event(
        _: &mut Self,
        _: &wl_shell::WlShell,
        _: wl_shell::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_shell_surface::WlShellSurface, ()> for WindowApp {
    fn event(
        _: &mut Self,
        shell_surface: &wl_shell_surface::WlShellSurface,
        event: wl_shell_surface::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            wl_shell_surface::Event::Ping { serial } => {
                shell_surface.pong(serial);
                debug!("pinged and ponged");
            }
            wl_shell_surface::Event::Configure { width, height, .. } => {
                trace!("shell surface configure: {width}x{height}");
            }
            _ => {}
        }
    }
}
