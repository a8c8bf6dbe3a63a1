//! Registry discovery: binding server-announced globals by interface name.

use anyhow::{Context, Result};
use log::{info, trace};
use wayland_client::{
    protocol::{wl_compositor, wl_registry, wl_shell, wl_shm},
    Connection, Dispatch, QueueHandle,
};
use wayland_protocols::xdg::shell::client::xdg_wm_base;

/// The capabilities a demo needs, populated by the registry callback and
/// handed back to the caller once the discovery roundtrip completes.
#[derive(Debug, Default)]
pub struct Globals {
    pub compositor: Option<wl_compositor::WlCompositor>,
    pub shm: Option<wl_shm::WlShm>,
    pub wm_base: Option<xdg_wm_base::XdgWmBase>,
    /// Legacy window role; bound only as a fallback for servers without
    /// `xdg_wm_base`.
    pub shell: Option<wl_shell::WlShell>,
}

impl Globals {
    /// Binds a just-announced global if it is one we use. Everything is
    /// bound at version 1; the demos need nothing newer.
    pub fn register<D>(
        &mut self,
        registry: &wl_registry::WlRegistry,
        name: u32,
        interface: &str,
        version: u32,
        qh: &QueueHandle<D>,
    ) where
        D: Dispatch<wl_compositor::WlCompositor, ()>
            + Dispatch<wl_shm::WlShm, ()>
            + Dispatch<xdg_wm_base::XdgWmBase, ()>
            + Dispatch<wl_shell::WlShell, ()>
            + 'static,
    {
        match interface {
            "wl_compositor" => {
                let compositor =
                    registry.bind::<wl_compositor::WlCompositor, _, _>(name, version.min(1), qh, ());
                self.compositor = Some(compositor);
            }
            "wl_shm" => {
                let shm = registry.bind::<wl_shm::WlShm, _, _>(name, version.min(1), qh, ());
                self.shm = Some(shm);
            }
            "xdg_wm_base" => {
                let wm_base =
                    registry.bind::<xdg_wm_base::XdgWmBase, _, _>(name, version.min(1), qh, ());
                self.wm_base = Some(wm_base);
            }
            "wl_shell" => {
                let shell = registry.bind::<wl_shell::WlShell, _, _>(name, version.min(1), qh, ());
                self.shell = Some(shell);
            }
            _ => {}
        }
    }

    /// The first required capability that is not bound, if any. Required:
    /// compositor, shm, and a window role (xdg_wm_base or wl_shell). Any
    /// capability still missing after the roundtrip is permanently absent
    /// for this run.
    pub fn missing(&self) -> Option<&'static str> {
        if self.compositor.is_none() {
            return Some("wl_compositor");
        }
        if self.shm.is_none() {
            return Some("wl_shm");
        }
        if self.wm_base.is_none() && self.shell.is_none() {
            return Some("xdg_wm_base or wl_shell");
        }
        None
    }
}

/// Connects to the display and runs the discovery handshake on its own:
/// dispatch once so the first batch of announcements arrives, then force a
/// roundtrip so the set is complete. Returns the bound globals.
pub fn probe() -> Result<Globals> {
    let conn = Connection::connect_to_env().context("failed to connect to display")?;
    info!("connected to display");

    let mut queue = conn.new_event_queue::<GlobalsProbe>();
    let qh = queue.handle();
    let _registry = conn.display().get_registry(&qh, ());

    let mut state = GlobalsProbe::default();
    queue
        .blocking_dispatch(&mut state)
        .context("initial dispatch failed")?;
    queue
        .roundtrip(&mut state)
        .context("registry roundtrip failed")?;
    Ok(state.globals)
}

#[derive(Default)]
struct GlobalsProbe {
    globals: Globals,
}

impl Dispatch<wl_registry::WlRegistry, ()> for GlobalsProbe {
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

// The probe only checks that capabilities exist; their events carry nothing
// it needs beyond protocol housekeeping.

impl Dispatch<wl_compositor::WlCompositor, ()> for GlobalsProbe {
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

impl Dispatch<wl_shm::WlShm, ()> for GlobalsProbe {
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

impl Dispatch<xdg_wm_base::XdgWmBase, ()> for GlobalsProbe {
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

impl Dispatch<wl_shell::WlShell, ()> for GlobalsProbe {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_globals_report_missing_compositor_first() {
        assert_eq!(Globals::default().missing(), Some("wl_compositor"));
    }
}
