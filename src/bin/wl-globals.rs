//! Connects to the display, enumerates the advertised globals, and
//! verifies the compositor capability before disconnecting.

#[cfg(unix)]
fn main() -> anyhow::Result<()> {
    use anyhow::bail;
    use log::info;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let globals = softblit::wayland::probe()?;
    if globals.compositor.is_none() {
        bail!("wl_compositor not found");
    }
    info!("found compositor");
    info!("disconnected from display");
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("wl-globals needs a Wayland display server; none exists on this platform");
    std::process::exit(1);
}
