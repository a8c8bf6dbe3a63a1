//! Static 480x360 checkerboard on a shared-memory surface.

#[cfg(unix)]
fn main() -> anyhow::Result<()> {
    use softblit::scene::Checkerboard;
    use softblit::wayland::{self, WindowConfig};

    const WIDTH: u32 = 480;
    const HEIGHT: u32 = 360;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    wayland::run(
        WindowConfig {
            title: "softblit checker".to_string(),
            width: WIDTH,
            height: HEIGHT,
            animate: false,
        },
        Box::new(Checkerboard),
    )
}

#[cfg(not(unix))]
fn main() {
    eprintln!("wl-checker needs a Wayland display server; none exists on this platform");
    std::process::exit(1);
}
