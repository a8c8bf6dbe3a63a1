//! Animated 480x360 surface: every frame callback repaints the shared
//! buffer with a climbing solid color and re-arms the next callback.

#[cfg(unix)]
fn main() -> anyhow::Result<()> {
    use softblit::scene::ColorRamp;
    use softblit::wayland::{self, WindowConfig};

    const WIDTH: u32 = 480;
    const HEIGHT: u32 = 360;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    wayland::run(
        WindowConfig {
            title: "softblit ramp".to_string(),
            width: WIDTH,
            height: HEIGHT,
            animate: true,
        },
        Box::new(ColorRamp::default()),
    )
}

#[cfg(not(unix))]
fn main() {
    eprintln!("wl-ramp needs a Wayland display server; none exists on this platform");
    std::process::exit(1);
}
