//! Message-loop window blitting a static two-square scene from an
//! in-memory bitmap.

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use softblit::scene;
    use softblit::win32;

    const WIDTH: u32 = 800;
    const HEIGHT: u32 = 600;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scene = scene::demo_scene(WIDTH, HEIGHT);
    win32::run("softblit", scene)
}

#[cfg(not(windows))]
fn main() {
    eprintln!("bitmap-window needs the Win32 windowing stack");
    std::process::exit(1);
}
