//! gesture_cloud — interactive entry point.
//!
//! ```text
//! gesture_cloud [--width PX] [--height PX] [--mobile] [--config FILE]
//!               [--source sim|leap|off] [--seed N]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use env_logger::Env;

use gesture_cloud::app::run;
use gesture_cloud::config::{CaptureBackend, Config, ConfigOverrides, DeviceTier};
use gesture_cloud::visualizer::{Viewport, DEFAULT_WIN_H, DEFAULT_WIN_W};

struct Args {
    width:   usize,
    height:  usize,
    mobile:  bool,
    config:  Option<PathBuf>,
    source:  Option<CaptureBackend>,
    seed:    Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut out = Args {
        width:  DEFAULT_WIN_W,
        height: DEFAULT_WIN_H,
        mobile: false,
        config: None,
        source: None,
        seed:   None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{} needs a value", flag));
        match arg.as_str() {
            "--width"  => out.width  = value("--width")?.parse().context("--width")?,
            "--height" => out.height = value("--height")?.parse().context("--height")?,
            "--mobile" => out.mobile = true,
            "--config" => out.config = Some(PathBuf::from(value("--config")?)),
            "--source" => out.source = Some(value("--source")?.parse()?),
            "--seed"   => out.seed   = Some(value("--seed")?.parse().context("--seed")?),
            other      => bail!("unknown argument `{}`", other),
        }
    }
    Ok(out)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let viewport = Viewport::new(args.width, args.height);
    let tier = if args.mobile {
        DeviceTier::Mobile
    } else {
        DeviceTier::from_viewport_width(viewport.width)
    };

    let mut cfg = match &args.config {
        Some(path) => Config::load(path, tier)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::resolve(tier, ConfigOverrides::default())?,
    };
    if let Some(source) = args.source { cfg.backend = source; }
    if args.seed.is_some() { cfg.seed = args.seed; }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Gesture Cloud — Hand-Controlled Particle Shapes       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    match cfg.backend {
        CaptureBackend::Sim  => println!("  Mode: Mouse simulation  (--source leap for hardware)"),
        CaptureBackend::Leap => println!("  Mode: LeapMotion hardware"),
        CaptureBackend::Off  => println!("  Mode: No hand input"),
    }
    println!("  {} particles, {:?} tier, window {}x{}",
        cfg.particle_count, cfg.tier, viewport.width, viewport.height);
    println!();

    run(cfg, viewport)?;
    Ok(())
}
