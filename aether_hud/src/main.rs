//! aether_hud — interactive entry point.

use std::io::{self, Write};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aether_hud::app::{run, CliArgs, Profile, Role};

fn main() {
    let mut args = CliArgs::parse();
    init_tracing(args.verbose);

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Aether HUD — Multimodal Sign-in Particle Field      ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Input: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Input: Keyboard simulation  (use --features leap for hardware)");
    #[cfg(feature = "mic")]
    println!("  Voice: default microphone");
    #[cfg(not(feature = "mic"))]
    println!("  Voice: off  (use --features mic for the microphone)");
    println!();

    if args.quick {
        println!("  Quick-start: defaults for the chosen profile\n");
    } else {
        configure_interactively(&mut args);
    }

    let cfg = match args.resolve() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!(
        "  Profile: {}  Role: {}  Particles: {}",
        cfg.profile.name(),
        cfg.role.name(),
        cfg.field.particle_count
    );
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

/// Ask for whatever the command line left open.
fn configure_interactively(args: &mut CliArgs) {
    if args.profile.is_none() {
        println!("  Profile:  1.aether (150k particles)  2.zeno (12k particles, hand-driven)");
        args.profile = Some(match read_line("  Choice (1–2, default 1): ").trim() {
            "2" => Profile::Zeno,
            _   => Profile::Aether,
        });
    }
    if args.role.is_none() {
        println!("  Role:  1.both  2.sensor only  3.render only");
        args.role = Some(match read_line("  Choice (1–3, default 1): ").trim() {
            "2" => Role::Sensor,
            "3" => Role::Render,
            _   => Role::Both,
        });
    }
    if args.bridge.is_none() && args.role != Some(Role::Both) {
        let path = read_line("  Bridge file (default: temp dir): ");
        let path = path.trim();
        if !path.is_empty() {
            args.bridge = Some(path.into());
        }
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
