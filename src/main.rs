use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::time::{Duration, Instant};

use lipsync_rs::audio::{self, AudioCapture};
use lipsync_rs::character::ShapeLibrary;
use lipsync_rs::classifier::EnergyProvider;
use lipsync_rs::viseme::Viseme;
use lipsync_rs::{LipSyncNode, NodeConfig};

#[derive(Parser)]
#[command(name = "lipsync-rs")]
#[command(about = "Real-time microphone viseme meter")]
struct Args {
    /// List capture devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Capture device name (default input device when omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Input gain (0.0 - 10.0)
    #[arg(short, long, default_value = "1.0")]
    gain: f32,

    /// Noise gate threshold in dB (-60.0 - 0.0)
    #[arg(long, default_value = "-40.0")]
    gate: f32,

    /// Hold-open time in seconds after the level drops
    #[arg(long, default_value = "0.5")]
    hold: f32,

    /// Snap to the single dominant viseme instead of blending
    #[arg(long)]
    binarize: bool,

    /// Print the full per-viseme debug block every second
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_devices {
        for (label, id) in audio::list_input_devices()? {
            println!("[{id}] {label}");
        }
        return Ok(());
    }

    let config = NodeConfig {
        gain: args.gain,
        noise_gate_db: args.gate,
        hold_open: args.hold,
        binarize: args.binarize,
        show_debug: args.verbose,
        ..NodeConfig::default()
    };

    // the built-in amplitude fallback engine; a real phoneme engine would be
    // wired in here instead
    let mut node = LipSyncNode::new(Box::new(EnergyProvider), config);

    // a stand-in character with the standard VRChat viseme shapes
    let mut library = ShapeLibrary::new();
    library.add_mesh(
        "Face",
        Viseme::ALL
            .iter()
            .map(|v| format!("vrc/{}", v.name().to_lowercase()))
            .collect(),
    );
    node.set_character(Some(library));
    node.auto_map()?;

    let capture = AudioCapture::open(args.device.as_deref())?;
    capture.start()?;

    println!("Listening... (Ctrl+C to quit)");

    let mut last_tick = Instant::now();
    let mut last_debug = Instant::now();

    loop {
        while let Some(chunk) = capture.try_read() {
            node.push_samples(&chunk);
        }

        let now = Instant::now();
        node.update(now.duration_since(last_tick).as_secs_f32());
        last_tick = now;

        let outputs = node.pull_outputs();
        let (top_shape, top_weight) = outputs
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(name, weight)| (name.as_str(), *weight))
            .unwrap_or(("-", 0.0));
        let top_shape = top_shape.to_string();

        print!(
            "\rdb: {:6.1}  {}: {:.2}        ",
            node.db(),
            top_shape,
            top_weight
        );
        std::io::stdout().flush()?;

        if args.verbose && now.duration_since(last_debug) >= Duration::from_secs(1) {
            last_debug = now;
            println!("\n{}", node.debug_output());
        }

        std::thread::sleep(Duration::from_millis(10));
    }
}
