use anyhow::Context;
use clap::{Parser, Subcommand};
use houdini_ramen::core::config::RamenConfig;
use houdini_ramen::core::host::{MessageSink, NetworkUi, NodeGraph, ParmReader, Playbar, Stage};
use houdini_ramen::core::live_link::LiveLink;
use houdini_ramen::core::material::{MaterialRequest, ParmSuffix, material};
use houdini_ramen::core::memory::MemoryHost;
use houdini_ramen::core::project::HoudiniSession;
use houdini_ramen::core::turntable::{
    DEFAULT_APERTURE, DEFAULT_FOCAL_LENGTH, Optics, TurntableRequest, auto_turntable,
};
use houdini_ramen::core::types::NodePath;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "houdini_ramen", about = "Turntable and MaterialX setup for Houdini over Live-Link")]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run against an in-memory scene loaded from this JSON file and print the result
    #[arg(long, global = true)]
    scene: Option<PathBuf>,

    /// Print the generated Python instead of sending it.
    /// Scene reads (bounds, frame range, parameters) still query Houdini over Live-Link.
    #[arg(long, global = true)]
    print_script: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Frame a camera on an asset and spin the asset over the playback range
    Turntable {
        #[arg(long)]
        asset: String,
        /// Camera prim path; defaults to the configured camera
        #[arg(long)]
        camera: Option<String>,
        #[arg(long, default_value_t = DEFAULT_FOCAL_LENGTH)]
        focal: f64,
        #[arg(long, default_value_t = DEFAULT_APERTURE)]
        aperture: f64,
        /// Framing multiplier (>= 1.0); defaults to the configured padding
        #[arg(long)]
        padding: Option<f64>,
    },
    /// Build a MaterialX material bound to a tool's texture parameters
    Material {
        /// Tool instance node, e.g. /stage/subnet1
        #[arg(long)]
        tool: String,
        #[arg(long)]
        name: String,
        /// Name of the triggering parameter; its last three characters pick the parameter set
        #[arg(long)]
        parm: String,
    },
}

/// Outcome line for the terminal; `ok` is false when nothing was authored.
struct Status {
    ok: bool,
    message: String,
}

impl Status {
    fn print(&self) {
        if self.ok {
            println!("✅ {}", self.message);
        } else {
            eprintln!("❌ {}", self.message);
        }
    }
}

fn run<H>(host: &mut H, command: &Command, config: &RamenConfig) -> anyhow::Result<Status>
where
    H: Stage + Playbar + MessageSink + NodeGraph + ParmReader + NetworkUi,
{
    match command {
        Command::Turntable {
            asset,
            camera,
            focal,
            aperture,
            padding,
        } => {
            let request = TurntableRequest {
                asset: asset.clone(),
                camera: camera
                    .clone()
                    .unwrap_or_else(|| config.turntable.camera.clone()),
                optics: Optics::new(*focal, *aperture),
                padding: padding.unwrap_or(config.turntable.padding),
            };
            let outcome = auto_turntable(host, &request, &config.turntable)
                .with_context(|| format!("turntable setup for {} failed", asset))?;
            Ok(Status {
                ok: outcome.is_authored(),
                message: outcome.message(),
            })
        }
        Command::Material { tool, name, parm } => {
            let request = MaterialRequest {
                tool: NodePath::new(tool.as_str()),
                name: name.clone(),
                suffix: ParmSuffix::from_parm_name(parm),
            };
            let outcome = material(host, &request, &config.material)
                .with_context(|| format!("building material '{}' failed", name))?;
            Ok(Status {
                ok: true,
                message: outcome.message(),
            })
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RamenConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RamenConfig::default(),
    };

    if let Some(scene) = &cli.scene {
        let text = std::fs::read_to_string(scene)
            .with_context(|| format!("reading scene {}", scene.display()))?;
        let mut host: MemoryHost = serde_json::from_str(&text)
            .with_context(|| format!("parsing scene {}", scene.display()))?;
        let status = run(&mut host, &cli.command, &config)?;
        status.print();
        println!("{}", serde_json::to_string_pretty(&host)?);
        return Ok(());
    }

    let mut session = HoudiniSession::new(LiveLink::new(config.live_link.clone()), config.session.clone());
    let status = run(&mut session, &cli.command, &config)?;
    if cli.print_script {
        if let Some(script) = session.take_script() {
            println!("{}", script);
        }
    } else {
        session
            .commit()
            .context("could not deliver the script to Houdini; is the Live-Link server running?")?;
    }
    status.print();
    Ok(())
}
