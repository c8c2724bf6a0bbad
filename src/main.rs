use clap::{Parser, Subcommand};
use photo_collage::config::{self, CollageConfig};
use photo_collage::export::deliver;
use photo_collage::imaging::{Quality, is_supported_path};
use photo_collage::layout::{find_aspect_ratio, find_layout};
use photo_collage::output;
use photo_collage::session::Session;
use photo_collage::types::{CollageSettings, ImageSource, Rgb, SettingsPatch};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Width of the dry-run preview canvas.
const PREVIEW_WIDTH: u32 = 640;

#[derive(Parser)]
#[command(name = "photo-collage")]
#[command(about = "Compose up to five photos into a styled collage")]
#[command(long_about = "\
Compose up to five photos into a styled collage

Photos fill the cells of a layout in the order given. Each photo is
scaled to cover its cell and cropped around its focal point; rounded
corners and gutters are drawn over a solid background, and the result is
exported as a JPEG.

Inputs may be files or directories. Directories are walked recursively and
every supported image inside is used, sorted by path.

Settings resolution (later wins):
  collage.toml   [collage] section (see 'photo-collage gen-config')
  --settings     saved settings record (JSON)
  flags          --layout, --aspect, --gutter, --radius, --background

Run 'photo-collage layouts' to list layouts and aspect ratios.")]
#[command(version)]
struct Cli {
    /// Directory holding collage.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log engine activity (decode fallbacks, evictions, export) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ComposeArgs {
    /// Image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Layout id
    #[arg(long)]
    layout: Option<String>,

    /// Aspect ratio id, e.g. 4:5
    #[arg(long)]
    aspect: Option<String>,

    /// Space between cells, in pixels
    #[arg(long)]
    gutter: Option<f64>,

    /// Cell corner radius, in pixels
    #[arg(long)]
    radius: Option<f64>,

    /// Background color (#rgb or #rrggbb)
    #[arg(long)]
    background: Option<Rgb>,

    /// Focal point for one photo: POSITION=X,Y with 1-based position, X/Y in 0..1
    #[arg(long = "focus", value_parser = parse_focus)]
    focus: Vec<FocusArg>,

    /// Export width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Output directory for the JPEG
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Saved settings record to start from (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the final settings back to --settings
    #[arg(long, requires = "settings")]
    save_settings: bool,

    /// Render a preview and report cells without exporting
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build a collage from photos and export it as JPEG
    Compose(ComposeArgs),
    /// List layouts and aspect ratios
    Layouts,
    /// Print a stock collage.toml with all options documented
    GenConfig,
}

#[derive(Debug, Clone, Copy)]
struct FocusArg {
    position: usize,
    x: f64,
    y: f64,
}

fn parse_focus(s: &str) -> Result<FocusArg, String> {
    let err = || format!("expected POSITION=X,Y (e.g. 2=0.5,0.2), got '{s}'");
    let (position, point) = s.split_once('=').ok_or_else(err)?;
    let (x, y) = point.split_once(',').ok_or_else(err)?;
    let position: usize = position.trim().parse().map_err(|_| err())?;
    if position == 0 {
        return Err("focus positions start at 1".to_string());
    }
    Ok(FocusArg {
        position,
        x: x.trim().parse().map_err(|_| err())?,
        y: y.trim().parse().map_err(|_| err())?,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Compose(args) => {
            let config = config::load_config(&cli.config_dir)?;
            compose(&config, args)?;
        }
        Command::Layouts => output::print_layouts(),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, honoring `RUST_LOG` when set.
fn init_tracing(verbose: bool) {
    let default = if verbose { "photo_collage=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn compose(config: &CollageConfig, args: ComposeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = starting_settings(config, &args)?;
    let mut session = Session::new(settings);

    let sources = collect_sources(&args.inputs)?;
    if sources.is_empty() {
        return Err("no supported images found in the given inputs".into());
    }
    let report = session.add_sources(sources);

    for focus in &args.focus {
        let Some(image) = session.images().get(focus.position - 1) else {
            return Err(format!("--focus {}: no photo at that position", focus.position).into());
        };
        let id = image.id;
        session.set_focus(id, focus.x, focus.y);
    }

    output::print_add_report(session.images(), &report, session.capacity());
    println!();

    if args.save_settings
        && let Some(path) = &args.settings
    {
        std::fs::write(path, session.settings().to_json()?)?;
    }

    if args.dry_run {
        let outcome = session.render_preview(PREVIEW_WIDTH)?;
        output::print_render_outcome(session.layout(), &outcome);
        session.close();
        return Ok(());
    }

    let mut export = config.export_config();
    if let Some(width) = args.width {
        if !config::EXPORT_WIDTH_RANGE.contains(&width) {
            return Err(format!(
                "--width must be {}-{}",
                config::EXPORT_WIDTH_RANGE.start(),
                config::EXPORT_WIDTH_RANGE.end()
            )
            .into());
        }
        export.width = width;
    }
    if let Some(quality) = args.quality {
        export.quality = Quality::new(quality);
    }

    let file = session.export(export)?;
    let stats = session.cache_stats();
    // No platform share sheet on the command line: save straight to disk.
    let delivered = deliver(&file, &[], &args.output)?;
    output::print_export(&file, &delivered, &stats);
    session.close();
    Ok(())
}

/// Config file, then saved record, then flags.
fn starting_settings(
    config: &CollageConfig,
    args: &ComposeArgs,
) -> Result<CollageSettings, Box<dyn std::error::Error>> {
    let mut settings = config.settings()?;
    if let Some(path) = &args.settings
        && path.exists()
    {
        let saved = CollageSettings::from_json(&std::fs::read_to_string(path)?);
        settings = settings.merged(&saved.into());
    }

    if let Some(id) = &args.layout
        && find_layout(id).is_none()
    {
        return Err(format!("unknown layout '{id}' (see 'photo-collage layouts')").into());
    }
    if let Some(id) = &args.aspect
        && find_aspect_ratio(id).is_none()
    {
        return Err(format!("unknown aspect ratio '{id}' (see 'photo-collage layouts')").into());
    }
    for (flag, value) in [("--gutter", args.gutter), ("--radius", args.radius)] {
        if let Some(v) = value
            && !(v.is_finite() && v >= 0.0)
        {
            return Err(format!("{flag} must be a non-negative number").into());
        }
    }

    Ok(settings.merged(&SettingsPatch {
        layout_id: args.layout.clone(),
        aspect_ratio_id: args.aspect.clone(),
        gutter: args.gutter,
        corner_radius: args.radius,
        background_color: args.background,
    }))
}

/// Expand inputs into image sources, in order. Directories contribute their
/// supported images sorted by path.
fn collect_sources(inputs: &[PathBuf]) -> Result<Vec<ImageSource>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_supported_path(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    paths.iter().map(|p| read_source(p)).collect()
}

fn read_source(path: &Path) -> Result<ImageSource, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut source = ImageSource::from_path(path);
    source.bytes = Some(Arc::from(bytes));
    Ok(source)
}
