use clap::Parser;
use printpack::compose::{ComposeOptions, Composer, PaddingStrategy};
use printpack::config::DecorationConfig;
use printpack::geocode::NominatimGeocoder;
use printpack::imaging::text::{TextRenderer, TrueTypeRenderer};
use std::path::PathBuf;
use std::process::ExitCode;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "printpack")]
#[command(about = "Assemble bordered, EXIF-annotated photo compositions for printing")]
#[command(long_about = "\
Assemble bordered, EXIF-annotated photo compositions for printing

Images found under the input directory are sorted by aspect ratio
(portrait and landscape treated alike), split into groups, and each group
is merged into one bordered composite at the target aspect ratio. Border
text is driven by a JSON config with four corner slots:

  {
    \"item_separator\": \" | \",
    \"top_left\":     { \"description\": null },
    \"top_right\":    { \"geocode\": { \"zoom\": 12 } },
    \"bottom_left\":  { \"focal_length\": {}, \"aperture\": {},
                      \"shutter_speed\": {}, \"iso\": {} },
    \"bottom_right\": { \"gps_coordinates\": {} }
  }

Run 'printpack --create-default-config' to write the stock config.")]
#[command(version = version_string())]
struct Cli {
    /// Path to a JSON decoration config; stock defaults apply if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory searched recursively for images to process
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output directory for compositions (created if absent)
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Write the stock config to PATH and exit
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = "printpack-default.json"
    )]
    create_default_config: Option<PathBuf>,

    /// Target aspect ratio of each composition, as "W:H" or a number
    #[arg(long, default_value = "4:3", value_parser = parse_aspect_ratio)]
    aspect_ratio: f64,

    /// Number of images per composition
    #[arg(long, default_value_t = printpack::compose::DEFAULT_GROUP_SIZE)]
    group_size: usize,

    /// Border width multiplier (1.0 = 5mm border on a 13cm print)
    #[arg(long, default_value_t = 1.0)]
    border_multiplier: f64,

    /// Remainder-group handling: upscale, placeholder, duplicate
    #[arg(long, default_value = "upscale")]
    padding_strategy: PaddingStrategy,

    /// TrueType font for border text (overrides the config)
    #[arg(long)]
    font: Option<PathBuf>,
}

fn parse_aspect_ratio(value: &str) -> Result<f64, String> {
    let ratio = match value.split_once(':') {
        Some((w, h)) => {
            let w: f64 = w.trim().parse().map_err(|_| format!("invalid ratio {value:?}"))?;
            let h: f64 = h.trim().parse().map_err(|_| format!("invalid ratio {value:?}"))?;
            if h == 0.0 {
                return Err(format!("invalid ratio {value:?}"));
            }
            w / h
        }
        None => value
            .trim()
            .parse()
            .map_err(|_| format!("invalid ratio {value:?}"))?,
    };
    if ratio.is_finite() && ratio > 0.0 {
        Ok(ratio)
    } else {
        Err(format!("aspect ratio must be positive, got {value:?}"))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = cli.create_default_config {
        DecorationConfig::default().write(&path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let input_dir = cli
        .input_dir
        .ok_or("--input-dir is required unless --create-default-config is given")?;

    let config = match &cli.config {
        Some(path) => DecorationConfig::load(path)?,
        None => DecorationConfig::default(),
    };

    // The font is only needed when some corner actually renders text.
    let font = cli.font.or_else(|| config.font.clone());
    let mut renderer: Box<dyn TextRenderer> = if config.has_items() {
        Box::new(TrueTypeRenderer::new(font.as_deref())?)
    } else {
        Box::new(NoopRenderer)
    };
    let mut geocoder = NominatimGeocoder::new()?;

    let options = ComposeOptions {
        target_aspect_ratio: cli.aspect_ratio,
        group_size: cli.group_size.max(1),
        border_multiplier: cli.border_multiplier,
        padding_strategy: cli.padding_strategy,
    };
    let mut composer = Composer::with_options(config, options);
    composer.discover_images(&input_dir)?;
    println!(
        "Discovered {} image(s) under {}",
        composer.input_files().len(),
        input_dir.display()
    );

    let written = composer.create_compositions(&cli.output_dir, renderer.as_mut(), &mut geocoder)?;
    for path in &written {
        println!("  {}", path.display());
    }
    println!("Wrote {} composition(s)", written.len());
    Ok(())
}

/// Renderer for runs with no configured border text.
struct NoopRenderer;

impl TextRenderer for NoopRenderer {
    fn draw_text(
        &mut self,
        _canvas: &mut image::RgbImage,
        _text: &str,
        _anchor: (i32, i32),
        _font_size: u32,
        _align: printpack::imaging::text::TextAlign,
        _color: image::Rgb<u8>,
    ) -> Result<(), printpack::imaging::text::TextError> {
        Ok(())
    }
}
