use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image_to_palette_wasm::{Config, OutputFormat, PaletteError, display, loader, pipeline, quantize};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CliFormat {
    Text,
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Text => OutputFormat::Text,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

/// Extract the dominant colors of an image.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image file to analyse
    image_path: PathBuf,

    /// Number of colors to extract
    #[arg(short, long, default_value_t = 3, allow_negative_numbers = true)]
    colors: i64,

    /// Also write the report to this file (created or replaced)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Draw the extracted colors in the terminal
    #[arg(short, long)]
    show: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = CliFormat::Text)]
    format: CliFormat,

    /// Shrink images so their longest side is at most this many pixels (0 keeps full size)
    #[arg(long, default_value_t = loader::DEFAULT_MAX_SIDE)]
    max_side: u32,

    /// Upper bound on k-means iterations
    #[arg(long, default_value_t = quantize::DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Log pipeline details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match try_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err
                .downcast_ref::<PaletteError>()
                .map_or(1, PaletteError::exit_code);
            eprintln!("error: {err:#}");
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Validate parsed arguments into a run configuration.
fn config_from_args(args: Args) -> Result<Config, PaletteError> {
    Config::new(args.image_path, args.colors, args.output, args.show)?
        .with_format(args.format.into())
        .with_max_side(args.max_side)
        .with_max_iterations(args.max_iterations)
}

fn try_main(args: Args) -> Result<()> {
    let config = config_from_args(args)?;

    let report = pipeline::run(&config)?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(report.rendered.as_bytes())
        .context("writing palette to stdout")?;
    if config.show {
        stdout
            .write_all(display::render_swatches(&report.palette).as_bytes())
            .context("drawing palette")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("palette-cli").chain(argv.iter().copied()))
    }

    #[test]
    fn defaults_apply_when_only_path_given() {
        let config = config_from_args(parse(&["photo.png"]).unwrap()).unwrap();

        assert_eq!(config.image_path, PathBuf::from("photo.png"));
        assert_eq!(config.colors, 3);
        assert_eq!(config.output, None);
        assert!(!config.show);
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn all_options_are_recognised() {
        let args = parse(&[
            "photo.png", "--colors", "7", "--output", "out.json", "--show", "--format", "json",
            "--max-side", "0", "--max-iterations", "5",
        ])
        .unwrap();
        let config = config_from_args(args).unwrap();

        assert_eq!(config.colors, 7);
        assert_eq!(config.output, Some(PathBuf::from("out.json")));
        assert!(config.show);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.load.max_side, None);
        assert_eq!(config.quantize.max_iterations, 5);
    }

    #[test]
    fn non_numeric_colors_is_usage_error() {
        let err = parse(&["photo.png", "--colors", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_image_path_is_usage_error() {
        let err = parse(&["--colors", "4"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn negative_colors_reach_validation() {
        let args = parse(&["photo.png", "--colors", "-1"]).unwrap();
        assert_eq!(args.colors, -1);

        let err = config_from_args(args).unwrap_err();
        assert!(matches!(err, PaletteError::InvalidArgument(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn zero_colors_is_invalid_argument() {
        let err = config_from_args(parse(&["photo.png", "-c", "0"]).unwrap()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn zero_iterations_is_invalid_argument() {
        let err = config_from_args(parse(&["photo.png", "--max-iterations", "0"]).unwrap()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn unknown_format_is_usage_error() {
        let err = parse(&["photo.png", "--format", "yaml"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);
    }
}
