use tracing::{debug, info, info_span};

use crate::{
    config::{Config, OutputFormat},
    error::PaletteError,
    loader,
    quantize,
    report::{self, Palette},
};

/// Stage of an extraction run. Any stage can fail, which aborts the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Quantizing,
    Formatting,
    Done,
}

/// Result of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub palette: Palette,
    /// Rendered report, identical to what was written to `Config::output`
    pub rendered: String,
}

/// Load, quantize and format according to `config`.
///
/// When `config.output` is set the rendered report is written there. No file
/// is touched unless loading and quantizing both succeeded.
pub fn run(config: &Config) -> Result<Report, PaletteError> {
    let span = info_span!("extract", path = %config.image_path.display(), colors = config.colors);
    let _enter = span.enter();

    debug!(stage = ?Stage::Loading);
    let pixels = loader::load_pixels(&config.image_path, &config.load)?;

    debug!(stage = ?Stage::Quantizing, pixels = pixels.len());
    let palette = quantize::quantize(&pixels, config.colors, &config.quantize)?;

    debug!(stage = ?Stage::Formatting, entries = palette.len());
    let rendered = match config.format {
        OutputFormat::Text => report::render_text(&palette),
        OutputFormat::Json => report::render_json(&palette)?,
    };
    if let Some(path) = &config.output {
        report::write_report(path, &rendered)?;
        info!(path = %path.display(), "wrote palette");
    }

    info!(stage = ?Stage::Done, entries = palette.len(), "extracted palette");
    Ok(Report { palette, rendered })
}
