use std::path::PathBuf;

use crate::{error::PaletteError, loader::LoadOptions, quantize::QuantizeOptions};

/// How the palette report is rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `N. #RRGGBB  →  RGB(r, g, b)` lines
    #[default]
    Text,
    Json,
}

/// Validated settings for one extraction run.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub image_path: PathBuf,
    pub colors: usize,
    pub output: Option<PathBuf>,
    pub show: bool,
    pub format: OutputFormat,
    pub load: LoadOptions,
    pub quantize: QuantizeOptions,
}

impl Config {
    /// Validate raw command-line values.
    ///
    /// `colors` is taken signed so that zero and negative counts are
    /// reported as invalid arguments rather than parse failures.
    pub fn new(image_path: PathBuf, colors: i64, output: Option<PathBuf>, show: bool) -> Result<Self, PaletteError> {
        if image_path.as_os_str().is_empty() {
            return Err(PaletteError::Usage("missing image path".into()));
        }
        let colors = match usize::try_from(colors) {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(PaletteError::InvalidArgument(format!(
                    "--colors must be a positive integer, got {colors}"
                )));
            }
        };

        Ok(Self {
            image_path,
            colors,
            output,
            show,
            format: OutputFormat::default(),
            load: LoadOptions::default(),
            quantize: QuantizeOptions::default(),
        })
    }

    pub fn with_format(self, format: OutputFormat) -> Self {
        Self { format, ..self }
    }

    /// Longest side to downscale to; `0` disables downscaling.
    pub fn with_max_side(self, max_side: u32) -> Self {
        let load = LoadOptions {
            max_side: (max_side > 0).then_some(max_side),
        };
        Self { load, ..self }
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> Result<Self, PaletteError> {
        if max_iterations == 0 {
            return Err(PaletteError::InvalidArgument(
                "--max-iterations must be at least 1".into(),
            ));
        }
        let quantize = QuantizeOptions {
            max_iterations,
            ..self.quantize
        };
        Ok(Self { quantize, ..self })
    }
}
