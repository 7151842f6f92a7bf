use termion::color;

use crate::report::Palette;

const SWATCH: &str = "      ";

/// Render each entry as a truecolor block followed by its hex code and share.
pub fn render_swatches(palette: &Palette) -> String {
    palette
        .iter()
        .map(|entry| {
            let [r, g, b] = entry.rgb;
            format!(
                "{}{SWATCH}{} {} {:>6.2}%\n",
                color::Bg(color::Rgb(r, g, b)),
                color::Bg(color::Reset),
                entry.hex,
                entry.percent,
            )
        })
        .collect()
}
