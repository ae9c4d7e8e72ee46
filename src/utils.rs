use std::path::Path;

use anyhow::{Context, Result};
use plotters::style::{register_font, FontStyle};
use tracing::info;

use crate::constants::PLOT_FONT_FAMILY;

pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Registers a TTF for chart text. Plotters keeps font data for the whole process.
pub fn register_plot_font(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read font {}", path.display()))?;
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    for style in [FontStyle::Normal, FontStyle::Bold] {
        register_font(PLOT_FONT_FAMILY, style, bytes)
            .map_err(|_| anyhow::anyhow!("Invalid font data in {}", path.display()))?;
    }
    info!("Registered chart font {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(register_plot_font(Path::new("/nonexistent/font.ttf")).is_err());
    }
}
