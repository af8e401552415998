use std::path::Path;

use amr_maps::prelude::Map2D;
use image::{GrayImage, Luma};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a `fmt` subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,amr_maps=debug"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Mapping from pixel values to grey levels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ColorScale {
    /// `log10` of positive values; non-positive values render black.
    #[default]
    Log,
    Linear,
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub scale: ColorScale,
    /// Fixed value range; `None` stretches to the map's own range.
    pub range: Option<(f64, f64)>,
    /// Output pixels per map pixel.
    pub upscale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: ColorScale::Log,
            range: None,
            upscale: 1,
        }
    }
}

impl RenderConfig {
    pub fn new(scale: ColorScale) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    pub fn with_range(mut self, lo: f64, hi: f64) -> Self {
        self.range = Some((lo, hi));
        self
    }

    pub fn with_upscale(mut self, upscale: u32) -> Self {
        self.upscale = upscale.max(1);
        self
    }
}

fn transform(scale: ColorScale, v: f64) -> Option<f64> {
    if v.is_nan() {
        return None;
    }
    match scale {
        ColorScale::Log if v > 0.0 => Some(v.log10()),
        ColorScale::Log => None,
        ColorScale::Linear => Some(v),
    }
}

/// Writes `map` as a greyscale PNG with row `0` at the bottom. Pixels without data are black.
pub fn render_map_to_png(
    map: &Map2D,
    config: &RenderConfig,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let values: Vec<Option<f64>> = map
        .data
        .iter()
        .map(|&v| transform(config.scale, v))
        .collect();

    let (lo, hi) = match config.range {
        Some((lo, hi)) => (
            transform(config.scale, lo).unwrap_or(f64::MIN),
            transform(config.scale, hi).unwrap_or(f64::MAX),
        ),
        None => values
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            }),
    };
    let span = if hi > lo { hi - lo } else { 1.0 };

    let up = config.upscale.max(1);
    let width = u32::try_from(map.width)? * up;
    let height = u32::try_from(map.height)? * up;
    let img = GrayImage::from_fn(width, height, |x, y| {
        let i = (x / up) as usize;
        let j = map.height - 1 - (y / up) as usize;
        let level = values[j * map.width + i].map_or(0u8, |v| {
            (1.0 + 254.0 * ((v - lo) / span).clamp(0.0, 1.0)).round() as u8
        });
        Luma([level])
    });

    let path = path.as_ref();
    img.save(path)?;
    info!("Wrote {}x{} map to {}.", width, height, path.display());
    Ok(())
}
