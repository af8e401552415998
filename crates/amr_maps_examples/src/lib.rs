#![forbid(unsafe_code)]

mod rendering;
mod tables;

pub use rendering::{init_tracing, render_map_to_png, ColorScale, RenderConfig};
pub use tables::{galaxy_scale, galaxy_table};
