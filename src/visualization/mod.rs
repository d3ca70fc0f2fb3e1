//! 3D surface rendering of height fields.
//!
//! Builds a physical-unit coordinate grid from pixel indices and the run's
//! scale factor, then renders the field as a height-colored surface with a
//! colorbar using the plotters library.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::colors::colormaps::{Bone, ColorMap, Copper, ViridisRGB};
use plotters::style::FontStyle;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::RenderConfig;
use crate::core::loaders::HeightField;
use crate::core::transforms::physical_axis;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Plotting error: {0}")]
    Plotting(String),

    #[error("Empty height field")]
    EmptySurface,
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Suffix appended to the input stem for rendered images.
const IMAGE_SUFFIX: &str = "_3D";
/// Headroom factor above the tallest sample on the vertical axis.
const Z_HEADROOM: f64 = 1.1;
/// Number of gradient bands in the manually drawn colorbar.
const COLORBAR_STEPS: usize = 256;
/// Share of the image width reserved for the colorbar.
const COLORBAR_FRACTION: f64 = 0.14;

/// Where the rendered image for `input` lands inside `image_dir`:
/// `<input-stem>_3D.<ext>`.
pub fn output_image_path(input: &Path, image_dir: &Path, ext: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scan".to_string());
    image_dir.join(format!("{stem}{IMAGE_SUFFIX}.{ext}"))
}

/// Map a normalized height (0..1) through the configured colormap.
fn colormap_color(name: &str, t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    match name {
        "copper" => Copper.get_color(t),
        "bone" => Bone.get_color(t),
        _ => ViridisRGB.get_color(t),
    }
}

/// Render a normalized height field as a 3D surface image.
///
/// Row indices map to one lateral axis and column indices to the other, both
/// scaled by `nm_per_pixel`; the vertical axis is capped at 1.1x the field
/// maximum for visual headroom. The bitmap backend is presented and dropped
/// before returning, so peak memory stays flat across a large batch.
///
/// # Errors
///
/// Returns [`RenderError::EmptySurface`] for a zero-sized field, or
/// [`RenderError::Plotting`] if the backend fails.
pub fn render_surface(
    output_path: &Path,
    field: &HeightField,
    nm_per_pixel: f64,
    cfg: &RenderConfig,
) -> Result<()> {
    if field.is_empty() {
        return Err(RenderError::EmptySurface);
    }

    let rows = field.rows();
    let cols = field.cols();
    let xs = physical_axis(cols, nm_per_pixel);
    let ys = physical_axis(rows, nm_per_pixel);

    let height_max = field.max();
    let color_max = if height_max > 0.0 { height_max } else { 1.0 };
    let z_cap = Z_HEADROOM * color_max;

    // Single-pixel axes still need a nonzero span to build a chart.
    let x_max = xs.last().copied().unwrap_or(0.0).max(nm_per_pixel);
    let y_max = ys.last().copied().unwrap_or(0.0).max(nm_per_pixel);

    let root =
        BitMapBackend::new(output_path, (cfg.width_px, cfg.height_px)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    let bar_width = (cfg.width_px as f64 * COLORBAR_FRACTION) as i32;
    let (surface_area, bar_area) = root.split_horizontally(cfg.width_px as i32 - bar_width);

    let caption_size = (cfg.height_px / 24).max(20) as i32;
    let caption_font = ("sans-serif", caption_size)
        .into_font()
        .style(FontStyle::Bold);
    let mut chart = ChartBuilder::on(&surface_area)
        .caption(&cfg.title, caption_font)
        .margin(caption_size / 2)
        .build_cartesian_3d(0.0..x_max, 0.0..z_cap, 0.0..y_max)
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    let pitch = cfg.elevation_deg.to_radians();
    let yaw = cfg.azimuth_deg.to_radians();
    chart.with_projection(|mut pb| {
        pb.pitch = pitch;
        pb.yaw = yaw;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.1))
        .max_light_lines(4)
        .x_formatter(&|x| format!("{x:.0} nm"))
        .y_formatter(&|y| format!("{y:.1} nm"))
        .z_formatter(&|z| format!("{z:.0} nm"))
        .draw()
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    chart
        .draw_series(
            SurfaceSeries::xoz(xs.iter().copied(), ys.iter().copied(), |x, z| {
                let c = ((x / nm_per_pixel).round() as usize).min(cols - 1);
                let r = ((z / nm_per_pixel).round() as usize).min(rows - 1);
                field.get(r, c)
            })
            .style_func(&|&h| colormap_color(&cfg.colormap, h / color_max).filled()),
        )
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    draw_colorbar(&bar_area, color_max, &cfg.colormap)?;

    // present() flushes the bitmap; dropping the drawing area at scope end
    // releases the backend before the next file is processed.
    root.present()
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    Ok(())
}

/// Vertical height-to-color legend beside the surface plot.
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    color_max: f64,
    colormap: &str,
) -> Result<()> {
    let (area_width, area_height) = area.dim_in_pixel();
    // The strip is narrow; margins and the label gutter must both fit it.
    let margin = (area_height / 8).min(area_width / 8).max(4) as i32;

    let mut chart = ChartBuilder::on(area)
        .margin(margin)
        .y_label_area_size((area_width / 2) as i32)
        .build_cartesian_2d(0.0..1.0, 0.0..color_max)
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("Height (nm)")
        .y_labels(6)
        .draw()
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    chart
        .draw_series((0..COLORBAR_STEPS).map(|i| {
            let lo = color_max * i as f64 / COLORBAR_STEPS as f64;
            let hi = color_max * (i + 1) as f64 / COLORBAR_STEPS as f64;
            let mid = 0.5 * (lo + hi) / color_max;
            Rectangle::new(
                [(0.0, lo), (1.0, hi)],
                colormap_color(colormap, mid).filled(),
            )
        }))
        .map_err(|e| RenderError::Plotting(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use tempfile::TempDir;

    fn small_render_config() -> RenderConfig {
        RenderConfig {
            width_px: 400,
            height_px: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_output_image_path_naming() {
        let path = output_image_path(
            Path::new("/data/scans/sample01.spm"),
            Path::new("/data/renders"),
            "png",
        );
        assert_eq!(path, Path::new("/data/renders/sample01_3D.png"));
    }

    #[test]
    fn test_output_image_path_replaces_extension_only() {
        let path = output_image_path(
            Path::new("deep/nested/scan.004"),
            Path::new("out"),
            "png",
        );
        assert_eq!(path, Path::new("out/scan_3D.png"));
    }

    #[test]
    fn test_colormap_endpoints_differ() {
        for name in crate::config::COLORMAPS {
            let low = colormap_color(name, 0.0);
            let high = colormap_color(name, 1.0);
            assert_ne!(low, high, "colormap {name} is degenerate");
        }
    }

    #[test]
    fn test_render_writes_image() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("field_3D.png");
        let field =
            HeightField::from_rows(2, 2, vec![0.0, 2.0, 4.0, 6.0]).unwrap();

        render_surface(&output, &field, 1.0, &small_render_config()).unwrap();

        let metadata = std::fs::metadata(&output).unwrap();
        assert!(metadata.len() > 0);
    }

    #[test]
    fn test_render_flat_field() {
        // A constant field must not divide by a zero color range.
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("flat_3D.png");
        let field = HeightField::from_rows(3, 3, vec![0.0; 9]).unwrap();

        render_surface(&output, &field, 2.0, &small_render_config()).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_render_empty_field_errors() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("empty_3D.png");
        let field = HeightField::from_rows(0, 0, Vec::new()).unwrap();

        match render_surface(&output, &field, 1.0, &small_render_config()) {
            Err(RenderError::EmptySurface) => {}
            other => panic!("expected EmptySurface, got {other:?}"),
        }
    }
}
