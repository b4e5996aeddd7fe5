//! Static and animated 3D rendering of the two energy sheets.
//!
//! Each sheet is tessellated into one quadrilateral per polar grid cell. The
//! chart axes are (x, energy, y) with energy vertical. Faces of both sheets
//! are drawn in one pass, ordered back-to-front for the current camera so
//! that the sheets occlude each other correctly.

use crate::config::{AnimationOptions, PlotOptions};
use crate::surface::SurfaceGrid;
use log::{debug, info};
use plotters::coord::ranged3d::{ProjectionMatrix, ProjectionMatrixBuilder};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;
use thiserror::Error;

/// Error type for rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The surface has too few samples to form a face
    #[error("Empty surface: {0}")]
    EmptySurface(String),
    /// Backend, font or encoder failure
    #[error("Drawing error: {0}")]
    Drawing(String),
}

impl From<Box<dyn Error>> for RenderError {
    fn from(e: Box<dyn Error>) -> Self {
        RenderError::Drawing(e.to_string())
    }
}

/// Which energy sheet a face belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sheet {
    /// E_upper
    Upper,
    /// E_lower
    Lower,
}

/// One quadrilateral in chart coordinates `(x, energy, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Owning sheet
    pub sheet: Sheet,
    /// Corners in drawing order
    pub vertices: [(f64, f64, f64); 4],
    /// Mean energy of the corners
    pub energy: f64,
}

impl Face {
    fn centroid(&self) -> (f64, f64, f64) {
        let mut c = (0.0, 0.0, 0.0);
        for v in &self.vertices {
            c.0 += v.0 / 4.0;
            c.1 += v.1 / 4.0;
            c.2 += v.2 / 4.0;
        }
        c
    }
}

/// Axis ranges of the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBounds {
    /// x range
    pub x: (f64, f64),
    /// y range
    pub y: (f64, f64),
    /// energy range, padded
    pub energy: (f64, f64),
}

impl SceneBounds {
    /// Bounds enclosing both sheets; a flat energy range is widened.
    pub fn of(surface: &SurfaceGrid) -> Self {
        let (lo, hi) = surface.energy_range();
        let pad = if hi > lo { 0.05 * (hi - lo) } else { 1.0 };
        Self {
            x: widen(surface.x.min(), surface.x.max()),
            y: widen(surface.y.min(), surface.y.max()),
            energy: (lo - pad, hi + pad),
        }
    }

    fn normalize(&self, p: (f64, f64, f64)) -> (f64, f64, f64) {
        let n = |v: f64, (lo, hi): (f64, f64)| 2.0 * (v - lo) / (hi - lo) - 1.0;
        (n(p.0, self.x), n(p.1, self.energy), n(p.2, self.y))
    }
}

fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

/// Tessellates both sheets into faces, closing the angular seam.
pub fn build_faces(surface: &SurfaceGrid) -> Vec<Face> {
    let (rows, cols) = surface.shape();
    if rows < 2 || cols < 2 {
        return Vec::new();
    }
    let mut faces = Vec::with_capacity(2 * rows * (cols - 1));
    for (sheet, energies) in [(Sheet::Upper, &surface.upper), (Sheet::Lower, &surface.lower)] {
        for j in 0..rows {
            let jn = (j + 1) % rows;
            for i in 0..cols - 1 {
                let corner =
                    |r: usize, c: usize| (surface.x[(r, c)], energies[(r, c)], surface.y[(r, c)]);
                let vertices = [corner(j, i), corner(j, i + 1), corner(jn, i + 1), corner(jn, i)];
                let energy = vertices.iter().map(|v| v.1).sum::<f64>() / 4.0;
                faces.push(Face {
                    sheet,
                    vertices,
                    energy,
                });
            }
        }
    }
    faces
}

/// Unit vector from the scene centre towards the camera.
///
/// Components follow the chart axes `(x, energy, y)`. Azimuth 0 looks along
/// the y axis, matching the yaw applied by [`camera`].
pub fn view_direction(azimuth_deg: f64, elevation_deg: f64) -> (f64, f64, f64) {
    let (az, el) = (azimuth_deg.to_radians(), elevation_deg.to_radians());
    (el.cos() * az.sin(), el.sin(), el.cos() * az.cos())
}

/// Chart projection for a camera at the given azimuth and elevation (degrees).
pub fn camera(mut pb: ProjectionMatrixBuilder, azimuth: f64, elevation: f64) -> ProjectionMatrix {
    pb.yaw = azimuth.to_radians();
    pb.pitch = elevation.to_radians();
    pb.scale = 0.8;
    pb.into_matrix()
}

/// Orders faces so that the farthest from the camera comes first.
pub fn sort_back_to_front(faces: &mut [Face], bounds: &SceneBounds, azimuth: f64, elevation: f64) {
    let eye = view_direction(azimuth, elevation);
    let depth = |f: &Face| {
        let c = bounds.normalize(f.centroid());
        c.0 * eye.0 + c.1 * eye.1 + c.2 * eye.2
    };
    faces.sort_by(|a, b| depth(a).total_cmp(&depth(b)));
}

/// Fill colour of a face: warm tones for the upper sheet, cool for the lower.
pub fn face_color(face: &Face, energy_range: (f64, f64)) -> HSLColor {
    let (lo, hi) = energy_range;
    let t = if hi > lo {
        ((face.energy - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    match face.sheet {
        Sheet::Upper => HSLColor(0.02 + 0.10 * t, 0.85, 0.35 + 0.30 * t),
        Sheet::Lower => HSLColor(0.64 - 0.10 * t, 0.70, 0.28 + 0.35 * t),
    }
}

struct View<'a> {
    azimuth: f64,
    elevation: f64,
    caption: Option<&'a str>,
    unit: &'a str,
    font_scale: f64,
}

fn draw_scene<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    faces: &[Face],
    bounds: &SceneBounds,
    view: &View<'_>,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(root);
    builder.margin((10.0 * view.font_scale) as u32);
    if let Some(caption) = view.caption {
        builder.caption(caption, ("sans-serif", 24.0 * view.font_scale));
    }
    let mut chart = builder.build_cartesian_3d(
        bounds.x.0..bounds.x.1,
        bounds.energy.0..bounds.energy.1,
        bounds.y.0..bounds.y.1,
    )?;
    chart.with_projection(|pb| camera(pb, view.azimuth, view.elevation));

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.1))
        .max_light_lines(3)
        .draw()?;

    chart.draw_series(
        faces
            .iter()
            .map(|f| Polygon::new(f.vertices.to_vec(), face_color(f, bounds.energy).filled())),
    )?;

    let legend_size = (8.0 * view.font_scale) as i32;
    for (sheet, name) in [(Sheet::Upper, "E upper"), (Sheet::Lower, "E lower")] {
        let swatch = Face {
            sheet,
            vertices: [(0.0, 0.0, 0.0); 4],
            energy: bounds.energy.1,
        };
        let color = face_color(&swatch, bounds.energy);
        chart
            .draw_series(std::iter::empty::<Polygon<(f64, f64, f64)>>())?
            .label(format!("{} ({})", name, view.unit))
            .legend(move |(x, y)| {
                Rectangle::new(
                    [(x, y - legend_size), (x + 2 * legend_size, y + legend_size)],
                    color.filled(),
                )
            });
    }
    chart
        .configure_series_labels()
        .label_font(("sans-serif", 14.0 * view.font_scale))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

fn prepare(surface: &SurfaceGrid) -> Result<(Vec<Face>, SceneBounds), RenderError> {
    let faces = build_faces(surface);
    if faces.is_empty() {
        let (rows, cols) = surface.shape();
        return Err(RenderError::EmptySurface(format!(
            "{}x{} grid has no cells to draw",
            rows, cols
        )));
    }
    Ok((faces, SceneBounds::of(surface)))
}

/// Renders both sheets to a PNG file at the configured size and camera.
pub fn render_surface_png(
    surface: &SurfaceGrid,
    plot: &PlotOptions,
    path: &Path,
) -> Result<(), RenderError> {
    let (mut faces, bounds) = prepare(surface)?;
    sort_back_to_front(&mut faces, &bounds, plot.azimuth, plot.elevation);
    let size = plot.pixel_size(plot.dpi);
    let view = View {
        azimuth: plot.azimuth,
        elevation: plot.elevation,
        caption: plot.title.as_deref(),
        unit: surface.unit.label(),
        font_scale: plot.dpi as f64 / 100.0,
    };
    debug!("Rendering {} faces at {}x{} px", faces.len(), size.0, size.1);

    let draw = || -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw_scene(&root, &faces, &bounds, &view)?;
        root.present()?;
        Ok(())
    };
    draw()?;
    info!("Surface plot saved to {}", path.display());
    Ok(())
}

/// Renders a GIF rotating the camera azimuth through a full turn.
pub fn render_rotation_gif(
    surface: &SurfaceGrid,
    plot: &PlotOptions,
    animation: &AnimationOptions,
    path: &Path,
) -> Result<(), RenderError> {
    let (faces, bounds) = prepare(surface)?;
    let size = plot.pixel_size(animation.dpi);
    let azimuths = animation.frame_azimuths();
    info!(
        "Generating {}-frame animation at {} fps...",
        azimuths.len(),
        animation.fps
    );

    let draw = || -> Result<(), Box<dyn Error>> {
        let root = BitMapBackend::gif(path, size, animation.frame_delay_ms())?.into_drawing_area();
        let mut frame_faces = faces.clone();
        for (k, &azimuth) in azimuths.iter().enumerate() {
            sort_back_to_front(&mut frame_faces, &bounds, azimuth, plot.elevation);
            let view = View {
                azimuth,
                elevation: plot.elevation,
                caption: plot.title.as_deref(),
                unit: surface.unit.label(),
                font_scale: animation.dpi as f64 / 100.0,
            };
            draw_scene(&root, &frame_faces, &bounds, &view)?;
            root.present()?;
            debug!("Frame {}/{} (azimuth {:.1})", k + 1, azimuths.len(), azimuth);
        }
        Ok(())
    };
    draw()?;
    info!("Animation saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branching_plane::TopologicalDescriptors;
    use crate::surface::{evaluate, PolarGrid};

    fn cone() -> SurfaceGrid {
        let d = TopologicalDescriptors {
            pitch: 1.0,
            asymmetry: 0.2,
            tilt: 0.3,
            tilt_heading: 0.5,
        };
        let grid = PolarGrid {
            r_max: 1.0,
            n_radial: 4,
            n_angular: 6,
        };
        evaluate(&d, 0.0, &grid).unwrap()
    }

    #[test]
    fn test_face_count_closes_seam() {
        let faces = build_faces(&cone());
        // 6 angular cells (seam closed) x 3 radial cells x 2 sheets
        assert_eq!(faces.len(), 36);
        assert_eq!(faces.iter().filter(|f| f.sheet == Sheet::Upper).count(), 18);
    }

    #[test]
    fn test_top_view_draws_upper_sheet_last() {
        let surface = cone();
        let bounds = SceneBounds::of(&surface);
        let mut faces = build_faces(&surface);
        sort_back_to_front(&mut faces, &bounds, 0.0, 90.0);
        let last = faces.last().unwrap();
        assert_eq!(last.sheet, Sheet::Upper);
        let first = faces.first().unwrap();
        assert_eq!(first.sheet, Sheet::Lower);
    }

    /// Counts (nearer, farther) steps of the chart's own depth along the sorted faces.
    fn chart_depth_steps(azimuth: f64, elevation: f64) -> (usize, usize) {
        let d = TopologicalDescriptors {
            pitch: 1.0,
            asymmetry: 0.3,
            tilt: 0.4,
            tilt_heading: 1.0,
        };
        let grid = PolarGrid {
            r_max: 1.0,
            n_radial: 6,
            n_angular: 12,
        };
        let surface = evaluate(&d, 0.0, &grid).unwrap();
        let bounds = SceneBounds::of(&surface);
        let mut faces = build_faces(&surface);
        sort_back_to_front(&mut faces, &bounds, azimuth, elevation);

        let (w, h) = (400u32, 300u32);
        let mut buffer = vec![0u8; (w * h * 3) as usize];
        let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_3d(
                bounds.x.0..bounds.x.1,
                bounds.energy.0..bounds.energy.1,
                bounds.y.0..bounds.y.1,
            )
            .unwrap();
        chart.with_projection(|pb| camera(pb, azimuth, elevation));
        let coord = chart.as_coord_spec();

        let depths: Vec<i32> = faces
            .iter()
            .map(|f| {
                let c = f.centroid();
                coord.projected_depth(&c.0, &c.1, &c.2)
            })
            .collect();
        let mut steps = (0, 0);
        for pair in depths.windows(2) {
            if pair[1] > pair[0] {
                steps.0 += 1;
            } else if pair[1] < pair[0] {
                steps.1 += 1;
            }
        }
        steps
    }

    #[test]
    fn test_sort_agrees_with_chart_depth() {
        let mut dominant = Vec::new();
        for azimuth in [-133.0, 0.0, 90.0] {
            let (up, down) = chart_depth_steps(azimuth, 28.0);
            let total = up + down;
            assert!(total > 60, "azimuth {}: only {} depth steps", azimuth, total);
            assert!(
                10 * up.min(down) <= total,
                "azimuth {}: {} up / {} down",
                azimuth,
                up,
                down
            );
            dominant.push(down > up);
        }
        assert!(dominant.iter().all(|&d| d == dominant[0]));
    }

    #[test]
    fn test_view_direction_is_unit() {
        let (x, y, z) = view_direction(-133.0, 28.0);
        assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-12);
        assert!(y > 0.0);
    }

    #[test]
    fn test_bounds_widen_flat_energy() {
        let d = TopologicalDescriptors {
            pitch: 0.0,
            asymmetry: 0.0,
            tilt: 0.0,
            tilt_heading: 0.0,
        };
        let surface = evaluate(&d, 2.0, &PolarGrid::default()).unwrap();
        let bounds = SceneBounds::of(&surface);
        assert_eq!(bounds.energy, (1.0, 3.0));
    }

    #[test]
    fn test_colors_distinguish_sheets() {
        let face = |sheet| Face {
            sheet,
            vertices: [(0.0, 0.0, 0.0); 4],
            energy: 0.0,
        };
        let upper = face_color(&face(Sheet::Upper), (-1.0, 1.0));
        let lower = face_color(&face(Sheet::Lower), (-1.0, 1.0));
        assert!(upper.0 < 0.2);
        assert!(lower.0 > 0.5);
    }
}
