//! # 能带与态密度图
//!
//! 使用 `plotters` 绘制左侧能带、右侧态密度的组合图。
//! 输出格式由扩展名决定：`.svg` 为矢量图，`.png` 为位图。
//!
//! ## 依赖关系
//! - 被 `bands/extractor.rs` 调用
//! - 使用 `models/results.rs` 的 BandsResults，`bands/labels.rs` 的 plain_label
//! - 使用 `plotters` 渲染图表

use crate::bands::labels::plain_label;
use crate::error::{BandsError, Result};
use crate::models::BandsResults;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 700;

/// 能带区占整图宽度的比例 (分子/分母)
const BANDS_SHARE: (u32, u32) = (3, 4);

/// 能量窗口两端留白 (eV)
const ENERGY_PAD: f64 = 0.5;

const SPIN_COLORS: [RGBColor; 2] = [RGBColor(0, 102, 204), RGBColor(204, 51, 51)];

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlotFormat {
    Png,
    Svg,
}

fn plot_format(path: &Path) -> Result<PlotFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => Ok(PlotFormat::Png),
        Some("svg") => Ok(PlotFormat::Svg),
        _ => Err(BandsError::InvalidValue {
            option: "plot".to_string(),
            value: path.display().to_string(),
            reason: "plot file must end in .png or .svg".to_string(),
        }),
    }
}

/// 纵轴能量窗口
fn energy_window(results: &BandsResults) -> (f64, f64) {
    match results.energy_range() {
        Some((lo, hi)) if hi > lo => (lo - ENERGY_PAD, hi + ENERGY_PAD),
        Some((e, _)) => (e - 1.0, e + 1.0),
        None => (-5.0, 5.0),
    }
}

/// 态密度横轴范围，自旋向下在负半轴
fn density_window(results: &BandsResults) -> (f64, f64) {
    let up = results.dos_max[0].max(0.0);
    let down = results.dos_max[1].max(0.0);
    let span = up.max(down).max(1e-6) * 1.05;
    (-span, span)
}

/// 生成能带 + 态密度图
pub fn generate_bands_plot(results: &BandsResults, output_path: &Path) -> Result<()> {
    match plot_format(output_path)? {
        PlotFormat::Svg => {
            let root = SVGBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
            draw_bands_chart(&root, results)?;
            root.present()
                .map_err(|e| BandsError::Plot(e.to_string()))?;
        }
        PlotFormat::Png => {
            let root = BitMapBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
            draw_bands_chart(&root, results)?;
            root.present()
                .map_err(|e| BandsError::Plot(e.to_string()))?;
        }
    }
    Ok(())
}

fn draw_bands_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    results: &BandsResults,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    let title = results.name.replace("\\%", "%");
    let root = root
        .titled(&title, ("sans-serif", 26).into_font())
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    let (width, _) = root.dim_in_pixel();
    let split = width * BANDS_SHARE.0 / BANDS_SHARE.1;
    let (left, right) = root.split_horizontally(split);

    let (e_min, e_max) = energy_window(results);
    draw_band_panel(&left, results, e_min, e_max)?;
    draw_dos_panel(&right, results, e_min, e_max)?;

    Ok(())
}

/// 左侧：各自旋的能带、高对称点竖线与费米能级
fn draw_band_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    results: &BandsResults,
    e_min: f64,
    e_max: f64,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let x_min = results.xcoords.first().copied().unwrap_or(0.0);
    let mut x_max = results.xcoords.last().copied().unwrap_or(1.0);
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, e_min..e_max)
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(0)
        .y_desc("E - E_F (eV)")
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    for (spin, e_kn) in results.energies.iter().enumerate() {
        let color = SPIN_COLORS[spin.min(1)];
        for band in 1..results.band_count() {
            chart
                .draw_series(LineSeries::new(
                    e_kn.iter().map(|row| (row[0], row[band])),
                    color.stroke_width(2),
                ))
                .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;
        }
    }

    let guide = RGBColor(120, 120, 120);
    for &x in &results.label_xcoords {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, e_min), (x, e_max)],
                guide.stroke_width(1),
            )))
            .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;
    }

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x_min, 0.0), (x_max, 0.0)],
            guide.mix(0.6).stroke_width(1),
        )))
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    // 高对称点标签画在横轴下方
    let label_style = ("sans-serif", 18)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (&x, label) in results.label_xcoords.iter().zip(&results.x_labels) {
        let (px, py) = chart.backend_coord(&(x, e_min));
        area.draw(&Text::new(plain_label(label), (px, py + 8), label_style.clone()))
            .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;
    }

    Ok(())
}

/// 右侧：自旋向上在正半轴，自旋向下在负半轴
fn draw_dos_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    results: &BandsResults,
    e_min: f64,
    e_max: f64,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (d_min, d_max) = density_window(results);

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(10)
        .build_cartesian_2d(d_min..d_max, e_min..e_max)
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_labels(3)
        .x_desc("DOS")
        .x_label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    for (spin, channel) in results.dos.iter().enumerate() {
        let color = SPIN_COLORS[spin.min(1)];
        chart
            .draw_series(LineSeries::new(
                channel
                    .iter()
                    .filter(|[e, _]| *e >= e_min && *e <= e_max)
                    .map(|&[e, d]| (d, e)),
                color.stroke_width(2),
            ))
            .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;
    }

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(d_min, 0.0), (d_max, 0.0)],
            RGBColor(120, 120, 120).mix(0.6).stroke_width(1),
        )))
        .map_err(|e| BandsError::Plot(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> BandsResults {
        BandsResults {
            name: "Si\\%".to_string(),
            energies: vec![vec![vec![0.0, -2.0, 1.0], vec![1.0, -1.0, 3.0]]],
            xcoords: vec![0.0, 1.0],
            label_xcoords: vec![0.0, 1.0],
            x_labels: vec![r"$\Gamma$".to_string(), "X".to_string()],
            energies_dim: [1, 2, 3],
            dos: vec![vec![[-1.0, 0.5], [0.0, 2.0]], vec![[-1.0, -0.5], [0.0, -2.0]]],
            dos_max: [2.0, 0.5],
        }
    }

    #[test]
    fn test_plot_format_from_extension() {
        assert_eq!(plot_format(Path::new("a.svg")).unwrap(), PlotFormat::Svg);
        assert_eq!(plot_format(Path::new("out/b.PNG")).unwrap(), PlotFormat::Png);
        let err = plot_format(Path::new("c.pdf")).unwrap_err();
        assert!(matches!(err, BandsError::InvalidValue { .. }));
        assert!(plot_format(Path::new("noext")).is_err());
    }

    #[test]
    fn test_windows() {
        let r = results();
        assert_eq!(energy_window(&r), (-2.5, 3.5));
        let (lo, hi) = density_window(&r);
        assert_eq!(lo, -hi);
        assert!((hi - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_windows_for_flat_results() {
        let mut r = results();
        r.energies = vec![vec![vec![0.0, 0.5], vec![1.0, 0.5]]];
        r.energies_dim = [1, 2, 2];
        assert_eq!(energy_window(&r), (-0.5, 1.5));

        r.energies = vec![vec![vec![0.0], vec![1.0]]];
        r.energies_dim = [1, 2, 1];
        assert_eq!(energy_window(&r), (-5.0, 5.0));
    }

    #[test]
    fn test_bad_extension_fails_before_drawing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bands.jpeg");
        assert!(generate_bands_plot(&results(), &path).is_err());
        assert!(!path.exists());
    }
}
