//! Report generation tools
//!
//! Render the weekly calorie series (actual vs target) as a PNG chart.

use std::path::Path;

use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde::Serialize;

use crate::db::Database;
use crate::nutrition::{weekly_series, WeeklyChartData};
use super::date_or_today;

// ============================================================================
// Chart Constants
// ============================================================================

pub const DEFAULT_CHART_WIDTH: u32 = 1000;
pub const DEFAULT_CHART_HEIGHT: u32 = 500;

/// Calorie axis is rounded up to a multiple of this
const CALORIE_AXIS_STEP: f64 = 500.0;
/// Headroom above the tallest bar or target
const CALORIE_AXIS_HEADROOM: f64 = 1.15;
/// Bar width as a fraction of a day slot
const BAR_WIDTH: f64 = 0.7;

const COLOR_ACTUAL: (u8, u8, u8) = (66, 133, 244);    // Blue bars
const COLOR_TARGET: (u8, u8, u8) = (220, 53, 69);     // Red target line

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct GenerateChartResponse {
    pub success: bool,
    pub file_path: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_with_meals: usize,
    pub target_calories: i64,
    pub message: String,
}

// ============================================================================
// Chart Generation (plotters)
// ============================================================================

/// Upper bound of the calorie axis
pub fn calorie_axis_max(chart: &WeeklyChartData) -> f64 {
    let peak = chart
        .calories
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .max(chart.target_calories) as f64;

    ((peak * CALORIE_AXIS_HEADROOM) / CALORIE_AXIS_STEP).ceil().max(1.0) * CALORIE_AXIS_STEP
}

/// "10/18" style label for a "2026-10-18" date
fn short_date(date: &str) -> String {
    date.split('-').skip(1).collect::<Vec<_>>().join("/")
}

/// Generate the weekly calorie chart as PNG bytes
pub fn generate_weekly_chart(chart: &WeeklyChartData, width: u32, height: u32) -> Result<Vec<u8>, String> {
    use plotters::prelude::*;

    let days = chart.dates.len();
    if days == 0 {
        return Err("No data to chart".to_string());
    }

    let actual_color = RGBColor(COLOR_ACTUAL.0, COLOR_ACTUAL.1, COLOR_ACTUAL.2);
    let target_color = RGBColor(COLOR_TARGET.0, COLOR_TARGET.1, COLOR_TARGET.2);

    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(|e| e.to_string())?;

        // Days sit on integer x positions, bars centered on them
        let x_range = -0.5..(days as f64 - 0.5);
        let y_max = calorie_axis_max(chart);

        let mut ctx = ChartBuilder::on(&root)
            .caption("Calories: actual vs target", ("sans-serif", 22))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, 0.0..y_max)
            .map_err(|e| e.to_string())?;

        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(days)
            .x_label_formatter(&|x| {
                let idx = x.round();
                if (x - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < days {
                    short_date(&chart.dates[idx as usize])
                } else {
                    String::new()
                }
            })
            .y_desc("kcal")
            .draw()
            .map_err(|e| e.to_string())?;

        ctx.draw_series(chart.calories.iter().enumerate().map(|(i, kcal)| {
            let center = i as f64;
            Rectangle::new(
                [(center - BAR_WIDTH / 2.0, 0.0), (center + BAR_WIDTH / 2.0, *kcal as f64)],
                actual_color.filled(),
            )
        }))
        .map_err(|e| e.to_string())?
        .label("Actual")
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], actual_color.filled()));

        let target = chart.target_calories as f64;
        ctx.draw_series(LineSeries::new(
            vec![(-0.5, target), (days as f64 - 0.5, target)],
            target_color.stroke_width(2),
        ))
        .map_err(|e| e.to_string())?
        .label(format!("Target ({} kcal)", chart.target_calories))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], target_color.stroke_width(2)));

        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| e.to_string())?;

        root.present().map_err(|e| e.to_string())?;
    }

    // Convert RGB buffer to PNG
    let img = RgbImage::from_raw(width, height, buffer)
        .ok_or("Failed to create image from buffer")?;

    let mut png_bytes = Vec::new();
    let dyn_img = DynamicImage::ImageRgb8(img);
    dyn_img.write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| e.to_string())?;

    Ok(png_bytes)
}

// ============================================================================
// Weekly Chart Report
// ============================================================================

/// Render the seven days ending `today` to a PNG file
pub fn generate_weekly_chart_report(
    db: &Database,
    user_id: i64,
    today: Option<&str>,
    output_path: &str,
) -> Result<GenerateChartResponse, String> {
    if !output_path.to_lowercase().ends_with(".png") {
        return Err("output_path must end with .png".to_string());
    }

    let today = date_or_today(today)?;

    let series = {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        weekly_series(&*conn, user_id, today)
            .map_err(|e| format!("Failed to build weekly series: {}", e))?
    };

    let chart = series.chart_data();
    let png_bytes = generate_weekly_chart(&chart, DEFAULT_CHART_WIDTH, DEFAULT_CHART_HEIGHT)?;

    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    std::fs::write(path, &png_bytes).map_err(|e| e.to_string())?;

    let days_with_meals = series.days.iter().filter(|d| !d.nutrition.is_zero()).count();
    tracing::info!(user_id, path = output_path, "Wrote weekly chart");

    Ok(GenerateChartResponse {
        success: true,
        file_path: output_path.to_string(),
        start_date: series.start(),
        end_date: series.end(),
        days_with_meals,
        target_calories: series.targets.calories,
        message: format!(
            "Weekly chart generated with {} of {} days logged",
            days_with_meals,
            series.days.len()
        ),
    })
}
