use mosaic_stitch::config::stitch::{self, StitchToolConfig};
use mosaic_stitch::image::io::{load_image, save_image, save_plane, write_json_file};
use mosaic_stitch::image::Image;
use mosaic_stitch::pipeline::{StitchOutput, Stitcher, Surface};
use mosaic_stitch::warp::focal_length_px;
use std::env;
use std::path::{Path, PathBuf};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn usage(program: &str) -> String {
    format!("Usage: {program} <config.json>")
}

fn run() -> Result<(), String> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "stitch_demo".to_string());
    let config_path = args.next().map(PathBuf::from).ok_or_else(|| usage(&program))?;
    let config = stitch::load_config(&config_path)?;

    let images = config
        .inputs
        .iter()
        .map(|p| load_image(p))
        .collect::<Result<Vec<Image>, String>>()?;
    let options = resolve_options(&config, &images)?;

    let output = Stitcher::new(options)
        .stitch(&images, &config.pairs)
        .map_err(|e| format!("Stitching failed: {e}"))?;

    print_summary(&output);
    save_image(&output.composite.image, &config.output.composite)?;
    println!("Composite written to {}", config.output.composite.display());

    if let Some(path) = &config.output.report_json {
        write_json_file(path, &output.trace)?;
        println!("JSON report written to {}", path.display());
    }
    if let Some(dir) = &config.output.artifacts_dir {
        save_artifacts(dir, &output)?;
        println!("Artifacts written to {}", dir.display());
    }
    Ok(())
}

fn resolve_options(
    config: &StitchToolConfig,
    images: &[Image],
) -> Result<mosaic_stitch::pipeline::StitchOptions, String> {
    let mut options = config.options.clone();
    if let Some(camera) = config.camera {
        let width = images.first().map(Image::width).unwrap_or(0);
        let focal_px = focal_length_px(camera.focal_mm, camera.sensor_width_mm, width)
            .map_err(|e| format!("Invalid camera parameters: {e}"))?;
        options.surface = Surface::Cylindrical { focal_px };
    }
    if config.output.artifacts_dir.is_some() {
        options.keep_artifacts = true;
    }
    Ok(options)
}

fn print_summary(output: &StitchOutput) {
    let c = &output.composite;
    println!("Stitch summary");
    println!("  reference: {}", output.reference);
    println!("  order: {:?}", output.order);
    println!(
        "  canvas: origin=({}, {}) size={}x{} covered={}",
        c.bounds.x0,
        c.bounds.y0,
        c.bounds.width,
        c.bounds.height,
        c.covered_pixels()
    );
    for pair in &output.trace.pairs {
        println!(
            "  pair {}->{}: {:?} inliers={}/{} elapsed_ms={:.3}",
            pair.first,
            pair.second,
            pair.method,
            pair.inliers.len(),
            pair.correspondences,
            pair.elapsed_ms
        );
    }
    for f in &output.trace.features {
        println!(
            "  features[{}]: candidates={} anms={} described={} dropped_at_border={}",
            f.image, f.candidates, f.after_anms, f.described, f.dropped_at_border
        );
    }
    println!("  total_ms: {:.3}", output.trace.timings.total_ms);
}

fn save_artifacts(dir: &Path, output: &StitchOutput) -> Result<(), String> {
    let Some(artifacts) = &output.trace.artifacts else {
        return Ok(());
    };
    for (step, layer) in artifacts.warped.iter().enumerate() {
        let image = output.order.get(step).copied().unwrap_or(step);
        save_image(&layer.image, &dir.join(format!("warped_{step}_img{image}.png")))?;
    }
    for (step, (base, incoming)) in artifacts.distance_fields.iter().enumerate() {
        let scale = 1.0 / max_value(base).max(max_value(incoming)).max(1.0);
        save_plane(base, scale, &dir.join(format!("distance_{}_composite.png", step + 1)))?;
        save_plane(incoming, scale, &dir.join(format!("distance_{}_incoming.png", step + 1)))?;
    }
    Ok(())
}

fn max_value(plane: &mosaic_stitch::image::ImageF32) -> f32 {
    plane.data.iter().copied().fold(0.0, f32::max)
}
