mod common;

use common::synthetic_image::{checkerboard_image, crop, rectangle_scene, strips};
use mosaic_stitch::blend::{BlendMode, ExposureOptions};
use mosaic_stitch::diagnostics::EstimationMethod;
use mosaic_stitch::features::DetectionConfig;
use mosaic_stitch::geometry::{solve_exact, Homography};
use mosaic_stitch::image::{Image, ImageF32};
use mosaic_stitch::pipeline::{PairLink, StitchOptions, Stitcher, Surface};
use mosaic_stitch::types::Correspondence;
use mosaic_stitch::warp::{warp_into, warp_planar, CanvasBounds};
use mosaic_stitch::StitchError;
use nalgebra::Matrix3;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Correspondences for a pure horizontal shift: `(x, y)` in the first image
/// is `(x - dx, y)` in the second.
fn shift_points(dx: f64) -> Vec<Correspondence> {
    [[70.0, 10.0], [95.0, 15.0], [90.0, 85.0], [72.0, 80.0], [81.0, 47.0]]
        .into_iter()
        .map(|p| Correspondence::new(p, [p[0] - dx, p[1]]))
        .collect()
}

fn max_abs_diff(a: &ImageF32, b: &ImageF32) -> f32 {
    assert_eq!((a.w, a.h), (b.w, b.h));
    a.data
        .iter()
        .zip(&b.data)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

#[test]
fn unit_square_maps_to_identity() {
    let square = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let pts: Vec<Correspondence> = square.iter().map(|&p| Correspondence::new(p, p)).collect();
    let h = solve_exact(&pts).expect("unit square is non-degenerate");
    assert!(h.max_abs_diff(&Homography::identity()) < 1e-10);
}

#[test]
fn warped_checkerboard_is_rectified_by_four_points() {
    init_logger();
    let original = checkerboard_image(64, 48, 8);
    let h_true = Homography::from_matrix(Matrix3::new(2.0, 0.0, 3.0, 0.0, 2.0, 4.0, 0.0, 0.0, 1.0))
        .unwrap();
    let warped = warp_planar(&original, &h_true, usize::MAX).unwrap();
    let (ox, oy) = (warped.bounds.x0 as f64, warped.bounds.y0 as f64);

    // four correct correspondences: warped-local pixel -> original pixel
    let inv = h_true.inverse().unwrap();
    let pts: Vec<Correspondence> = [[10.0, 12.0], [110.0, 8.0], [104.0, 86.0], [6.0, 80.0]]
        .into_iter()
        .map(|p| Correspondence::new(p, inv.apply([p[0] + ox, p[1] + oy]).unwrap()))
        .collect();
    let h_back = solve_exact(&pts).unwrap();

    let rectified = warp_into(&warped.image, &h_back, CanvasBounds::of_image(64, 48)).unwrap();
    let mut compared = 0;
    for y in 0..48 {
        for x in 0..64 {
            if !rectified.covered(x, y) {
                continue;
            }
            compared += 1;
            let (got, want) = (rectified.image.get(x, y, 0), original.get(x, y, 0));
            assert!((got - want).abs() < 1e-3, "({x}, {y}): {got} vs {want}");
        }
    }
    assert!(compared >= 60 * 44, "only {compared} pixels rectified");
}

#[test]
fn two_manual_images_reassemble_the_scene() {
    init_logger();
    let scene = rectangle_scene(164, 100, 50, 7);
    let images = strips(&scene, 2, 100, 64);
    let pairs = vec![PairLink::manual(0, 1, shift_points(64.0))];
    let options = StitchOptions::default().with_blend(BlendMode::gradient_domain());

    let out = Stitcher::new(options).stitch(&images, &pairs).unwrap();
    assert_eq!(out.reference, 0);
    assert_eq!(out.order, vec![0, 1]);
    assert_eq!(out.composite.bounds, CanvasBounds::new(0, 0, 164, 100));
    assert_eq!(out.composite.covered_pixels(), 164 * 100);
    assert!(out.homographies[1].max_abs_diff(&Homography::translation(64.0, 0.0)) < 1e-9);
    assert!(max_abs_diff(out.composite.image.plane(0), &scene) < 1e-3);

    let pair = &out.trace.pairs[0];
    assert_eq!(pair.correspondences, 5);
    assert!(pair.outliers.is_empty());
}

#[test]
fn two_band_keeps_single_coverage_pixels_and_bounds_the_overlap() {
    init_logger();
    let scene = rectangle_scene(164, 100, 50, 11);
    let images = strips(&scene, 2, 100, 64);
    let pairs = vec![PairLink::manual(0, 1, shift_points(64.0))];
    let out = Stitcher::new(StitchOptions::default())
        .stitch(&images, &pairs)
        .unwrap();
    let plane = out.composite.image.plane(0);
    let mut overlap_err = 0.0f64;
    for y in 0..100 {
        for x in 0..164 {
            let (got, want) = (plane.get(x, y), scene.get(x, y));
            if (64..100).contains(&x) {
                overlap_err += (got - want).abs() as f64;
                assert!((-0.05..=1.05).contains(&got));
            } else {
                assert!((got - want).abs() < 1e-5, "single-coverage pixel ({x}, {y}) changed");
            }
        }
    }
    assert!(overlap_err / (36.0 * 100.0) < 0.05);
}

#[test]
fn three_image_chain_uses_the_middle_as_reference() {
    init_logger();
    let scene = rectangle_scene(228, 100, 70, 3);
    let images = strips(&scene, 3, 100, 64);
    let pairs = vec![
        PairLink::manual(0, 1, shift_points(64.0)),
        PairLink::manual(1, 2, shift_points(64.0)),
    ];
    let options = StitchOptions::default()
        .with_blend(BlendMode::gradient_domain())
        .with_artifacts(true);

    let out = Stitcher::new(options).stitch(&images, &pairs).unwrap();
    assert_eq!(out.reference, 1);
    assert_eq!(out.order, vec![1, 0, 2]);
    assert_eq!(out.composite.bounds, CanvasBounds::new(-64, 0, 228, 100));
    assert!(out.homographies[0].max_abs_diff(&Homography::translation(-64.0, 0.0)) < 1e-9);
    assert!(out.homographies[2].max_abs_diff(&Homography::translation(64.0, 0.0)) < 1e-9);
    assert!(max_abs_diff(out.composite.image.plane(0), &scene) < 1e-3);

    let artifacts = out.trace.artifacts.as_ref().expect("artifacts requested");
    assert_eq!(artifacts.warped.len(), 3);
    assert_eq!(artifacts.distance_fields.len(), 2);
    assert_eq!(out.trace.blends.len(), 2);
}

#[test]
fn explicit_order_is_followed() {
    let scene = rectangle_scene(228, 100, 70, 5);
    let images = strips(&scene, 3, 100, 64);
    let pairs = vec![
        PairLink::manual(0, 1, shift_points(64.0)),
        PairLink::manual(1, 2, shift_points(64.0)),
    ];
    let out = Stitcher::new(StitchOptions::default().with_order(vec![2, 0]))
        .stitch(&images, &pairs)
        .unwrap();
    assert_eq!(out.order, vec![1, 2, 0]);

    let err = Stitcher::new(StitchOptions::default().with_order(vec![2]))
        .stitch(&images, &pairs)
        .unwrap_err();
    assert!(matches!(err, StitchError::InvalidInput(_)));
}

#[test]
fn reversed_pair_direction_is_inverted_when_chaining() {
    let scene = rectangle_scene(164, 100, 50, 9);
    let images = strips(&scene, 2, 100, 64);
    let reversed: Vec<Correspondence> = shift_points(64.0).iter().map(|c| c.reversed()).collect();
    let pairs = vec![PairLink::manual(1, 0, reversed)];
    let out = Stitcher::new(StitchOptions::default())
        .stitch(&images, &pairs)
        .unwrap();
    assert_eq!(out.reference, 0);
    assert!(out.homographies[1].max_abs_diff(&Homography::translation(64.0, 0.0)) < 1e-9);
}

#[test]
fn exposure_compensation_restores_a_dimmed_image() {
    init_logger();
    let scene = rectangle_scene(164, 100, 50, 13);
    let left = Image::from_plane(crop(&scene, 0, 0, 100, 100));
    let right = Image::from_plane(crop(&scene, 64, 0, 100, 100).map(|v| 0.8 * v));
    let pairs = vec![PairLink::manual(0, 1, shift_points(64.0))];
    let options = StitchOptions::default().with_exposure(ExposureOptions::gain_bias());

    let out = Stitcher::new(options).stitch(&[left, right], &pairs).unwrap();
    let plane = out.composite.image.plane(0);
    for y in 0..100 {
        for x in 100..164 {
            assert!((plane.get(x, y) - scene.get(x, y)).abs() < 1e-3);
        }
    }
    let exposure = out.trace.blends[0].exposure.as_ref().unwrap();
    assert!(exposure.applied);
    assert!((exposure.channels[0].gain - 1.25).abs() < 1e-3);
}

#[test]
fn robust_manual_fit_rejects_a_bad_correspondence() {
    let scene = rectangle_scene(164, 100, 50, 17);
    let images = strips(&scene, 2, 100, 64);
    let mut points = shift_points(64.0);
    points.push(Correspondence::new([80.0, 30.0], [2.0, 90.0]));
    let pairs = vec![PairLink::manual(0, 1, points)];
    let options = StitchOptions::default().with_robust_manual(true);

    let out = Stitcher::new(options).stitch(&images, &pairs).unwrap();
    assert_eq!(out.trace.pairs[0].outliers, vec![5]);
    assert!(out.homographies[1].max_abs_diff(&Homography::translation(64.0, 0.0)) < 1e-6);
}

#[test]
fn detected_features_recover_the_shift() {
    init_logger();
    let scene = rectangle_scene(256, 128, 90, 21);
    let images = strips(&scene, 2, 160, 96);
    let detection = DetectionConfig::new(0.9, 0.8)
        .with_pyramid_levels(3)
        .with_ransac(2000, 1.0);
    let options = StitchOptions::default().with_detection(detection);

    let out = Stitcher::new(options)
        .stitch(&images, &[PairLink::detect(0, 1)])
        .unwrap();
    assert_eq!(out.trace.features.len(), 2);
    let pair = &out.trace.pairs[0];
    assert_eq!(pair.method, EstimationMethod::Ransac);
    assert!(pair.inliers.len() >= 8, "inliers={}", pair.inliers.len());

    let h = &out.homographies[1];
    for p in [[0.0, 0.0], [159.0, 0.0], [159.0, 127.0], [0.0, 127.0]] {
        let q = h.apply(p).unwrap();
        assert!((q[0] - (p[0] + 96.0)).abs() < 0.5 && (q[1] - p[1]).abs() < 0.5);
    }
}

#[test]
fn flat_image_reports_no_features() {
    let flat = Image::from_plane(ImageF32::filled(120, 90, 0.4));
    let options = StitchOptions::default().with_detection(DetectionConfig::new(0.9, 0.7));
    let err = Stitcher::new(options)
        .stitch(&[flat.clone(), flat], &[PairLink::detect(0, 1)])
        .unwrap_err();
    assert!(matches!(err, StitchError::NoFeaturesFound { .. }));
}

#[test]
fn detect_pair_without_config_is_rejected() {
    let flat = Image::from_plane(ImageF32::filled(40, 30, 0.4));
    let err = Stitcher::new(StitchOptions::default())
        .stitch(&[flat.clone(), flat], &[PairLink::detect(0, 1)])
        .unwrap_err();
    assert!(matches!(err, StitchError::InvalidInput(_)));
}

#[test]
fn disconnected_pair_graph_is_insufficient() {
    let scene = rectangle_scene(228, 100, 70, 19);
    let images = strips(&scene, 3, 100, 64);
    let pairs = vec![PairLink::manual(0, 1, shift_points(64.0))];
    let err = Stitcher::new(StitchOptions::default())
        .stitch(&images, &pairs)
        .unwrap_err();
    assert!(matches!(err, StitchError::InsufficientData { needed: 3, got: 2, .. }));
}

#[test]
fn flat_images_on_a_cylinder_have_no_features() {
    init_logger();
    let flat = Image::from_plane(ImageF32::filled(400, 240, 0.6));
    let detection = DetectionConfig::new(0.9, 0.8)
        .with_pyramid_levels(3)
        .with_ransac(500, 1.0);
    let options = StitchOptions::default()
        .with_surface(Surface::Cylindrical { focal_px: 200.0 })
        .with_detection(detection);
    let err = Stitcher::new(options)
        .stitch(&[flat.clone(), flat], &[PairLink::detect(0, 1)])
        .unwrap_err();
    assert!(matches!(err, StitchError::NoFeaturesFound { levels: 3, .. }), "{err:?}");
}

#[test]
fn corners_only_near_the_border_report_no_features() {
    let img = Image::from_plane(ImageF32::from_fn(60, 60, |x, y| {
        if (3..10).contains(&x) && (3..10).contains(&y) {
            0.0
        } else {
            0.6
        }
    }));
    let detection = DetectionConfig::new(0.9, 0.8).with_pyramid_levels(1);
    let err = Stitcher::new(StitchOptions::default().with_detection(detection))
        .stitch(&[img.clone(), img], &[PairLink::detect(0, 1)])
        .unwrap_err();
    assert!(matches!(err, StitchError::NoFeaturesFound { levels: 1, .. }), "{err:?}");
}

#[test]
fn cylindrical_surface_aligns_by_translation() {
    init_logger();
    let scene = rectangle_scene(164, 100, 50, 23);
    let images = strips(&scene, 2, 100, 64);
    let pairs = vec![PairLink::manual(0, 1, shift_points(64.0))];
    let options = StitchOptions::default().with_surface(Surface::Cylindrical { focal_px: 400.0 });

    let out = Stitcher::new(options).stitch(&images, &pairs).unwrap();
    let m = out.homographies[1].to_rows();
    assert_eq!((m[0][0], m[1][1], m[2][2]), (1.0, 1.0, 1.0));
    assert_eq!((m[0][1], m[1][0], m[2][0], m[2][1]), (0.0, 0.0, 0.0, 0.0));
    assert!(m[0][2] > 55.0 && m[0][2] < 64.0, "tx={}", m[0][2]);
    assert_eq!(out.trace.surface, "cylindrical");
    assert!(out.composite.bounds.width > 150);
}

#[test]
fn mismatched_channel_counts_are_rejected() {
    let gray = Image::from_plane(ImageF32::filled(20, 20, 0.5));
    let rgb = Image::new(20, 20, 3);
    let pairs = vec![PairLink::manual(0, 1, shift_points(0.0))];
    let err = Stitcher::new(StitchOptions::default())
        .stitch(&[gray, rgb], &pairs)
        .unwrap_err();
    assert!(matches!(err, StitchError::InvalidInput(_)));
}
