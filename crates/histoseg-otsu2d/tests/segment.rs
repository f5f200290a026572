use histoseg_core::{GrayImage, GridError};
use histoseg_otsu2d::{
    DecisionRule, Histogram2DBuilder, Otsu2dError, Otsu2dParams, Otsu2dSegmenter, Quality,
};

/// Dark disk on a bright background with deterministic texture.
fn disk_image(size: usize) -> GrayImage {
    let c = size as f64 / 2.0;
    let r = size as f64 / 4.0;
    GrayImage::from_fn(size, size, |x, y| {
        let dx = x as f64 - c;
        let dy = y as f64 - c;
        let texture = ((x * 7 + y * 13) % 11) as u8;
        if dx * dx + dy * dy < r * r {
            30 + texture
        } else {
            200 + texture
        }
    })
}

/// 3×3 box mean, standing in for the external neighborhood filter.
fn box_mean(img: &GrayImage) -> GrayImage {
    GrayImage::from_fn(img.width, img.height, |x, y| {
        let mut sum = 0u32;
        let mut n = 0u32;
        for yy in y.saturating_sub(1)..=(y + 1).min(img.height - 1) {
            for xx in x.saturating_sub(1)..=(x + 1).min(img.width - 1) {
                sum += img.get(xx, yy) as u32;
                n += 1;
            }
        }
        (sum / n) as u8
    })
}

#[test]
fn segments_disk_from_background() {
    let img = disk_image(64);
    let feature = box_mean(&img);
    let params = Otsu2dParams {
        quality: Quality::Best,
        smoothing_sigma: 0.0,
        ..Otsu2dParams::default()
    };
    let res = Otsu2dSegmenter::new(params)
        .expect("params")
        .segment(&img.view(), &feature.view())
        .expect("segment");

    assert!(!res.fallback);
    assert!(res.mask.is_binary());
    assert_eq!(res.mask.get(32, 32), 0, "disk center is dark");
    assert_eq!(res.mask.get(2, 2), 255, "corner is bright");
    assert!(res.threshold_intensity[0] > 35.0 && res.threshold_intensity[0] < 200.0);
    assert!(!res.histogram_flags.smoothed && res.histogram_flags.normalized);
    assert!(res.global.is_some());
}

#[test]
fn vanishing_sigma_matches_unsmoothed_run() {
    let img = disk_image(32);
    let feature = box_mean(&img);
    let run = |sigma: f64| {
        let params = Otsu2dParams {
            smoothing_sigma: sigma,
            ..Otsu2dParams::default()
        };
        params.validate().expect("valid sigma");
        Otsu2dSegmenter::new(params)
            .expect("params")
            .segment(&img.view(), &feature.view())
            .expect("segment")
    };
    let tiny = run(1e-200);
    let plain = run(0.0);
    assert!(tiny.histogram_flags.smoothed);
    assert_eq!(tiny.threshold, plain.threshold);
    assert_eq!(tiny.mask, plain.mask);
}

#[test]
fn raw_histogram_mass_equals_pixel_count() {
    let img = disk_image(40);
    let feature = box_mean(&img);
    for bins in [8usize, 16, 100, 256] {
        let hist = Histogram2DBuilder::new(bins)
            .pixel_weight_factor(0.25)
            .build(&img.view(), &feature.view())
            .expect("histogram");
        assert_eq!(hist.total(), (40 * 40) as f64);

        let normalized = Histogram2DBuilder::new(bins)
            .pixel_weight_factor(0.25)
            .smoothing_sigma(2.0)
            .log_scale(true)
            .normalize(true)
            .build(&img.view(), &feature.view())
            .expect("histogram");
        assert!((normalized.total() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn repeated_runs_are_identical() {
    let img = disk_image(48);
    let feature = box_mean(&img);
    let seg = Otsu2dSegmenter::new(Otsu2dParams::default()).expect("params");
    let a = seg.segment(&img.view(), &feature.view()).expect("segment");
    let b = seg.segment(&img.view(), &feature.view()).expect("segment");
    assert_eq!(a.mask, b.mask);
    assert_eq!(a.threshold, b.threshold);
}

#[test]
fn either_axis_marks_at_least_as_much_foreground() {
    let img = disk_image(48);
    let feature = box_mean(&img);
    let both = Otsu2dSegmenter::new(Otsu2dParams::default())
        .expect("params")
        .segment(&img.view(), &feature.view())
        .expect("segment");
    let either = Otsu2dSegmenter::new(Otsu2dParams {
        decision_rule: DecisionRule::EitherAxis,
        ..Otsu2dParams::default()
    })
    .expect("params")
    .segment(&img.view(), &feature.view())
    .expect("segment");

    assert_eq!(both.threshold, either.threshold);
    assert!(either.mask.count_nonzero() >= both.mask.count_nonzero());
    for (b, e) in both.mask.data.iter().zip(either.mask.data.iter()) {
        assert!(*b == 0 || *e == 255, "AND foreground must be OR foreground");
    }
}

#[test]
fn uniform_image_reports_fallback() {
    let img = GrayImage::from_fn(16, 16, |_, _| 100);
    let res = Otsu2dSegmenter::new(Otsu2dParams {
        histogram_bins: 8,
        smoothing_sigma: 0.0,
        ..Otsu2dParams::default()
    })
    .expect("params")
    .segment(&img.view(), &img.view())
    .expect("segment");
    assert!(res.fallback);
    assert_eq!(res.threshold.pixel_threshold, 4);
    assert_eq!(res.histogram_stats.non_zero_bins, 1);
}

#[test]
fn empty_grid_is_low_confidence_not_an_error() {
    let img = GrayImage::zeros(0, 0);
    let res = Otsu2dSegmenter::new(Otsu2dParams::default())
        .expect("params")
        .segment(&img.view(), &img.view())
        .expect("segment");
    assert!(res.fallback);
    assert!(res.global.is_none());
    assert_eq!(res.histogram_stats.non_zero_bins, 0);
    assert!(res.mask.data.is_empty());
}

#[test]
fn mismatched_feature_grid_fails_before_work() {
    let img = GrayImage::zeros(8, 8);
    let feature = GrayImage::zeros(8, 7);
    let err = Otsu2dSegmenter::new(Otsu2dParams::default())
        .expect("params")
        .segment(&img.view(), &feature.view())
        .unwrap_err();
    assert!(matches!(
        err,
        Otsu2dError::Grid(GridError::DimensionMismatch { .. })
    ));
}

#[test]
fn invalid_params_are_rejected() {
    let err = Otsu2dSegmenter::new(Otsu2dParams {
        pixel_weight_factor: f64::NAN,
        ..Otsu2dParams::default()
    })
    .unwrap_err();
    assert!(matches!(err, Otsu2dError::InvalidWeightFactor(_)));
}

#[test]
fn result_serializes_to_json() {
    let img = disk_image(16);
    let res = Otsu2dSegmenter::new(Otsu2dParams::default())
        .expect("params")
        .segment(&img.view(), &img.view())
        .expect("segment");
    let json = serde_json::to_value(&res).expect("json");
    assert!(json["threshold"]["pixel_threshold"].is_u64());
    assert!(json["histogram_flags"]["normalized"].as_bool().unwrap_or(false));
}
