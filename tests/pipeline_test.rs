use image::{Rgb, RgbImage};

use tumor_triage_rs::mocks::{FailingClassifier, MockClassifier, MockDetector, MockSegmenter};
use tumor_triage_rs::{Pipeline, TumorClass, OVERLAY_COLOR, TUMOR_THRESHOLD};

fn uniform_gray(w: u32, h: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb([value, value, value]))
}

fn mock_pipeline(probability: f32) -> Pipeline<MockDetector, MockClassifier, MockSegmenter> {
    Pipeline::new(
        MockDetector::new(probability),
        MockClassifier::new([0.2, 0.7, 0.1]),
        MockSegmenter::default(),
    )
}

#[test]
fn below_threshold_short_circuits_everything() {
    let image = uniform_gray(64, 48, 100);
    let result = mock_pipeline(0.49).run_on_image(&image).unwrap();

    assert!(!result.has_tumor());
    assert!(result.findings.is_none());
    assert_eq!(result.detection_probability, 0.49);
    // Overlay is pixel-identical to the input.
    assert_eq!(result.overlay, image);
}

#[test]
fn threshold_boundary_is_inclusive() {
    let image = uniform_gray(32, 32, 100);
    let result = mock_pipeline(TUMOR_THRESHOLD).run_on_image(&image).unwrap();
    assert!(result.has_tumor());
    assert!(result.findings.is_some());
}

#[test]
fn tumor_branch_populates_all_findings() {
    let image = uniform_gray(60, 40, 80);
    let result = mock_pipeline(0.93).run_on_image(&image).unwrap();

    let findings = result.findings.expect("tumor branch must produce findings");
    assert_eq!(findings.classification.label, TumorClass::Meningioma);

    let sum: f32 = findings.classification.probabilities().map(|(_, p)| p).sum();
    assert!((sum - 1.0).abs() < 1e-5);

    assert_eq!(findings.mask.dimensions(), (60, 40));
}

#[test]
fn scenario_uniform_gray_square() {
    let image = uniform_gray(100, 100, 127);
    let result = mock_pipeline(0.25).run_on_image(&image).unwrap();

    assert!((0.0..=1.0).contains(&result.detection_probability));
    assert_eq!(result.overlay.dimensions(), (100, 100));
}

#[test]
fn scenario_stubbed_tumor_on_small_image() {
    // Detector forced to 0.9, segmenter emits an all-one 224x224 working mask
    // on a 50x50 original.
    let value = 120_u8;
    let image = uniform_gray(50, 50, value);
    let pipeline = Pipeline::new(
        MockDetector::new(0.9),
        MockClassifier::new([1.0, 0.0, 0.0]),
        MockSegmenter::new(224),
    );
    let result = pipeline.run_on_image(&image).unwrap();

    let findings = result.findings.unwrap();
    assert_eq!(findings.mask.dimensions(), (50, 50));
    assert!(findings.mask.as_array().iter().all(|&v| v == 1));

    // Every pixel is the default color blended at the default alpha.
    let expected = |tint: u8| (0.4 * f32::from(value) + 0.6 * f32::from(tint)).round() as u8;
    let expected_pixel = [
        expected(OVERLAY_COLOR.0[0]),
        expected(OVERLAY_COLOR.0[1]),
        expected(OVERLAY_COLOR.0[2]),
    ];
    assert!(result.overlay.pixels().all(|p| p.0 == expected_pixel));
}

#[test]
fn classifier_failure_aborts_the_invocation() {
    let image = uniform_gray(30, 30, 10);
    let pipeline = Pipeline::new(
        MockDetector::new(0.9),
        FailingClassifier,
        MockSegmenter::default(),
    );
    assert!(pipeline.run_on_image(&image).is_err());
}

#[test]
fn no_tumor_never_invokes_the_classifier() {
    // The failing classifier would abort the call if it ran; below threshold
    // it must not be invoked at all.
    let image = uniform_gray(30, 30, 10);
    let pipeline = Pipeline::new(
        MockDetector::new(0.1),
        FailingClassifier,
        MockSegmenter::default(),
    );
    let result = pipeline.run_on_image(&image).unwrap();
    assert!(!result.has_tumor());
}

#[test]
fn run_on_path_decodes_and_runs() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("scan.png");
    uniform_gray(40, 20, 200).save(&path).unwrap();

    let result = mock_pipeline(0.8).run_on_path(&path).unwrap();
    assert!(result.has_tumor());
    assert_eq!(result.overlay.dimensions(), (40, 20));
}

#[test]
fn run_on_path_surfaces_decode_errors() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("scan.png");
    std::fs::write(&path, b"not an image").unwrap();

    let err = mock_pipeline(0.8).run_on_path(&path).unwrap_err();
    assert!(matches!(err, tumor_triage_rs::PipelineError::Decode { .. }));
}
