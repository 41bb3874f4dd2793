use detector::{Detector, InferenceBackend, InferenceOutput, PipelineConfig};
use ndarray::{Array3, Array4};
use std::io::Write;
use transform::PipelineError;

const LETTERBOX: &str = r#"{
    "steps": [
        {"Standardize": {"max_value": 255.0}},
        {"DetLongMaxRescale": null},
        {"CenterPad": {"pad_value": 114}}
    ],
    "out_shape": [64, 64],
    "iou_tresh": 0.5,
    "score_tresh": 0.3
}"#;

/// Returns the same boxes for every call and remembers the tensors it saw.
struct FixedBackend {
    boxes: Vec<[f32; 4]>,
    classes: usize,
    seen_shapes: Vec<Vec<usize>>,
}

impl FixedBackend {
    fn new(boxes: Vec<[f32; 4]>, classes: usize) -> Self {
        Self {
            boxes,
            classes,
            seen_shapes: Vec::new(),
        }
    }
}

impl InferenceBackend for FixedBackend {
    fn infer(&mut self, input: &Array4<f32>) -> anyhow::Result<InferenceOutput> {
        self.seen_shapes.push(input.shape().to_vec());

        let n = self.boxes.len();
        let boxes = Array3::from_shape_vec(
            (1, n, 4),
            self.boxes.iter().flat_map(|b| b.iter().copied()).collect(),
        )?;
        let scores = Array3::from_shape_fn((1, n, self.classes), |(_, i, k)| {
            if k == i % self.classes { 0.9 } else { 0.01 }
        });

        Ok(InferenceOutput { boxes, scores })
    }
}

struct FailingBackend;

impl InferenceBackend for FailingBackend {
    fn infer(&mut self, _input: &Array4<f32>) -> anyhow::Result<InferenceOutput> {
        anyhow::bail!("Model session is not loaded")
    }
}

fn test_image(height: usize, width: usize) -> Array3<u8> {
    Array3::from_shape_fn((height, width, 3), |(y, x, c)| ((x * 3 + y + c * 40) % 200) as u8)
}

#[test]
fn test_detect_maps_model_boxes_back_to_image() {
    let config = PipelineConfig::from_json_str(LETTERBOX).unwrap();
    // 48x32 image scales by 1.25 to 60x40, then centers with left 2 and top 12
    let backend = FixedBackend::new(vec![[14.5, 37.0, 52.0, 62.0]], 4);
    let mut detector = Detector::new(backend, &config).unwrap();

    let detections = detector.detect(test_image(32, 48).view()).unwrap();

    assert_eq!(detector.backend().seen_shapes, vec![vec![1, 3, 64, 64]]);

    assert_eq!(detections.len(), 1);
    let detection = detections.get(0).unwrap();
    let expected = [10.0, 20.0, 30.0, 20.0];
    for (actual, wanted) in detection.bbox.iter().zip(expected) {
        assert!(
            (actual - wanted).abs() < 1e-4,
            "Got {:?}, expected {:?}",
            detection.bbox,
            expected
        );
    }
    assert_eq!(detection.class_id, 0);
    assert!((detection.score - 0.9).abs() < 1e-6);
}

#[test]
fn test_detect_reuses_pipelines_across_images() {
    let config = PipelineConfig::from_json_str(LETTERBOX).unwrap();
    let backend = FixedBackend::new(vec![[2.0, 12.0, 62.0, 52.0], [10.0, 20.0, 30.0, 40.0]], 3);
    let mut detector = Detector::new(backend, &config).unwrap();

    let wide = detector.detect(test_image(32, 48).view()).unwrap();
    let tall = detector.detect(test_image(120, 30).view()).unwrap();

    assert_eq!(detector.backend().seen_shapes.len(), 2);
    assert_eq!(wide.len(), 2);
    assert_eq!(tall.len(), 2);
    assert_eq!(wide.classes.to_vec(), vec![0, 1]);

    // The first box covers the whole resized content of the wide image
    let full = wide.get(0).unwrap().bbox;
    assert!((full[2] - 48.0).abs() < 1e-4 && (full[3] - 32.0).abs() < 1e-4);

    // Same model box, different trail, different image-space result
    assert_ne!(wide.get(1).unwrap().bbox, tall.get(1).unwrap().bbox);
}

#[test]
fn test_detect_empty_model_output() {
    let config = PipelineConfig::from_json_str(LETTERBOX).unwrap();
    let mut detector = Detector::new(FixedBackend::new(Vec::new(), 80), &config).unwrap();

    let detections = detector.detect(test_image(32, 48).view()).unwrap();
    assert!(detections.is_empty());
    assert_eq!(detections.boxes.shape(), &[0, 4]);
}

#[test]
fn test_thresholds_come_from_configuration() {
    let config = PipelineConfig::from_json_str(LETTERBOX).unwrap();
    let detector = Detector::new(FailingBackend, &config).unwrap();

    assert_eq!(detector.iou_threshold(), 0.5);
    assert_eq!(detector.score_threshold(), 0.3);
}

#[test]
fn test_backend_errors_propagate() {
    let config = PipelineConfig::from_json_str(LETTERBOX).unwrap();
    let mut detector = Detector::new(FailingBackend, &config).unwrap();

    let err = detector.detect(test_image(32, 48).view()).unwrap_err();
    assert!(err.to_string().contains("not loaded"));
}

#[test]
fn test_pipeline_errors_keep_their_kind() {
    let config = PipelineConfig::from_json_str(LETTERBOX).unwrap();
    let mut detector = Detector::new(FixedBackend::new(Vec::new(), 2), &config).unwrap();

    let empty = Array3::<u8>::zeros((0, 10, 3));
    let err = detector.detect(empty.view()).unwrap_err();

    assert!(
        matches!(err.downcast_ref::<PipelineError>(), Some(PipelineError::Shape(_))),
        "Got {:?}",
        err
    );
}

#[test]
fn test_detector_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LETTERBOX.as_bytes()).unwrap();

    let config = PipelineConfig::from_path(file.path()).unwrap();
    let mut detector =
        Detector::new(FixedBackend::new(vec![[14.5, 37.0, 52.0, 62.0]], 1), &config).unwrap();

    let detections = detector.detect(test_image(32, 48).view()).unwrap();
    assert_eq!(detections.len(), 1);
}

#[test]
fn test_invalid_geometry_fails_at_construction() {
    let config = PipelineConfig::from_json_str(
        r#"{"steps": ["DetLongMaxRescale"], "out_shape": [4, 64]}"#,
    )
    .unwrap();

    let err = Detector::new(FailingBackend, &config)
        .err()
        .expect("Output shape inside the margin should be rejected");
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Configuration(_))
    ));
}
