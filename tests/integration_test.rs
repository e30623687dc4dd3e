use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use ssd_detect::mocks::MockDetectionModel;
use ssd_detect::{
    BatchDetector, Config, DetectError, DrawStyle, ObjectDetectionModel, Renderer,
};

const BACKGROUND: Rgb<u8> = Rgb([10, 20, 30]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

struct Workspace {
    _temp_dir: TempDir,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    fn new() -> Workspace {
        let temp_dir = TempDir::new().unwrap();
        let input_dir = temp_dir.path().join("inputs");
        let output_dir = temp_dir.path().join("outputs");
        fs::create_dir_all(&input_dir).unwrap();
        fs::create_dir_all(&output_dir).unwrap();
        Workspace {
            _temp_dir: temp_dir,
            input_dir,
            output_dir,
        }
    }

    fn config(&self) -> Config {
        Config {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            weights: "ssd.onnx".into(),
            font: None,
            confidence: 0.5,
            device_id: None,
        }
    }

    fn write_image(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let path = self.input_dir.join(name);
        RgbImage::from_pixel(width, height, BACKGROUND)
            .save(&path)
            .unwrap();
        path
    }
}

fn detector<M: ObjectDetectionModel>(model: M, config: Config) -> BatchDetector<M> {
    BatchDetector::new(model, Renderer::new(DrawStyle::default(), None), config)
}

fn open_rgb(path: &Path) -> RgbImage {
    image::open(path).unwrap().into_rgb8()
}

#[test]
fn test_car_detection_drawn_at_original_scale() {
    let workspace = Workspace::new();
    workspace.write_image("street.png", 256, 256);

    let model = MockDetectionModel::with_detections(
        (512, 512),
        &[[7.0, 0.91, 100.0, 100.0, 400.0, 400.0]],
    );
    let summary = detector(model, workspace.config())
        .process_directory()
        .unwrap();
    assert_eq!(summary.images, 1);
    assert_eq!(summary.detections, 1);

    let output = open_rgb(&workspace.output_dir.join("street.png"));
    assert_eq!(output.dimensions(), (256, 256));

    // rectangle (50,50)-(200,200), 2px stroke
    for (x, y) in [(50, 50), (200, 200), (50, 125), (51, 125), (200, 125), (125, 200)] {
        assert_eq!(*output.get_pixel(x, y), RED, "pixel ({x}, {y})");
    }
    for (x, y) in [(125, 125), (49, 125), (201, 125), (52, 125), (10, 240)] {
        assert_eq!(*output.get_pixel(x, y), BACKGROUND, "pixel ({x}, {y})");
    }
}

#[test]
fn test_single_image_annotation_label() {
    let workspace = Workspace::new();
    let input = workspace.write_image("street.png", 256, 256);

    let model = MockDetectionModel::with_detections(
        (512, 512),
        &[[7.0, 0.91, 100.0, 100.0, 400.0, 400.0]],
    );
    let annotations = detector(model, workspace.config())
        .process_single_image(&input)
        .unwrap();

    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].label, "car: 0.91");
    assert_eq!(annotations[0].top_left, (50, 50));
    assert_eq!(annotations[0].bottom_right, (200, 200));
}

#[test]
fn test_below_threshold_output_matches_input() {
    let workspace = Workspace::new();
    let input = workspace.write_image("quiet.png", 120, 90);

    let model = MockDetectionModel::with_detections(
        (512, 512),
        &[
            [15.0, 0.5, 0.0, 0.0, 512.0, 512.0],
            [7.0, 0.49, 10.0, 10.0, 100.0, 100.0],
        ],
    );
    let summary = detector(model, workspace.config())
        .process_directory()
        .unwrap();
    assert_eq!(summary.detections, 0);

    let output = image::open(workspace.output_dir.join("quiet.png")).unwrap();
    assert_eq!(output, image::open(&input).unwrap());
}

#[test]
fn test_no_detections_keeps_alpha_channel() {
    let workspace = Workspace::new();
    let input = workspace.input_dir.join("overlay.png");
    RgbaImage::from_pixel(40, 30, Rgba([10, 20, 30, 77]))
        .save(&input)
        .unwrap();

    detector(MockDetectionModel::new((512, 512)), workspace.config())
        .process_directory()
        .unwrap();

    let output = image::open(workspace.output_dir.join("overlay.png")).unwrap();
    assert!(matches!(output, DynamicImage::ImageRgba8(_)));
    assert_eq!(output, image::open(&input).unwrap());
}

#[test]
fn test_no_detections_keeps_grayscale() {
    let workspace = Workspace::new();
    let input = workspace.input_dir.join("gray.png");
    GrayImage::from_pixel(40, 30, Luma([99])).save(&input).unwrap();

    detector(MockDetectionModel::new((512, 512)), workspace.config())
        .process_directory()
        .unwrap();

    let output = image::open(workspace.output_dir.join("gray.png")).unwrap();
    assert!(matches!(output, DynamicImage::ImageLuma8(_)));
    assert_eq!(output, image::open(&input).unwrap());
}

#[test]
fn test_grayscale_detection_drawn_in_place() {
    let workspace = Workspace::new();
    GrayImage::from_pixel(256, 256, Luma([99]))
        .save(workspace.input_dir.join("gray.png"))
        .unwrap();

    let model = MockDetectionModel::with_detections(
        (512, 512),
        &[[7.0, 0.91, 100.0, 100.0, 400.0, 400.0]],
    );
    detector(model, workspace.config())
        .process_directory()
        .unwrap();

    let output = image::open(workspace.output_dir.join("gray.png")).unwrap();
    let gray = output.as_luma8().expect("grayscale output");
    assert_ne!(*gray.get_pixel(50, 125), Luma([99]));
    assert_eq!(*gray.get_pixel(125, 125), Luma([99]));
}

#[test]
fn test_saturated_box_is_drawn_without_overflow() {
    let workspace = Workspace::new();
    workspace.write_image("wide.png", 64, 64);

    let model = MockDetectionModel::with_detections(
        (512, 512),
        &[[7.0, 0.91, -1e30, 128.0, 1e30, 256.0]],
    );
    let renderer = Renderer::with_embedded_font(DrawStyle::default()).unwrap();
    let summary = BatchDetector::new(model, renderer, workspace.config())
        .process_directory()
        .unwrap();
    assert_eq!(summary.detections, 1);

    let output = open_rgb(&workspace.output_dir.join("wide.png"));
    assert_eq!(*output.get_pixel(0, 16), RED);
    assert_eq!(*output.get_pixel(63, 32), RED);
    assert_eq!(*output.get_pixel(32, 24), BACKGROUND);
}

#[test]
fn test_non_square_image_rescales_each_axis() {
    let workspace = Workspace::new();
    workspace.write_image("wide.png", 1024, 256);

    let model = MockDetectionModel::with_detections(
        (512, 512),
        &[[15.0, 0.8, 0.0, 0.0, 512.0, 512.0]],
    );
    detector(model, workspace.config())
        .process_directory()
        .unwrap();

    let output = open_rgb(&workspace.output_dir.join("wide.png"));
    assert_eq!(output.dimensions(), (1024, 256));
    assert_eq!(*output.get_pixel(0, 128), RED);
    assert_eq!(*output.get_pixel(1023, 128), RED);
    assert_eq!(*output.get_pixel(512, 255), RED);
    assert_eq!(*output.get_pixel(512, 128), BACKGROUND);
}

#[test]
fn test_processes_every_file_and_keeps_names() {
    let workspace = Workspace::new();
    workspace.write_image("b.png", 64, 64);
    workspace.write_image("a.png", 32, 48);
    fs::create_dir_all(workspace.input_dir.join("nested")).unwrap();
    RgbImage::new(8, 8)
        .save(workspace.input_dir.join("nested/skipped.png"))
        .unwrap();

    let summary = detector(MockDetectionModel::new((512, 512)), workspace.config())
        .process_directory()
        .unwrap();
    assert_eq!(summary.images, 2);

    let a = image::open(workspace.output_dir.join("a.png")).unwrap();
    assert_eq!(a.dimensions(), (32, 48));
    assert!(workspace.output_dir.join("b.png").exists());
    assert!(!workspace.output_dir.join("skipped.png").exists());
}

#[test]
fn test_empty_directory_is_a_no_op() {
    let workspace = Workspace::new();

    let summary = detector(MockDetectionModel::new((512, 512)), workspace.config())
        .process_directory()
        .unwrap();
    assert_eq!(summary.images, 0);
    assert_eq!(fs::read_dir(&workspace.output_dir).unwrap().count(), 0);
}

#[test]
fn test_missing_input_directory() {
    let workspace = Workspace::new();
    let mut config = workspace.config();
    config.input_dir = workspace.input_dir.join("missing");

    let err = detector(MockDetectionModel::new((512, 512)), config)
        .process_directory()
        .unwrap_err();
    assert!(matches!(err, DetectError::FileSystem { .. }));
}

#[test]
fn test_missing_output_directory_aborts() {
    let workspace = Workspace::new();
    workspace.write_image("a.png", 16, 16);
    let mut config = workspace.config();
    config.output_dir = workspace.output_dir.join("missing");

    let err = detector(MockDetectionModel::new((512, 512)), config)
        .process_directory()
        .unwrap_err();
    assert!(matches!(err, DetectError::ImageProcessing { .. }));
}

#[test]
fn test_corrupt_file_aborts_the_batch() {
    let workspace = Workspace::new();
    fs::write(workspace.input_dir.join("a_broken.png"), b"not an image").unwrap();
    workspace.write_image("b_fine.png", 16, 16);

    let err = detector(MockDetectionModel::new((512, 512)), workspace.config())
        .process_directory()
        .unwrap_err();
    assert!(matches!(err, DetectError::ImageProcessing { .. }));
    // sorted order: the broken file comes first, nothing after it is written
    assert!(!workspace.output_dir.join("b_fine.png").exists());
}

#[test]
fn test_model_receives_fixed_size_input() {
    let workspace = Workspace::new();
    workspace.write_image("odd.png", 37, 91);

    // the mock rejects any tensor that is not [1, 300, 300, 3]
    let model = MockDetectionModel::new((300, 300));
    detector(model, workspace.config())
        .process_directory()
        .unwrap();

    let output = image::open(workspace.output_dir.join("odd.png")).unwrap();
    assert_eq!(output.dimensions(), (37, 91));
}

#[test]
fn test_detect_objects_in_memory() {
    let workspace = Workspace::new();
    let model = MockDetectionModel::with_detections(
        (512, 512),
        &[[15.0, 0.5005, 0.0, 0.0, 256.0, 256.0]],
    );
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, BACKGROUND));

    let (annotated, annotations) = detector(model, workspace.config())
        .detect_objects(image)
        .unwrap();
    assert_eq!(annotations[0].label, "person: 0.50");
    assert_eq!(annotations[0].bottom_right, (50, 50));
    assert!(matches!(annotated, DynamicImage::ImageRgb8(_)));
    assert_eq!(annotated.get_pixel(0, 25), Rgba([255, 0, 0, 255]));
}
