mod common;

use approx::assert_abs_diff_eq;
use common::*;
use fishmark::{
    AnnotationPipeline, FrameOutcome, FrameSkipReason, LandmarkLabel, PipelineConfig, SetupError,
};
use nalgebra::Point2;
use std::fs;
use std::path::Path;

fn crop_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    for label in LandmarkLabel::ALL {
        let dir = root.join(label.dir_name());
        if !dir.exists() {
            continue;
        }
        for entry in fs::read_dir(dir).expect("read label dir") {
            files.push(entry.expect("dir entry").path());
        }
    }
    files.sort();
    files
}

#[test]
fn missing_log_skips_only_that_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());

    let pipeline =
        AnnotationPipeline::new(PipelineConfig::for_root(dir.path())).expect("pipeline setup");
    let run = pipeline.run().expect("run");

    assert_eq!(run.summary.total, 3);
    assert_eq!(run.summary.processed, 2);
    assert_eq!(run.summary.skipped, 1);
    assert_eq!(crop_files(dir.path()).len(), 8);

    let names: Vec<&str> = run.outcomes.iter().map(FrameOutcome::name).collect();
    assert_eq!(names, FRAME_NAMES);

    match &run.outcomes[2] {
        FrameOutcome::Skipped(s) => {
            assert!(matches!(s.reason, FrameSkipReason::LandmarkNotFound(_)));
        }
        other => panic!("expected a skip, got {other:?}"),
    }
    for label in LandmarkLabel::ALL {
        assert!(!dir
            .path()
            .join(label.dir_name())
            .join(FRAME_NAMES[2])
            .exists());
    }
}

#[test]
fn landmarks_follow_template_and_last_log_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());

    let pipeline =
        AnnotationPipeline::new(PipelineConfig::for_root(dir.path())).expect("pipeline setup");
    let run = pipeline.run().expect("run");

    let FrameOutcome::Processed(first) = &run.outcomes[0] else {
        panic!("first frame skipped");
    };
    assert_eq!(first.landmarks.eye, Point2::new(EYE.0 as i32, EYE.1 as i32));
    assert_eq!(
        first.landmarks.tail_base,
        Point2::new(TAIL_BASE.0 as i32, TAIL_BASE.1 as i32)
    );
    assert_eq!(
        first.landmarks.tail_tip,
        Point2::new(TAIL_TIP.0 as i32, TAIL_TIP.1 as i32)
    );
    assert_abs_diff_eq!(first.eye_score, 1.0, epsilon = 1e-3);
}

#[test]
fn crops_hold_the_expected_slices() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());

    let pipeline =
        AnnotationPipeline::new(PipelineConfig::for_root(dir.path())).expect("pipeline setup");
    pipeline.run().expect("run");

    let name = FRAME_NAMES[1];
    let source = load_gray(&dir.path().join(name));
    let r = 40;
    let expected = [
        (LandmarkLabel::Head, slice(&source, EYE.0, EYE.1, 2 * r)),
        (
            LandmarkLabel::TailBase,
            slice(&source, TAIL_BASE.0 - r, TAIL_BASE.1 - r, 2 * r),
        ),
        (
            LandmarkLabel::TailTip,
            slice(&source, TAIL_TIP.0 - r, TAIL_TIP.1 - r, 2 * r),
        ),
        (LandmarkLabel::Background, slice(&source, 10, 10, 2 * r)),
    ];
    for (label, want) in expected {
        let got = load_gray(&dir.path().join(label.dir_name()).join(name));
        assert_eq!(got.dimensions(), (80, 80), "{label}");
        assert_eq!(got.as_raw(), want.as_raw(), "{label} crop differs");
    }
}

#[test]
fn rerun_writes_identical_crops() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());
    let config = PipelineConfig::for_root(dir.path());

    AnnotationPipeline::new(config.clone())
        .expect("pipeline setup")
        .run()
        .expect("first run");
    let first: Vec<Vec<u8>> = crop_files(dir.path())
        .iter()
        .map(|p| fs::read(p).expect("read crop"))
        .collect();

    AnnotationPipeline::new(config)
        .expect("pipeline setup")
        .run()
        .expect("second run");
    let second: Vec<Vec<u8>> = crop_files(dir.path())
        .iter()
        .map(|p| fs::read(p).expect("read crop"))
        .collect();

    assert_eq!(first.len(), 8);
    assert_eq!(first, second);
}

#[test]
fn zero_byte_template_fails_before_any_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());
    fs::write(dir.path().join("eye_template").join("eye_template.png"), b"")
        .expect("truncate template");

    let err = match AnnotationPipeline::new(PipelineConfig::for_root(dir.path())) {
        Ok(_) => panic!("setup should fail"),
        Err(e) => e,
    };
    assert!(matches!(err, SetupError::TemplateUnreadable { .. }));
    for label in LandmarkLabel::ALL {
        assert!(!dir.path().join(label.dir_name()).exists());
    }
}

#[test]
fn separate_output_root_and_overlays() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());
    let out = dir.path().join("dataset");
    let overlays = dir.path().join("overlays");

    let mut config = PipelineConfig::for_root(dir.path());
    config.output_dir = Some(out.clone());
    config.overlay_dir = Some(overlays.clone());
    let run = AnnotationPipeline::new(config)
        .expect("pipeline setup")
        .run()
        .expect("run");

    assert_eq!(crop_files(&out).len(), 8);
    assert!(!dir.path().join("head").exists());
    for name in FRAME_NAMES {
        assert!(overlays.join(name).is_file(), "overlay {name}");
    }

    let (shape, data) = run.overlays.viewer_array();
    assert_eq!(shape, [3, WIDTH as usize, HEIGHT as usize, 3]);
    assert_eq!(data.len(), shape.iter().product::<usize>());

    // processed frames carry the head rectangle, the skipped one is plain gray
    let head = image::Rgb([31, 119, 180]);
    assert_eq!(*run.overlays.frames[0].get_pixel(EYE.0, EYE.1 + 20), head);
    let skipped = run.overlays.frames[2].get_pixel(EYE.0, EYE.1 + 20);
    assert_eq!(skipped.0[0], skipped.0[1]);
    assert_eq!(skipped.0[1], skipped.0[2]);
}

#[test]
fn oversized_radius_fails_at_setup() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());

    let mut config = PipelineConfig::for_root(dir.path());
    config.layout.radius = 3_000_000_000;
    let err = match AnnotationPipeline::new(config) {
        Ok(_) => panic!("setup should fail"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        SetupError::InvalidRadius {
            radius: 3_000_000_000,
            ..
        }
    ));
    for label in LandmarkLabel::ALL {
        assert!(!dir.path().join(label.dir_name()).exists());
    }
}

#[test]
fn overlays_into_the_image_dir_are_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());
    let before: Vec<Vec<u8>> = FRAME_NAMES
        .iter()
        .map(|name| fs::read(dir.path().join(name)).expect("read frame"))
        .collect();

    let mut config = PipelineConfig::for_root(dir.path());
    config.overlay_dir = Some(dir.path().to_path_buf());
    let err = match AnnotationPipeline::new(config) {
        Ok(_) => panic!("setup should fail"),
        Err(e) => e,
    };
    assert!(matches!(err, SetupError::OverlayDirConflict { .. }));

    let after: Vec<Vec<u8>> = FRAME_NAMES
        .iter()
        .map(|name| fs::read(dir.path().join(name)).expect("read frame"))
        .collect();
    assert_eq!(before, after);
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_run_keeps_stack_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_dataset(dir.path());
    let overlays = dir.path().join("overlays");

    let mut config = PipelineConfig::for_root(dir.path());
    config.overlay_dir = Some(overlays.clone());
    let run = AnnotationPipeline::new(config)
        .expect("pipeline setup")
        .run()
        .expect("run");

    let names: Vec<&str> = run.outcomes.iter().map(FrameOutcome::name).collect();
    assert_eq!(names, FRAME_NAMES);
    assert_eq!(run.overlays.names, FRAME_NAMES);
    assert_eq!(run.summary.total, 3);
    assert_eq!(run.summary.processed, 2);
    assert_eq!(run.summary.skipped, 1);
    assert!(matches!(run.outcomes[2], FrameOutcome::Skipped(_)));
    assert_eq!(crop_files(dir.path()).len(), 8);
    assert_eq!(fs::read_dir(&overlays).expect("overlay dir").count(), 3);
}
