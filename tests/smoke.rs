//! End-to-end runs of the smoke harness against the process wide binding.

use pbcvt::binding::{self, reset_background_model};
use pbcvt::harness::{fixtures, Harness, NativeBinding};
use pbcvt::NdArray;
use std::sync::Mutex;

lazy_static::lazy_static! {
    // Tests in this file share the background model
    static ref MODEL_LOCK: Mutex<()> = Mutex::new(());
}

fn run_harness() -> String {
    let (a, b) = fixtures().unwrap();
    let mut harness = Harness::new(NativeBinding, Vec::new());
    harness.run(&a, &b).unwrap();
    let (_, out) = harness.into_inner();
    String::from_utf8(out).unwrap()
}

#[test]
fn prints_three_lines_on_a_fresh_model() {
    let _guard = MODEL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_background_model();

    let out = run_harness();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "(array([[127, 127, 127]], dtype=uint8), array([[1., 2., 3.]]))",
            "[[14.]]",
            "[[14.]]",
        ]
    );
}

#[test]
fn repeated_frames_settle_into_background() {
    let _guard = MODEL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_background_model();

    run_harness();
    let out = run_harness();
    assert!(out.starts_with("(array([[0, 0, 0]], dtype=uint8), "));
}

#[test]
fn apply_accepts_the_row_vector_and_prints() {
    let _guard = MODEL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_background_model();

    let (a, _) = fixtures().unwrap();
    let result = binding::apply(&a).unwrap();
    assert_eq!(result.foreground_mask.shape(), &[1, 3]);
    assert_eq!(result.frame, a);
    assert!(!result.to_string().is_empty());
}

#[test]
fn apply_restarts_on_a_new_frame_shape() {
    let _guard = MODEL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_background_model();

    let (a, b) = fixtures().unwrap();
    binding::apply(&a).unwrap();
    let result = binding::apply(&b).unwrap();
    assert_eq!(result.foreground_mask.shape(), &[3, 1]);
    assert_eq!(result.foreground_mask.as_slice(), &[127, 127, 127]);
}

#[test]
fn failing_call_leaves_no_later_output() {
    let _guard = MODEL_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_background_model();

    let (a, _) = fixtures().unwrap();
    let wrong = NdArray::from_rows(&[[1.0, 2.0]]).unwrap();
    let mut harness = Harness::new(NativeBinding, Vec::new());
    let err = harness.run(&a, &wrong).unwrap_err();
    assert!(err.to_string().starts_with("Incompatible sizes for matrix multiplication"));

    let (_, out) = harness.into_inner();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(out.lines().count(), 1);
    assert!(out.starts_with("(array("));
}
