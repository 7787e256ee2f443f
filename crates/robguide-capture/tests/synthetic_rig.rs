use robguide_capture::synthetic::{Stripe, SyntheticLamp, SyntheticStripeSource};
use robguide_capture::{CaptureConfig, CaptureController, CaptureError, CapturePhase};
use robguide_scan::Side;

fn config() -> CaptureConfig {
    CaptureConfig {
        h_resolution: 256,
        v_resolution: 4,
        scan_row: 2,
        max_attempts: 3,
        illumination_settle_ms: 0,
    }
}

#[test]
fn differencing_removes_ambient_light() {
    let lamp = SyntheticLamp::new();
    let source = SyntheticStripeSource::new(256, 4, lamp.clone()).with_ambient(90, 6);
    source
        .scene()
        .set_stripes(vec![Stripe::new(Side::Left, 100.0), Stripe::new(Side::Right, 30.0)]);

    let mut controller = CaptureController::new(config(), source, lamp.clone()).unwrap();
    let snapshot = controller.capture_once().unwrap();

    let left = snapshot.scan.left().as_slice();
    let right = snapshot.scan.right().as_slice();
    assert_eq!(left.len(), 256);

    // away from the stripes only the noise difference survives
    assert!(left[..90].iter().all(|&v| v <= 6));
    assert!(right[40..].iter().all(|&v| v <= 6));
    assert!(left[100] >= 140);
    assert!(right[30] >= 140);
    assert!(!lamp.is_lit());
}

#[test]
fn injected_failures_within_budget_are_absorbed() {
    let lamp = SyntheticLamp::new();
    let source = SyntheticStripeSource::new(256, 4, lamp.clone());
    let scene = source.scene();
    let mut controller = CaptureController::new(config(), source, lamp).unwrap();

    scene.inject_failures(2);
    controller.capture_once().unwrap();
    assert_eq!(controller.stats().retries, 2);

    scene.inject_failures(3);
    let err = controller.capture_once().unwrap_err();
    assert!(matches!(
        err,
        CaptureError::CaptureFailure {
            phase: CapturePhase::CapturingLit,
            attempts: 3,
            ..
        }
    ));
    assert_eq!(controller.buffer().sequence(), 1);
}

#[test]
fn continuous_capture_tracks_moving_stripe() {
    let lamp = SyntheticLamp::new();
    let source = SyntheticStripeSource::new(256, 4, lamp.clone()).with_ambient(20, 0);
    let scene = source.scene();
    scene.set_stripes(vec![Stripe::new(Side::Left, 50.0)]);

    let handle = CaptureController::new(config(), source, lamp.clone())
        .unwrap()
        .spawn();

    let mut reader = handle.buffer().reader();
    let mut moved = false;
    loop {
        let Some(snapshot) = reader.poll() else {
            std::thread::yield_now();
            continue;
        };
        let left = snapshot.scan.left().as_slice();
        if !moved {
            scene.set_stripes(vec![Stripe::new(Side::Left, 150.0)]);
            moved = true;
        } else if left[150] == 150 && left[50] == 0 {
            break;
        }
    }

    let stopped = handle.stop().unwrap();
    assert!(stopped.result.unwrap().cycles >= 2);
    assert!(!lamp.is_lit());
}
