use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use robguide::calib::{Axis, IntrinsicModel, SweepConfig};
use robguide::capture::synthetic::{SceneHandle, SyntheticLamp, SyntheticStripeSource};
use robguide::capture::{CaptureConfig, CaptureError};
use robguide::scan::Side;
use robguide::{Project, RobguideError, RobotMotion, Sensor, SensorConfig, SimulatedRobot};

const H: usize = 256;
const RECORD: &str = "-50.0,0.0,1.1071487177940904,8.0,50.0,0.0,2.0344439357957027,8.0,0.003";

// left and right stripe displacement per unit of each axis
const SENSITIVITY: [[f64; 2]; 6] = [
    [2.0, -1.0],
    [1.0, 1.0],
    [-2.0, 2.0],
    [3.0, 1.0],
    [1.0, -2.0],
    [-1.0, -1.0],
];

struct Rig {
    sensor: Arc<Mutex<Sensor>>,
    scene: SceneHandle,
    lamp: SyntheticLamp,
}

fn rig() -> Rig {
    let config = SensorConfig {
        capture: CaptureConfig {
            h_resolution: H,
            v_resolution: 2,
            scan_row: 1,
            max_attempts: 3,
            illumination_settle_ms: 0,
        },
        ..Default::default()
    };

    let lamp = SyntheticLamp::new();
    let source = SyntheticStripeSource::new(H, 2, lamp.clone()).with_seed(7);
    let scene = source.scene();
    let intrinsics = IntrinsicModel::from_record(RECORD, H).unwrap();
    let sensor = Sensor::with_intrinsics(config, intrinsics, source, lamp.clone()).unwrap();

    Rig {
        sensor: Arc::new(Mutex::new(sensor)),
        scene,
        lamp,
    }
}

#[test]
fn calibrate_and_measure_through_the_synthetic_rig() {
    let rig = rig();
    let mut robot = SimulatedRobot::new(rig.scene.clone(), [100.0, 150.0], SENSITIVITY);

    let mut project = Project::new();
    let job = project.job_mut(0).unwrap();
    job.set_sweep(SweepConfig::new(-3.0, 3.0, 7).unwrap()).unwrap();
    job.sequence_mut(0).unwrap().set_sensor(&rig.sensor);

    assert_eq!(job.calibrate(&mut robot).unwrap(), 1);
    for axis in Axis::ALL {
        assert_eq!(robot.offset(axis), 0.0);
    }

    let sequence = job.sequence(0).unwrap();
    let calibration = sequence.calibration();
    assert!(calibration.is_valid());
    assert_eq!(calibration.observation_count(), 6 * 7);

    let matrix = calibration.matrix().unwrap();
    for axis in Axis::ALL {
        for side in Side::BOTH {
            assert_relative_eq!(
                matrix.sensitivity(axis, side),
                SENSITIVITY[axis.index()][side.index()],
                epsilon = 1e-6
            );
        }
        assert_relative_eq!(matrix.intercept(axis, Side::Left), 100.0, epsilon = 1e-6);
        assert_relative_eq!(matrix.intercept(axis, Side::Right), 150.0, epsilon = 1e-6);
    }

    robot.move_axis(Axis::Y, 2.0).unwrap();
    let measurement = sequence.measure().unwrap();
    assert_eq!(measurement.peaks.left, vec![102]);
    assert_eq!(measurement.peaks.right, vec![152]);
    let point = measurement.point.unwrap();
    assert!(point.iter().all(|v| v.is_finite()));

    let offset = sequence
        .estimate_offset(Axis::Y, &measurement.peaks)
        .unwrap();
    assert_relative_eq!(offset, 2.0, epsilon = 1e-9);
    assert!(!rig.lamp.is_lit());
}

#[test]
fn calibration_fails_without_a_stripe() {
    let rig = rig();
    rig.scene.set_stripes(Vec::new());

    struct Still;
    impl RobotMotion for Still {
        fn move_axis(&mut self, _axis: Axis, _offset: f64) -> Result<(), robguide::RobotError> {
            Ok(())
        }
    }

    let mut project = Project::new();
    let sequence = project.job_mut(0).unwrap().sequence_mut(0).unwrap();
    sequence.set_sensor(&rig.sensor);

    let res = sequence.calibrate(&[-1.0, 1.0], &mut Still);
    assert!(matches!(
        res,
        Err(RobguideError::MissingPeak {
            axis: Axis::X,
            side: Side::Left,
            ..
        })
    ));
    assert!(!sequence.calibration().is_valid());
}

#[test]
fn dropped_sensor_is_reported() {
    let rig = rig();
    let mut project = Project::new();
    let sequence = project.job_mut(0).unwrap().sequence_mut(0).unwrap();
    sequence.set_sensor(&rig.sensor);
    assert!(sequence.has_sensor());

    drop(rig);
    assert!(!sequence.has_sensor());
    assert!(matches!(
        sequence.measure(),
        Err(RobguideError::SensorDropped)
    ));
}

#[test]
fn live_mode_streams_new_scans() {
    let rig = rig();
    let _robot = SimulatedRobot::new(rig.scene.clone(), [60.0, 200.0], SENSITIVITY);

    let mut project = Project::new();
    let sequence = project.job_mut(0).unwrap().sequence_mut(0).unwrap();
    sequence.set_sensor(&rig.sensor);

    let mut seen = Vec::new();
    let stats = sequence
        .live_mode(|snapshot, peaks| {
            assert_eq!(peaks.left, vec![60]);
            assert_eq!(peaks.right, vec![200]);
            seen.push(snapshot.sequence);
            if seen.len() == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(stats.cycles >= 5);

    let sensor = rig.sensor.lock().unwrap();
    assert!(!sensor.is_streaming());
    assert!(!rig.lamp.is_lit());
}

#[test]
fn live_mode_surfaces_capture_failure() {
    let rig = rig();
    let mut project = Project::new();
    let sequence = project.job_mut(0).unwrap().sequence_mut(0).unwrap();
    sequence.set_sensor(&rig.sensor);

    let scene = rig.scene.clone();
    let res = sequence.live_mode(|_, _| {
        scene.inject_failures(10);
        ControlFlow::Continue(())
    });

    assert!(matches!(
        res,
        Err(RobguideError::Capture(CaptureError::CaptureFailure {
            attempts: 3,
            ..
        }))
    ));
    assert!(!rig.sensor.lock().unwrap().is_streaming());
    assert!(!rig.lamp.is_lit());
}
