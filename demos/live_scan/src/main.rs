use argh::FromArgs;
use robguide::{
    calib::{Axis, IntrinsicModel, SensitivityMatrix},
    capture::synthetic::{SyntheticLamp, SyntheticStripeSource},
    scan::Side,
    Project, RobotMotion, Sensor, SensorConfig, SimulatedRobot,
};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::{Duration, Instant};

// left and right stripe displacement in pixels per unit of each axis
const SENSITIVITY: [[f64; 2]; 6] = [
    [4.0, -2.0],
    [1.5, 1.5],
    [-3.0, 3.0],
    [6.0, 2.0],
    [2.0, -4.0],
    [-1.0, -1.0],
];

// both boresights meet 100 mm in front of the sensor
const DEMO_RECORD: &str =
    "-50.0,0.0,1.1071487177940904,8.0,50.0,0.0,2.0344439357957027,8.0,0.003";

#[derive(FromArgs)]
/// Drive a synthetic structured light sensor through calibration and live mode
struct Args {
    /// path to a JSON sensor configuration
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// load the intrinsic record from the configured path instead of the built-in one
    #[argh(switch)]
    load_intrinsics: bool,

    /// calibrate against the simulated robot before going live
    #[argh(switch)]
    calibrate: bool,

    /// the duration in seconds to run live mode
    #[argh(option, short = 'd')]
    duration: Option<u64>,

    /// print every n-th scan
    #[argh(option, short = 'e', default = "50")]
    every: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => SensorConfig::from_json_file(path)?,
        None => SensorConfig {
            capture: robguide::capture::CaptureConfig {
                illumination_settle_ms: 2,
                ..Default::default()
            },
            sweep: robguide::calib::SweepConfig::new(-5.0, 5.0, 11)?,
            ..Default::default()
        },
    };
    let h_resolution = config.capture.h_resolution;
    let nominal = [h_resolution as f64 * 0.4, h_resolution as f64 * 0.6];

    let lamp = SyntheticLamp::new();
    let source =
        SyntheticStripeSource::new(h_resolution, config.capture.v_resolution, lamp.clone());
    let scene = source.scene();
    let sweep = config.sweep;

    let sensor = if args.load_intrinsics {
        Sensor::new(config, source, lamp)?
    } else {
        let intrinsics = IntrinsicModel::from_record(DEMO_RECORD, h_resolution)?;
        Sensor::with_intrinsics(config, intrinsics, source, lamp)?
    };
    let sensor = Arc::new(Mutex::new(sensor));

    let mut robot = SimulatedRobot::new(scene, nominal, SENSITIVITY);

    let mut project = Project::new();
    project.rename("live-scan-demo");
    let job = project
        .job_mut(0)
        .ok_or("the project has no job")?;
    job.set_sweep(sweep)?;
    let sequence = job.sequence_mut(0).ok_or("the job has no sequence")?;
    sequence.set_sensor(&sensor);

    if args.calibrate {
        let started = Instant::now();
        job.calibrate(&mut robot)?;
        println!("Calibrated in {:.2?}", started.elapsed());

        let sequence = job.sequence(0).ok_or("the job has no sequence")?;
        let matrix = sequence.calibration().matrix()?;
        for axis in Axis::ALL {
            let row = |side| matrix.rows()[SensitivityMatrix::row_index(axis, side)];
            println!(
                "  {axis}: left {:?}  right {:?}",
                row(Side::Left),
                row(Side::Right)
            );
        }
    }

    // create a cancel token to stop live mode
    let cancel_token = Arc::new(AtomicBool::new(false));

    ctrlc::set_handler({
        let cancel_token = cancel_token.clone();
        move || {
            println!("Received Ctrl-C signal. Sending cancel signal !!");
            cancel_token.store(true, Ordering::SeqCst);
        }
    })?;

    // we launch a timer to cancel the token after a certain duration
    std::thread::spawn({
        let cancel_token = cancel_token.clone();
        move || {
            if let Some(duration_secs) = args.duration {
                std::thread::sleep(Duration::from_secs(duration_secs));
                println!("Sending timer cancel signal !!");
                cancel_token.store(true, Ordering::SeqCst);
            }
        }
    });

    let sequence = job.sequence(0).ok_or("the job has no sequence")?;
    let started = Instant::now();
    let stats = sequence.live_mode(|snapshot, peaks| {
        if cancel_token.load(Ordering::SeqCst) {
            return ControlFlow::Break(());
        }

        // sway the robot along X
        let t = started.elapsed().as_secs_f64();
        if let Err(e) = robot.move_axis(Axis::X, 3.0 * (0.5 * t).sin()) {
            log::error!("robot motion failed: {e}");
            return ControlFlow::Break(());
        }

        if snapshot.sequence % args.every.max(1) == 0 {
            let estimate = sequence
                .estimate_offset(Axis::X, peaks)
                .map(|x| format!("{x:+.2}"))
                .unwrap_or_else(|e| e.to_string());
            println!(
                "scan {:>6}: left {:?} right {:?} X {}",
                snapshot.sequence, peaks.left, peaks.right, estimate
            );
        }
        ControlFlow::Continue(())
    })?;

    println!(
        "Finished live mode: {} cycles, {} failures, {} retries, {:.1} Hz",
        stats.cycles, stats.failures, stats.retries, stats.cycle_hz
    );

    Ok(())
}
