use log::{info, warn};
use robguide_calib::SweepConfig;

use crate::error::RobguideError;
use crate::robot::RobotMotion;
use crate::sequence::Sequence;

fn remove_at<T>(items: &mut Vec<T>, index: usize) -> Result<T, RobguideError> {
    if index >= items.len() {
        return Err(RobguideError::IndexOutOfRange {
            index,
            len: items.len(),
        });
    }
    Ok(items.remove(index))
}

/// A job: an ordered list of sequences sharing one calibration sweep.
#[derive(Debug)]
pub struct Job {
    name: String,
    sequences: Vec<Sequence>,
    sweep: SweepConfig,
}

impl Default for Job {
    fn default() -> Self {
        Self {
            name: "robguide-job".to_string(),
            sequences: vec![Sequence::default()],
            sweep: SweepConfig::default(),
        }
    }
}

impl Job {
    /// Creates a job holding one default sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the job.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the job.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends a default sequence and returns it.
    pub fn add_sequence(&mut self) -> &mut Sequence {
        self.sequences.push(Sequence::default());
        let last = self.sequences.len() - 1;
        &mut self.sequences[last]
    }

    /// Removes the sequence at `index`.
    pub fn remove_sequence(&mut self, index: usize) -> Result<Sequence, RobguideError> {
        remove_at(&mut self.sequences, index)
    }

    /// The sequences in order.
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// The sequence at `index`.
    pub fn sequence(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    /// Mutable access to the sequence at `index`.
    pub fn sequence_mut(&mut self, index: usize) -> Option<&mut Sequence> {
        self.sequences.get_mut(index)
    }

    /// The calibration sweep.
    pub fn sweep(&self) -> &SweepConfig {
        &self.sweep
    }

    /// Replaces the calibration sweep. Invalid sweeps are rejected and leave the job unchanged.
    pub fn set_sweep(&mut self, sweep: SweepConfig) -> Result<(), RobguideError> {
        sweep.validate()?;
        self.sweep = sweep;
        Ok(())
    }

    /// The axis offsets visited by the calibration sweep.
    pub fn calibration_positions(&self) -> Vec<f64> {
        self.sweep.positions()
    }

    /// Calibrates every sequence that has a sensor.
    ///
    /// # Returns
    ///
    /// The number of calibrated sequences.
    pub fn calibrate(&mut self, robot: &mut dyn RobotMotion) -> Result<usize, RobguideError> {
        let positions = self.calibration_positions();
        let mut calibrated = 0;
        for sequence in self.sequences.iter_mut() {
            if !sequence.has_sensor() {
                warn!("sequence {} has no sensor, skipping calibration", sequence.name());
                continue;
            }
            sequence.calibrate(&positions, robot)?;
            calibrated += 1;
        }
        info!("job {}: calibrated {calibrated} sequences", self.name);
        Ok(calibrated)
    }
}

/// A project: an ordered list of jobs.
#[derive(Debug)]
pub struct Project {
    name: String,
    jobs: Vec<Job>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: "robguide-project".to_string(),
            jobs: vec![Job::default()],
        }
    }
}

impl Project {
    /// Creates a project holding one default job.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the project.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the project.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends a default job and returns it.
    pub fn add_job(&mut self) -> &mut Job {
        self.jobs.push(Job::default());
        let last = self.jobs.len() - 1;
        &mut self.jobs[last]
    }

    /// Removes the job at `index`.
    pub fn remove_job(&mut self, index: usize) -> Result<Job, RobguideError> {
        remove_at(&mut self.jobs, index)
    }

    /// The jobs in order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// The job at `index`.
    pub fn job(&self, index: usize) -> Option<&Job> {
        self.jobs.get(index)
    }

    /// Mutable access to the job at `index`.
    pub fn job_mut(&mut self, index: usize) -> Option<&mut Job> {
        self.jobs.get_mut(index)
    }
}
