/// An error type for the peaks module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PeakError {
    /// A threshold was set to a value the detector cannot use.
    #[error("Invalid peak threshold {name} = {value}")]
    InvalidThreshold {
        /// Name of the threshold.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}
