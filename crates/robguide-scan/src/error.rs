/// An error type for the scan module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ScanError {
    /// The lit and unlit rows do not have the same number of samples.
    #[error("Lit row has {lit} samples but unlit row has {unlit}")]
    LengthMismatch {
        /// Number of samples in the lit row.
        lit: usize,
        /// Number of samples in the unlit row.
        unlit: usize,
    },

    /// A stereo row must split evenly into a left and a right half.
    #[error("Stereo row of {0} samples cannot be split into two equal halves")]
    OddLength(usize),

    /// The left and right halves of a scan must have the same resolution.
    #[error("Left scan line has {left} samples but right scan line has {right}")]
    SideMismatch {
        /// Number of samples on the left side.
        left: usize,
        /// Number of samples on the right side.
        right: usize,
    },
}
