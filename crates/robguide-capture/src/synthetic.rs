//! A software stand-in for the sensor hardware.
//!
//! [`SyntheticLamp`] is a switchable illumination whose state is shared with a
//! [`SyntheticStripeSource`], which renders the projected stripes only while the lamp is lit,
//! on top of an ambient background with random noise. A [`SceneHandle`] moves the stripes and
//! injects transient capture failures from any thread.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use robguide_scan::Side;

use crate::error::{FrameSourceError, IlluminationError};
use crate::source::{FrameSource, IlluminationControl, RawFrame};

/// A switchable illumination that only records its state.
#[derive(Debug, Clone, Default)]
pub struct SyntheticLamp {
    lit: Arc<AtomicBool>,
    switches: Arc<AtomicU64>,
}

impl SyntheticLamp {
    /// Creates a lamp that is off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the lamp is on.
    pub fn is_lit(&self) -> bool {
        self.lit.load(Ordering::SeqCst)
    }

    /// Number of times the lamp was set, on or off.
    pub fn switch_count(&self) -> u64 {
        self.switches.load(Ordering::SeqCst)
    }
}

impl IlluminationControl for SyntheticLamp {
    fn set(&mut self, on: bool) -> Result<(), IlluminationError> {
        self.lit.store(on, Ordering::SeqCst);
        self.switches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A projected stripe as seen by one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stripe {
    /// The camera that sees the stripe.
    pub side: Side,
    /// Pixel position of the stripe centre.
    pub center: f64,
    /// Standard deviation of the stripe profile in pixels.
    pub sigma: f64,
    /// Peak intensity added by the stripe.
    pub amplitude: f64,
}

impl Stripe {
    /// Creates a stripe with a sigma of 1.5 pixels and an amplitude of 150.
    pub fn new(side: Side, center: f64) -> Self {
        Self {
            side,
            center,
            sigma: 1.5,
            amplitude: 150.0,
        }
    }
}

#[derive(Debug, Default)]
struct Scene {
    stripes: Mutex<Vec<Stripe>>,
    pending_failures: AtomicU32,
}

/// Shared handle to the scene rendered by a [`SyntheticStripeSource`].
#[derive(Debug, Clone, Default)]
pub struct SceneHandle {
    scene: Arc<Scene>,
}

impl SceneHandle {
    /// Replaces the stripes of the scene.
    pub fn set_stripes(&self, stripes: Vec<Stripe>) {
        *self
            .scene
            .stripes
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = stripes;
    }

    /// The current stripes of the scene.
    pub fn stripes(&self) -> Vec<Stripe> {
        self.scene
            .stripes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes the next `count` frame captures fail with [`FrameSourceError::Timeout`].
    pub fn inject_failures(&self, count: u32) {
        self.scene.pending_failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.scene
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Renders side-by-side stereo frames of projected stripes over a noisy ambient background.
pub struct SyntheticStripeSource {
    h_resolution: usize,
    v_resolution: usize,
    lamp: SyntheticLamp,
    scene: SceneHandle,
    ambient: u8,
    noise: u8,
    rng: StdRng,
}

impl SyntheticStripeSource {
    /// Creates a source rendering frames of `v_resolution` rows of `2 × h_resolution` samples.
    ///
    /// # Arguments
    ///
    /// * `h_resolution` - Samples per camera.
    /// * `v_resolution` - Rows per frame.
    /// * `lamp` - The lamp whose state decides whether stripes are rendered.
    pub fn new(h_resolution: usize, v_resolution: usize, lamp: SyntheticLamp) -> Self {
        Self {
            h_resolution,
            v_resolution,
            lamp,
            scene: SceneHandle::default(),
            ambient: 40,
            noise: 8,
            rng: StdRng::seed_from_u64(42),
        }
    }

    /// Sets the ambient background level and the maximum random noise added to it.
    pub fn with_ambient(mut self, ambient: u8, noise: u8) -> Self {
        self.ambient = ambient;
        self.noise = noise;
        self
    }

    /// Reseeds the noise generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// A handle to move the stripes and inject failures.
    pub fn scene(&self) -> SceneHandle {
        self.scene.clone()
    }

    fn render_row(&mut self) -> Vec<u8> {
        let stripes = if self.lamp.is_lit() {
            self.scene.stripes()
        } else {
            Vec::new()
        };

        let mut row = Vec::with_capacity(2 * self.h_resolution);
        for side in Side::BOTH {
            for x in 0..self.h_resolution {
                let mut value = self.ambient as f64;
                if self.noise > 0 {
                    value += self.rng.random_range(0..=self.noise) as f64;
                }
                for stripe in stripes.iter().filter(|s| s.side == side) {
                    let d = (x as f64 - stripe.center) / stripe.sigma;
                    value += stripe.amplitude * (-0.5 * d * d).exp();
                }
                row.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }
        row
    }
}

impl FrameSource for SyntheticStripeSource {
    fn capture_frame(&mut self) -> Result<RawFrame, FrameSourceError> {
        if self.scene.take_failure() {
            return Err(FrameSourceError::Timeout);
        }

        let row = self.render_row();
        let width = row.len();
        let data = row.repeat(self.v_resolution);
        RawFrame::new(width, self.v_resolution, data).ok_or_else(|| {
            FrameSourceError::Device("rendered frame has the wrong size".to_string())
        })
    }
}
