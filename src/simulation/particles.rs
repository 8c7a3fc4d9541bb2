//! Host-side particle state in Structure-of-Arrays layout.
//!
//! One `Vec<f32>` per attribute, all the same length, index-aligned: index
//! `i` in every column refers to the same logical particle. Velocity is not
//! stored explicitly — it is the difference between the current and previous
//! position, updated each step.
//!
//! This type exists for initial seeding, the one-time upload into
//! [`super::ParticleBuffers`], and as the CPU reference implementation of the
//! integration step used to validate the compute kernel.

use glam::Vec2;
use rand::Rng;

use crate::simulation::ATTRIBUTE_COUNT;

/// Minimum per-step drift speed, in NDC units per frame.
const MIN_SPEED: f32 = 0.004;
/// Maximum per-step drift speed, in NDC units per frame.
const MAX_SPEED: f32 = 0.010;

/// All particle attributes, in the fixed binding order shared with the
/// compute kernel: x/y current, x/y previous, mass, density.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    pub x_curr: Vec<f32>,
    pub y_curr: Vec<f32>,
    pub x_prev: Vec<f32>,
    pub y_prev: Vec<f32>,
    pub mass: Vec<f32>,
    pub density: Vec<f32>,
}

impl ParticleState {
    /// Seed `count` particles uniformly over the drawable area, mapped to the
    /// normalized device coordinate square `[-1, 1]²`.
    ///
    /// Each particle gets a small random drift at a uniform random angle,
    /// encoded Verlet-style: `curr = pos + vel`, `prev = pos`. Mass is 1,
    /// density starts at 0.
    pub fn seeded(count: usize, drawable_width: u32, drawable_height: u32) -> Self {
        let mut rng = rand::thread_rng();
        let half_width = drawable_width.max(1) as f32 * 0.5;
        let half_height = drawable_height.max(1) as f32 * 0.5;

        let mut state = Self::zeroed(count);
        for i in 0..count {
            let pixel_x = rng.gen_range(0.0..drawable_width.max(1) as f32);
            let pixel_y = rng.gen_range(0.0..drawable_height.max(1) as f32);
            let pos = Vec2::new(
                (pixel_x - half_width) / half_width,
                (pixel_y - half_height) / half_height,
            );

            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let speed = rng.gen_range(MIN_SPEED..MAX_SPEED);
            let vel = Vec2::from_angle(angle) * speed;

            state.x_curr[i] = pos.x + vel.x;
            state.y_curr[i] = pos.y + vel.y;
            state.x_prev[i] = pos.x;
            state.y_prev[i] = pos.y;
            state.mass[i] = 1.0;
            state.density[i] = 0.0;
        }
        state
    }

    /// All-zero state with `count` particles per attribute.
    pub fn zeroed(count: usize) -> Self {
        Self {
            x_curr: vec![0.0; count],
            y_curr: vec![0.0; count],
            x_prev: vec![0.0; count],
            y_prev: vec![0.0; count],
            mass: vec![0.0; count],
            density: vec![0.0; count],
        }
    }

    /// Rebuild a state from readback columns, in binding order.
    pub fn from_columns(columns: [Vec<f32>; ATTRIBUTE_COUNT]) -> Self {
        let [x_curr, y_curr, x_prev, y_prev, mass, density] = columns;
        Self {
            x_curr,
            y_curr,
            x_prev,
            y_prev,
            mass,
            density,
        }
    }

    /// Attribute columns as `(label, data)` pairs, in binding order.
    pub fn attributes(&self) -> [(&'static str, &[f32]); ATTRIBUTE_COUNT] {
        [
            ("x_curr", &self.x_curr),
            ("y_curr", &self.y_curr),
            ("x_prev", &self.x_prev),
            ("y_prev", &self.y_prev),
            ("mass", &self.mass),
            ("density", &self.density),
        ]
    }

    pub fn len(&self) -> usize {
        self.x_curr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_curr.is_empty()
    }

    /// CPU reference for one integration step, mirroring the compute kernel:
    /// `new = curr + (curr - prev)` with zero acceleration, old current value
    /// written into the previous slot.
    pub fn step_reference(&mut self) {
        for i in 0..self.len() {
            let curr = Vec2::new(self.x_curr[i], self.y_curr[i]);
            let prev = Vec2::new(self.x_prev[i], self.y_prev[i]);
            let next = curr + (curr - prev);

            self.x_prev[i] = curr.x;
            self.y_prev[i] = curr.y;
            self.x_curr[i] = next.x;
            self.y_curr[i] = next.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_state_is_index_aligned() {
        let state = ParticleState::seeded(1024, 800, 600);

        assert_eq!(state.len(), 1024);
        for (label, column) in state.attributes() {
            assert_eq!(column.len(), 1024, "attribute {} length mismatch", label);
        }
    }

    #[test]
    fn seeded_positions_and_velocities_are_in_range() {
        let state = ParticleState::seeded(1024, 800, 600);

        for i in 0..state.len() {
            // Previous position is the raw seed point inside the NDC square.
            assert!(state.x_prev[i].abs() <= 1.0);
            assert!(state.y_prev[i].abs() <= 1.0);

            // Velocity is encoded as curr - prev.
            let vel = Vec2::new(
                state.x_curr[i] - state.x_prev[i],
                state.y_curr[i] - state.y_prev[i],
            );
            let speed = vel.length();
            assert!(
                (MIN_SPEED - 1e-6..=MAX_SPEED + 1e-6).contains(&speed),
                "particle {} speed {} out of range",
                i,
                speed
            );

            assert_eq!(state.mass[i], 1.0);
            assert_eq!(state.density[i], 0.0);
        }
    }

    #[test]
    fn reference_step_preserves_velocity_without_acceleration() {
        // With zero acceleration, N steps must land each particle at
        // init + N * velocity. Particles may drift off-screen; that is
        // expected, not a bug.
        let mut state = ParticleState::seeded(1024, 800, 600);
        let initial = state.clone();
        let steps = 50;

        for _ in 0..steps {
            state.step_reference();
        }

        for i in 0..state.len() {
            let vel_x = initial.x_curr[i] - initial.x_prev[i];
            let vel_y = initial.y_curr[i] - initial.y_prev[i];
            let expected_x = initial.x_curr[i] + steps as f32 * vel_x;
            let expected_y = initial.y_curr[i] + steps as f32 * vel_y;

            assert!((state.x_curr[i] - expected_x).abs() < 1e-4);
            assert!((state.y_curr[i] - expected_y).abs() < 1e-4);
        }
    }

    #[test]
    fn reference_step_swaps_current_into_previous() {
        let mut state = ParticleState::zeroed(2);
        state.x_curr = vec![0.5, -0.25];
        state.y_curr = vec![0.1, 0.2];
        state.x_prev = vec![0.4, -0.30];
        state.y_prev = vec![0.1, 0.15];

        state.step_reference();

        assert_eq!(state.x_prev, vec![0.5, -0.25]);
        assert_eq!(state.y_prev, vec![0.1, 0.2]);
        assert!((state.x_curr[0] - 0.6).abs() < 1e-6);
        assert!((state.x_curr[1] - -0.2).abs() < 1e-6);
    }
}
