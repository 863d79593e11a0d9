use anyhow::Result;
use rand::distr::Uniform;
use rand::prelude::*;
use simulation_common::Vec2;

/// One point particle. Its identity is its slot in the particle store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Acceleration applied by the most recent move.
    pub acc: Vec2,
}

impl Particle {
    pub fn at(pos: Vec2, vel: Vec2) -> Self {
        Self { pos, vel, acc: Vec2::zero() }
    }
}

/// Places `count` particles on a lattice inside `[0, domain_size]^2`.
///
/// Lattice slots are handed out through a shuffled permutation so that
/// particle index and position are uncorrelated; the lattice spacing keeps
/// particles apart at start. Velocities are uniform in `[-1, 1)`.
pub fn init_particles(count: usize, domain_size: f64, rng: &mut StdRng) -> Result<Vec<Particle>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let sx = (count as f64).sqrt().ceil() as usize;
    let sy = count.div_ceil(sx);

    // Make sure particles are not spatially sorted
    let mut slots: Vec<usize> = (0..count).collect();
    slots.shuffle(rng);

    let speed_dist = Uniform::new(-1.0f64, 1.0f64)?;
    let particles = slots
        .into_iter()
        .map(|k| {
            let pos = Vec2::new(
                domain_size * (1 + k % sx) as f64 / (1 + sx) as f64,
                domain_size * (1 + k / sx) as f64 / (1 + sy) as f64,
            );
            let vel = Vec2::new(rng.sample(&speed_dist), rng.sample(&speed_dist));
            Particle::at(pos, vel)
        })
        .collect();
    Ok(particles)
}
