//! Pairwise repulsion kernel and explicit Euler integrator.

use crate::particle::Particle;
use simulation_common::{SimParams, Vec2};

/// Distance bookkeeping for the pairs that fell inside the cutoff, in cutoff units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionStats {
    pub min_distance: f64,
    pub distance_sum: f64,
    pub pairs: u64,
}

impl Default for InteractionStats {
    fn default() -> Self {
        // Distances are only tracked below the cutoff, so 1.0 is the ceiling
        Self { min_distance: 1.0, distance_sum: 0.0, pairs: 0 }
    }
}

impl InteractionStats {
    /// Combines two partial reductions.
    pub fn merge(self, other: Self) -> Self {
        Self {
            min_distance: self.min_distance.min(other.min_distance),
            distance_sum: self.distance_sum + other.distance_sum,
            pairs: self.pairs + other.pairs,
        }
    }

    /// Mean pair distance, if any pair interacted.
    pub fn mean_distance(&self) -> Option<f64> {
        (self.pairs > 0).then(|| self.distance_sum / self.pairs as f64)
    }
}

/// Adds the force `neighbor` exerts on `particle` to `acc`.
#[inline(always)]
pub fn apply_force(
    acc: &mut Vec2,
    particle: &Particle,
    neighbor: &Particle,
    params: &SimParams,
    stats: &mut InteractionStats,
) {
    let d = neighbor.pos - particle.pos;
    let mut r2 = d.length_squared();
    if r2 > params.cutoff_sq {
        return;
    }

    if r2 != 0.0 {
        let r = r2.sqrt() / params.cutoff;
        if r < stats.min_distance {
            stats.min_distance = r;
        }
        stats.distance_sum += r;
        stats.pairs += 1;
    }

    r2 = r2.max(params.min_r_sq);
    let r = r2.sqrt();

    // Very simple short-range repulsive force
    let coef = (1.0 - params.cutoff / r) / r2 / params.mass;
    *acc += d.scale(coef);
}

/// Integrates one step with explicit Euler and reflects off the domain walls.
#[inline(always)]
pub fn move_particle(particle: &mut Particle, params: &SimParams) {
    particle.vel += particle.acc * params.dt;
    particle.pos += particle.vel * params.dt;

    let size = params.domain_size;
    // Bounce until inside; one pass is enough unless the step is absurdly large
    while particle.pos.x < 0.0 || particle.pos.x > size {
        particle.pos.x = if particle.pos.x < 0.0 { -particle.pos.x } else { 2.0 * size - particle.pos.x };
        particle.vel.x = -particle.vel.x;
    }
    while particle.pos.y < 0.0 || particle.pos.y > size {
        particle.pos.y = if particle.pos.y < 0.0 { -particle.pos.y } else { 2.0 * size - particle.pos.y };
        particle.vel.y = -particle.vel.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulation_common::SimulationConfig;

    fn params() -> SimParams {
        SimulationConfig::default().sim_params(1000)
    }

    #[test]
    fn pairs_beyond_cutoff_do_not_interact() {
        let params = params();
        let a = Particle::at(Vec2::new(0.1, 0.1), Vec2::zero());
        let b = Particle::at(Vec2::new(0.1 + params.cutoff * 1.5, 0.1), Vec2::zero());
        let mut acc = Vec2::zero();
        let mut stats = InteractionStats::default();
        apply_force(&mut acc, &a, &b, &params, &mut stats);
        assert_eq!(acc, Vec2::zero());
        assert_eq!(stats, InteractionStats::default());
    }

    #[test]
    fn close_pairs_repel_and_are_counted() {
        let params = params();
        let a = Particle::at(Vec2::new(0.1, 0.1), Vec2::zero());
        let b = Particle::at(Vec2::new(0.1 + params.cutoff * 0.5, 0.1), Vec2::zero());
        let mut acc = Vec2::zero();
        let mut stats = InteractionStats::default();
        apply_force(&mut acc, &a, &b, &params, &mut stats);

        // b sits to the right, so a is pushed left
        assert!(acc.x < 0.0);
        assert_eq!(acc.y, 0.0);
        assert_eq!(stats.pairs, 1);
        assert!((stats.min_distance - 0.5).abs() < 1e-9);
        assert_eq!(stats.mean_distance(), Some(stats.distance_sum));
    }

    #[test]
    fn force_is_antisymmetric() {
        let params = params();
        let a = Particle::at(Vec2::new(0.2, 0.2), Vec2::zero());
        let b = Particle::at(Vec2::new(0.203, 0.204), Vec2::zero());
        let (mut acc_a, mut acc_b) = (Vec2::zero(), Vec2::zero());
        let mut stats = InteractionStats::default();
        apply_force(&mut acc_a, &a, &b, &params, &mut stats);
        apply_force(&mut acc_b, &b, &a, &params, &mut stats);
        assert!((acc_a.x + acc_b.x).abs() < 1e-6);
        assert!((acc_a.y + acc_b.y).abs() < 1e-6);
    }

    #[test]
    fn coincident_particles_feel_no_force_and_are_not_counted() {
        let params = params();
        let a = Particle::at(Vec2::new(0.3, 0.3), Vec2::zero());
        let mut acc = Vec2::zero();
        let mut stats = InteractionStats::default();
        apply_force(&mut acc, &a, &a, &params, &mut stats);
        assert_eq!(acc, Vec2::zero());
        assert_eq!(stats.pairs, 0);
        assert_eq!(stats.mean_distance(), None);
    }

    #[test]
    fn stats_merge_keeps_minimum_and_sums() {
        let a = InteractionStats { min_distance: 0.7, distance_sum: 2.0, pairs: 3 };
        let b = InteractionStats { min_distance: 0.5, distance_sum: 1.0, pairs: 1 };
        let merged = a.merge(b);
        assert_eq!(merged.min_distance, 0.5);
        assert_eq!(merged.distance_sum, 3.0);
        assert_eq!(merged.pairs, 4);
        assert_eq!(InteractionStats::default().merge(a), a);
    }

    #[test]
    fn euler_step_uses_acceleration() {
        let params = params();
        let mut p = Particle::at(Vec2::new(0.3, 0.3), Vec2::new(1.0, -1.0));
        p.acc = Vec2::new(2.0, 0.0);
        move_particle(&mut p, &params);
        let vx = 1.0 + 2.0 * params.dt;
        assert!((p.vel.x - vx).abs() < 1e-12);
        assert!((p.pos.x - (0.3 + vx * params.dt)).abs() < 1e-12);
        assert!((p.pos.y - (0.3 - params.dt)).abs() < 1e-12);
    }

    #[test]
    fn walls_reflect_position_and_velocity() {
        let params = params();
        let size = params.domain_size;
        let mut p = Particle::at(Vec2::new(size - 1e-5, 1e-5), Vec2::new(1.0, -1.0));
        move_particle(&mut p, &params);
        assert!(p.pos.x <= size && p.pos.x >= 0.0);
        assert!(p.pos.y <= size && p.pos.y >= 0.0);
        assert_eq!(p.vel, Vec2::new(-1.0, 1.0));
    }
}
