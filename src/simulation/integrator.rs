//! CPU reference integrator.
//!
//! Follows the leap-frog kernel step for step so GPU results can be checked
//! against it.

use crate::simulation::body::Body;
use crate::simulation::scenario::Physics;

/// Recomputes every body's acceleration from the current positions.
pub fn accelerations(universe: &mut [Body], physics: &Physics) {
    let eps2 = physics.softening * physics.softening;
    let updated: Vec<[f32; 3]> = (0..universe.len())
        .map(|i| {
            let here = universe[i].position;
            let mut acc = [0.0f32; 3];
            for (j, other) in universe.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = [
                    other.position[0] - here[0],
                    other.position[1] - here[1],
                    other.position[2] - here[2],
                ];
                let r2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2] + eps2;
                let scale = physics.gravitational_constant * other.mass / (r2 * r2.sqrt());
                for k in 0..3 {
                    acc[k] += scale * d[k];
                }
            }
            acc
        })
        .collect();

    for (body, acc) in universe.iter_mut().zip(updated) {
        body.acceleration = acc;
    }
}

/// Advances `universe` by `steps` kick-drift-kick steps of length `dt`.
///
/// Bodies start from `previous`; on return `position` is the final position
/// and `previous` the position one step earlier.
pub fn leap_frog(universe: &mut [Body], dt: f32, steps: u32, physics: &Physics) {
    for body in universe.iter_mut() {
        body.position = body.previous;
    }
    accelerations(universe, physics);

    let half = 0.5 * dt;
    for _ in 0..steps {
        for body in universe.iter_mut() {
            for k in 0..3 {
                body.velocity[k] += half * body.acceleration[k];
            }
            body.previous = body.position;
            for k in 0..3 {
                body.position[k] += dt * body.velocity[k];
            }
        }
        accelerations(universe, physics);
        for body in universe.iter_mut() {
            for k in 0..3 {
                body.velocity[k] += half * body.acceleration[k];
            }
        }
    }
}

/// Total momentum of the system.
pub fn total_momentum(universe: &[Body]) -> [f32; 3] {
    universe.iter().fold([0.0; 3], |acc, body| {
        let p = body.momentum();
        [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
    })
}

/// Kinetic plus softened gravitational potential energy, evaluated at `position`.
pub fn total_energy(universe: &[Body], physics: &Physics) -> f64 {
    let eps2 = f64::from(physics.softening * physics.softening);
    let g = f64::from(physics.gravitational_constant);
    let kinetic: f64 = universe.iter().map(|b| f64::from(b.kinetic_energy())).sum();

    let mut potential = 0.0f64;
    for (i, a) in universe.iter().enumerate() {
        for b in &universe[i + 1..] {
            let r2: f64 = (0..3)
                .map(|k| f64::from(a.position[k] - b.position[k]).powi(2))
                .sum();
            potential -= g * f64::from(a.mass) * f64::from(b.mass) / (r2 + eps2).sqrt();
        }
    }
    kinetic + potential
}

/// Largest Euclidean distance between corresponding body positions.
pub fn max_position_deviation(a: &[Body], b: &[Body]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            (0..3)
                .map(|k| (x.position[k] - y.position[k]).powi(2))
                .sum::<f32>()
                .sqrt()
        })
        .fold(0.0, f32::max)
}
