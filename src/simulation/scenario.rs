//! Simulation scenarios: initial bodies, time stepping and physical constants.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{SimulationError, SimulationResult};
use crate::gpu::Defines;
use crate::simulation::body::{Body, SimParams};

/// Physical constants used by both integrators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    #[serde(default = "Physics::default_gravitational_constant")]
    pub gravitational_constant: f32,
    /// Plummer softening length, keeps close encounters finite.
    #[serde(default = "Physics::default_softening")]
    pub softening: f32,
}

impl Physics {
    fn default_gravitational_constant() -> f32 {
        1.0
    }

    fn default_softening() -> f32 {
        0.01
    }

    pub fn new() -> Self {
        Self {
            gravitational_constant: Self::default_gravitational_constant(),
            softening: Self::default_softening(),
        }
    }

    pub fn with_gravitational_constant(mut self, g: f32) -> Self {
        self.gravitational_constant = g;
        self
    }

    pub fn with_softening(mut self, softening: f32) -> Self {
        self.softening = softening;
        self
    }

    /// Program defines setting the kernel's `G` and `SOFTENING` constants.
    pub fn defines(&self) -> Defines {
        Defines::new()
            .with("G", f64::from(self.gravitational_constant))
            .with("SOFTENING", f64::from(self.softening))
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

/// Initial state of one body in a scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub name: String,
    pub position: [f32; 3],
    #[serde(default)]
    pub velocity: [f32; 3],
    pub mass: f32,
}

/// A complete simulation setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// Length of one time step.
    pub dt: f32,
    /// Total simulated time.
    pub t_max: f32,
    #[serde(default)]
    pub physics: Physics,
    pub bodies: Vec<BodySpec>,
}

impl Scenario {
    /// Sun, earth and moon, integrated for 100 time units in steps of 0.01.
    pub fn three_body() -> Self {
        Self {
            name: Some("sun-earth-moon".to_string()),
            dt: 0.01,
            t_max: 100.0,
            physics: Physics::default(),
            bodies: vec![
                // Sun at the centre
                BodySpec {
                    name: "sun".to_string(),
                    position: [0.0, 0.0, 0.0],
                    velocity: [0.0, 0.0, 0.0],
                    mass: 5.0,
                },
                BodySpec {
                    name: "earth".to_string(),
                    position: [40.0, 0.0, 0.0],
                    velocity: [0.0, 2.0, 0.0],
                    mass: 81.3,
                },
                BodySpec {
                    name: "moon".to_string(),
                    position: [44.0, 0.0, 0.0],
                    velocity: [0.0, -0.8, 0.0],
                    mass: 10.0,
                },
            ],
        }
    }

    pub fn from_json_str(json: &str) -> SimulationResult<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> SimulationResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| SimulationError::ScenarioIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> SimulationResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> SimulationResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimulationError::InvalidTimeStep { dt: self.dt });
        }
        if !self.t_max.is_finite() || self.t_max < 0.0 {
            return Err(SimulationError::InvalidDuration { t_max: self.t_max });
        }
        if self.bodies.is_empty() {
            return Err(SimulationError::EmptyUniverse);
        }
        for body in &self.bodies {
            if !body.mass.is_finite() || body.mass <= 0.0 {
                return Err(SimulationError::InvalidMass {
                    name: body.name.clone(),
                    mass: body.mass,
                });
            }
            for (field, value) in [("position", body.position), ("velocity", body.velocity)] {
                if !value.iter().all(|v| v.is_finite()) {
                    return Err(SimulationError::InvalidBody {
                        name: body.name.clone(),
                        field,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of whole time steps that fit in `t_max`.
    pub fn steps(&self) -> u32 {
        // Rounded so that e.g. 100 / 0.01 yields 10000 despite f32 error.
        (self.t_max / self.dt).round() as u32
    }

    /// Host-side array of bodies in their initial state.
    pub fn universe(&self) -> Vec<Body> {
        self.bodies
            .iter()
            .map(|spec| Body::new(spec.position, spec.velocity, spec.mass))
            .collect()
    }

    pub fn params(&self) -> SimParams {
        SimParams {
            dt: self.dt,
            count: self.bodies.len() as u32,
            t_max: self.t_max,
            steps: self.steps(),
        }
    }

    pub fn body_names(&self) -> impl Iterator<Item = &str> {
        self.bodies.iter().map(|body| body.name.as_str())
    }
}
