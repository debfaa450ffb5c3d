//! What a kernel source declares, read from the driver's own WGSL front end.
//!
//! The device compiles the source itself; this pass only answers the host's
//! questions about it: which overridable constants exist (so a define can be
//! checked against them) and how wide each compute entry point's workgroup is.

use std::collections::BTreeMap;

use wgpu::naga;

use crate::errors::{ComputeError, ComputeResult};

/// Workgroup width (x dimension) of a compute entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkgroupSize {
    /// `@workgroup_size(64)`.
    Fixed(u32),
    /// `@workgroup_size(NAME)` where `NAME` is an overridable constant.
    Override { name: String, default: Option<u32> },
}

/// Overridable constants and compute entry points of a kernel source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramLayout {
    overrides: BTreeMap<String, Option<f64>>,
    entry_points: BTreeMap<String, WorkgroupSize>,
}

impl ProgramLayout {
    /// Parses `source`; `label` names it in the error.
    pub fn parse(label: &str, source: &str) -> ComputeResult<Self> {
        let module =
            naga::front::wgsl::parse_str(source).map_err(|e| ComputeError::BuildProgramFailure {
                label: label.to_string(),
                log: e.emit_to_string(source),
            })?;
        Self::from_module(&module).map_err(|reason| ComputeError::BuildProgramFailure {
            label: label.to_string(),
            log: reason,
        })
    }

    fn from_module(module: &naga::Module) -> Result<Self, String> {
        let overrides = module
            .overrides
            .iter()
            .filter_map(|(_, o)| {
                let name = o.name.clone()?;
                let default = o.init.and_then(|init| literal_value(module, init));
                Some((name, default))
            })
            .collect();

        let mut entry_points = BTreeMap::new();
        for entry in module
            .entry_points
            .iter()
            .filter(|e| e.stage == naga::ShaderStage::Compute)
        {
            let size = match entry.workgroup_size_overrides.and_then(|sizes| sizes[0]) {
                None => WorkgroupSize::Fixed(entry.workgroup_size[0]),
                Some(expr) => match module.global_expressions[expr] {
                    naga::Expression::Override(handle) => {
                        let o = &module.overrides[handle];
                        WorkgroupSize::Override {
                            name: o.name.clone().unwrap_or_default(),
                            default: o
                                .init
                                .and_then(|init| literal_value(module, init))
                                .map(|v| v as u32),
                        }
                    }
                    _ => {
                        return Err(format!(
                            "{}: workgroup size must be a literal or a single overridable constant",
                            entry.name
                        ));
                    }
                },
            };
            entry_points.insert(entry.name.clone(), size);
        }

        Ok(Self {
            overrides,
            entry_points,
        })
    }

    /// Whether the source declares `override NAME`.
    pub fn has_override(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }

    /// Default value of `override NAME`, when it has a literal one.
    pub fn override_default(&self, name: &str) -> Option<f64> {
        self.overrides.get(name).copied().flatten()
    }

    pub fn override_names(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(String::as_str)
    }

    /// Workgroup width of compute entry point `name`.
    pub fn workgroup_size(&self, name: &str) -> Option<&WorkgroupSize> {
        self.entry_points.get(name)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.entry_points.keys().map(String::as_str)
    }
}

fn literal_value(module: &naga::Module, expr: naga::Handle<naga::Expression>) -> Option<f64> {
    use naga::Literal;

    match module.global_expressions[expr] {
        naga::Expression::Literal(literal) => match literal {
            Literal::F64(v) | Literal::AbstractFloat(v) => Some(v),
            Literal::F32(v) => Some(f64::from(v)),
            Literal::U32(v) => Some(f64::from(v)),
            Literal::I32(v) => Some(f64::from(v)),
            Literal::U64(v) => Some(v as f64),
            Literal::I64(v) | Literal::AbstractInt(v) => Some(v as f64),
            Literal::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
        },
        _ => None,
    }
}
