//! WGSL kernels shipped with the crate.

/// Entry point of [`LEAP_FROG_WGSL`].
pub const LEAP_FROG_ENTRY: &str = "leap_frog";

/// Fixed `@workgroup_size` of the leap-frog kernel.
pub const LEAP_FROG_MAX_BODIES: usize = 64;

/// Leap-frog N-body kernel.
///
/// Binding 0 is the body array, binding 1 the `SimParams` uniform. The
/// overridable constants `G` and `SOFTENING` are set through program defines.
/// One workgroup integrates at most [`LEAP_FROG_MAX_BODIES`] bodies.
pub const LEAP_FROG_WGSL: &str = include_str!("leap_frog.wgsl");

#[cfg(test)]
mod tests {
    use wgpu::naga;

    use super::*;
    use crate::gpu::reflect::{ProgramLayout, WorkgroupSize};

    #[test]
    fn test_leap_frog_compiles_without_a_device() {
        let module = naga::front::wgsl::parse_str(LEAP_FROG_WGSL)
            .unwrap_or_else(|e| panic!("{}", e.emit_to_string(LEAP_FROG_WGSL)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{}", e.emit_to_string(LEAP_FROG_WGSL)));
    }

    #[test]
    fn test_leap_frog_layout() {
        let layout = ProgramLayout::parse("leap_frog", LEAP_FROG_WGSL).unwrap();
        assert_eq!(
            layout.workgroup_size(LEAP_FROG_ENTRY),
            Some(&WorkgroupSize::Fixed(LEAP_FROG_MAX_BODIES as u32))
        );
        assert_eq!(layout.override_default("G"), Some(1.0));
        assert_eq!(layout.override_names().collect::<Vec<_>>(), ["G", "SOFTENING"]);
    }

    #[test]
    fn test_leap_frog_declares_entry_and_overrides() {
        assert!(LEAP_FROG_WGSL.contains(&format!("fn {LEAP_FROG_ENTRY}(")));
        assert!(LEAP_FROG_WGSL.contains(&format!("@workgroup_size({LEAP_FROG_MAX_BODIES})")));
        for name in ["G", "SOFTENING"] {
            assert!(LEAP_FROG_WGSL.contains(&format!("override {name}:")));
        }
    }

    #[test]
    fn test_leap_frog_body_layout_has_thirteen_floats() {
        let body = LEAP_FROG_WGSL
            .split("struct Body {")
            .nth(1)
            .and_then(|rest| rest.split('}').next())
            .unwrap();
        let floats: usize = body
            .lines()
            .map(|line| {
                if line.contains("array<f32, 3>") {
                    3
                } else if line.contains("f32") {
                    1
                } else {
                    0
                }
            })
            .sum();
        assert_eq!(floats, 13);
    }
}
