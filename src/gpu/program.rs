//! Kernel programs: loading WGSL source and compiling it on the device.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;

use log::{info, warn};
use pollster::FutureExt;

use crate::errors::{ComputeError, ComputeResult};
use crate::gpu::context::ComputeContext;
use crate::gpu::reflect::ProgramLayout;

/// Compile-time constants handed to a program.
///
/// Each define sets a pipeline-overridable constant (`override NAME: T = ...;`)
/// in the kernel source when a kernel is created from the program. A define
/// naming a constant the source does not declare is a build error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defines {
    values: BTreeMap<String, f64>,
}

impl Defines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Parses build options in `-D NAME=VALUE` form.
    ///
    /// Both `-D NAME=VALUE` and `-DNAME=VALUE` are accepted; a bare `-D NAME`
    /// defines `NAME` as `1`.
    pub fn parse(options: &str) -> ComputeResult<Self> {
        let invalid = |reason: String| ComputeError::InvalidBuildOptions {
            options: options.to_string(),
            reason,
        };

        let mut defines = Self::new();
        let mut tokens = options.split_whitespace();
        while let Some(token) = tokens.next() {
            let definition = match token.strip_prefix("-D") {
                Some("") => tokens
                    .next()
                    .ok_or_else(|| invalid("-D without a definition".to_string()))?,
                Some(rest) => rest,
                None => return Err(invalid(format!("unsupported option {token}"))),
            };

            let (name, value) = match definition.split_once('=') {
                Some((name, value)) => {
                    let value = value
                        .parse::<f64>()
                        .map_err(|_| invalid(format!("{value} is not a number")))?;
                    (name, value)
                }
                None => (definition, 1.0),
            };
            if !is_identifier(name) {
                return Err(invalid(format!("{name} is not an identifier")));
            }
            defines.values.insert(name.to_string(), value);
        }
        Ok(defines)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub(crate) fn to_constants(&self) -> HashMap<String, f64> {
        self.values.clone().into_iter().collect()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reads a kernel source file.
pub fn load_source(path: &Path) -> ComputeResult<String> {
    std::fs::read_to_string(path).map_err(|source| ComputeError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Severity of a compiler message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Error,
    Warning,
    Info,
}

/// One diagnostic produced while compiling a program.
#[derive(Debug, Clone)]
pub struct CompileMessage {
    pub level: MessageLevel,
    pub message: String,
    /// 1-based line and column, when the compiler reports a location.
    pub location: Option<(u32, u32)>,
}

impl From<&wgpu::CompilationMessage> for CompileMessage {
    fn from(message: &wgpu::CompilationMessage) -> Self {
        let level = match message.message_type {
            wgpu::CompilationMessageType::Error => MessageLevel::Error,
            wgpu::CompilationMessageType::Warning => MessageLevel::Warning,
            wgpu::CompilationMessageType::Info => MessageLevel::Info,
        };
        Self {
            level,
            message: message.message.clone(),
            location: message
                .location
                .map(|location| (location.line_number, location.line_position)),
        }
    }
}

/// A compiled kernel program.
pub struct Program {
    module: wgpu::ShaderModule,
    label: String,
    defines: Defines,
    messages: Vec<CompileMessage>,
    layout: ProgramLayout,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("label", &self.label)
            .field("defines", &self.defines)
            .field("messages", &self.messages)
            .field("layout", &self.layout)
            .finish()
    }
}

impl Program {
    /// Loads and compiles the kernel source at `path`.
    pub fn from_file(
        ctx: &ComputeContext,
        path: impl AsRef<Path>,
        defines: Defines,
    ) -> ComputeResult<Self> {
        let path = path.as_ref();
        let source = load_source(path)?;
        Self::from_source(ctx, &path.display().to_string(), &source, defines)
    }

    /// Compiles `source`; `label` names the program in logs and errors.
    pub fn from_source(
        ctx: &ComputeContext,
        label: &str,
        source: &str,
        defines: Defines,
    ) -> ComputeResult<Self> {
        let (module, error) = ctx.capture(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        info!("Program created from {}", label);

        let messages: Vec<CompileMessage> = module
            .get_compilation_info()
            .block_on()
            .messages
            .iter()
            .map(CompileMessage::from)
            .collect();

        let mut program = Self {
            module,
            label: label.to_string(),
            defines,
            messages,
            layout: ProgramLayout::default(),
        };

        let has_errors = program
            .messages
            .iter()
            .any(|m| m.level == MessageLevel::Error);
        if has_errors || error.is_some() {
            let mut log = program.build_log();
            if let Some(e) = error {
                if !log.is_empty() {
                    log.push('\n');
                }
                log.push_str(&e.to_string());
            }
            return Err(ComputeError::BuildProgramFailure {
                label: program.label,
                log,
            });
        }

        for message in program
            .messages
            .iter()
            .filter(|m| m.level == MessageLevel::Warning)
        {
            warn!("{}: {}", program.label, message.message);
        }

        program.layout = ProgramLayout::parse(&program.label, source)?;
        program.check_defines()?;
        info!("Program built from {}", program.label);
        Ok(program)
    }

    fn check_defines(&self) -> ComputeResult<()> {
        match self
            .defines
            .iter()
            .find(|(name, _)| !self.layout.has_override(name))
        {
            Some((name, value)) => Err(ComputeError::InvalidBuildOptions {
                options: format!("-D {name}={value}"),
                reason: format!("{} declares no override {name}", self.label),
            }),
            None => Ok(()),
        }
    }

    /// All compiler diagnostics, one per line as `line:col: level: message`.
    pub fn build_log(&self) -> String {
        let mut log = String::new();
        for message in &self.messages {
            if !log.is_empty() {
                log.push('\n');
            }
            if let Some((line, column)) = message.location {
                let _ = write!(log, "{line}:{column}: ");
            }
            let level = match message.level {
                MessageLevel::Error => "error",
                MessageLevel::Warning => "warning",
                MessageLevel::Info => "info",
            };
            let _ = write!(log, "{level}: {}", message.message);
        }
        log
    }

    pub fn messages(&self) -> &[CompileMessage] {
        &self.messages
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    /// Overridable constants and compute entry points the source declares.
    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    pub(crate) fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_separate_and_joined_defines() {
        let defines = Defines::parse("-D G=6.5 -DSOFTENING=0.01 -D FAST").unwrap();
        assert_eq!(defines.get("G"), Some(6.5));
        assert_eq!(defines.get("SOFTENING"), Some(0.01));
        assert_eq!(defines.get("FAST"), Some(1.0));
    }

    #[test]
    fn test_parse_empty_options() {
        assert!(Defines::parse("").unwrap().is_empty());
        assert!(Defines::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_options() {
        for options in ["-O3", "-D", "-D G=fast", "-D 1G=2", "-D =2"] {
            let result = Defines::parse(options);
            assert!(
                matches!(result, Err(ComputeError::InvalidBuildOptions { .. })),
                "{options} should be rejected"
            );
        }
    }

    #[test]
    fn test_later_define_wins() {
        let defines = Defines::parse("-D N=1 -D N=2").unwrap();
        assert_eq!(defines.get("N"), Some(2.0));
        assert_eq!(defines.iter().count(), 1);
    }

    #[test]
    fn test_load_missing_source() {
        let result = load_source(Path::new("/definitely/not/here.wgsl"));
        assert!(matches!(result, Err(ComputeError::SourceUnavailable { .. })));
    }
}
