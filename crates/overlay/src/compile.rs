//! Boundary to the external program compiler and diagnostics sink.
//!
//! The core never compiles anything itself: it hands a [`ProgramRequest`]
//! to a [`ProgramCompiler`] supplied by the backend and forwards failures
//! to a [`DiagnosticsSink`] untouched.

use std::fmt;

use crate::types::{ContainerId, ProgramId};

/// Which footer the backend appends after the visualization's main source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    /// Calls `mainImage` and outputs its colour unchanged.
    Plain,
    /// Dims the image and composites a "play" triangle on top; used as the
    /// resting appearance of animatable visualizations.
    PauseOverlay,
}

/// Source material for one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRequest {
    pub label: String,
    /// Shared library prelude, already concatenated.
    pub library: String,
    /// The visualization's own source defining `mainImage`.
    pub main: String,
    pub appearance: Appearance,
}

impl ProgramRequest {
    pub fn new(
        label: impl Into<String>,
        library: impl Into<String>,
        main: impl Into<String>,
        appearance: Appearance,
    ) -> Self {
        Self {
            label: label.into(),
            library: library.into(),
            main: main.into(),
            appearance,
        }
    }

    /// Names of every `uniform float NAME;` declared in library or main.
    pub fn custom_uniforms(&self) -> Vec<String> {
        let mut names = declared_scalar_uniforms(&self.library);
        for name in declared_scalar_uniforms(&self.main) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{stage} shader did not compile successfully. Error log: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("Shader program did not link successfully. Error log: {0}")]
    Link(String),
}

/// Turns shader sources into program handles.
pub trait ProgramCompiler {
    fn compile(&mut self, request: &ProgramRequest) -> Result<ProgramId, CompileError>;
}

/// Receives per-visualization compile failures.
pub trait DiagnosticsSink {
    fn report(&mut self, container: ContainerId, label: &str, error: &CompileError);
}

/// Logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&mut self, container: ContainerId, label: &str, error: &CompileError) {
        tracing::error!(?container, label, "{error}");
    }
}

/// Keeps every reported failure, for callers that render them next to the
/// failed visualization.
#[derive(Debug, Default, Clone)]
pub struct CollectedDiagnostics {
    pub entries: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub container: ContainerId,
    pub label: String,
    pub message: String,
}

impl DiagnosticsSink for CollectedDiagnostics {
    fn report(&mut self, container: ContainerId, label: &str, error: &CompileError) {
        self.entries.push(Diagnostic {
            container,
            label: label.to_string(),
            message: error.to_string(),
        });
    }
}

/// Library code shared by every visualization on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderPrelude {
    source: String,
}

impl ShaderPrelude {
    /// Joins library snippets in document order, one per line.
    pub fn from_snippets<I, T>(snippets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let source = snippets
            .into_iter()
            .map(|snippet| snippet.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self { source }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn request(&self, label: &str, main: &str, appearance: Appearance) -> ProgramRequest {
        ProgramRequest::new(label, self.source.clone(), main, appearance)
    }
}

/// Scans GLSL for `uniform float NAME;` declarations (one or more names per
/// statement, possibly spread over several lines), skipping line comments.
pub fn declared_scalar_uniforms(source: &str) -> Vec<String> {
    let code = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");
    let mut names = Vec::new();
    for statement in code.split(|c: char| matches!(c, ';' | '{' | '}')) {
        let mut tokens = statement.split_whitespace();
        if tokens.next() != Some("uniform") {
            continue;
        }
        let mut kind = tokens.next();
        if matches!(kind, Some("highp" | "mediump" | "lowp")) {
            kind = tokens.next();
        }
        if kind != Some("float") {
            continue;
        }
        let rest = tokens.collect::<Vec<_>>().join(" ");
        for name in rest.split(',') {
            let name = name.trim();
            if is_identifier(name) && !names.iter().any(|known| known == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
