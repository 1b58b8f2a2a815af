//! Compiler boundary: turns a template reference plus inputs into a graph.
//!
//! Each call is a fresh compilation; nothing is cached here.

use crate::clout::CloutGraph;
use crate::vertex::CompiledGraph;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tosca_inventory_core::{
    CompileError, CompilerConfig, CompilerKind, DeriveOptions, Error, Inputs, Problem, Result,
    SourceLocation,
};
use tracing::debug;

#[async_trait::async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        template: &str,
        inputs: &Inputs,
    ) -> std::result::Result<Box<dyn CompiledGraph>, CompileError>;
}

/// Build the compiler described by the source's `compiler` section, bounded by
/// the configured timeout if there is one.
pub fn create_compiler(
    config: &CompilerConfig,
    options: &DeriveOptions,
) -> Result<Arc<dyn Compiler>> {
    let compiler: Arc<dyn Compiler> = match config.kind {
        CompilerKind::Clout => Arc::new(CloutFileCompiler),
        CompilerKind::Command => Arc::new(CommandCompiler::from_config(config)?),
    };
    Ok(match options.compile_timeout() {
        Some(timeout) => Arc::new(TimeoutCompiler::new(compiler, timeout)),
        None => compiler,
    })
}

// ---------------------------------------------------------------------------
// CloutFileCompiler
// ---------------------------------------------------------------------------

/// Treats the template reference as the path of an already-compiled clout document.
pub struct CloutFileCompiler;

#[async_trait::async_trait]
impl Compiler for CloutFileCompiler {
    async fn compile(
        &self,
        template: &str,
        inputs: &Inputs,
    ) -> std::result::Result<Box<dyn CompiledGraph>, CompileError> {
        if !inputs.is_empty() {
            debug!(template, "inputs ignored for precompiled clout");
        }
        let text = tokio::fs::read_to_string(template).await.map_err(|e| {
            CompileError::with_problems(
                format!("cannot read clout: {}", e),
                vec![Problem::new(e.to_string()).at(SourceLocation::new(template))],
            )
        })?;
        Ok(Box::new(CloutGraph::parse(&text)?))
    }
}

// ---------------------------------------------------------------------------
// CommandCompiler
// ---------------------------------------------------------------------------

/// Runs an external compiler executable and reads the clout from its stdout.
///
/// Invocation: `<program> <args...> <template> [<input_flag> name=<json>]...`
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
    input_flag: String,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input_flag: "--input".into(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input_flag(mut self, flag: impl Into<String>) -> Self {
        self.input_flag = flag.into();
        self
    }

    pub fn from_config(config: &CompilerConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| Error::config("`compiler.command` must name a program"))?;
        Ok(Self::new(program)
            .with_args(args.iter().cloned())
            .with_input_flag(&config.input_flag))
    }

    fn command_args(&self, template: &str, inputs: &Inputs) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(template.to_string());
        for (name, value) in inputs {
            args.push(self.input_flag.clone());
            args.push(format!("{}={}", name, value));
        }
        args
    }
}

#[async_trait::async_trait]
impl Compiler for CommandCompiler {
    async fn compile(
        &self,
        template: &str,
        inputs: &Inputs,
    ) -> std::result::Result<Box<dyn CompiledGraph>, CompileError> {
        let args = self.command_args(template, inputs);
        debug!(program = %self.program, ?args, "running compiler");

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CompileError::new(format!("cannot run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompileError::with_problems(
                format!("{} exited with {}", self.program, output.status),
                parse_problems(&stderr),
            ));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| CompileError::new(format!("{} wrote non-UTF-8 output", self.program)))?;
        Ok(Box::new(CloutGraph::parse(&stdout)?))
    }
}

/// Parse compiler diagnostics, one problem per non-empty line.
/// Lines shaped `location:row:column: message` keep their location.
pub fn parse_problems(text: &str) -> Vec<Problem> {
    static LOCATED: OnceLock<Option<Regex>> = OnceLock::new();
    let re = LOCATED.get_or_init(|| {
        Regex::new(r"^(?P<url>\S+?):(?P<row>\d+):(?P<column>\d+):\s*(?P<message>.+)$").ok()
    });

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match re.as_ref().and_then(|re| re.captures(line)) {
            Some(caps) => {
                let mut location = SourceLocation::new(&caps["url"]);
                location.row = caps["row"].parse().ok();
                location.column = caps["column"].parse().ok();
                Problem::new(&caps["message"]).at(location)
            }
            None => Problem::new(line),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// TimeoutCompiler
// ---------------------------------------------------------------------------

/// Bounds every compile call. An expired call is a compile error like any other.
pub struct TimeoutCompiler {
    inner: Arc<dyn Compiler>,
    timeout: Duration,
}

impl TimeoutCompiler {
    pub fn new(inner: Arc<dyn Compiler>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl Compiler for TimeoutCompiler {
    async fn compile(
        &self,
        template: &str,
        inputs: &Inputs,
    ) -> std::result::Result<Box<dyn CompiledGraph>, CompileError> {
        match tokio::time::timeout(self.timeout, self.inner.compile(template, inputs)).await {
            Ok(result) => result,
            Err(_) => Err(CompileError::new(format!(
                "compilation timed out after {:?}",
                self.timeout
            ))),
        }
    }
}
