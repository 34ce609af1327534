use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::error::{Error, Result};

/// One snippet's report: what it inspected plus any problems it ran into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetResult {
    #[serde(flatten)]
    pub output: SnippetOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<CodeProblem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnippetOutput {
    Module {
        name: String,
        #[serde(default = "default_valid")]
        valid: bool,
        #[serde(default)]
        has_default_constructor: bool,
    },
    Context {
        name: String,
        #[serde(default)]
        modules: Vec<String>,
        #[serde(default)]
        bindings: Vec<Binding>,
    },
}

fn default_valid() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// The injection key, usually a fully-qualified type name
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<CodeLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLocation {
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeProblem {
    pub kind: ProblemKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<CodeLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    InvalidModule,
    Binding,
    OutOfScope,
    Exception,
}

impl SnippetResult {
    pub fn module(name: impl Into<String>, valid: bool) -> Self {
        Self {
            output: SnippetOutput::Module {
                name: name.into(),
                valid,
                has_default_constructor: false,
            },
            problems: Vec::new(),
        }
    }

    pub fn context(name: impl Into<String>, modules: Vec<String>, bindings: Vec<Binding>) -> Self {
        Self {
            output: SnippetOutput::Context {
                name: name.into(),
                modules,
                bindings,
            },
            problems: Vec::new(),
        }
    }

    pub fn with_problem(mut self, problem: CodeProblem) -> Self {
        self.problems.push(problem);
        self
    }

    /// Name of the module or context this result describes
    pub fn name(&self) -> &str {
        match &self.output {
            SnippetOutput::Module { name, .. } | SnippetOutput::Context { name, .. } => name,
        }
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Read exactly one JSON value from `reader`.
    ///
    /// Anything after the value is left unread; an empty stream is
    /// `MissingOutput`, anything unparseable is `MalformedOutput`.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut stream = serde_json::Deserializer::from_reader(reader).into_iter::<Self>();
        match stream.next() {
            Some(Ok(result)) => Ok(result),
            Some(Err(e)) if e.is_eof() && e.line() <= 1 && e.column() == 0 => {
                Err(Error::MissingOutput)
            }
            Some(Err(e)) if e.is_io() => Err(Error::Io(e.into())),
            Some(Err(e)) => Err(Error::MalformedOutput(e.to_string())),
            None => Err(Error::MissingOutput),
        }
    }
}

impl CodeProblem {
    pub fn new(kind: ProblemKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.location = Some(CodeLocation {
            file: file.into(),
            line,
        });
        self
    }
}
