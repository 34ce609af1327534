use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// What happens when the user activates a piece of result text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    GotoCodeLocation {
        file: String,
        line: u32,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        stack_trace: Vec<StackFrame>,
    },
    GotoFile {
        class_name: String,
    },
    #[default]
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub class_name: String,
    pub method_name: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

// The stack trace is context for the jump, not part of where it goes.
impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Action::GotoCodeLocation { file, line, .. },
                Action::GotoCodeLocation {
                    file: other_file,
                    line: other_line,
                    ..
                },
            ) => file == other_file && line == other_line,
            (
                Action::GotoFile { class_name },
                Action::GotoFile {
                    class_name: other_class,
                },
            ) => class_name == other_class,
            (Action::Null, Action::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Action {}

impl Action {
    pub fn goto_location(file: impl Into<String>, line: u32) -> Self {
        Action::GotoCodeLocation {
            file: file.into(),
            line,
            stack_trace: Vec::new(),
        }
    }

    pub fn goto_file(class_name: impl Into<String>) -> Self {
        Action::GotoFile {
            class_name: class_name.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Action::Null)
    }

    /// Decode an action sent by a snippet or host, rejecting kinds this
    /// crate does not know how to perform
    pub fn from_json(value: &Value) -> Result<Self> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidAction(format!("missing action kind in {value}")))?;

        match kind {
            "goto_code_location" | "goto_file" | "null" => Action::deserialize(value)
                .map_err(|e| Error::InvalidAction(format!("{kind}: {e}"))),
            other => Err(Error::InvalidAction(format!("unknown action kind '{other}'"))),
        }
    }
}

/// Performs actions on behalf of the host.
///
/// `run` is the single dispatch point; implementors only provide the concrete jumps.
pub trait ActionsHandler {
    fn goto_code_location(&self, file: &str, line: u32, stack_trace: &[StackFrame]) -> Result<()>;

    fn goto_file(&self, class_name: &str) -> Result<()>;

    fn run(&self, action: &Action) -> Result<()> {
        match action {
            Action::GotoCodeLocation {
                file,
                line,
                stack_trace,
            } => self.goto_code_location(file, *line, stack_trace),
            Action::GotoFile { class_name } => self.goto_file(class_name),
            Action::Null => Ok(()),
        }
    }
}
