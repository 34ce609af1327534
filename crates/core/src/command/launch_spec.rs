use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::{
    error::{Error, Result},
    project::Project,
};

pub const CLASSPATH_FLAG: &str = "-classpath";

/// A fully resolved snippet command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// The joined classpath passed after `-classpath`
    pub fn classpath(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == CLASSPATH_FLAG)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// The snippet class, i.e. the first argument after the classpath value
    pub fn snippet_class(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == CLASSPATH_FLAG)
            .and_then(|i| self.args.get(i + 2))
            .map(String::as_str)
    }

    /// Arguments handed to the snippet class itself
    pub fn snippet_args(&self) -> &[String] {
        match self.args.iter().position(|arg| arg == CLASSPATH_FLAG) {
            Some(i) if i + 3 <= self.args.len() => &self.args[i + 3..],
            _ => &[],
        }
    }

    pub fn to_shell_command(&self) -> String {
        let mut cmd = quote(&self.program);
        for arg in &self.args {
            cmd.push(' ');
            cmd.push_str(&quote(arg));
        }
        cmd
    }

    /// Build a process command with piped stdout/stderr and no stdin
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}

/// POSIX single-quoting for anything outside a conservative safe set
fn quote(arg: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "_-./:=,@+%".contains(c);
    if !arg.is_empty() && arg.chars().all(safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Builds the snippet command line for a project:
/// `[runtime, ...flags, -classpath, snippets[:library]:project, class, ...args]`,
/// run from the project's working directory when it has one
pub struct LaunchSpecBuilder<'a> {
    project: &'a dyn Project,
    class_name: String,
    class_args: Vec<String>,
}

impl<'a> LaunchSpecBuilder<'a> {
    pub fn for_project(project: &'a dyn Project) -> Self {
        Self {
            project,
            class_name: String::new(),
            class_args: Vec::new(),
        }
    }

    pub fn snippet(mut self, class_name: impl Into<String>, args: Vec<String>) -> Self {
        self.class_name = class_name.into();
        self.class_args = args;
        self
    }

    pub fn build(self) -> Result<LaunchSpec> {
        if self.class_name.trim().is_empty() {
            return Err(Error::Other("no snippet class to run".to_string()));
        }

        let classpath = self.joined_classpath()?;

        let mut args = self.project.runtime_flags()?;
        args.push(CLASSPATH_FLAG.to_string());
        args.push(classpath);
        args.push(self.class_name);
        args.extend(self.class_args);

        let spec = LaunchSpec {
            program: self.project.runtime_command()?,
            args,
            working_dir: self.project.working_dir(),
        };
        debug!("Built launch spec: {}", spec.to_shell_command());
        Ok(spec)
    }

    fn joined_classpath(&self) -> Result<String> {
        let delimiter = self.project.classpath_delimiter();

        let mut segments = vec![self.project.snippets_classpath()?];
        if let Some(library) = self.project.library_classpath()? {
            if !library.is_empty() {
                segments.push(library);
            }
        }
        segments.push(self.project.project_classpath()?);

        Ok(segments.join(&delimiter))
    }
}
