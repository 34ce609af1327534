use std::fmt::Write;

use injectscope_core::{LaunchSpec, command::CLASSPATH_FLAG};

/// Human-readable breakdown of a launch; `delimiter` splits the classpath
pub fn format_command_breakdown(spec: &LaunchSpec, delimiter: &str) -> String {
    let mut out = String::new();
    writeln!(out, "   Command breakdown:").ok();
    writeln!(out, "      • runtime: {}", spec.program).ok();

    let flags: Vec<&String> = spec
        .args
        .iter()
        .take_while(|arg| *arg != CLASSPATH_FLAG)
        .collect();
    if !flags.is_empty() {
        writeln!(out, "      • flags: {:?}", flags).ok();
    }

    if let Some(classpath) = spec.classpath() {
        writeln!(out, "      • classpath:").ok();
        for segment in classpath.split(delimiter).filter(|s| !s.is_empty()) {
            writeln!(out, "          {}", segment).ok();
        }
    }

    if let Some(class) = spec.snippet_class() {
        writeln!(out, "      • snippet: {}", class).ok();
    }

    let args = spec.snippet_args();
    if !args.is_empty() {
        writeln!(out, "      • args: {:?}", args).ok();
    }

    if let Some(ref dir) = spec.working_dir {
        writeln!(out, "      • working dir: {}", dir.display()).ok();
    }
    out
}

pub fn print_command_breakdown(spec: &LaunchSpec, delimiter: &str) {
    print!("{}", format_command_breakdown(spec, delimiter));
}

#[cfg(test)]
mod tests {
    use super::*;
    use injectscope_core::{ClasspathProject, LaunchSpecBuilder};

    #[test]
    fn test_classpath_split_on_project_delimiter() {
        let project = ClasspathProject::new("win")
            .with_snippets_classpath(r"C:\tools\snippets.jar")
            .with_library_classpath(r"C:\libs\guice.jar")
            .with_project_classpath(r"C:\app\classes")
            .with_delimiter(";");
        let spec = LaunchSpecBuilder::for_project(&project)
            .snippet("a.Snippet", Vec::new())
            .build()
            .unwrap();

        let breakdown = format_command_breakdown(&spec, ";");
        assert!(breakdown.contains("          C:\\tools\\snippets.jar\n          C:\\libs\\guice.jar\n          C:\\app\\classes\n"));
        assert!(breakdown.contains("      • snippet: a.Snippet\n"));
        assert!(!breakdown.contains("working dir"));
    }
}
