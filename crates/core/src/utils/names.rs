/// Drop the package and enclosing-class prefix from a qualified class name.
///
/// `com.example.Outer$Inner` becomes `Inner`; an annotation keeps its `@`,
/// so `@com.example.Named` becomes `@Named`.
pub fn shorten(class_name: &str) -> String {
    let (at, name) = match class_name.strip_prefix('@') {
        Some(rest) => ("@", rest),
        None => ("", class_name),
    };
    let short = match name.rfind(['.', '$']) {
        Some(i) if i + 1 < name.len() => &name[i + 1..],
        _ => name,
    };
    format!("{at}{short}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("com.example.Service"), "Service");
        assert_eq!(shorten("com.example.Outer$Inner"), "Inner");
        assert_eq!(shorten("@com.google.inject.name.Named"), "@Named");
        assert_eq!(shorten("Plain"), "Plain");
        assert_eq!(shorten("trailing."), "trailing.");
        assert_eq!(shorten(""), "");
    }
}
