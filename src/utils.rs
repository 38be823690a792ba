// Path helpers shared by the operations, kept free of I/O for testing.

/// Directory prefixes to create for `path`, shortest first, each with a
/// trailing slash. A leading `/` is preserved and empty segments are skipped.
/// With `exclude_last_segment` the final segment (a file name) is left out.
pub fn directory_prefixes(path: &str, exclude_last_segment: bool) -> Vec<String> {
    let (mut built, rest) = match path.strip_prefix('/') {
        Some(rest) => ("/".to_string(), rest),
        None => (String::new(), path),
    };

    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if exclude_last_segment {
        segments.pop();
    }

    segments
        .into_iter()
        .map(|segment| {
            built.push_str(segment);
            built.push('/');
            built.clone()
        })
        .collect()
}

/// Turns a `file://` or `file:` reference into a plain local path.
pub fn strip_file_scheme(reference: &str) -> &str {
    reference
        .strip_prefix("file://")
        .or_else(|| reference.strip_prefix("file:"))
        .unwrap_or(reference)
}

/// `parent + "/" + name`, verbatim. Callers rely on the exact concatenation.
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_absolute_path() {
        assert_eq!(
            directory_prefixes("/a/b/c", false),
            vec!["/a/", "/a/b/", "/a/b/c/"]
        );
    }

    #[test]
    fn test_prefixes_exclude_file_name() {
        assert_eq!(
            directory_prefixes("/uploads/2024/photo.jpg", true),
            vec!["/uploads/", "/uploads/2024/"]
        );
    }

    #[test]
    fn test_prefixes_relative_path() {
        assert_eq!(directory_prefixes("a/b/file.txt", true), vec!["a/", "a/b/"]);
    }

    #[test]
    fn test_prefixes_bare_file_name_creates_nothing() {
        assert!(directory_prefixes("file.txt", true).is_empty());
        assert!(directory_prefixes("/file.txt", true).is_empty());
    }

    #[test]
    fn test_prefixes_edge_cases() {
        assert!(directory_prefixes("", false).is_empty());
        assert!(directory_prefixes("/", false).is_empty());
        assert_eq!(directory_prefixes("/a//b/", false), vec!["/a/", "/a/b/"]);
        // A trailing slash leaves no file segment, so the last directory goes.
        assert_eq!(directory_prefixes("/a/b/", true), vec!["/a/"]);
    }

    #[test]
    fn test_strip_file_scheme() {
        assert_eq!(strip_file_scheme("file:///tmp/x.txt"), "/tmp/x.txt");
        assert_eq!(strip_file_scheme("file:/tmp/x.txt"), "/tmp/x.txt");
        assert_eq!(strip_file_scheme("/tmp/x.txt"), "/tmp/x.txt");
        assert_eq!(strip_file_scheme("relative/x.txt"), "relative/x.txt");
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("/home", "docs"), "/home/docs");
        assert_eq!(child_path("/", "docs"), "//docs");
        assert_eq!(child_path("/home", ".."), "/home/..");
    }
}
