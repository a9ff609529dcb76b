//! Slash-separated store paths.
//!
//! Paths are relative to the store root and normalized: no leading, trailing or repeated
//! slashes, `.` segments dropped and `..` resolved. The root itself is the empty string.

use itertools::Itertools;

/// Normalize a store path.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.iter().join("/")
}

/// Resolve `child` relative to the group at `base`.
pub fn group_path(base: &str, child: &str) -> String {
    normalize(&format!("{base}/{child}"))
}

/// The parent of a normalized path, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map_or("", |(parent, _)| parent))
}

/// Every proper ancestor of a normalized path, root first, followed by the path itself.
pub fn ancestors_and_self(path: &str) -> Vec<String> {
    let mut result = vec![String::new()];
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        result.push(current.clone());
    }
    result
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", "")]
    #[case("/", "")]
    #[case("/my-tree/", "my-tree")]
    #[case("a//b/./c", "a/b/c")]
    #[case("a/b/../c", "a/c")]
    #[case("../a", "a")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn joins_children() {
        assert_eq!(group_path("my-tree", "coordinates"), "my-tree/coordinates");
        assert_eq!(group_path("/forest/tree/", "/values"), "forest/tree/values");
        assert_eq!(group_path("", "values"), "values");
    }

    #[test]
    fn parents_and_ancestors() {
        assert_eq!(parent(""), None);
        assert_eq!(parent("tree"), Some(""));
        assert_eq!(parent("forest/tree"), Some("forest"));
        assert_eq!(
            ancestors_and_self("forest/tree"),
            vec!["".to_string(), "forest".to_string(), "forest/tree".to_string()]
        );
    }
}
