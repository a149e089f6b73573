//! Lexical path handling for trace paths
//!
//! Trace paths are strings recorded on another machine, so nothing here
//! touches the filesystem. Separators are always `/`.

/// Absolute paths pass through; relative ones are rebased under `prefix`.
pub fn canon_path(path: &str, prefix: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    if prefix.is_empty() {
        return clean(path);
    }
    clean(&format!("{}/{}", prefix, path))
}

/// Lexically normalizes a slash-separated path: collapses repeated
/// separators, drops `.` and resolves `..` where possible.
pub fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Directory part of a path, `"."` when there is none.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => ".",
    }
}

/// Final path component.
pub fn base(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}
