//! Key path helpers shared by the HTTP backends

/// Percent-encode every segment of a slash-delimited key, keeping `/` as the
/// separator. A leading `/` is dropped; callers add their own API prefix.
pub(crate) fn encode_key(key: &str) -> String {
    key.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn a list path into a directory prefix: `"app"` and `"/app/"` both become
/// `"app/"`, and the root (`""` or `"/"`) becomes `""`.
pub(crate) fn directory_prefix(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// True when `key` sits directly under `prefix` (no deeper `/`, not the
/// directory marker itself).
pub(crate) fn is_immediate_child(prefix: &str, key: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

/// etcd reports keys with a single leading `/`, no trailing `/` and no
/// empty segments (`a//b` comes back as `/a/b`)
pub(crate) fn etcd_canonical(key: &str) -> String {
    let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
