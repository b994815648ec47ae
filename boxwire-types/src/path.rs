//! Slash-delimited command paths.

use std::sync::LazyLock;

use regex::Regex;

use crate::ObjectId;

static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/[A-Za-z0-9_.:\-]+)+$").expect("path regex"));

/// Returns true for an absolute path made of non-empty segments.
pub fn is_valid(path: &str) -> bool {
    PATH_RE.is_match(path)
}

/// Join a base path and a relative path, normalising the separator between
/// them. An empty base yields the relative path unchanged.
pub fn join(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    if rel.is_empty() {
        return base.to_string();
    }
    if rel.starts_with('/') {
        format!("{}{}", base, rel)
    } else {
        format!("{}/{}", base, rel)
    }
}

/// Path addressing an object by identity: `<namespace>/<id><rel>`.
pub fn identity_path(namespace: &str, id: ObjectId, rel: &str) -> String {
    join(&format!("{}/{}", namespace.trim_end_matches('/'), id), rel)
}

/// Split an identity-addressed path into the id and the remaining relative
/// path. Returns `None` if `path` is not under `namespace`.
pub fn split_identity_path<'a>(namespace: &str, path: &'a str) -> Option<(ObjectId, &'a str)> {
    let rest = path.strip_prefix(namespace.trim_end_matches('/'))?;
    let rest = rest.strip_prefix('/')?;
    let (id, rel) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    ObjectId::parse(id).ok().map(|id| (id, rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validates_paths() {
        assert!(is_valid("/scene/status"));
        assert!(is_valid("/doc/uuid/0123456789abcdef0123456789abcdef/name"));
        assert!(!is_valid("scene/status"));
        assert!(!is_valid("/scene//status"));
        assert!(!is_valid("/"));
        assert!(!is_valid("/has space"));
    }

    #[test]
    fn test_join_normalises_separators() {
        assert_eq!(join("/master", "/status"), "/master/status");
        assert_eq!(join("/master/", "status"), "/master/status");
        assert_eq!(join("/master", ""), "/master");
    }

    #[test]
    fn test_identity_path_round_trip() {
        let id = ObjectId::from_u128(0xabc);
        let p = identity_path("/doc/uuid", id, "/name");
        assert_eq!(p, format!("/doc/uuid/{}/name", id));
        assert_eq!(split_identity_path("/doc/uuid", &p), Some((id, "/name")));
        assert_eq!(split_identity_path("/doc/uuid", "/master/status"), None);
    }
}
