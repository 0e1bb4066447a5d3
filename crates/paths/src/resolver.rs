//! Template substitution and lexical path normalization.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::ResolveError;
use crate::platform::{Placeholder, PlatformLookup, SystemLookup};

/// Marker for the per-user directory segment (e.g. a Steam account id).
///
/// The segment cannot be known when resolving, so the template is cut at
/// the marker and everything from it onward is dropped. Backing up the
/// parent directory covers every user's saves.
pub const USER_ID_MARKER: &str = "<user-id>";

/// Resolves save-location templates into concrete paths.
#[derive(Clone)]
pub struct PathResolver {
    lookup: Arc<dyn PlatformLookup>,
}

impl PathResolver {
    /// Creates a resolver backed by the given lookup.
    pub fn new(lookup: Arc<dyn PlatformLookup>) -> Self {
        Self { lookup }
    }

    /// Creates a resolver backed by the environment and local launcher install.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemLookup))
    }

    /// Resolves `template` into a normalized path without trailing separator.
    ///
    /// Fails if the template is empty (after truncation at
    /// [`USER_ID_MARKER`]) or references a placeholder with no value.
    pub fn resolve(&self, template: &str) -> Result<PathBuf, ResolveError> {
        let template = template.trim();
        let template = match template.find(USER_ID_MARKER) {
            Some(idx) => &template[..idx],
            None => template,
        };
        if template.trim().is_empty() {
            return Err(ResolveError::Empty);
        }

        let substituted = self.substitute(template)?;
        let resolved = normalize(&substituted);

        tracing::debug!(template, resolved = %resolved.display(), "resolved save location");
        Ok(resolved)
    }

    /// Replaces every placeholder token in a single left-to-right pass.
    ///
    /// Substituted values are copied verbatim and never scanned again.
    fn substitute(&self, template: &str) -> Result<String, ResolveError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        'scan: while !rest.is_empty() {
            for placeholder in Placeholder::all() {
                if let Some(tail) = strip_token(rest, placeholder.token()) {
                    let value = self
                        .lookup
                        .lookup(*placeholder)
                        .ok_or(ResolveError::Unresolved(*placeholder))?;
                    out.push_str(&value);
                    rest = tail;
                    continue 'scan;
                }
            }

            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }

        Ok(out)
    }
}

/// Case-insensitive (ASCII) token prefix match.
fn strip_token<'a>(s: &'a str, token: &str) -> Option<&'a str> {
    let head = s.get(..token.len())?;
    if head.eq_ignore_ascii_case(token) {
        s.get(token.len()..)
    } else {
        None
    }
}

/// Normalizes a path lexically.
///
/// Collapses repeated separators, drops `.` segments, resolves `..`
/// against the preceding segment and strips trailing separators. `..`
/// at the root is discarded. An empty path becomes `.`.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MapLookup;

    fn resolver(lookup: MapLookup) -> PathResolver {
        PathResolver::new(Arc::new(lookup))
    }

    fn appdata() -> PathResolver {
        resolver(MapLookup::new().with(Placeholder::AppData, "/home/u/appdata"))
    }

    #[test]
    fn user_id_segment_is_dropped() {
        let path = appdata()
            .resolve("%APPDATA%/Game/<user-id>/saves")
            .unwrap();
        assert_eq!(path, PathBuf::from("/home/u/appdata/Game"));
    }

    #[test]
    fn truncation_ignores_what_follows_marker() {
        let r = appdata();
        let a = r.resolve("%APPDATA%/Game/<user-id>").unwrap();
        let b = r.resolve("%APPDATA%/Game/<user-id>/%UNKNOWN%/../x").unwrap();
        // A placeholder after the marker is never looked up.
        let c = r
            .resolve("%APPDATA%/Game/<user-id>/%USERPROFILE%/saves")
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn marker_at_start_is_empty() {
        assert_eq!(appdata().resolve("<user-id>/saves"), Err(ResolveError::Empty));
        assert_eq!(appdata().resolve("   "), Err(ResolveError::Empty));
    }

    #[test]
    fn every_placeholder_is_substituted() {
        let lookup = Placeholder::all()
            .iter()
            .fold(MapLookup::new(), |l, p| l.with(*p, format!("/v/{}", p.token().len())));
        let r = resolver(lookup);

        for placeholder in Placeholder::all() {
            let template = format!("{}/saves", placeholder.token());
            let resolved = r.resolve(&template).unwrap();
            let s = resolved.to_string_lossy();
            for p in Placeholder::all() {
                assert!(!s.contains(p.token()), "{s} still contains {p}");
            }
            assert!(s.ends_with("saves"));
        }
    }

    #[test]
    fn repeated_placeholder_substituted_each_time() {
        let path = appdata().resolve("%APPDATA%/%APPDATA%").unwrap();
        assert_eq!(path, PathBuf::from("/home/u/appdata/home/u/appdata"));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let r = resolver(MapLookup::new().with(Placeholder::AppData, "/x/%USERPROFILE%"));
        // USERPROFILE has no value, but it only appears inside a substituted value.
        let path = r.resolve("%APPDATA%/Game").unwrap();
        assert_eq!(path, PathBuf::from("/x/%USERPROFILE%/Game"));
    }

    #[test]
    fn tokens_match_case_insensitively() {
        let path = appdata().resolve("%AppData%/Game").unwrap();
        assert_eq!(path, PathBuf::from("/home/u/appdata/Game"));
    }

    #[test]
    fn unresolved_placeholder_fails() {
        let err = appdata().resolve("%LOCALAPPDATA%/Game").unwrap_err();
        assert_eq!(err, ResolveError::Unresolved(Placeholder::LocalAppData));
    }

    #[test]
    fn steam_folder_substitution() {
        let r = resolver(MapLookup::new().with(Placeholder::SteamFolder, "/opt/steam/"));
        let path = r.resolve("<Steam-folder>/userdata/<user-id>/123/remote").unwrap();
        assert_eq!(path, PathBuf::from("/opt/steam/userdata"));
    }

    #[test]
    fn plain_paths_pass_through() {
        let path = appdata().resolve("/srv/games/saves/").unwrap();
        assert_eq!(path, PathBuf::from("/srv/games/saves"));
    }

    #[test]
    fn resolve_is_idempotent() {
        let r = appdata();
        for template in [
            "%APPDATA%/Game/<user-id>/saves",
            "%APPDATA%//Game/./slot/../saves///",
            "/a/b/../../..",
            "relative/./dir/",
            "../up/one",
        ] {
            let once = r.resolve(template).unwrap();
            let twice = r.resolve(&once.to_string_lossy()).unwrap();
            assert_eq!(once, twice, "template {template}");
        }
    }

    #[test]
    fn normalize_collapses_and_resolves() {
        assert_eq!(normalize("/a//b/./c/../d/"), PathBuf::from("/a/b/d"));
        assert_eq!(normalize("/../a"), PathBuf::from("/a"));
        assert_eq!(normalize("a/../../b"), PathBuf::from("../b"));
        assert_eq!(normalize("./"), PathBuf::from("."));
        assert_eq!(normalize("/"), PathBuf::from("/"));
    }
}
