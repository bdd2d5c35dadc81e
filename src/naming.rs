//! Component naming and root-relative path helpers.

use crate::error::BundleError;
use crate::reference::Reference;
use std::path::{Component, Path};

/// Derives the merged-document name of the component an external ref points at.
///
/// The name is `<origin file stem>_<last anchor token>`, so
/// `shared/common.yml#/components/schemas/Error` becomes `common_Error`. Files
/// act as namespaces; two files with the same stem exporting the same name
/// collide.
pub fn derive_local_name(reference: &Reference) -> Result<String, BundleError> {
    if !reference.is_external() {
        return Err(BundleError::NotExternal(reference.to_string()));
    }

    let filename = reference.external_filename().unwrap_or_default();
    let namespace = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    let anchor = reference
        .anchor_path()
        .last()
        .ok_or_else(|| BundleError::MissingAnchor(reference.to_string()))?;

    Ok(format!("{}_{}", namespace, anchor))
}

/// Resolves `external` against the directory of the root-relative document
/// `referencing`, returning root-relative segments.
///
/// `.` and empty segments are dropped and `..` pops a directory. A `..` that
/// climbs past the root is kept so the result still names a location outside
/// the loaded set. A leading `/` anchors the path at the specification root.
pub fn resolve_external(referencing: &str, external: &[String]) -> Vec<String> {
    let mut resolved: Vec<String> = if external.first().is_some_and(|s| s.is_empty()) {
        Vec::new()
    } else {
        let mut dir: Vec<String> = referencing.split('/').map(str::to_string).collect();
        dir.pop();
        dir
    };

    for segment in external {
        match segment.as_str() {
            "" | "." => {}
            ".." => {
                if resolved.last().is_some_and(|s| s != "..") {
                    resolved.pop();
                } else {
                    resolved.push("..".to_string());
                }
            }
            other => resolved.push(other.to_string()),
        }
    }

    resolved
}

/// Expresses `path` relative to `root` with `/` separators, the form used as
/// document keys. Returns `None` if `path` is not under `root`.
pub fn root_relative(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(document_key(relative))
}

/// Joins the normal components of a relative path with `/`.
pub fn document_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn segments(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn local_name_joins_file_stem_and_last_anchor_token() {
        let r = Reference::parse("shared/common.yml#/components/schemas/Error").unwrap();
        assert_eq!(derive_local_name(&r).unwrap(), "common_Error");

        let r = Reference::parse("crowd_projects.yml#/components/schemas/crowd_project").unwrap();
        assert_eq!(derive_local_name(&r).unwrap(), "crowd_projects_crowd_project");
    }

    #[test]
    fn local_name_keeps_inner_dots_of_the_stem() {
        let r = Reference::parse("pet.v2.yaml#/components/schemas/Pet").unwrap();
        assert_eq!(derive_local_name(&r).unwrap(), "pet.v2_Pet");
    }

    #[test]
    fn local_name_requires_an_external_ref() {
        let r = Reference::parse("#/components/schemas/Pet").unwrap();
        assert!(matches!(
            derive_local_name(&r),
            Err(BundleError::NotExternal(s)) if s == "#/components/schemas/Pet"
        ));
    }

    #[test]
    fn local_name_requires_an_anchor() {
        let r = Reference::parse("pet.yml").unwrap();
        assert!(matches!(
            derive_local_name(&r),
            Err(BundleError::MissingAnchor(_))
        ));
    }

    #[test]
    fn resolves_sibling_and_parent_paths() {
        assert_eq!(
            resolve_external("paths/pets.yml", &segments(&["..", "models", "pet.yml"])),
            segments(&["models", "pet.yml"])
        );
        assert_eq!(
            resolve_external("paths/pets.yml", &segments(&[".", "params.yml"])),
            segments(&["paths", "params.yml"])
        );
        assert_eq!(
            resolve_external("api.yml", &segments(&["common.yml"])),
            segments(&["common.yml"])
        );
    }

    #[test]
    fn keeps_parent_segments_that_escape_the_root() {
        assert_eq!(
            resolve_external("api.yml", &segments(&["..", "other", "x.yml"])),
            segments(&["..", "other", "x.yml"])
        );
    }

    #[test]
    fn leading_slash_is_anchored_at_the_root() {
        assert_eq!(
            resolve_external("paths/pets.yml", &segments(&["", "models", "pet.yml"])),
            segments(&["models", "pet.yml"])
        );
    }

    #[test]
    fn root_relative_uses_forward_slashes() {
        let root = PathBuf::from("/spec");
        let file = root.join("paths").join("pets.yml");
        assert_eq!(root_relative(&root, &file).as_deref(), Some("paths/pets.yml"));
        assert_eq!(root_relative(&root, Path::new("/elsewhere/a.yml")), None);
    }
}
