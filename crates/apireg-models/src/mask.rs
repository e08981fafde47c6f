use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Selects which fields of a request body an update applies.
///
/// - an empty mask applies every populated (non-default) field
/// - `*` applies every updatable field, clearing those left empty
/// - otherwise each path must name an updatable field
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMask {
    pub paths: Vec<String>,
}

impl FieldMask {
    pub fn new<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Every updatable field.
    pub fn all() -> Self {
        Self::new(["*"])
    }

    /// Parse a comma-separated list such as `"contents,mime_type"`.
    pub fn parse(paths: &str) -> Self {
        Self::new(
            paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Expand the mask to concrete paths, in the order of `updatable`.
    pub(crate) fn resolve(
        &self,
        updatable: &[&'static str],
        populated: impl Fn(&str) -> bool,
    ) -> ModelResult<Vec<&'static str>> {
        if self.paths.is_empty() {
            return Ok(updatable.iter().copied().filter(|p| populated(p)).collect());
        }
        if self.paths.iter().any(|p| p == "*") {
            return Ok(updatable.to_vec());
        }
        for path in &self.paths {
            if !updatable.contains(&path.as_str()) {
                return Err(ModelError::InvalidArgument(format!(
                    "invalid field mask path {path:?}, expected one of {updatable:?}"
                )));
            }
        }
        Ok(updatable
            .iter()
            .copied()
            .filter(|p| self.paths.iter().any(|q| q == p))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPDATABLE: &[&str] = &["mime_type", "contents", "description"];

    #[test]
    fn empty_mask_uses_populated_fields() {
        let paths = FieldMask::default()
            .resolve(UPDATABLE, |p| p == "description")
            .unwrap();
        assert_eq!(paths, ["description"]);
    }

    #[test]
    fn star_selects_everything() {
        let paths = FieldMask::all().resolve(UPDATABLE, |_| false).unwrap();
        assert_eq!(paths, UPDATABLE);
    }

    #[test]
    fn explicit_paths_follow_field_order() {
        let paths = FieldMask::parse("contents, mime_type")
            .resolve(UPDATABLE, |_| false)
            .unwrap();
        assert_eq!(paths, ["mime_type", "contents"]);
    }

    #[test]
    fn unknown_path_is_rejected() {
        let err = FieldMask::new(["owner"]).resolve(UPDATABLE, |_| true).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument(_)));
    }
}
