//! Hierarchical resource names.
//!
//! Every registry resource is addressed by a slash-separated path:
//!
//! ```text
//! projects/{project}
//! projects/{project}/locations/global/apis/{api}
//! projects/{project}/locations/global/apis/{api}/versions/{version}
//! projects/{project}/locations/global/apis/{api}/versions/{version}/specs/{spec}[@{revision}]
//! {parent}/artifacts/{artifact}
//! ```
//!
//! Parsing is lenient about identifier shape and accepts the `-` wildcard so
//! that collection parents like `projects/-/locations/global/apis/-` can be
//! expressed. Creating a resource additionally calls `validate()`, which
//! applies the strict identifier rules and rejects wildcards.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TypeError};

/// The only location supported by the registry.
pub const LOCATION: &str = "global";

/// Segment value matching any identifier in a collection parent.
pub const WILDCARD: &str = "-";

const MAX_IDENTIFIER_LEN: usize = 80;
const MAX_TAG_LEN: usize = 40;

/// Validate a resource identifier (one path segment).
///
/// Identifiers are 1-80 characters from `[a-z0-9-.]`, begin and end with a
/// letter or digit, and must not look like a UUID.
///
/// ```
/// use apireg_types::validate_identifier;
///
/// assert!(validate_identifier("petstore").is_ok());
/// assert!(validate_identifier("v1.2").is_ok());
/// assert!(validate_identifier("-").is_err());
/// assert!(validate_identifier("Upper").is_err());
/// ```
pub fn validate_identifier(id: &str) -> Result<()> {
    let fail = |reason: &str| {
        Err(TypeError::InvalidIdentifier {
            id: id.to_string(),
            reason: reason.into(),
        })
    };

    if id.is_empty() {
        return fail("must not be empty");
    }
    if id.len() > MAX_IDENTIFIER_LEN {
        return fail("must be 80 characters or less");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return fail("must contain only lowercase letters, digits, '-' and '.'");
    }
    if id.starts_with(['-', '.']) || id.ends_with(['-', '.']) {
        return fail("must begin and end with a letter or digit");
    }
    if uuid::Uuid::parse_str(id).is_ok() {
        return fail("must not be a UUID");
    }
    Ok(())
}

/// Validate a revision tag.
///
/// Tags are 1-40 characters from `[a-z0-9-]` and may not be the wildcard.
pub fn validate_tag(tag: &str) -> Result<()> {
    let fail = |reason: &str| {
        Err(TypeError::InvalidTag {
            tag: tag.to_string(),
            reason: reason.into(),
        })
    };

    if tag.is_empty() {
        return fail("must not be empty");
    }
    if tag.len() > MAX_TAG_LEN {
        return fail("must be 40 characters or less");
    }
    if tag == WILDCARD {
        return fail("must not be a wildcard");
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return fail("must contain only lowercase letters, digits and '-'");
    }
    Ok(())
}

fn invalid(name: &str, reason: impl Into<String>) -> TypeError {
    TypeError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Lowercase and sanity-check one segment taken from a name.
fn segment(name: &str, raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(invalid(name, "empty path segment"));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    {
        return Err(invalid(name, format!("unexpected characters in {raw:?}")));
    }
    Ok(raw.to_ascii_lowercase())
}

/// Check that the fixed collection keywords appear at their positions.
fn expect_keywords(name: &str, parts: &[&str], keywords: &[(usize, &str)]) -> Result<()> {
    for (idx, keyword) in keywords {
        if parts.get(*idx) != Some(keyword) {
            return Err(invalid(name, format!("expected {keyword:?} at segment {idx}")));
        }
    }
    Ok(())
}

const API_KEYWORDS: &[(usize, &str)] = &[(0, "projects"), (2, "locations"), (3, LOCATION), (4, "apis")];

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Name of a project: `projects/{project}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectName {
    pub project_id: String,
}

impl ProjectName {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }

    /// Parse `projects/{p}` or the location-qualified `projects/{p}/locations/global`.
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.len() {
            2 => expect_keywords(name, &parts, &[(0, "projects")])?,
            4 => expect_keywords(name, &parts, &[(0, "projects"), (2, "locations"), (3, LOCATION)])?,
            _ => return Err(invalid(name, "expected projects/{project}")),
        }
        Ok(Self::new(segment(name, parts[1])?))
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.project_id)
    }

    pub fn is_wildcard(&self) -> bool {
        self.project_id == WILDCARD
    }

    pub fn api(&self, api_id: impl Into<String>) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: api_id.into(),
        }
    }

    /// `projects/{p}/locations/global`, the parent of APIs and project artifacts.
    pub fn location_path(&self) -> String {
        format!("projects/{}/locations/{LOCATION}", self.project_id)
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}", self.project_id)
    }
}

impl FromStr for ProjectName {
    type Err = TypeError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Api
// ---------------------------------------------------------------------------

/// Name of an API: `projects/{p}/locations/global/apis/{a}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApiName {
    pub project_id: String,
    pub api_id: String,
}

impl ApiName {
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() != 6 {
            return Err(invalid(name, "expected projects/{project}/locations/global/apis/{api}"));
        }
        expect_keywords(name, &parts, API_KEYWORDS)?;
        Ok(Self {
            project_id: segment(name, parts[1])?,
            api_id: segment(name, parts[5])?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.project_id)?;
        validate_identifier(&self.api_id)
    }

    pub fn is_wildcard(&self) -> bool {
        self.project_id == WILDCARD || self.api_id == WILDCARD
    }

    pub fn project(&self) -> ProjectName {
        ProjectName::new(self.project_id.clone())
    }

    pub fn version(&self, version_id: impl Into<String>) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: version_id.into(),
        }
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{LOCATION}/apis/{}",
            self.project_id, self.api_id
        )
    }
}

impl FromStr for ApiName {
    type Err = TypeError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Name of an API version: `{api}/versions/{v}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
}

impl VersionName {
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() != 8 {
            return Err(invalid(name, "expected {api}/versions/{version}"));
        }
        expect_keywords(name, &parts, API_KEYWORDS)?;
        expect_keywords(name, &parts, &[(6, "versions")])?;
        Ok(Self {
            project_id: segment(name, parts[1])?,
            api_id: segment(name, parts[5])?,
            version_id: segment(name, parts[7])?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.api().validate()?;
        validate_identifier(&self.version_id)
    }

    pub fn is_wildcard(&self) -> bool {
        self.api().is_wildcard() || self.version_id == WILDCARD
    }

    pub fn api(&self) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
        }
    }

    pub fn spec(&self, spec_id: impl Into<String>) -> SpecName {
        SpecName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            spec_id: spec_id.into(),
        }
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/versions/{}", self.api(), self.version_id)
    }
}

impl FromStr for VersionName {
    type Err = TypeError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Spec
// ---------------------------------------------------------------------------

/// Name of a spec without a revision qualifier: `{version}/specs/{s}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
}

impl SpecName {
    /// Parse a spec name. A revision qualifier (`@...`) is rejected.
    pub fn parse(name: &str) -> Result<Self> {
        let revision = SpecRevisionName::parse(name)?;
        if !revision.revision_id.is_empty() {
            return Err(invalid(name, "revision qualifier not allowed here"));
        }
        Ok(revision.spec)
    }

    pub fn validate(&self) -> Result<()> {
        self.version().validate()?;
        validate_identifier(&self.spec_id)
    }

    pub fn is_wildcard(&self) -> bool {
        self.version().is_wildcard() || self.spec_id == WILDCARD
    }

    pub fn version(&self) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
        }
    }

    pub fn revision(&self, revision_id: impl Into<String>) -> SpecRevisionName {
        SpecRevisionName {
            spec: self.clone(),
            revision_id: revision_id.into(),
        }
    }
}

impl fmt::Display for SpecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/specs/{}", self.version(), self.spec_id)
    }
}

impl FromStr for SpecName {
    type Err = TypeError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Name of a spec with an optional revision qualifier: `{spec}[@{revision}]`.
///
/// The revision part may be a revision ID or a tag; an empty revision means
/// "the current revision".
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecRevisionName {
    pub spec: SpecName,
    pub revision_id: String,
}

impl SpecRevisionName {
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() != 10 {
            return Err(invalid(name, "expected {version}/specs/{spec}[@{revision}]"));
        }
        expect_keywords(name, &parts, API_KEYWORDS)?;
        expect_keywords(name, &parts, &[(6, "versions"), (8, "specs")])?;
        let (spec_id, revision_id) = match parts[9].split_once('@') {
            Some((spec, rev)) => (spec, segment(name, rev)?),
            None => (parts[9], String::new()),
        };
        Ok(Self {
            spec: SpecName {
                project_id: segment(name, parts[1])?,
                api_id: segment(name, parts[5])?,
                version_id: segment(name, parts[7])?,
                spec_id: segment(name, spec_id)?,
            },
            revision_id,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.spec.validate()?;
        if self.revision_id.is_empty() {
            Ok(())
        } else {
            validate_tag(&self.revision_id)
        }
    }

    pub fn spec(&self) -> &SpecName {
        &self.spec
    }

    pub fn has_revision(&self) -> bool {
        !self.revision_id.is_empty()
    }
}

impl fmt::Display for SpecRevisionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.revision_id.is_empty() {
            write!(f, "{}", self.spec)
        } else {
            write!(f, "{}@{}", self.spec, self.revision_id)
        }
    }
}

impl FromStr for SpecRevisionName {
    type Err = TypeError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// The resource an artifact is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactParent {
    Project(ProjectName),
    Api(ApiName),
    Version(VersionName),
    Spec(SpecRevisionName),
}

impl ArtifactParent {
    /// Parse any name that can own artifacts.
    pub fn parse(name: &str) -> Result<Self> {
        match name.split('/').count() {
            2 | 4 => ProjectName::parse(name).map(Self::Project),
            6 => ApiName::parse(name).map(Self::Api),
            8 => VersionName::parse(name).map(Self::Version),
            10 => SpecRevisionName::parse(name).map(Self::Spec),
            _ => Err(invalid(name, "not a valid artifact parent")),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Project(p) => p.validate(),
            Self::Api(a) => a.validate(),
            Self::Version(v) => v.validate(),
            Self::Spec(s) => s.validate(),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        match self {
            Self::Project(p) => p.is_wildcard(),
            Self::Api(a) => a.is_wildcard(),
            Self::Version(v) => v.is_wildcard(),
            Self::Spec(s) => s.spec.is_wildcard() || s.revision_id == WILDCARD,
        }
    }

    pub fn project_id(&self) -> &str {
        match self {
            Self::Project(p) => &p.project_id,
            Self::Api(a) => &a.project_id,
            Self::Version(v) => &v.project_id,
            Self::Spec(s) => &s.spec.project_id,
        }
    }

    pub fn api_id(&self) -> &str {
        match self {
            Self::Project(_) => "",
            Self::Api(a) => &a.api_id,
            Self::Version(v) => &v.api_id,
            Self::Spec(s) => &s.spec.api_id,
        }
    }

    pub fn version_id(&self) -> &str {
        match self {
            Self::Project(_) | Self::Api(_) => "",
            Self::Version(v) => &v.version_id,
            Self::Spec(s) => &s.spec.version_id,
        }
    }

    pub fn spec_id(&self) -> &str {
        match self {
            Self::Spec(s) => &s.spec.spec_id,
            _ => "",
        }
    }

    pub fn revision_id(&self) -> &str {
        match self {
            Self::Spec(s) => &s.revision_id,
            _ => "",
        }
    }

    pub fn artifact(&self, artifact_id: impl Into<String>) -> ArtifactName {
        ArtifactName {
            parent: self.clone(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for ArtifactParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(p) => write!(f, "{}", p.location_path()),
            Self::Api(a) => write!(f, "{a}"),
            Self::Version(v) => write!(f, "{v}"),
            Self::Spec(s) => write!(f, "{s}"),
        }
    }
}

/// Name of an artifact: `{parent}/artifacts/{a}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactName {
    pub parent: ArtifactParent,
    pub artifact_id: String,
}

impl ArtifactName {
    pub fn parse(name: &str) -> Result<Self> {
        let (parent, artifact_id) = name
            .rsplit_once("/artifacts/")
            .ok_or_else(|| invalid(name, "expected {parent}/artifacts/{artifact}"))?;
        let parent = match ArtifactParent::parse(parent)? {
            // Project artifacts always live under the location path.
            ArtifactParent::Project(p) if !parent.contains("/locations/") => {
                return Err(invalid(name, format!("expected {}/artifacts/...", p.location_path())))
            }
            other => other,
        };
        Ok(Self {
            parent,
            artifact_id: segment(name, artifact_id)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.parent.validate()?;
        validate_identifier(&self.artifact_id)
    }

    /// Same artifact, attached to a concrete spec revision.
    pub fn with_revision(&self, revision_id: &str) -> Self {
        match &self.parent {
            ArtifactParent::Spec(s) => {
                ArtifactParent::Spec(s.spec.revision(revision_id)).artifact(&self.artifact_id)
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/artifacts/{}", self.parent, self.artifact_id)
    }
}

impl FromStr for ArtifactName {
    type Err = TypeError;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = "projects/demo/locations/global/apis/petstore/versions/v1/specs/openapi";

    // ---- identifiers ----

    #[test]
    fn valid_identifiers() {
        for id in ["a", "demo", "v1.0.2", "my-api", "x9"] {
            assert!(validate_identifier(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn invalid_identifiers() {
        let too_long = "a".repeat(81);
        let cases = [
            "",
            "-",
            "-abc",
            "abc.",
            "Upper",
            "under_score",
            "a b",
            too_long.as_str(),
            "7c9e6679-7425-40de-944b-e07fc1f90ae7",
        ];
        for id in cases {
            assert!(validate_identifier(id).is_err(), "{id:?} should be invalid");
        }
    }

    #[test]
    fn identifier_length_boundary() {
        assert!(validate_identifier(&"a".repeat(80)).is_ok());
    }

    #[test]
    fn tag_rules() {
        assert!(validate_tag("prod").is_ok());
        assert!(validate_tag("release-1").is_ok());
        assert!(validate_tag("").is_err());
        assert!(validate_tag("-").is_err());
        assert!(validate_tag("v1.0").is_err());
        assert!(validate_tag(&"t".repeat(41)).is_err());
        assert!(validate_tag(&"t".repeat(40)).is_ok());
    }

    // ---- parsing and formatting ----

    #[test]
    fn project_accepts_both_forms() {
        let short = ProjectName::parse("projects/demo").unwrap();
        let long = ProjectName::parse("projects/demo/locations/global").unwrap();
        assert_eq!(short, long);
        assert_eq!(short.to_string(), "projects/demo");
        assert_eq!(short.location_path(), "projects/demo/locations/global");
    }

    #[test]
    fn project_rejects_other_locations() {
        assert!(ProjectName::parse("projects/demo/locations/us").is_err());
        assert!(ProjectName::parse("things/demo").is_err());
    }

    #[test]
    fn spec_round_trips_through_display() {
        let name = SpecName::parse(SPEC).unwrap();
        assert_eq!(name.spec_id, "openapi");
        assert_eq!(name.version().version_id, "v1");
        assert_eq!(name.to_string(), SPEC);
    }

    #[test]
    fn spec_revision_qualifier() {
        let rev = SpecRevisionName::parse(&format!("{SPEC}@abcd1234")).unwrap();
        assert_eq!(rev.revision_id, "abcd1234");
        assert!(rev.has_revision());
        assert_eq!(rev.to_string(), format!("{SPEC}@abcd1234"));
        assert!(SpecName::parse(&format!("{SPEC}@abcd1234")).is_err());
    }

    #[test]
    fn parsing_lowercases_segments() {
        let api = ApiName::parse("projects/Demo/locations/global/apis/PetStore").unwrap();
        assert_eq!(api.project_id, "demo");
        assert_eq!(api.api_id, "petstore");
    }

    #[test]
    fn wildcards_parse_but_fail_validation() {
        let v = VersionName::parse("projects/-/locations/global/apis/-/versions/-").unwrap();
        assert!(v.is_wildcard());
        assert!(v.validate().is_err());
    }

    #[test]
    fn artifact_parents() {
        let project = ArtifactName::parse("projects/demo/locations/global/artifacts/summary").unwrap();
        assert!(matches!(project.parent, ArtifactParent::Project(_)));
        assert_eq!(project.to_string(), "projects/demo/locations/global/artifacts/summary");

        let spec = ArtifactName::parse(&format!("{SPEC}@r1/artifacts/lint-text")).unwrap();
        assert_eq!(spec.parent.spec_id(), "openapi");
        assert_eq!(spec.parent.revision_id(), "r1");
        assert_eq!(spec.artifact_id, "lint-text");
    }

    #[test]
    fn artifact_with_revision_rebinds_spec_parent() {
        let a = ArtifactName::parse(&format!("{SPEC}/artifacts/score")).unwrap();
        let bound = a.with_revision("deadbeef");
        assert_eq!(bound.to_string(), format!("{SPEC}@deadbeef/artifacts/score"));
    }

    #[test]
    fn project_artifact_requires_location() {
        assert!(ArtifactName::parse("projects/demo/artifacts/summary").is_err());
    }
}
