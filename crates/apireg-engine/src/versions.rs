use apireg_models::{kinds, FieldMask, Version, VersionMessage};
use apireg_store::Key;
use apireg_types::{ApiName, VersionName};
use tracing::{debug, info};

use crate::cursor::{Page, PageOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::{scoped, Registry};

const VERSION_CHILDREN: &[&str] = &[
    kinds::SPECS,
    kinds::SPEC_REVISION_TAGS,
    kinds::ARTIFACTS,
    kinds::BLOBS,
];

impl Registry {
    /// Create a version under an existing API.
    pub fn create_version(&self, name: &VersionName, body: &VersionMessage) -> RegistryResult<VersionMessage> {
        let version = Version::new(name, body, self.now())?;
        self.require(kinds::APIS, &name.api().to_string())?;
        let key = name.to_string();
        self.require_absent(kinds::VERSIONS, &key)?;
        self.save(kinds::VERSIONS, &key, &version)?;
        debug!(version = %key, "created version");
        Ok(version.message())
    }

    /// Get a version by name.
    pub fn get_version(&self, name: &VersionName) -> RegistryResult<VersionMessage> {
        let version: Version = self.fetch(kinds::VERSIONS, &name.to_string())?;
        Ok(version.message())
    }

    /// Apply a masked update; with `allow_missing`, create the version if absent.
    pub fn update_version(
        &self,
        body: &VersionMessage,
        mask: &FieldMask,
        allow_missing: bool,
    ) -> RegistryResult<VersionMessage> {
        let name = VersionName::parse(&body.name)?;
        let key = name.to_string();
        let Some(mut version) = self.load::<Version>(kinds::VERSIONS, &key)? else {
            if allow_missing {
                return self.create_version(&name, body);
            }
            return Err(RegistryError::NotFound(key));
        };
        version.update(body, mask, self.now())?;
        self.save(kinds::VERSIONS, &key, &version)?;
        Ok(version.message())
    }

    /// Delete a version and everything beneath it.
    pub fn delete_version(&self, name: &VersionName) -> RegistryResult<()> {
        let key = name.to_string();
        self.require(kinds::VERSIONS, &key)?;
        let removed = self.delete_scope(&version_scope(name), VERSION_CHILDREN)?;
        self.storage().delete(&Key::new(kinds::VERSIONS, &key))?;
        info!(version = %key, descendants = removed, "deleted version");
        Ok(())
    }

    /// List versions of `parent`, which may use `-` wildcards.
    pub fn list_versions(&self, parent: &ApiName, options: &PageOptions) -> RegistryResult<Page<VersionMessage>> {
        if !parent.is_wildcard() {
            self.require(kinds::APIS, &parent.to_string())?;
        }
        let query = scoped(
            kinds::VERSIONS,
            &[("project_id", &parent.project_id), ("api_id", &parent.api_id)],
        );
        let page = self.list_resources::<Version>(query, options)?;
        Ok(page.map(|v| v.message()))
    }
}

pub(crate) fn version_scope(name: &VersionName) -> [(&str, &str); 3] {
    [
        ("project_id", name.project_id.as_str()),
        ("api_id", name.api_id.as_str()),
        ("version_id", name.version_id.as_str()),
    ]
}
