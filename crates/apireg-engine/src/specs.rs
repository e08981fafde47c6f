use apireg_models::{
    kinds, Blob, ContentsChange, Currency, FieldMask, Resource, Spec, SpecMessage, SpecRevisionTag,
};
use apireg_store::from_document;
use apireg_types::{SpecName, SpecRevisionName, VersionName};
use tracing::{debug, info};

use crate::cursor::{Page, PageOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::{scoped, Contents, Registry};
use crate::versions::version_scope;

const SPEC_CHILDREN: &[&str] = &[
    kinds::SPECS,
    kinds::SPEC_REVISION_TAGS,
    kinds::ARTIFACTS,
    kinds::BLOBS,
];

impl Registry {
    /// Create the first revision of a spec. The version must exist.
    pub fn create_spec(&self, name: &SpecName, body: &SpecMessage) -> RegistryResult<SpecMessage> {
        let now = self.now();
        let spec = Spec::new(name, body, now)?;
        self.require(kinds::VERSIONS, &name.version().to_string())?;
        if self.current_spec(name)?.is_some() {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        let key = spec.key_name();
        self.save(kinds::BLOBS, &key, &Blob::for_spec(&spec, body.contents.clone(), now)?)?;
        self.save(kinds::SPECS, &key, &spec)?;
        debug!(spec = %key, hash = %spec.hash, "created spec");
        Ok(spec.message())
    }

    /// Read a spec. An unqualified name reads the current revision; a
    /// qualified one may use a revision ID or a tag.
    pub fn get_spec(&self, name: &SpecRevisionName) -> RegistryResult<SpecMessage> {
        let spec = self.resolve_revision(name)?;
        Ok(if name.has_revision() {
            spec.revision_message()
        } else {
            spec.message()
        })
    }

    /// Read the contents of the current, tagged or named revision.
    pub fn get_spec_contents(&self, name: &SpecRevisionName, accept_gzip: bool) -> RegistryResult<Contents> {
        let spec = self.resolve_revision(name)?;
        self.read_blob(&spec.key_name(), accept_gzip)
    }

    /// Update the current revision of the spec named in `body`.
    ///
    /// A change of contents hash forks a new current revision and keeps the
    /// old one; anything else is applied to the current revision in place.
    pub fn update_spec(
        &self,
        body: &SpecMessage,
        mask: &FieldMask,
        allow_missing: bool,
    ) -> RegistryResult<SpecMessage> {
        let name = SpecName::parse(&body.name)?;
        let Some(current) = self.current_spec(&name)? else {
            if allow_missing {
                return self.create_spec(&name, body);
            }
            return Err(RegistryError::NotFound(name.to_string()));
        };

        let now = self.now();
        let mut next = current.clone();
        match next.update(body, mask, now)? {
            ContentsChange::Forked => {
                self.save(kinds::BLOBS, &next.key_name(), &Blob::for_spec(&next, body.contents.clone(), now)?)?;
                self.demote(current.clone())?;
                self.save(kinds::SPECS, &next.key_name(), &next)?;
                info!(
                    spec = %name,
                    from = %current.revision_id,
                    to = %next.revision_id,
                    "spec contents changed, new revision"
                );
            }
            ContentsChange::Rewritten => {
                let previous: Blob = self.fetch(kinds::BLOBS, &next.key_name())?;
                let mut blob = Blob::for_spec(&next, body.contents.clone(), now)?;
                blob.create_time = previous.create_time;
                self.save(kinds::BLOBS, &next.key_name(), &blob)?;
                self.save(kinds::SPECS, &next.key_name(), &next)?;
                debug!(spec = %name, revision = %next.revision_id, "rewrote contents in place");
            }
            ContentsChange::Untouched => {
                if next.mime_type != current.mime_type {
                    let mut blob: Blob = self.fetch(kinds::BLOBS, &next.key_name())?;
                    blob.mime_type = next.mime_type.clone();
                    blob.update_time = now;
                    self.save(kinds::BLOBS, &next.key_name(), &blob)?;
                }
                self.save(kinds::SPECS, &next.key_name(), &next)?;
                debug!(spec = %name, revision = %next.revision_id, "updated spec in place");
            }
        }
        Ok(next.message())
    }

    /// Delete a spec with all of its revisions, tags and artifacts.
    pub fn delete_spec(&self, name: &SpecName) -> RegistryResult<()> {
        if self.current_spec(name)?.is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        let removed = self.delete_scope(&spec_scope(name), SPEC_CHILDREN)?;
        info!(spec = %name, rows = removed, "deleted spec");
        Ok(())
    }

    /// List the current revision of each spec under `parent`.
    pub fn list_specs(&self, parent: &VersionName, options: &PageOptions) -> RegistryResult<Page<SpecMessage>> {
        if !parent.is_wildcard() {
            self.require(kinds::VERSIONS, &parent.to_string())?;
        }
        let query = scoped(kinds::SPECS, &version_scope(parent))
            .require("currency", Currency::IsCurrent.as_str());
        let page = self.list_resources::<Spec>(query, options)?;
        Ok(page.map(|s| s.message()))
    }

    // ---- Revision resolution ----

    /// The revision of `name` currently marked current, if the spec exists.
    pub(crate) fn current_spec(&self, name: &SpecName) -> RegistryResult<Option<Spec>> {
        let query = scoped(kinds::SPECS, &spec_scope(name))
            .require("currency", Currency::IsCurrent.as_str());
        match self.storage().first(&query)? {
            Some(entry) => Ok(Some(from_document(entry.document)?)),
            None => Ok(None),
        }
    }

    /// Resolve `{spec}`, `{spec}@{revision_id}` or `{spec}@{tag}` to a stored
    /// revision. Tags take precedence over revision IDs.
    pub(crate) fn resolve_revision(&self, name: &SpecRevisionName) -> RegistryResult<Spec> {
        let spec = name.spec();
        if !name.has_revision() {
            return self
                .current_spec(spec)?
                .ok_or_else(|| RegistryError::NotFound(spec.to_string()));
        }
        let tag_key = SpecRevisionTag::key_for(spec, &name.revision_id);
        let revision_id = match self.load::<SpecRevisionTag>(kinds::SPEC_REVISION_TAGS, &tag_key)? {
            Some(tag) => tag.revision_id,
            None => name.revision_id.clone(),
        };
        self.load(kinds::SPECS, &spec.revision(revision_id).to_string())?
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Store `spec` as a non-current revision.
    pub(crate) fn demote(&self, mut spec: Spec) -> RegistryResult<()> {
        spec.currency = Currency::NotCurrent;
        self.save(kinds::SPECS, &spec.key_name(), &spec)
    }
}

pub(crate) fn spec_scope(name: &SpecName) -> [(&str, &str); 4] {
    [
        ("project_id", name.project_id.as_str()),
        ("api_id", name.api_id.as_str()),
        ("version_id", name.version_id.as_str()),
        ("spec_id", name.spec_id.as_str()),
    ]
}
