//! Revision-level operations: tagging, rollback, deletion and listing.
//!
//! Every operation here preserves the single-current rule: after it returns,
//! a spec that still has revisions has exactly one marked current.

use apireg_models::{kinds, Blob, Currency, Resource, Spec, SpecMessage, SpecRevisionTag};
use apireg_store::from_document;
use apireg_types::{validate_tag, SpecName, SpecRevisionName};
use tracing::{debug, info};

use crate::cursor::{Page, PageOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::{scoped, Registry};
use crate::specs::spec_scope;

const REVISION_CHILDREN: &[&str] = &[kinds::BLOBS, kinds::SPEC_REVISION_TAGS, kinds::ARTIFACTS];

impl Registry {
    /// Point `tag` at the revision `name` resolves to, creating or moving it.
    pub fn tag_spec_revision(&self, name: &SpecRevisionName, tag: &str) -> RegistryResult<SpecMessage> {
        validate_tag(tag)?;
        let spec = self.resolve_revision(name)?;
        let key = SpecRevisionTag::key_for(name.spec(), tag);
        let now = self.now();
        let mut row = SpecRevisionTag::new(name.spec(), tag, &spec.revision_id, now);
        if let Some(existing) = self.load::<SpecRevisionTag>(kinds::SPEC_REVISION_TAGS, &key)? {
            row.create_time = existing.create_time;
        }
        self.save(kinds::SPEC_REVISION_TAGS, &key, &row)?;
        debug!(tag = %key, revision = %spec.revision_id, "tagged revision");
        Ok(SpecMessage {
            name: key,
            ..spec.message()
        })
    }

    /// Make a copy of `revision` the new current revision of `name`.
    ///
    /// The target revision itself is left untouched.
    pub fn rollback_spec(&self, name: &SpecName, revision: &str) -> RegistryResult<SpecMessage> {
        if revision.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "a revision ID or tag is required for rollback".to_string(),
            ));
        }
        let target = self.resolve_revision(&name.revision(revision))?;
        let blob: Blob = self.fetch(kinds::BLOBS, &target.key_name())?;
        let current = self.current_spec(name)?;

        let now = self.now();
        let next = target.new_revision(now);
        self.save(kinds::BLOBS, &next.key_name(), &blob.copy_for(&next, now))?;
        if let Some(current) = current {
            self.demote(current)?;
        }
        self.save(kinds::SPECS, &next.key_name(), &next)?;
        info!(
            spec = %name,
            target = %target.revision_id,
            revision = %next.revision_id,
            "rolled back spec"
        );
        Ok(next.revision_message())
    }

    /// Delete one revision with its contents, tags and artifacts.
    ///
    /// Deleting the current revision promotes the most recently created
    /// survivor. Returns the spec's current revision afterwards, or `None`
    /// when no revisions remain.
    pub fn delete_spec_revision(&self, name: &SpecRevisionName) -> RegistryResult<Option<SpecMessage>> {
        if !name.has_revision() {
            return Err(RegistryError::InvalidArgument(format!(
                "{name} does not name a revision"
            )));
        }
        let target = self.resolve_revision(name)?;
        let spec = name.spec();
        self.storage()
            .delete(&apireg_store::Key::new(kinds::SPECS, target.key_name()))?;
        let [project, api, version, spec_id] = spec_scope(spec);
        let scope = [project, api, version, spec_id, ("revision_id", target.revision_id.as_str())];
        let removed = self.delete_scope(&scope, REVISION_CHILDREN)?;
        info!(spec = %spec, revision = %target.revision_id, dependents = removed, "deleted revision");

        if !target.is_current() {
            return Ok(self.current_spec(spec)?.map(|s| s.message()));
        }
        let latest = scoped(kinds::SPECS, &spec_scope(spec)).descending("revision_create_time");
        match self.storage().first(&latest)? {
            Some(entry) => {
                let mut promoted: Spec = from_document(entry.document)?;
                promoted.currency = Currency::IsCurrent;
                self.save(kinds::SPECS, &promoted.key_name(), &promoted)?;
                debug!(spec = %spec, revision = %promoted.revision_id, "promoted revision");
                Ok(Some(promoted.message()))
            }
            None => Ok(None),
        }
    }

    /// Every revision of `name`, newest first.
    pub fn list_spec_revisions(&self, name: &SpecName, options: &PageOptions) -> RegistryResult<Page<SpecMessage>> {
        if !name.is_wildcard() && self.current_spec(name)?.is_none() {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        let query = scoped(kinds::SPECS, &spec_scope(name)).descending("revision_create_time");
        let page = self.list_resources::<Spec>(query, options)?;
        Ok(page.map(|s| s.revision_message()))
    }
}
