use apireg_models::{kinds, Artifact, ArtifactMessage, Blob};
use apireg_store::Key;
use apireg_types::{ArtifactName, ArtifactParent, WILDCARD};
use tracing::{debug, info};

use crate::cursor::{Page, PageOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::{scoped, Contents, Registry};

impl Registry {
    /// Create an artifact, failing if one already exists under `name`.
    pub fn create_artifact(&self, name: &ArtifactName, body: &ArtifactMessage) -> RegistryResult<ArtifactMessage> {
        name.validate()?;
        let name = self.resolve_artifact(name)?;
        let key = name.to_string();
        self.require_absent(kinds::ARTIFACTS, &key)?;
        let artifact = self.store_artifact(&name, body, None)?;
        debug!(artifact = %key, size = artifact.size_bytes, "created artifact");
        Ok(artifact.message())
    }

    /// Create or overwrite the artifact named in `body`, contents included.
    pub fn replace_artifact(&self, body: &ArtifactMessage) -> RegistryResult<ArtifactMessage> {
        let name = ArtifactName::parse(&body.name)?;
        name.validate()?;
        let name = self.resolve_artifact(&name)?;
        let existing = self.load::<Artifact>(kinds::ARTIFACTS, &name.to_string())?;
        let artifact = self.store_artifact(&name, body, existing.map(|a| a.create_time))?;
        debug!(artifact = %name, size = artifact.size_bytes, "replaced artifact");
        Ok(artifact.message())
    }

    /// Get artifact metadata without its contents.
    pub fn get_artifact(&self, name: &ArtifactName) -> RegistryResult<ArtifactMessage> {
        let name = self.resolve_artifact(name)?;
        let artifact: Artifact = self.fetch(kinds::ARTIFACTS, &name.to_string())?;
        Ok(artifact.message())
    }

    /// Read an artifact payload, inflating gzip unless `accept_gzip`.
    pub fn get_artifact_contents(&self, name: &ArtifactName, accept_gzip: bool) -> RegistryResult<Contents> {
        let name = self.resolve_artifact(name)?;
        let key = name.to_string();
        self.require(kinds::ARTIFACTS, &key)?;
        self.read_blob(&key, accept_gzip)
    }

    /// Delete an artifact and its payload.
    pub fn delete_artifact(&self, name: &ArtifactName) -> RegistryResult<()> {
        let name = self.resolve_artifact(name)?;
        let key = name.to_string();
        self.require(kinds::ARTIFACTS, &key)?;
        self.storage().delete(&Key::new(kinds::BLOBS, &key))?;
        self.storage().delete(&Key::new(kinds::ARTIFACTS, &key))?;
        info!(artifact = %key, "deleted artifact");
        Ok(())
    }

    /// List artifacts attached directly to `parent`.
    ///
    /// A spec parent without a revision lists the current revision's
    /// artifacts; `@-` or a wildcard spec spans all revisions.
    pub fn list_artifacts(&self, parent: &ArtifactParent, options: &PageOptions) -> RegistryResult<Page<ArtifactMessage>> {
        let parent = if parent.is_wildcard() {
            parent.clone()
        } else {
            self.resolve_parent(parent)?
        };
        let revision = match &parent {
            ArtifactParent::Spec(s) if s.revision_id.is_empty() => WILDCARD,
            other => other.revision_id(),
        };
        let query = scoped(
            kinds::ARTIFACTS,
            &[
                ("project_id", parent.project_id()),
                ("api_id", parent.api_id()),
                ("version_id", parent.version_id()),
                ("spec_id", parent.spec_id()),
                ("revision_id", revision),
            ],
        );
        let page = self.list_resources::<Artifact>(query, options)?;
        Ok(page.map(|a| a.message()))
    }

    // ---- Helpers ----

    /// Check that `parent` exists, binding a spec parent to a concrete revision.
    fn resolve_parent(&self, parent: &ArtifactParent) -> RegistryResult<ArtifactParent> {
        match parent {
            ArtifactParent::Project(p) => self.require(kinds::PROJECTS, &p.to_string())?,
            ArtifactParent::Api(a) => self.require(kinds::APIS, &a.to_string())?,
            ArtifactParent::Version(v) => self.require(kinds::VERSIONS, &v.to_string())?,
            ArtifactParent::Spec(s) => {
                let spec = self.resolve_revision(s)?;
                return Ok(ArtifactParent::Spec(spec.revision_name()));
            }
        }
        Ok(parent.clone())
    }

    fn resolve_artifact(&self, name: &ArtifactName) -> RegistryResult<ArtifactName> {
        if name.parent.is_wildcard() {
            return Err(RegistryError::InvalidArgument(format!(
                "{name} must not contain wildcards"
            )));
        }
        Ok(self.resolve_parent(&name.parent)?.artifact(&name.artifact_id))
    }

    fn store_artifact(
        &self,
        name: &ArtifactName,
        body: &ArtifactMessage,
        create_time: Option<chrono::DateTime<chrono::Utc>>,
    ) -> RegistryResult<Artifact> {
        let now = self.now();
        let mut artifact = Artifact::new(name, body, now)?;
        if let Some(created) = create_time {
            artifact.create_time = created;
        }
        let key = name.to_string();
        self.save(kinds::BLOBS, &key, &Blob::for_artifact(&artifact, body.contents.clone(), now)?)?;
        self.save(kinds::ARTIFACTS, &key, &artifact)?;
        Ok(artifact)
    }
}
