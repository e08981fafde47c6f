use apireg_models::{kinds, FieldMask, Project, ProjectMessage};
use apireg_store::Query;
use apireg_types::ProjectName;
use tracing::{debug, info};

use crate::cursor::{Page, PageOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::Registry;

/// Every kind stored beneath a project.
const PROJECT_CHILDREN: &[&str] = &[
    kinds::APIS,
    kinds::VERSIONS,
    kinds::SPECS,
    kinds::SPEC_REVISION_TAGS,
    kinds::ARTIFACTS,
    kinds::BLOBS,
];

impl Registry {
    /// Create a project.
    pub fn create_project(&self, name: &ProjectName, body: &ProjectMessage) -> RegistryResult<ProjectMessage> {
        let project = Project::new(name, body, self.now())?;
        let key = name.to_string();
        self.require_absent(kinds::PROJECTS, &key)?;
        self.save(kinds::PROJECTS, &key, &project)?;
        debug!(project = %key, "created project");
        Ok(project.message())
    }

    /// Get a project by name.
    pub fn get_project(&self, name: &ProjectName) -> RegistryResult<ProjectMessage> {
        let project: Project = self.fetch(kinds::PROJECTS, &name.to_string())?;
        Ok(project.message())
    }

    /// Apply a masked update to the project named in `body`.
    ///
    /// With `allow_missing`, an absent project is created instead.
    pub fn update_project(
        &self,
        body: &ProjectMessage,
        mask: &FieldMask,
        allow_missing: bool,
    ) -> RegistryResult<ProjectMessage> {
        let name = ProjectName::parse(&body.name)?;
        let key = name.to_string();
        let Some(mut project) = self.load::<Project>(kinds::PROJECTS, &key)? else {
            if allow_missing {
                return self.create_project(&name, body);
            }
            return Err(RegistryError::NotFound(key));
        };
        project.update(body, mask, self.now())?;
        self.save(kinds::PROJECTS, &key, &project)?;
        Ok(project.message())
    }

    /// Delete a project and everything beneath it.
    pub fn delete_project(&self, name: &ProjectName) -> RegistryResult<()> {
        let key = name.to_string();
        self.require(kinds::PROJECTS, &key)?;
        let removed = self.delete_scope(&[("project_id", &name.project_id)], PROJECT_CHILDREN)?;
        self.storage().delete(&apireg_store::Key::new(kinds::PROJECTS, &key))?;
        info!(project = %key, descendants = removed, "deleted project");
        Ok(())
    }

    /// List projects matching the filter in `options`.
    pub fn list_projects(&self, options: &PageOptions) -> RegistryResult<Page<ProjectMessage>> {
        let page = self.list_resources::<Project>(Query::new(kinds::PROJECTS), options)?;
        Ok(page.map(|p| p.message()))
    }
}
