use apireg_models::{kinds, Api, ApiMessage, FieldMask};
use apireg_store::Key;
use apireg_types::{ApiName, ProjectName};
use tracing::{debug, info};

use crate::cursor::{Page, PageOptions};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::{scoped, Registry};

const API_CHILDREN: &[&str] = &[
    kinds::VERSIONS,
    kinds::SPECS,
    kinds::SPEC_REVISION_TAGS,
    kinds::ARTIFACTS,
    kinds::BLOBS,
];

impl Registry {
    /// Create an API under an existing project.
    pub fn create_api(&self, name: &ApiName, body: &ApiMessage) -> RegistryResult<ApiMessage> {
        let api = Api::new(name, body, self.now())?;
        self.require(kinds::PROJECTS, &name.project().to_string())?;
        let key = name.to_string();
        self.require_absent(kinds::APIS, &key)?;
        self.save(kinds::APIS, &key, &api)?;
        debug!(api = %key, "created api");
        Ok(api.message())
    }

    /// Get an API by name.
    pub fn get_api(&self, name: &ApiName) -> RegistryResult<ApiMessage> {
        let api: Api = self.fetch(kinds::APIS, &name.to_string())?;
        Ok(api.message())
    }

    /// Apply a masked update; with `allow_missing`, create the API if absent.
    pub fn update_api(
        &self,
        body: &ApiMessage,
        mask: &FieldMask,
        allow_missing: bool,
    ) -> RegistryResult<ApiMessage> {
        let name = ApiName::parse(&body.name)?;
        let key = name.to_string();
        let Some(mut api) = self.load::<Api>(kinds::APIS, &key)? else {
            if allow_missing {
                return self.create_api(&name, body);
            }
            return Err(RegistryError::NotFound(key));
        };
        api.update(body, mask, self.now())?;
        self.save(kinds::APIS, &key, &api)?;
        Ok(api.message())
    }

    /// Delete an API and everything beneath it.
    pub fn delete_api(&self, name: &ApiName) -> RegistryResult<()> {
        let key = name.to_string();
        self.require(kinds::APIS, &key)?;
        let scope = [("project_id", name.project_id.as_str()), ("api_id", name.api_id.as_str())];
        let removed = self.delete_scope(&scope, API_CHILDREN)?;
        self.storage().delete(&Key::new(kinds::APIS, &key))?;
        info!(api = %key, descendants = removed, "deleted api");
        Ok(())
    }

    /// List APIs under `parent`; `projects/-` spans all projects.
    pub fn list_apis(&self, parent: &ProjectName, options: &PageOptions) -> RegistryResult<Page<ApiMessage>> {
        if !parent.is_wildcard() {
            self.require(kinds::PROJECTS, &parent.to_string())?;
        }
        let query = scoped(kinds::APIS, &[("project_id", &parent.project_id)]);
        let page = self.list_resources::<Api>(query, options)?;
        Ok(page.map(|a| a.message()))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{registry, seeded};
    use crate::{Code, PageOptions};
    use apireg_models::{ApiMessage, FieldMask, ProjectMessage};
    use apireg_types::{ApiName, ProjectName};
    use std::collections::BTreeMap;

    fn api(project: &str, id: &str) -> ApiName {
        ProjectName::new(project).api(id)
    }

    #[test]
    fn parent_must_exist() {
        let err = registry()
            .create_api(&api("ghost", "pets"), &ApiMessage::default())
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[test]
    fn list_across_projects_with_wildcard() {
        let r = seeded();
        r.create_project(&ProjectName::new("other"), &ProjectMessage::default())
            .unwrap();
        r.create_api(&api("other", "books"), &ApiMessage::default()).unwrap();

        let one = r
            .list_apis(&ProjectName::new("other"), &PageOptions::default())
            .unwrap();
        assert_eq!(one.items.len(), 1);

        let all = r
            .list_apis(&ProjectName::new("-"), &PageOptions::default())
            .unwrap();
        assert_eq!(all.items.len(), 2);
    }

    #[test]
    fn list_missing_parent() {
        let err = seeded()
            .list_apis(&ProjectName::new("ghost"), &PageOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[test]
    fn filter_on_labels() {
        let r = seeded();
        let body = ApiMessage {
            name: api("demo", "petstore").to_string(),
            labels: BTreeMap::from([("tier".to_string(), "gold".to_string())]),
            ..Default::default()
        };
        r.update_api(&body, &FieldMask::new(["labels"]), false).unwrap();
        r.create_api(&api("demo", "plain"), &ApiMessage::default()).unwrap();

        let gold = r
            .list_apis(
                &ProjectName::new("demo"),
                &PageOptions::default().with_filter(r#"has(labels.tier) && labels.tier == "gold""#),
            )
            .unwrap();
        let names: Vec<&str> = gold.items.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["projects/demo/locations/global/apis/petstore"]);
    }

    #[test]
    fn delete_api_keeps_siblings() {
        let r = seeded();
        r.create_api(&api("demo", "other"), &ApiMessage::default()).unwrap();
        r.delete_api(&api("demo", "petstore")).unwrap();
        assert_eq!(r.get_api(&api("demo", "petstore")).unwrap_err().code(), Code::NotFound);
        assert!(r.get_api(&api("demo", "other")).is_ok());
    }
}
