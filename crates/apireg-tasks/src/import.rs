use std::fmt;
use std::path::{Path, PathBuf};

use apireg_engine::{Code, Registry, RegistryResult};
use apireg_models::{ApiMessage, FieldMask, ProjectMessage, SpecMessage, VersionMessage};
use apireg_types::{SpecName, VersionName};
use async_trait::async_trait;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::context::TaskContext;
use crate::error::TaskResult;
use crate::pool::{Task, WorkerPool};
use crate::blocking;

const IMPORT_MASK: &str = "contents,mime_type,filename";

/// Create or update one spec from a local file, creating missing parents.
pub struct ImportTask {
    registry: Registry,
    spec: SpecName,
    path: PathBuf,
}

impl ImportTask {
    pub fn new(registry: Registry, spec: SpecName, path: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            spec,
            path: path.into(),
        }
    }

    /// A task importing `path` under `version`, naming the spec after the file.
    pub fn for_file(registry: Registry, version: &VersionName, path: &Path) -> Option<Self> {
        let spec_id = spec_id_for(path)?;
        Some(Self::new(registry, version.spec(spec_id), path))
    }
}

impl fmt::Display for ImportTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import {} as {}", self.path.display(), self.spec)
    }
}

#[async_trait]
impl Task for ImportTask {
    async fn run(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.check()?;
        let contents = tokio::fs::read(&self.path).await?;
        ctx.check()?;
        let body = SpecMessage {
            name: self.spec.to_string(),
            filename: self
                .path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mime_type: mime_type_for(&self.path).to_string(),
            contents,
            ..Default::default()
        };
        let version = self.spec.version();
        let spec = blocking(&self.registry, move |r| {
            ensure_version(r, &version)?;
            r.update_spec(&body, &FieldMask::parse(IMPORT_MASK), true)
        })
        .await?;
        debug!(spec = %spec.name, revision = %spec.revision_id, "imported");
        Ok(())
    }
}

/// Create the project, API and version above `version` where missing.
pub fn ensure_version(registry: &Registry, version: &VersionName) -> RegistryResult<()> {
    let api = version.api();
    tolerate_existing(registry.create_project(&api.project(), &ProjectMessage::default()))?;
    tolerate_existing(registry.create_api(&api, &ApiMessage::default()))?;
    tolerate_existing(registry.create_version(version, &VersionMessage::default()))?;
    Ok(())
}

fn tolerate_existing<T>(result: RegistryResult<T>) -> RegistryResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.code() == Code::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Walk `dir` and enqueue one [`ImportTask`] per regular, non-hidden file.
/// Returns the number of tasks enqueued.
pub async fn import_directory(
    pool: &WorkerPool,
    registry: &Registry,
    dir: &Path,
    version: &VersionName,
) -> TaskResult<usize> {
    if !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )
        .into());
    }
    let mut queued = 0;
    let entries = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in entries {
        let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match ImportTask::for_file(registry.clone(), version, entry.path()) {
            Some(task) => {
                pool.submit(task).await?;
                queued += 1;
            }
            None => debug!(path = %entry.path().display(), "no usable spec id, skipped"),
        }
    }
    info!(dir = %dir.display(), queued, "import queued");
    Ok(queued)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Derive a spec ID from a file name: lowercase stem, other characters as `-`.
pub fn spec_id_for(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let stem = name.trim_end_matches(".gz");
    let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
    let id: String = stem
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' }
        })
        .collect();
    let id = id.trim_matches('-');
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// MIME type of an imported file by extension; `.gz` adds `+gzip`.
pub fn mime_type_for(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let (name, gzip) = match name.strip_suffix(".gz") {
        Some(inner) => (inner.to_string(), true),
        None => (name, false),
    };
    let base = match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("yaml") | Some("yml") => "application/x.openapi+yaml",
        Some("json") => "application/x.openapi+json",
        Some("proto") => "text/x.protobuf",
        Some("graphql") | Some("gql") => "application/x.graphql",
        Some("wsdl") | Some("xml") => "application/x.wsdl+xml",
        _ => "text/plain",
    };
    if gzip {
        format!("{base}+gzip")
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry, VERSION};
    use crate::PoolConfig;
    use apireg_types::SpecRevisionName;

    #[test]
    fn spec_ids_from_file_names() {
        assert_eq!(spec_id_for(Path::new("dir/PetStore.yaml")).as_deref(), Some("petstore"));
        assert_eq!(spec_id_for(Path::new("my_api.v2.json")).as_deref(), Some("my-api-v2"));
        assert_eq!(spec_id_for(Path::new("a.proto.gz")).as_deref(), Some("a"));
        assert_eq!(spec_id_for(Path::new("___.yaml")), None);
    }

    #[test]
    fn mime_types_from_extensions() {
        assert_eq!(mime_type_for(Path::new("x.yaml")), "application/x.openapi+yaml");
        assert_eq!(mime_type_for(Path::new("x.JSON")), "application/x.openapi+json");
        assert_eq!(mime_type_for(Path::new("x.proto.gz")), "text/x.protobuf+gzip");
        assert_eq!(mime_type_for(Path::new("README")), "text/plain");
    }

    #[tokio::test]
    async fn import_creates_parents_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("petstore.yaml");
        std::fs::write(&file, "openapi: 3.0.0\n").unwrap();

        let registry = registry();
        let version = VersionName::parse(VERSION).unwrap();
        let task = ImportTask::for_file(registry.clone(), &version, &file).unwrap();
        task.run(&TaskContext::detached()).await.unwrap();

        let name = SpecRevisionName::parse(&format!("{VERSION}/specs/petstore")).unwrap();
        let first = registry.get_spec(&name).unwrap();
        assert_eq!(first.filename, "petstore.yaml");
        assert_eq!(first.mime_type, "application/x.openapi+yaml");

        // Same bytes again: no new revision.
        task.run(&TaskContext::detached()).await.unwrap();
        assert_eq!(registry.get_spec(&name).unwrap().revision_id, first.revision_id);

        std::fs::write(&file, "openapi: 3.1.0\n").unwrap();
        task.run(&TaskContext::detached()).await.unwrap();
        assert_ne!(registry.get_spec(&name).unwrap().revision_id, first.revision_id);
    }

    #[tokio::test]
    async fn cancelled_import_does_nothing() {
        let registry = registry();
        let version = VersionName::parse(VERSION).unwrap();
        let task = ImportTask::new(registry.clone(), version.spec("x"), "/nonexistent");
        let (ctx, handle) = TaskContext::new();
        handle.cancel();
        assert!(matches!(task.run(&ctx).await, Err(crate::TaskError::Cancelled)));
    }

    #[tokio::test]
    async fn import_directory_enqueues_each_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "a").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join(".hidden.yaml"), "h").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.proto"), "syntax").unwrap();

        let registry = registry();
        let version = VersionName::parse(VERSION).unwrap();
        let pool = WorkerPool::start(&TaskContext::detached(), &PoolConfig::default().with_workers(2));
        let queued = import_directory(&pool, &registry, dir.path(), &version).await.unwrap();
        let summary = pool.wait().await;

        assert_eq!(queued, 3);
        assert_eq!(summary.completed, 3);
        let specs = registry
            .list_specs(&version, &apireg_engine::PageOptions::default())
            .unwrap();
        assert_eq!(specs.items.len(), 3);
    }
}
