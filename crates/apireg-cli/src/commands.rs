use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use apireg_engine::{Page, PageOptions, Registry, RegistryResult};
use apireg_store::InMemoryStorage;
use apireg_tasks::{
    import_directory, visit_specs, ConformanceTask, LintTask, Linters, PoolConfig, PoolSummary,
    StyleGuide, TaskContext, WorkerPool,
};
use apireg_types::{
    ApiName, ArtifactName, ArtifactParent, ProjectName, SpecName, SpecRevisionName, VersionName,
};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let state = cli.state.clone().unwrap_or_else(|| config.state_path.clone());
    let storage = Arc::new(
        InMemoryStorage::open(&state).with_context(|| format!("opening state {}", state.display()))?,
    );
    let registry = Registry::new(storage.clone()).with_config(config.registry.clone());
    let out = Output { format: cli.format };

    match cli.command {
        Command::Import(args) => cmd_import(&registry, &config.pool, args, &out),
        Command::List(args) => cmd_list(&registry, args, &out),
        Command::Get(args) => cmd_get(&registry, args, &out),
        Command::Tag(args) => cmd_tag(&registry, args, &out),
        Command::Rollback(args) => cmd_rollback(&registry, args, &out),
        Command::DeleteRevision(args) => cmd_delete_revision(&registry, args, &out),
        Command::Lint(args) => cmd_lint(&registry, &config.pool, args, &out),
        Command::Conformance(args) => cmd_conformance(&registry, &config.pool, args, &out),
    }?;

    storage
        .save_snapshot(&state)
        .with_context(|| format!("saving state {}", state.display()))?;
    debug!(state = %state.display(), "state saved");
    Ok(())
}

// ---- Output ----

struct Output {
    format: OutputFormat,
}

impl Output {
    fn resource<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(value)?;
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
            OutputFormat::Text => print_fields(&value),
        }
        Ok(())
    }

    fn list<T: Serialize>(&self, items: &[T], next_page_token: &str) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let page = serde_json::json!({
                    "items": items,
                    "next_page_token": next_page_token,
                });
                println!("{}", serde_json::to_string_pretty(&page)?);
            }
            OutputFormat::Text => {
                for item in items {
                    let value = serde_json::to_value(item)?;
                    println!("{}", value["name"].as_str().unwrap_or_default());
                }
                if !next_page_token.is_empty() {
                    println!("{} {}", "next page token:".dimmed(), next_page_token);
                }
            }
        }
        Ok(())
    }

    fn done(&self, message: String) {
        if let OutputFormat::Text = self.format {
            println!("{} {}", "✓".green().bold(), message);
        }
    }

    fn summary(&self, verb: &str, summary: PoolSummary) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({ "completed": summary.completed, "failed": summary.failed })
            ),
            OutputFormat::Text => {
                println!("{} {} {}", "✓".green().bold(), summary.completed.to_string().bold(), verb);
                if summary.failed > 0 {
                    println!("  {} {}", summary.failed.to_string().red().bold(), "failed (see log)".red());
                }
            }
        }
        Ok(())
    }
}

fn print_fields(value: &Value) {
    let Value::Object(fields) = value else {
        println!("{value}");
        return;
    };
    for (key, field) in fields {
        match field {
            Value::String(s) => println!("{}: {}", key.cyan(), s),
            other => println!("{}: {}", key.cyan(), other),
        }
    }
}

// ---- Collections ----

/// A listable collection named by its parent and collection keyword.
#[derive(Debug, PartialEq)]
enum Collection {
    Projects,
    Apis(ProjectName),
    Versions(ApiName),
    Specs(VersionName),
    Revisions(SpecName),
    Artifacts(ArtifactParent),
}

impl Collection {
    fn parse(name: &str) -> anyhow::Result<Self> {
        let name = name.trim_end_matches('/');
        if name == "projects" {
            return Ok(Self::Projects);
        }
        let (parent, keyword) = name
            .rsplit_once('/')
            .ok_or_else(|| anyhow!("{name:?} does not name a collection"))?;
        Ok(match keyword {
            "apis" => Self::Apis(ProjectName::parse(parent.trim_end_matches("/locations/global"))?),
            "versions" => Self::Versions(ApiName::parse(parent)?),
            "specs" => Self::Specs(VersionName::parse(parent)?),
            "revisions" => Self::Revisions(SpecName::parse(parent)?),
            "artifacts" => Self::Artifacts(ArtifactParent::parse(parent)?),
            other => bail!("unknown collection {other:?}"),
        })
    }
}

fn collect_pages<T>(
    mut options: PageOptions,
    all: bool,
    mut fetch: impl FnMut(&PageOptions) -> RegistryResult<Page<T>>,
) -> anyhow::Result<Page<T>> {
    let mut items = Vec::new();
    loop {
        let page = fetch(&options)?;
        items.extend(page.items);
        if !all || page.next_page_token.is_empty() {
            return Ok(Page {
                items,
                next_page_token: page.next_page_token,
            });
        }
        options.page_token = page.next_page_token;
    }
}

// ---- Commands ----

fn cmd_list(registry: &Registry, args: ListArgs, out: &Output) -> anyhow::Result<()> {
    let options = PageOptions::new(args.page_size)
        .with_filter(args.filter)
        .with_token(args.page_token);
    match Collection::parse(&args.collection)? {
        Collection::Projects => {
            let page = collect_pages(options, args.all, |o| registry.list_projects(o))?;
            out.list(&page.items, &page.next_page_token)
        }
        Collection::Apis(parent) => {
            let page = collect_pages(options, args.all, |o| registry.list_apis(&parent, o))?;
            out.list(&page.items, &page.next_page_token)
        }
        Collection::Versions(parent) => {
            let page = collect_pages(options, args.all, |o| registry.list_versions(&parent, o))?;
            out.list(&page.items, &page.next_page_token)
        }
        Collection::Specs(parent) => {
            let page = collect_pages(options, args.all, |o| registry.list_specs(&parent, o))?;
            out.list(&page.items, &page.next_page_token)
        }
        Collection::Revisions(spec) => {
            let page = collect_pages(options, args.all, |o| registry.list_spec_revisions(&spec, o))?;
            out.list(&page.items, &page.next_page_token)
        }
        Collection::Artifacts(parent) => {
            let page = collect_pages(options, args.all, |o| registry.list_artifacts(&parent, o))?;
            out.list(&page.items, &page.next_page_token)
        }
    }
}

fn cmd_get(registry: &Registry, args: GetArgs, out: &Output) -> anyhow::Result<()> {
    let name = args.name.as_str();
    if name.contains("/artifacts/") {
        let artifact = ArtifactName::parse(name)?;
        if args.contents {
            return write_contents(&registry.get_artifact_contents(&artifact, false)?.data);
        }
        return out.resource(&registry.get_artifact(&artifact)?);
    }
    let segments = name.split('/').count();
    if args.contents && segments != 10 {
        bail!("--contents applies to specs and artifacts only");
    }
    match segments {
        2 | 4 => out.resource(&registry.get_project(&ProjectName::parse(name)?)?),
        6 => out.resource(&registry.get_api(&ApiName::parse(name)?)?),
        8 => out.resource(&registry.get_version(&VersionName::parse(name)?)?),
        10 => {
            let spec = SpecRevisionName::parse(name)?;
            if args.contents {
                write_contents(&registry.get_spec_contents(&spec, false)?.data)
            } else {
                out.resource(&registry.get_spec(&spec)?)
            }
        }
        _ => bail!("{name:?} is not a resource name"),
    }
}

fn write_contents(data: &[u8]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(data)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_tag(registry: &Registry, args: TagArgs, out: &Output) -> anyhow::Result<()> {
    let revision = SpecRevisionName::parse(&args.revision)?;
    let tagged = registry.tag_spec_revision(&revision, &args.tag)?;
    out.done(format!("Tagged {} → {}", tagged.name.bold(), tagged.revision_id.yellow()));
    if let OutputFormat::Json = out.format {
        out.resource(&tagged)?;
    }
    Ok(())
}

fn cmd_rollback(registry: &Registry, args: RollbackArgs, out: &Output) -> anyhow::Result<()> {
    let spec = SpecName::parse(&args.spec)?;
    let rolled = registry.rollback_spec(&spec, &args.revision)?;
    out.done(format!(
        "Rolled {} back to {}, new revision {}",
        spec.to_string().bold(),
        args.revision.yellow(),
        rolled.revision_id.yellow()
    ));
    if let OutputFormat::Json = out.format {
        out.resource(&rolled)?;
    }
    Ok(())
}

fn cmd_delete_revision(registry: &Registry, args: DeleteRevisionArgs, out: &Output) -> anyhow::Result<()> {
    let revision = SpecRevisionName::parse(&args.revision)?;
    let current = registry.delete_spec_revision(&revision)?;
    match &current {
        Some(spec) => out.done(format!(
            "Deleted {}, current revision is {}",
            revision.to_string().bold(),
            spec.revision_id.yellow()
        )),
        None => out.done(format!(
            "Deleted {}, no revisions of {} remain",
            revision.to_string().bold(),
            revision.spec
        )),
    }
    if let OutputFormat::Json = out.format {
        out.resource(&current)?;
    }
    Ok(())
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")
}

/// A context cancelled by Ctrl-C. Must be called inside the runtime.
fn interruptible() -> TaskContext {
    let (ctx, handle) = TaskContext::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling remaining tasks");
            handle.cancel();
        }
    });
    ctx
}

fn pool_config(base: &PoolConfig, jobs: Option<usize>) -> PoolConfig {
    match jobs {
        Some(workers) => base.clone().with_workers(workers),
        None => base.clone(),
    }
}

fn cmd_import(registry: &Registry, pool: &PoolConfig, args: ImportArgs, out: &Output) -> anyhow::Result<()> {
    let version = VersionName::parse(&args.version)?;
    version.validate()?;
    let config = pool_config(pool, args.jobs);
    let summary = runtime()?.block_on(async {
        let pool = WorkerPool::start(&interruptible(), &config);
        let queued = import_directory(&pool, registry, &args.dir, &version).await;
        let summary = pool.wait().await;
        queued.map(|_| summary)
    })?;
    out.summary("imported", summary)
}

fn cmd_lint(registry: &Registry, pool: &PoolConfig, args: LintArgs, out: &Output) -> anyhow::Result<()> {
    let pattern = SpecRevisionName::parse(&args.pattern)?;
    let linters = Linters::builtin();
    let linter = linters.get(&args.linter).ok_or_else(|| {
        anyhow!(
            "unknown linter {:?}, available: {}",
            args.linter,
            linters.names().collect::<Vec<_>>().join(", ")
        )
    })?;
    let config = pool_config(pool, args.jobs);
    let summary = runtime()?.block_on(async {
        let pool = WorkerPool::start(&interruptible(), &config);
        let queue = &pool;
        let visited = visit_specs(registry, &pattern, &args.filter, move |spec| {
            queue.submit(LintTask::new(registry.clone(), spec, linter.clone()))
        })
        .await;
        let summary = pool.wait().await;
        visited.map(|_| summary)
    })?;
    out.summary("linted", summary)
}

fn cmd_conformance(registry: &Registry, pool: &PoolConfig, args: ConformanceArgs, out: &Output) -> anyhow::Result<()> {
    let pattern = SpecRevisionName::parse(&args.pattern)?;
    let guide = Arc::new(load_styleguide(&args.styleguide)?);
    let linters = Linters::builtin();
    let config = pool_config(pool, args.jobs);
    let summary = runtime()?.block_on(async {
        let pool = WorkerPool::start(&interruptible(), &config);
        let queue = &pool;
        let visited = visit_specs(registry, &pattern, &args.filter, move |spec| {
            queue.submit(ConformanceTask::new(
                registry.clone(),
                spec,
                guide.clone(),
                linters.clone(),
            ))
        })
        .await;
        let summary = pool.wait().await;
        visited.map(|_| summary)
    })?;
    out.summary("checked", summary)
}

fn load_styleguide(path: &Path) -> anyhow::Result<StyleGuide> {
    StyleGuide::load(path).with_context(|| format!("loading style guide {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const VERSION: &str = "projects/demo/locations/global/apis/petstore/versions/v1";

    fn run(state: &Path, args: &[&str]) -> anyhow::Result<()> {
        let state = state.to_string_lossy().into_owned();
        let mut argv = vec!["apireg", "--state", state.as_str()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn reopen(state: &Path) -> Registry {
        Registry::new(Arc::new(InMemoryStorage::open(state).unwrap()))
    }

    #[test]
    fn collection_names() {
        assert_eq!(Collection::parse("projects").unwrap(), Collection::Projects);
        assert!(matches!(
            Collection::parse("projects/p/locations/global/apis").unwrap(),
            Collection::Apis(p) if p.project_id == "p"
        ));
        assert!(matches!(
            Collection::parse(&format!("{VERSION}/specs")).unwrap(),
            Collection::Specs(_)
        ));
        assert!(matches!(
            Collection::parse(&format!("{VERSION}/specs/openapi/revisions")).unwrap(),
            Collection::Revisions(_)
        ));
        assert!(matches!(
            Collection::parse("projects/p/locations/global/artifacts").unwrap(),
            Collection::Artifacts(ArtifactParent::Project(_))
        ));
        assert!(Collection::parse("projects/p/widgets").is_err());
        assert!(Collection::parse("nothing").is_err());
    }

    #[test]
    fn collect_pages_follows_tokens_only_with_all() {
        let mut calls = 0;
        let fetch = |o: &PageOptions| -> RegistryResult<Page<u32>> {
            Ok(Page {
                items: vec![o.page_token.len() as u32],
                next_page_token: if o.page_token.len() < 2 { format!("{}x", o.page_token) } else { String::new() },
            })
        };
        let one = collect_pages(PageOptions::default(), false, |o| { calls += 1; fetch(o) }).unwrap();
        assert_eq!(one.items, [0]);
        assert_eq!(one.next_page_token, "x");
        let all = collect_pages(PageOptions::default(), true, fetch).unwrap();
        assert_eq!(all.items, [0, 1, 2]);
        assert!(all.next_page_token.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn import_then_revise_through_the_binary() {
        let dir = tempfile::tempdir().unwrap();
        let specs = dir.path().join("specs");
        std::fs::create_dir(&specs).unwrap();
        std::fs::write(specs.join("openapi.yaml"), "openapi: 3.0.0\n").unwrap();
        let state = dir.path().join("state.json");

        run(&state, &["import", specs.to_str().unwrap(), "--version", VERSION, "-j", "2"]).unwrap();
        let spec = SpecRevisionName::parse(&format!("{VERSION}/specs/openapi")).unwrap();
        let first = reopen(&state).get_spec(&spec).unwrap();

        std::fs::write(specs.join("openapi.yaml"), "openapi: 3.1.0\n").unwrap();
        run(&state, &["import", specs.to_str().unwrap(), "--version", VERSION]).unwrap();
        let second = reopen(&state).get_spec(&spec).unwrap();
        assert_ne!(first.revision_id, second.revision_id);

        let pinned = format!("{VERSION}/specs/openapi@{}", first.revision_id);
        run(&state, &["tag", &pinned, "stable"]).unwrap();
        run(&state, &["rollback", &spec.to_string(), "stable"]).unwrap();
        let third = reopen(&state).get_spec(&spec).unwrap();
        assert_eq!(third.hash, first.hash);

        let second_pinned = format!("{VERSION}/specs/openapi@{}", second.revision_id);
        run(&state, &["delete-revision", &second_pinned]).unwrap();
        let revisions = reopen(&state)
            .list_spec_revisions(&spec.spec, &PageOptions::default())
            .unwrap();
        assert_eq!(revisions.items.len(), 2);

        run(&state, &["lint", &format!("{VERSION}/specs/-")]).unwrap();
        let report = ArtifactParent::Spec(spec.spec.revision(third.revision_id.clone())).artifact("lint-text");
        assert!(reopen(&state).get_artifact(&report).is_ok());

        run(&state, &["list", &format!("{VERSION}/specs/openapi/revisions"), "--all"]).unwrap();
        run(&state, &["get", &spec.to_string()]).unwrap();
    }

    #[test]
    fn failed_command_does_not_save() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let err = run(&state, &["get", "projects/ghost"]).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!state.exists());
    }

    #[test]
    fn unknown_linter() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let err = run(&state, &["lint", &format!("{VERSION}/specs/-"), "--linter", "spectral"]).unwrap_err();
        assert!(err.to_string().contains("unknown linter"));
    }
}
