use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "apireg",
    about = "API registry: specs, revisions, artifacts and bulk analysis",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./apireg.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Registry state file, overriding the configured one
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import every file under a directory as specs of one version
    Import(ImportArgs),
    /// List a collection, e.g. `projects` or `projects/p/locations/global/apis`
    List(ListArgs),
    /// Show one resource
    Get(GetArgs),
    /// Point a tag at a spec revision
    Tag(TagArgs),
    /// Make a copy of an earlier revision the current one
    Rollback(RollbackArgs),
    /// Delete one spec revision
    DeleteRevision(DeleteRevisionArgs),
    /// Lint matching specs and store the reports as artifacts
    Lint(LintArgs),
    /// Check matching specs against a style guide
    Conformance(ConformanceArgs),
}

#[derive(Args)]
pub struct ImportArgs {
    pub dir: PathBuf,
    /// Version receiving the specs, created if missing
    #[arg(long)]
    pub version: String,
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct ListArgs {
    pub collection: String,
    #[arg(long, default_value = "")]
    pub filter: String,
    #[arg(long, default_value = "0")]
    pub page_size: i32,
    #[arg(long, default_value = "")]
    pub page_token: String,
    /// Follow page tokens to the end
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub name: String,
    /// Print the spec or artifact payload instead of its metadata
    #[arg(long)]
    pub contents: bool,
}

#[derive(Args)]
pub struct TagArgs {
    pub revision: String,
    pub tag: String,
}

#[derive(Args)]
pub struct RollbackArgs {
    pub spec: String,
    pub revision: String,
}

#[derive(Args)]
pub struct DeleteRevisionArgs {
    pub revision: String,
}

#[derive(Args)]
pub struct LintArgs {
    /// Spec pattern; `-` segments are wildcards and `@-` selects all revisions
    pub pattern: String,
    #[arg(long, default_value = "text")]
    pub linter: String,
    #[arg(long, default_value = "")]
    pub filter: String,
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct ConformanceArgs {
    pub pattern: String,
    /// Style guide TOML file
    #[arg(long)]
    pub styleguide: PathBuf,
    #[arg(long, default_value = "")]
    pub filter: String,
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_import() {
        let cli = Cli::try_parse_from(["apireg", "import", "specs", "--version", "projects/p/locations/global/apis/a/versions/v", "-j", "4"]).unwrap();
        if let Command::Import(args) = cli.command {
            assert_eq!(args.dir, PathBuf::from("specs"));
            assert_eq!(args.jobs, Some(4));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn import_requires_version() {
        assert!(Cli::try_parse_from(["apireg", "import", "specs"]).is_err());
    }

    #[test]
    fn parse_list() {
        let cli = Cli::try_parse_from(["apireg", "list", "projects", "--filter", "project_id == 'p'", "--all"]).unwrap();
        if let Command::List(args) = cli.command {
            assert_eq!(args.collection, "projects");
            assert_eq!(args.filter, "project_id == 'p'");
            assert!(args.all);
            assert_eq!(args.page_size, 0);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_get_contents() {
        let cli = Cli::try_parse_from(["apireg", "get", "projects/p", "--contents"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert!(args.contents);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_tag() {
        let cli = Cli::try_parse_from(["apireg", "tag", "x@abc", "prod"]).unwrap();
        if let Command::Tag(args) = cli.command {
            assert_eq!(args.revision, "x@abc");
            assert_eq!(args.tag, "prod");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_delete_revision() {
        let cli = Cli::try_parse_from(["apireg", "delete-revision", "x@abc"]).unwrap();
        assert!(matches!(cli.command, Command::DeleteRevision(_)));
    }

    #[test]
    fn parse_lint_defaults() {
        let cli = Cli::try_parse_from(["apireg", "lint", "projects/p/locations/global/apis/-/versions/-/specs/-"]).unwrap();
        if let Command::Lint(args) = cli.command {
            assert_eq!(args.linter, "text");
            assert!(args.jobs.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["apireg", "--verbose", "--state", "s.json", "--format", "json", "get", "projects/p"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.state, Some(PathBuf::from("s.json")));
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
