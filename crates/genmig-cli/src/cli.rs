//! Command definition and flag handling
//!
//! Settings come from `--config` when given, then every explicit flag
//! overrides the file.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use genmig_apply::ConflictPolicy;
use genmig_core::{GeneratorId, MigrationConfig};
use genmig_hunk::DelimiterSpec;
use std::path::PathBuf;

/// Environment fallback when neither `--token` nor `GENMIG_TOKEN` is set
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// The `genmig` command
#[must_use]
pub fn command() -> Command {
    Command::new("genmig")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Migrate a scaffolded project to the latest release of its generator")
        .arg(
            Arg::new("generator")
                .value_name("OWNER/REPO")
                .help("Generator repository, e.g. acme/generator-widget"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .value_name("MARKER")
                .allow_hyphen_values(true)
                .help("Placeholder open delimiter [default: <%=]"),
        )
        .arg(
            Arg::new("close")
                .long("close")
                .value_name("MARKER")
                .allow_hyphen_values(true)
                .help("Placeholder close delimiter [default: %>]"),
        )
        .arg(
            Arg::new("template-prefix")
                .long("template-prefix")
                .value_name("PATH")
                .help("Directory of the template files inside the generator repository"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .env("GENMIG_TOKEN")
                .hide_env_values(true)
                .help("GitHub access token (falls back to GITHUB_TOKEN)"),
        )
        .arg(
            Arg::new("project-dir")
                .long("project-dir")
                .short('C')
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Project root [default: .]"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML settings file"),
        )
        .arg(
            Arg::new("tag-prefix")
                .long("tag-prefix")
                .value_name("PREFIX")
                .help("Prefix of release tags [default: v]"),
        )
        .arg(
            Arg::new("branch")
                .long("branch")
                .value_name("BRANCH")
                .help("Branch holding the published package.json [default: master]"),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .value_name("SECS")
                .value_parser(value_parser!(u64).range(1..))
                .help("HTTP request timeout [default: 30]"),
        )
        .arg(
            Arg::new("concurrency")
                .long("concurrency")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Files processed at once [default: 8]"),
        )
        .arg(
            Arg::new("no-advance-on-conflict")
                .long("no-advance-on-conflict")
                .action(ArgAction::SetTrue)
                .help("Keep the tracked version when any file conflicts"),
        )
        .arg(
            Arg::new("conflict-markers")
                .long("conflict-markers")
                .action(ArgAction::SetTrue)
                .help("Append conflict blocks to files that could not be migrated"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .short('n')
                .action(ArgAction::SetTrue)
                .help("Report what would change without writing"),
        )
        .arg(
            Arg::new("diff-file")
                .long("diff-file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Read the template diff from a unified diff file"),
        )
        .arg(
            Arg::new("to-version")
                .long("to-version")
                .value_name("VERSION")
                .help("Target version instead of the latest published one"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the report as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("More log output (-v debug, -vv trace)"),
        )
}

/// Everything one invocation needs
#[derive(Debug, Clone)]
pub struct Invocation {
    pub config: MigrationConfig,
    pub diff_file: Option<PathBuf>,
    pub to_version: Option<String>,
    pub json: bool,
    pub verbosity: u8,
}

impl Invocation {
    /// Build from parsed arguments
    ///
    /// # Errors
    /// Returns error if the config file or a flag value is invalid
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = match matches.get_one::<PathBuf>("config") {
            Some(path) => MigrationConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => MigrationConfig::default(),
        };

        if let Some(generator) = matches.get_one::<String>("generator") {
            let generator: GeneratorId = generator.parse().context("invalid generator")?;
            config = config.with_generator(generator);
        }

        let open = matches.get_one::<String>("open");
        let close = matches.get_one::<String>("close");
        if open.is_some() || close.is_some() {
            let delimiters = DelimiterSpec::new(
                open.map_or_else(|| config.delimiters.open().to_string(), Clone::clone),
                close.map_or_else(|| config.delimiters.close().to_string(), Clone::clone),
            )
            .context("invalid delimiters")?;
            config = config.with_delimiters(delimiters);
        }

        if let Some(prefix) = matches.get_one::<String>("template-prefix") {
            config = config.with_template_prefix(prefix.clone());
        }
        if let Some(root) = matches.get_one::<PathBuf>("project-dir") {
            config = config.with_project_root(root.clone());
        }
        if let Some(prefix) = matches.get_one::<String>("tag-prefix") {
            config = config.with_tag_prefix(prefix.clone());
        }
        if let Some(branch) = matches.get_one::<String>("branch") {
            config = config.with_metadata_branch(branch.clone());
        }
        if let Some(secs) = matches.get_one::<u64>("timeout-secs") {
            config = config.with_request_timeout_secs(*secs);
        }
        if let Some(max) = matches.get_one::<usize>("concurrency") {
            config = config.with_max_concurrency(*max);
        }
        if matches.get_flag("no-advance-on-conflict") {
            config = config.with_advance_on_conflict(false);
        }
        if matches.get_flag("conflict-markers") {
            config = config.with_conflict_policy(ConflictPolicy::AppendMarkers);
        }
        if matches.get_flag("dry-run") {
            config = config.with_dry_run(true);
        }

        let token = matches
            .get_one::<String>("token")
            .cloned()
            .or_else(|| std::env::var(GITHUB_TOKEN_ENV).ok())
            .filter(|t| !t.is_empty());
        if let Some(token) = token {
            config = config.with_token(token);
        }

        config.validate().context("invalid settings")?;

        Ok(Self {
            config,
            diff_file: matches.get_one::<PathBuf>("diff-file").cloned(),
            to_version: matches.get_one::<String>("to-version").cloned(),
            json: matches.get_flag("json"),
            verbosity: matches.get_count("verbose"),
        })
    }
}
