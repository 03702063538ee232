//! Run settings: CLI flags layered over an optional JSON config file.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use sphere_binding_gosrc::RewriteOptions;
use sphere_binding_schema::{LoadOptions, PathsMode, TaggerConfig};
use sphere_binding_tags::AliasTable;
use std::fs;
use std::path::{Path, PathBuf};

/// Flags shared by `tag` and `plan`.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// JSON config file; flags given on the command line take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the protoc-gen-go output [default: api]
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Exclude bound fields from the body tag (`json:"-"`) [default: true]
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub auto_remove_json: Option<bool>,

    /// Extra tag keys per location key, e.g. `query=form,uri=path`
    #[arg(long)]
    pub binding_aliases: Option<String>,

    /// Body tag key written by the Go generator [default: json]
    #[arg(long)]
    pub body_tag: Option<String>,

    /// Protobuf package declaring the binding extensions [default: sphere.binding]
    #[arg(long)]
    pub extension_package: Option<String>,

    /// protoc-gen-go `paths` mode: import | source_relative [default: import]
    #[arg(long)]
    pub paths: Option<PathsMode>,

    /// Only process these proto files (descriptor names, repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,

    /// Pipe rewritten files through `gofmt`
    #[arg(long)]
    pub gofmt: bool,

    /// Worker threads (1 = sequential)
    #[arg(long)]
    pub jobs: Option<usize>,
}

/// The on-disk form of [`SettingsArgs`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub out: Option<PathBuf>,
    pub auto_remove_json: Option<bool>,
    pub binding_aliases: Option<String>,
    pub body_tag: Option<String>,
    pub extension_package: Option<String>,
    pub paths: Option<PathsMode>,
    pub files: Vec<String>,
    pub gofmt: Option<bool>,
    pub jobs: Option<usize>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }
}

/// Fully resolved, immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tagger: TaggerConfig,
    pub load: LoadOptions,
    pub rewrite: RewriteOptions,
    pub paths: PathsMode,
    pub files: Vec<String>,
    pub jobs: Option<usize>,
}

impl SettingsArgs {
    /// Merge flags over the config file over defaults.
    ///
    /// The alias table is validated here, before any unit is processed.
    pub fn resolve(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        let defaults = TaggerConfig::default();

        let aliases = self
            .binding_aliases
            .as_deref()
            .or(file.binding_aliases.as_deref())
            .unwrap_or("");
        let aliases = AliasTable::parse(aliases).context("invalid --binding-aliases")?;

        let tagger = TaggerConfig {
            auto_remove_body_tag: self
                .auto_remove_json
                .or(file.auto_remove_json)
                .unwrap_or(defaults.auto_remove_body_tag),
            body_tag: self
                .body_tag
                .clone()
                .or(file.body_tag)
                .unwrap_or(defaults.body_tag),
            aliases,
        };
        let load = LoadOptions {
            extension_package: self
                .extension_package
                .clone()
                .or(file.extension_package)
                .unwrap_or_else(|| LoadOptions::default().extension_package),
        };
        let rewrite = RewriteOptions {
            out_dir: self
                .out
                .clone()
                .or(file.out)
                .unwrap_or_else(|| RewriteOptions::default().out_dir),
            gofmt: self.gofmt || file.gofmt.unwrap_or(false),
        };
        let files = if self.files.is_empty() {
            file.files
        } else {
            self.files.clone()
        };

        Ok(Settings {
            tagger,
            load,
            rewrite,
            paths: self.paths.or(file.paths).unwrap_or_default(),
            files,
            jobs: self.jobs.or(file.jobs),
        })
    }
}
