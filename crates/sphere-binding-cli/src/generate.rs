//! The per-unit pipeline: plan, locate, merge, write.

use crate::config::Settings;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use sphere_binding_gosrc::{rewrite_generated_file, RewriteOutcome};
use sphere_binding_schema::goname::generated_filename_prefix;
use sphere_binding_schema::{extract_file, load_descriptor_set_json, PathsMode, ProtoFile};
use sphere_binding_tags::StructTags;
use std::collections::BTreeMap;

/// Decode the descriptor set and keep the units selected by `--file`.
pub fn load_units(descriptor: &str, settings: &Settings) -> Result<Vec<ProtoFile>> {
    let files = load_descriptor_set_json(descriptor, &settings.load)
        .context("failed to load descriptor set")?;
    if settings.files.is_empty() {
        return Ok(files);
    }

    let units: Vec<ProtoFile> = files
        .into_iter()
        .filter(|f| settings.files.iter().any(|want| want == &f.name))
        .collect();
    for want in &settings.files {
        if !units.iter().any(|f| &f.name == want) {
            return Err(anyhow!("{want} is not in the descriptor set"));
        }
    }
    Ok(units)
}

/// `<prefix>` of the unit's `<prefix>.pb.go`, relative to the output directory.
pub fn unit_prefix(file: &ProtoFile, mode: PathsMode) -> String {
    if let Some(prefix) = generated_filename_prefix(&file.name, file.go_package.as_deref(), mode)
    {
        return prefix;
    }
    tracing::warn!(
        file = %file.name,
        "no go_package; falling back to the source-relative path"
    );
    let stem = file.name.strip_suffix(".proto").unwrap_or(&file.name);
    stem.to_string()
}

fn tag_unit(file: &ProtoFile, settings: &Settings) -> Result<RewriteOutcome> {
    let plan = extract_file(file, &settings.tagger)
        .with_context(|| format!("failed to plan tags for {}", file.name))?;
    let prefix = unit_prefix(file, settings.paths);
    rewrite_generated_file(&settings.rewrite, &prefix, &plan)
        .with_context(|| format!("failed to retag {}", file.name))
}

/// Run `f` on a pool sized by `--jobs`, or on rayon's global pool.
fn with_pool<T: Send>(jobs: Option<usize>, f: impl FnOnce() -> T + Send) -> Result<T> {
    match jobs {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n.max(1))
                .build()
                .context("failed to build worker pool")?;
            Ok(pool.install(f))
        }
        None => Ok(f()),
    }
}

/// Retag every unit; reports each outcome and fails if any unit failed.
pub fn run_tag(units: &[ProtoFile], settings: &Settings) -> Result<()> {
    let results: Vec<(&ProtoFile, Result<RewriteOutcome>)> = with_pool(settings.jobs, || {
        units
            .par_iter()
            .map(|file| (file, tag_unit(file, settings)))
            .collect()
    })?;

    let mut failed = 0usize;
    let mut rewritten = 0usize;
    for (file, result) in &results {
        match result {
            Ok(RewriteOutcome::Rewritten(path)) => {
                rewritten += 1;
                println!("  {} {}", "→".cyan(), path.display());
            }
            Ok(RewriteOutcome::Unchanged(path)) => {
                tracing::info!(file = %file.name, path = %path.display(), "up to date");
            }
            Ok(RewriteOutcome::EmptyPlan) => {
                tracing::debug!(file = %file.name, "nothing to tag");
            }
            Err(err) => {
                failed += 1;
                eprintln!("{} {err:#}", "error:".red().bold());
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} units failed", results.len()));
    }
    println!(
        "{} {} of {} files retagged",
        "ok".green().bold(),
        rewritten,
        results.len()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct UnitPlan {
    /// Generated file, relative to the output directory.
    pub target: String,
    /// struct → field → tag text.
    pub structs: BTreeMap<String, BTreeMap<String, String>>,
}

fn render_plan(file: &ProtoFile, plan: &StructTags, mode: PathsMode) -> UnitPlan {
    let structs = plan
        .iter()
        .map(|(strukt, fields)| {
            let fields = fields
                .iter()
                .map(|(field, tags)| (field.clone(), tags.to_string()))
                .collect();
            (strukt.clone(), fields)
        })
        .collect();
    UnitPlan {
        target: format!("{}.pb.go", unit_prefix(file, mode)),
        structs,
    }
}

/// The plan of every unit, keyed by proto file name. Nothing is written.
pub fn plan_units(units: &[ProtoFile], settings: &Settings) -> Result<BTreeMap<String, UnitPlan>> {
    let mut out = BTreeMap::new();
    for file in units {
        let plan = extract_file(file, &settings.tagger)
            .with_context(|| format!("failed to plan tags for {}", file.name))?;
        if plan.is_empty() {
            continue;
        }
        out.insert(file.name.clone(), render_plan(file, &plan, settings.paths));
    }
    Ok(out)
}
