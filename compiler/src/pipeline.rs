//! The compile driver.
//!
//! Stages run in a fixed order over the whole batch. Per-schema stages run
//! in parallel on rayon; a stage never starts before every worker of the
//! previous stage has joined. Cross-schema stages read every package in a
//! parallel collect phase, then apply their results sequentially in package
//! order, so the output does not depend on scheduling.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use asset_spec_core::{CompiledPackage, RawSchema, SchemaSpec, validate_package};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::attach::attach_default_funcs;
use crate::codegen::attach_asset_definition;
use crate::default_props::add_default_props;
use crate::overrides::apply_overrides;
use crate::prop_tree::{build_variant, category_name};
use crate::prune::prune_package;
use crate::report::{CompileReport, SchemaReport, SkipCode, StageTiming};
use crate::sockets::{SocketCatalog, add_input_sockets, add_output_sockets};
use crate::sub_assets::{collect_candidates, extract_sub_assets};
use crate::suggestions::{SuggestionIndex, apply_suggestions, plan_suggestions};
use crate::{CompileError, Result};

/// Version and provenance stamped on every package of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageStamp {
    pub version: String,
    pub created_at: String,
    pub created_by: String,
}

impl PackageStamp {
    pub fn package(&self, schema: SchemaSpec) -> CompiledPackage {
        CompiledPackage::new(
            schema,
            self.version.as_str(),
            self.created_at.as_str(),
            self.created_by.as_str(),
        )
    }
}

/// Runtime knobs for [`compile`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Version stamped on every package.
    pub version: String,
    pub created_by: String,
    /// Fixed creation timestamp; the current time when `None`.
    pub created_at: Option<String>,
    /// Worker threads; rayon's global pool when `None`.
    pub jobs: Option<usize>,
    pub extract_sub_assets: bool,
    /// Package name to a previously assigned schema unique id.
    pub existing_ids: HashMap<String, String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            version: Utc::now().format("%Y%m%d").to_string(),
            created_by: "asset-spec".to_string(),
            created_at: None,
            jobs: None,
            extract_sub_assets: true,
            existing_ids: HashMap::new(),
        }
    }
}

impl CompileOptions {
    fn stamp(&self) -> PackageStamp {
        PackageStamp {
            version: self.version.clone(),
            created_at: self
                .created_at
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
            created_by: self.created_by.clone(),
        }
    }
}

/// Packages and report of a finished run.
#[derive(Debug)]
pub struct CompileOutcome {
    pub packages: Vec<CompiledPackage>,
    pub report: CompileReport,
}

/// Compiles `schemas` into one package per resource type plus extracted
/// sub-assets.
///
/// `requested` limits the run to the named type names; an empty slice
/// compiles everything. Requested names with no schema are reported as
/// skipped. Recoverable errors skip the affected schema; fatal errors abort
/// the run.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::{CompileOptions, compile};
/// use asset_spec_core::RawSchema;
///
/// let schema: RawSchema = serde_json::from_value(serde_json::json!({
///     "typeName": "AWS::Demo::Widget",
///     "properties": { "Name": { "type": "string" }, "Id": { "type": "string" } },
///     "readOnlyProperties": ["/properties/Id"],
///     "primaryIdentifier": ["/properties/Id"],
///     "handlers": { "create": {}, "read": {}, "delete": {} }
/// }))
/// .unwrap();
///
/// let outcome = compile(vec![schema], &[], &CompileOptions::default()).unwrap();
/// assert_eq!(outcome.packages.len(), 1);
/// assert_eq!(outcome.report.compiled_count(), 1);
/// ```
pub fn compile(
    schemas: Vec<RawSchema>,
    requested: &[String],
    options: &CompileOptions,
) -> Result<CompileOutcome> {
    match options.jobs.filter(|jobs| *jobs > 0) {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
            pool.install(|| run(schemas, requested, options))
        }
        None => run(schemas, requested, options),
    }
}

fn run(
    mut schemas: Vec<RawSchema>,
    requested: &[String],
    options: &CompileOptions,
) -> Result<CompileOutcome> {
    let mut report = CompileReport::default();
    let stamp = options.stamp();

    if !requested.is_empty() {
        let wanted: BTreeSet<&str> = requested.iter().map(String::as_str).collect();
        schemas.retain(|s| wanted.contains(s.type_name.as_str()));
        let found: HashSet<&str> = schemas.iter().map(|s| s.type_name.as_str()).collect();
        for name in wanted.iter().filter(|name| !found.contains(*name)) {
            skip(&mut report, name, CompileError::MissingSchema(name.to_string()))?;
        }
    }
    schemas.sort_by(|a, b| a.type_name.cmp(&b.type_name));
    schemas.dedup_by(|a, b| a.type_name == b.type_name);

    let count = schemas.len();
    let built = stage(&mut report, "prop_tree", count, || {
        schemas
            .into_par_iter()
            .map(|schema| {
                let name = schema.type_name.clone();
                (name, build_package(schema, &stamp))
            })
            .collect::<Vec<_>>()
    });
    let mut packages = Vec::with_capacity(built.len());
    for (name, result) in built {
        match result {
            Ok(package) => packages.push(package),
            Err(err) => skip(&mut report, &name, err)?,
        }
    }

    let count = packages.len();
    stage(&mut report, "input_sockets", count, || {
        let catalog = packages
            .par_iter()
            .map(|p| SocketCatalog::collect(std::slice::from_ref(p)))
            .reduce(SocketCatalog::default, SocketCatalog::merge);
        packages.par_iter_mut().for_each(|package| {
            let name = package.name.clone();
            if let Some(variant) = package.variant_mut() {
                add_input_sockets(variant, &name, &catalog);
            }
        });
    });

    let mut sub_asset_names = HashSet::new();
    if options.extract_sub_assets {
        let extracted = stage(&mut report, "sub_assets", count, || {
            let candidates: Vec<_> = packages
                .par_iter()
                .enumerate()
                .flat_map_iter(|(index, package)| collect_candidates(index, package))
                .collect();
            extract_sub_assets(&mut packages, candidates, &stamp)
        });
        sub_asset_names.extend(extracted.iter().map(|p| p.name.clone()));
        packages.extend(extracted);
    }

    let count = packages.len();
    stage(&mut report, "suggestions", count, || {
        let index = SuggestionIndex::collect(&packages);
        let planned: Vec<_> = packages
            .par_iter()
            .enumerate()
            .flat_map_iter(|(i, package)| plan_suggestions(i, package, &index))
            .collect();
        apply_suggestions(&mut packages, planned);
    });

    let packages = per_package(&mut report, "attach", packages, attach_default_funcs)?;
    let packages = per_package(&mut report, "overrides", packages, apply_overrides)?;
    let packages = per_package(&mut report, "prune", packages, |p| prune_package(p).map(drop))?;
    let packages = per_package(&mut report, "codegen", packages, |package| {
        if let Some(id) = options.existing_ids.get(&package.name) {
            if let Some(schema) = package.schema_mut() {
                schema.unique_id = id.clone();
            }
        }
        attach_asset_definition(package)
    })?;
    let packages = per_package(&mut report, "validate", packages, |package| {
        let errors = validate_package(package);
        if errors.is_empty() {
            return Ok(());
        }
        let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Err(CompileError::InvalidPackage {
            schema: package.name.clone(),
            errors: errors.join("; "),
        })
    })?;

    for package in &packages {
        let sub_asset = sub_asset_names.contains(&package.name);
        report
            .schemas
            .push(SchemaReport::compiled(package.name.as_str(), sub_asset));
    }
    info!(
        compiled = report.compiled_count(),
        skipped = report.skipped().count(),
        "Compilation finished"
    );
    Ok(CompileOutcome { packages, report })
}

/// PropTree, default props and output sockets for one schema.
fn build_package(schema: RawSchema, stamp: &PackageStamp) -> Result<CompiledPackage> {
    let schema = Arc::new(schema);
    let mut variant = build_variant(&schema)?;
    add_default_props(&mut variant, &schema.type_name)?;
    add_output_sockets(&mut variant);

    let category = category_name(&schema.type_parts());
    let mut package = stamp.package(SchemaSpec::new(schema.type_name.as_str(), category, variant));
    package.description = schema.description.clone().unwrap_or_default();
    Ok(package)
}

fn stage<T>(report: &mut CompileReport, name: &str, packages: usize, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let output = f();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(stage = name, packages, elapsed_ms, "Stage complete");
    report.stages.push(StageTiming {
        stage: name.to_string(),
        packages,
        elapsed_ms,
    });
    output
}

/// Runs `f` on every package in parallel. Packages failing with a
/// recoverable error are dropped and reported; a fatal error aborts.
fn per_package<F>(
    report: &mut CompileReport,
    name: &str,
    mut packages: Vec<CompiledPackage>,
    f: F,
) -> Result<Vec<CompiledPackage>>
where
    F: Fn(&mut CompiledPackage) -> Result<()> + Sync,
{
    let count = packages.len();
    let results: Vec<Result<()>> = stage(report, name, count, || {
        packages.par_iter_mut().map(&f).collect()
    });

    let mut kept = Vec::with_capacity(count);
    for (package, result) in packages.into_iter().zip(results) {
        match result {
            Ok(()) => kept.push(package),
            Err(err) => skip(report, &package.name, err)?,
        }
    }
    Ok(kept)
}

/// Records a recoverable error as a skipped schema; returns fatal ones.
fn skip(report: &mut CompileReport, schema: &str, err: CompileError) -> Result<()> {
    let Some(code) = SkipCode::from_error(&err) else {
        return Err(err);
    };
    warn!(schema = %schema, code = %code, "Skipping schema: {err}");
    report
        .schemas
        .push(SchemaReport::skipped(schema, code, err.to_string()));
    Ok(())
}
