use std::fs;
use std::path::{Path, PathBuf};

use asset_spec_compiler::{CompileOptions, CompileReport, compile};
use asset_spec_core::{CompiledPackage, PropertyNode, SocketKind, validate_package};
use asset_spec_db::{CompileConfig, PackageIdEntry, PackageIdIndex, SchemaProvider, StoreBuilder};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

const ID_INDEX_FILE: &str = "ids.json";
const REPORT_FILE: &str = "compile-report.json";

#[derive(Debug, Parser)]
#[command(name = "asset-spec")]
#[command(about = "Compile CloudFormation resource schemas into asset packages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile registry schemas into one package file per resource type.
    Compile(CompileArgs),
    /// Structurally validate compiled package files.
    Validate(ValidateArgs),
    /// Print the outline of a compiled package.
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Directory of CloudFormation registry JSON files.
    #[arg(long)]
    schemas: Option<PathBuf>,
    /// JSON array of registry schemas, tried after --schemas.
    #[arg(long)]
    bundle: Option<PathBuf>,
    /// Output directory for package files.
    #[arg(long)]
    output: PathBuf,
    /// Path to asset-spec.yml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Comma-separated service tokens (e.g. EC2,S3); overrides the config.
    #[arg(long)]
    services: Option<String>,
    /// Comma-separated exact type names to compile.
    #[arg(long)]
    types: Option<String>,
    /// Comma-separated type names to skip, added to the config's list.
    #[arg(long)]
    exclude: Option<String>,
    /// Package version (default: today's date).
    #[arg(long)]
    package_version: Option<String>,
    /// Author recorded in every package.
    #[arg(long)]
    created_by: Option<String>,
    /// Fixed creation timestamp, for reproducible output.
    #[arg(long)]
    created_at: Option<String>,
    /// Number of worker threads (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Keep shared array elements inline instead of extracting sub-assets.
    #[arg(long)]
    no_sub_assets: bool,
    /// Id index file (default: <output>/ids.json).
    #[arg(long)]
    id_index: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Package files and/or directories containing package files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Compiled package file.
    input: PathBuf,
    /// Also print the generated asset definition.
    #[arg(long)]
    code: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asset_spec=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compile(args) => run_compile(args),
        Command::Validate(args) => run_validate(args),
        Command::Inspect(args) => run_inspect(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_compile(args: CompileArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => CompileConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => CompileConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let mut builder = StoreBuilder::new();
    if let Some(dir) = &args.schemas {
        builder = builder.from_dir(dir);
    }
    if let Some(bundle) = &args.bundle {
        builder = builder.from_bundle(bundle);
    }
    let mut store = builder
        .build()
        .map_err(|err| format!("Failed to load schemas (pass --schemas or --bundle): {err}"))?;
    store.retain(|name| config.is_allowed(name));
    let schemas = store.load(&[]).map_err(|e| e.to_string())?;

    fs::create_dir_all(&args.output).map_err(|err| {
        format!(
            "Failed to create output directory '{}': {err}",
            args.output.display()
        )
    })?;
    let index_path = args
        .id_index
        .clone()
        .unwrap_or_else(|| args.output.join(ID_INDEX_FILE));
    let mut index = PackageIdIndex::load_or_default(&index_path)
        .map_err(|err| format!("Failed to load id index '{}': {err}", index_path.display()))?;

    let options = compile_options(&config, &args, &index);
    let requested = parse_csv_list(args.types.clone());
    let outcome = compile(schemas, &requested, &options).map_err(|e| e.to_string())?;

    for package in &outcome.packages {
        let file = package_file_name(&package.name);
        let path = args.output.join(&file);
        let raw = serde_json::to_string_pretty(package)
            .map_err(|err| format!("Failed to serialize '{}': {err}", package.name))?;
        fs::write(&path, &raw)
            .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;

        let Some(schema) = package.schema() else {
            continue;
        };
        index.update_entry(
            package.name.clone(),
            PackageIdEntry {
                unique_id: schema.unique_id.clone(),
                checksum: PackageIdIndex::checksum(raw.as_bytes()),
                file: Some(file),
            },
        );
    }
    index
        .save(&index_path)
        .map_err(|err| format!("Failed to write '{}': {err}", index_path.display()))?;
    info!(path = %index_path.display(), entries = index.packages.len(), "Saved id index");
    write_report(&args.output, &outcome.report)?;

    println!(
        "Compiled and wrote {} package file(s).",
        outcome.packages.len()
    );
    let skipped: Vec<String> = outcome
        .report
        .skipped()
        .map(|r| match r.skip_code {
            Some(code) => format!("{} ({code})", r.schema),
            None => r.schema.clone(),
        })
        .collect();
    if !skipped.is_empty() {
        eprintln!("{} schema(s) skipped: {}", skipped.len(), skipped.join(", "));
    }
    Ok(())
}

fn apply_overrides(config: &mut CompileConfig, args: &CompileArgs) {
    let services = parse_csv_list(args.services.clone());
    if !services.is_empty() {
        config.services = services;
    }
    config.exclude.extend(parse_csv_list(args.exclude.clone()));
    if args.package_version.is_some() {
        config.package.version = args.package_version.clone();
    }
    if args.created_by.is_some() {
        config.package.created_by = args.created_by.clone();
    }
    if args.jobs.is_some() {
        config.compile.jobs = args.jobs;
    }
    if args.no_sub_assets {
        config.compile.extract_sub_assets = false;
    }
}

fn compile_options(
    config: &CompileConfig,
    args: &CompileArgs,
    index: &PackageIdIndex,
) -> CompileOptions {
    let defaults = CompileOptions::default();
    CompileOptions {
        version: config.package.version.clone().unwrap_or(defaults.version),
        created_by: config
            .package
            .created_by
            .clone()
            .unwrap_or(defaults.created_by),
        created_at: args.created_at.clone(),
        jobs: config.compile.jobs,
        extract_sub_assets: config.compile.extract_sub_assets,
        existing_ids: index.existing_ids(),
    }
}

fn write_report(output: &Path, report: &CompileReport) -> Result<(), String> {
    let path = output.join(REPORT_FILE);
    let raw = serde_json::to_string_pretty(report)
        .map_err(|err| format!("Failed to serialize compile report: {err}"))?;
    fs::write(&path, raw).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let paths = collect_package_paths(&args.inputs)?;
    let mut invalid = 0usize;
    for path in &paths {
        let package = read_package(path)?;
        let errors = validate_package(&package);
        if errors.is_empty() {
            continue;
        }
        invalid += 1;
        eprintln!("{}: {} error(s)", path.display(), errors.len());
        for error in errors {
            eprintln!("  {error}");
        }
    }
    if invalid > 0 {
        return Err(format!("{invalid} of {} package(s) invalid", paths.len()));
    }
    println!("Validated {} package file(s).", paths.len());
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let package = read_package(&args.input)?;
    print!("{}", outline(&package));
    if args.code {
        let variant = package
            .variant()
            .ok_or_else(|| format!("'{}' has no schema variant", package.name))?;
        let code = variant
            .data
            .func_unique_id
            .as_deref()
            .and_then(|id| package.func(id))
            .and_then(|func| func.data.code_base64.as_deref())
            .ok_or_else(|| format!("'{}' has no asset definition", package.name))?;
        let decoded = STANDARD
            .decode(code)
            .map_err(|err| format!("Failed to decode asset definition: {err}"))?;
        println!();
        println!("{}", String::from_utf8_lossy(&decoded));
    }
    Ok(())
}

/// Human-readable summary of a package: every prop path, then sockets and
/// functions.
fn outline(package: &CompiledPackage) -> String {
    let mut out = format!("{} ({})\n", package.name, package.version);
    let Some(variant) = package.variant() else {
        out.push_str("  no variant\n");
        return out;
    };

    for tree in [&variant.domain, &variant.secrets, &variant.resource_value] {
        for prop in tree.bfs() {
            out.push_str(&format!("  {}\n", prop_line(prop)));
        }
    }
    for kind in [SocketKind::Input, SocketKind::Output] {
        for socket in variant.sockets_of(kind) {
            let direction = match kind {
                SocketKind::Input => "input",
                SocketKind::Output => "output",
            };
            out.push_str(&format!("  {direction} socket {}\n", socket.name));
        }
    }
    for func in &package.funcs {
        out.push_str(&format!("  func {} [{:?}]\n", func.name, func.kind));
    }
    out
}

fn prop_line(prop: &PropertyNode) -> String {
    let mut line = format!("{}: {}", prop.path_str(), prop.kind_name());
    if let Some(widget) = prop.data.widget_kind {
        line.push_str(&format!(" [{}]", widget.as_str()));
    }
    if prop.metadata.required {
        line.push_str(" required");
    }
    if prop.data.hidden {
        line.push_str(" hidden");
    }
    line
}

fn read_package(path: &Path) -> Result<CompiledPackage, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("Failed to parse '{}': {err}", path.display()))
}

/// Expands directories into their package files, skipping the id index and
/// compile report.
fn collect_package_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }
        let entries = fs::read_dir(input)
            .map_err(|err| format!("Failed to read '{}': {err}", input.display()))?;
        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| e.to_string())?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.ends_with(".json") && name != ID_INDEX_FILE && name != REPORT_FILE {
                found.push(path);
            }
        }
        found.sort();
        paths.extend(found);
    }
    Ok(paths)
}

/// `AWS::EC2::VPC` becomes `aws-ec2-vpc.json`.
fn package_file_name(name: &str) -> String {
    let stem: String = name
        .split("::")
        .map(|part| {
            part.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_lowercase()
                    } else {
                        '_'
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-");
    format!("{stem}.json")
}

fn parse_csv_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_file_name() {
        assert_eq!(package_file_name("AWS::EC2::VPC"), "aws-ec2-vpc.json");
        assert_eq!(
            package_file_name("AWS::EC2::SecurityGroup::Rules"),
            "aws-ec2-securitygroup-rules.json"
        );
        assert_eq!(package_file_name("Odd Name"), "odd_name.json");
    }

    #[test]
    fn test_parse_csv_list_trims_and_drops_empty() {
        assert_eq!(
            parse_csv_list(Some(" EC2, ,S3 ".into())),
            vec!["EC2".to_string(), "S3".to_string()]
        );
        assert!(parse_csv_list(None).is_empty());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let args = Cli::parse_from([
            "asset-spec",
            "compile",
            "--output",
            "out",
            "--services",
            "S3",
            "--exclude",
            "AWS::S3::AccessPoint",
            "--jobs",
            "2",
            "--no-sub-assets",
        ]);
        let Command::Compile(args) = args.command else {
            panic!("expected compile");
        };
        let mut config = CompileConfig {
            services: vec!["EC2".into()],
            exclude: vec!["AWS::EC2::Host".into()],
            ..Default::default()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.services, vec!["S3"]);
        assert_eq!(config.exclude, vec!["AWS::EC2::Host", "AWS::S3::AccessPoint"]);
        assert_eq!(config.compile.jobs, Some(2));
        assert!(!config.compile.extract_sub_assets);

        let options = compile_options(&config, &args, &PackageIdIndex::new());
        assert_eq!(options.jobs, Some(2));
        assert!(!options.extract_sub_assets);
        assert_eq!(options.created_by, "asset-spec");
    }
}
