use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};

const BIN: &str = env!("CARGO_BIN_EXE_asset-spec");

fn write_schema(dir: &Path, file: &str, value: &Value) {
    fs::write(dir.join(file), serde_json::to_string_pretty(value).unwrap())
        .expect("failed to write schema");
}

fn seed_schemas(dir: &Path) {
    write_schema(
        dir,
        "aws-ec2-vpc.json",
        &json!({
            "typeName": "AWS::EC2::VPC",
            "properties": {
                "CidrBlock": { "type": "string" },
                "VpcId": { "type": "string" }
            },
            "readOnlyProperties": ["/properties/VpcId"],
            "primaryIdentifier": ["/properties/VpcId"],
            "handlers": { "create": {}, "read": {}, "delete": {}, "list": {} }
        }),
    );
    write_schema(
        dir,
        "aws-ec2-subnet.json",
        &json!({
            "typeName": "AWS::EC2::Subnet",
            "properties": {
                "VpcId": { "type": "string" },
                "SubnetId": { "type": "string" }
            },
            "required": ["VpcId"],
            "readOnlyProperties": ["/properties/SubnetId"],
            "primaryIdentifier": ["/properties/SubnetId"],
            "handlers": { "create": {}, "read": {}, "delete": {} }
        }),
    );
    write_schema(
        dir,
        "aws-s3-bucket.json",
        &json!({
            "typeName": "AWS::S3::Bucket",
            "properties": { "BucketName": { "type": "string" } },
            "handlers": { "create": {}, "read": {} }
        }),
    );
}

fn run(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .output()
        .expect("failed to run asset-spec")
}

fn compile_into(schemas: &Path, output: &Path, extra: &[&str]) -> Output {
    let mut args = vec![
        "compile",
        "--schemas",
        schemas.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "--created-at",
        "2025-01-01T00:00:00Z",
        "--package-version",
        "2025-01-01",
    ];
    args.extend_from_slice(extra);
    run(&args)
}

fn read_json(path: PathBuf) -> Value {
    serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap()
}

#[test]
fn compile_writes_one_file_per_package_and_an_index() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());

    let result = compile_into(schemas.path(), output.path(), &[]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    for file in ["aws-ec2-vpc.json", "aws-ec2-subnet.json", "aws-s3-bucket.json"] {
        let package = read_json(output.path().join(file));
        assert_eq!(package["kind"], "module");
        assert_eq!(package["version"], "2025-01-01");
        assert_eq!(package["createdAt"], "2025-01-01T00:00:00Z");
        assert_eq!(package["changeSets"], json!([]));
    }

    let index = read_json(output.path().join("ids.json"));
    assert_eq!(index["packages"].as_object().unwrap().len(), 3);
    let report = read_json(output.path().join("compile-report.json"));
    assert_eq!(report["schemas"].as_array().unwrap().len(), 3);
}

#[test]
fn recompiling_reuses_schema_ids() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());

    assert!(compile_into(schemas.path(), output.path(), &[]).status.success());
    let first = read_json(output.path().join("aws-ec2-vpc.json"));
    assert!(compile_into(schemas.path(), output.path(), &[]).status.success());
    let second = read_json(output.path().join("aws-ec2-vpc.json"));

    assert_eq!(
        first["schemas"][0]["uniqueId"],
        second["schemas"][0]["uniqueId"]
    );
}

#[test]
fn services_flag_limits_output() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());

    let result = compile_into(schemas.path(), output.path(), &["--services", "S3"]);
    assert!(result.status.success());
    assert!(output.path().join("aws-s3-bucket.json").exists());
    assert!(!output.path().join("aws-ec2-vpc.json").exists());
}

#[test]
fn config_file_is_honored() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());
    let config = schemas.path().join("asset-spec.yml");
    fs::write(
        &config,
        "version: \"1.0\"\nservices: [EC2]\nexclude: [AWS::EC2::Subnet]\npackage:\n  created_by: Clover\n",
    )
    .unwrap();

    let result = compile_into(
        schemas.path(),
        output.path(),
        &["--config", config.to_str().unwrap()],
    );
    assert!(result.status.success());
    let vpc = read_json(output.path().join("aws-ec2-vpc.json"));
    assert_eq!(vpc["createdBy"], "Clover");
    assert!(!output.path().join("aws-ec2-subnet.json").exists());
    assert!(!output.path().join("aws-s3-bucket.json").exists());
}

#[test]
fn unknown_requested_type_is_reported_not_fatal() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());

    let result = compile_into(
        schemas.path(),
        output.path(),
        &["--types", "AWS::EC2::VPC,AWS::Nope::Missing"],
    );
    assert!(result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("AWS::Nope::Missing (missing_schema)"), "{stderr}");
    assert!(output.path().join("aws-ec2-vpc.json").exists());
}

#[test]
fn validate_accepts_compiled_output() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());
    assert!(compile_into(schemas.path(), output.path(), &[]).status.success());

    let result = run(&["validate", output.path().to_str().unwrap()]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert!(String::from_utf8_lossy(&result.stdout).contains("Validated 3 package file(s)."));
}

#[test]
fn validate_rejects_broken_package() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());
    assert!(compile_into(schemas.path(), output.path(), &[]).status.success());

    let path = output.path().join("aws-s3-bucket.json");
    let mut package = read_json(path.clone());
    package["name"] = json!("");
    fs::write(&path, serde_json::to_string(&package).unwrap()).unwrap();

    let result = run(&["validate", path.to_str().unwrap()]);
    assert!(!result.status.success());
}

#[test]
fn inspect_prints_outline_and_code() {
    let schemas = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_schemas(schemas.path());
    assert!(compile_into(schemas.path(), output.path(), &[]).status.success());

    let path = output.path().join("aws-ec2-subnet.json");
    let result = run(&["inspect", path.to_str().unwrap(), "--code"]);
    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("/domain/VpcId: string"), "{stdout}");
    assert!(stdout.contains("input socket VpcId"), "{stdout}");
    assert!(stdout.contains("new AssetBuilder()"), "{stdout}");
}

#[test]
fn missing_schema_source_fails() {
    let output = tempfile::tempdir().unwrap();
    let result = run(&["compile", "--output", output.path().to_str().unwrap()]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("error:"));
}
