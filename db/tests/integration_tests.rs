use std::path::Path;

use asset_spec_core::HandlerKind;
use asset_spec_db::{
    CompileConfig, PackageIdEntry, PackageIdIndex, SchemaProvider, SchemaStore,
};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_json(dir: &Path, file: &str, value: &Value) {
    std::fs::write(dir.join(file), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn registry_schema() -> Value {
    json!({
        "typeName": "AWS::EC2::SecurityGroup",
        "description": "Resource Type definition for AWS::EC2::SecurityGroup",
        "definitions": {
            "Ingress": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "IpProtocol": { "type": "string" },
                    "FromPort": { "type": "integer" },
                    "Tags": { "type": "array", "items": { "$ref": "#/definitions/Tag" } }
                },
                "required": ["IpProtocol"]
            },
            "Tag": {
                "type": "object",
                "properties": {
                    "Key": { "type": "string" },
                    "Value": { "type": "string" }
                }
            }
        },
        "properties": {
            "GroupDescription": { "type": "string" },
            "GroupId": { "type": "string" },
            "SecurityGroupIngress": {
                "type": "array",
                "uniqueItems": false,
                "insertionOrder": false,
                "items": { "$ref": "#/definitions/Ingress" }
            }
        },
        "required": ["GroupDescription"],
        "readOnlyProperties": ["/properties/GroupId"],
        "primaryIdentifier": ["/properties/GroupId"],
        "handlers": {
            "create": { "permissions": ["ec2:CreateSecurityGroup"] },
            "read": { "permissions": ["ec2:DescribeSecurityGroups"] },
            "delete": { "permissions": ["ec2:DeleteSecurityGroup"] }
        }
    })
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_registry_directory_loads_with_inlined_definitions() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "aws-ec2-securitygroup.json", &registry_schema());

    let store = SchemaStore::from_dir(dir.path()).unwrap();
    let schema = store.get("AWS::EC2::SecurityGroup").unwrap();
    assert!(schema.has_handler(HandlerKind::Read));
    assert_eq!(schema.primary_identifier, vec!["/properties/GroupId"]);

    let ingress = schema.properties["SecurityGroupIngress"].items.as_deref().unwrap();
    assert_eq!(ingress.def_name.as_deref(), Some("Ingress"));
    assert!(ingress.reference.is_none());
    assert_eq!(ingress.required, vec!["IpProtocol"]);

    let tag = ingress.properties.as_ref().unwrap()["Tags"]
        .items
        .as_deref()
        .unwrap();
    assert_eq!(tag.def_name.as_deref(), Some("Tag"));
    assert!(tag.properties.as_ref().unwrap().contains_key("Key"));
}

#[test]
fn test_config_filters_loaded_store() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "sg.json", &registry_schema());
    write_json(
        dir.path(),
        "bucket.json",
        &json!({ "typeName": "AWS::S3::Bucket", "properties": {} }),
    );
    write_json(
        dir.path(),
        "host.json",
        &json!({ "typeName": "AWS::EC2::Host", "properties": {} }),
    );

    let config: CompileConfig =
        serde_yaml::from_str("version: \"1.0\"\nservices: [ec2]\nexclude: [AWS::EC2::Host]\n")
            .unwrap();
    let mut store = SchemaStore::from_dir(dir.path()).unwrap();
    store.retain(|name| config.is_allowed(name));

    let names: Vec<&str> = store.type_names().collect();
    assert_eq!(names, vec!["AWS::EC2::SecurityGroup"]);
    assert_eq!(store.load(&[]).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Id index
// ---------------------------------------------------------------------------

#[test]
fn test_id_index_roundtrip_and_verification() {
    let dir = tempfile::tempdir().unwrap();
    let package = br#"{"kind":"module","name":"AWS::S3::Bucket"}"#;
    std::fs::write(dir.path().join("aws-s3-bucket.json"), package).unwrap();

    let mut index = PackageIdIndex::new();
    index.update_entry(
        "AWS::S3::Bucket".into(),
        PackageIdEntry {
            unique_id: "01J00000000000000000000000".into(),
            checksum: PackageIdIndex::calculate_checksum(dir.path().join("aws-s3-bucket.json"))
                .unwrap(),
            file: Some("aws-s3-bucket.json".into()),
        },
    );
    let path = dir.path().join("ids.json");
    index.save(&path).unwrap();

    let loaded = PackageIdIndex::load(&path).unwrap();
    assert_eq!(loaded.packages, index.packages);
    assert!(loaded.diff(&index).is_empty());
    loaded.verify("AWS::S3::Bucket", dir.path()).unwrap();
    assert_eq!(
        loaded.existing_ids().get("AWS::S3::Bucket").map(String::as_str),
        Some("01J00000000000000000000000")
    );

    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw["packages"]["AWS::S3::Bucket"]["uniqueId"].is_string());
}
