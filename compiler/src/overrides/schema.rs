use asset_spec_core::{
    ActionKind, ArgumentKind, CREATE_ONLY_PROP_LABEL, CompiledPackage, FuncKind,
    LeafInput, PropKind, PropertyNode, Suggestion, TreeRoot, WidgetKind, WidgetOption,
};
use serde_json::Value;

use super::{
    SchemaOverride, add_secret_prop, array_prop_for_override, attach_extra_action,
    attach_extra_management, attach_qualification, domain_prop, modify_func,
    object_prop_for_override, override_func_id, prop_for_override, string_prop_for_override,
    variant_for_override,
};
use crate::default_props::PropUsageMap;
use crate::funcs::{
    CLOUDFORMATION_LINT, CODEGEN_CREATE, CODEGEN_UPDATE, DISCOVER_ON_AWS, IMPORT_FROM_AWS,
    REFRESH_ASSET, UPDATE_ASSET, func_id, new_func,
};
use crate::{CompileError, Result};

static SCHEMA_OVERRIDES: [SchemaOverride; 19] = [
    SchemaOverride { schema: "AWS::EC2::Instance", apply: ec2_instance },
    SchemaOverride { schema: "AWS::Route53::RecordSet", apply: route53_record_set },
    SchemaOverride { schema: "AWS::CertificateManager::Certificate", apply: acm_certificate },
    SchemaOverride { schema: "AWS::ECS::Service", apply: ecs_service },
    SchemaOverride { schema: "AWS::EC2::LaunchTemplate", apply: ec2_launch_template },
    SchemaOverride { schema: "AWS::RDS::DBParameterGroup", apply: rds_db_parameter_group },
    SchemaOverride { schema: "AWS::SecretsManager::Secret", apply: secrets_manager_secret },
    SchemaOverride { schema: "AWS::RDS::DBCluster", apply: master_user_password },
    SchemaOverride { schema: "AWS::RDS::DBInstance", apply: master_user_password },
    SchemaOverride { schema: "AWS::EC2::SecurityGroupIngress", apply: ec2_security_group_ingress },
    SchemaOverride { schema: "AWS::AutoScaling::AutoScalingGroup", apply: autoscaling_group },
    SchemaOverride { schema: "AWS::ImageBuilder::Component", apply: image_builder_component },
    SchemaOverride { schema: "AWS::ECS::Cluster", apply: ecs_cluster },
    SchemaOverride { schema: "AWS::ApiGatewayV2::Route", apply: api_gateway_v2_route },
    SchemaOverride { schema: "AWS::WAFv2::WebACL", apply: wafv2_web_acl },
    SchemaOverride { schema: "AWS::ECS::TaskDefinition", apply: ecs_task_definition },
    SchemaOverride { schema: "AWS::EC2::VPNConnection", apply: ec2_vpn_connection },
    SchemaOverride { schema: "AWS::EC2::CustomerGateway", apply: ec2_customer_gateway },
    SchemaOverride { schema: "AWS::S3::Bucket", apply: s3_bucket },
];

/// The schema override table, in registration order.
pub fn schema_overrides() -> &'static [SchemaOverride] {
    &SCHEMA_OVERRIDES
}

/// Replaces the package-local copy of the default function `name`.
fn replace_default(package: &mut CompiledPackage, name: &str, code: &str) -> Result<()> {
    let new_id = override_func_id(&package.name, name);
    modify_func(package, &func_id(name), new_id, code)
}

fn ec2_instance(package: &mut CompiledPackage) -> Result<()> {
    let name = "Set UserData prop and base64 encode if needed";
    package.add_func(new_func(
        name,
        Some(name),
        FuncKind::Attribute,
        "jsAttribute",
        "json",
        Some(include_str!("../../assets/overrides/ec2_instance/base64EncodeUserData.ts")),
        override_func_id(&package.name, name),
        &[("data", ArgumentKind::String)],
    ));

    domain_prop(package, &["UserData"])?.data.widget_kind = Some(WidgetKind::CodeEditor);

    attach_extra_action(
        package,
        "Reboot Ec2 Instance",
        ActionKind::Other,
        include_str!("../../assets/overrides/ec2_instance/reboot.ts"),
    )?;
    attach_extra_action(
        package,
        "Stop Ec2 Instance",
        ActionKind::Other,
        include_str!("../../assets/overrides/ec2_instance/stop.ts"),
    )?;
    attach_extra_action(
        package,
        "Start Ec2 Instance",
        ActionKind::Other,
        include_str!("../../assets/overrides/ec2_instance/start.ts"),
    )?;

    // Instance type checks read the secrets tree as well.
    attach_qualification(
        package,
        "Is Valid EC2 Instance Type",
        include_str!("../../assets/overrides/ec2_instance/isValidEc2InstanceType.ts"),
        &[LeafInput::Domain, LeafInput::Secrets],
    )
}

fn route53_record_set(package: &mut CompiledPackage) -> Result<()> {
    attach_extra_management(
        package,
        DISCOVER_ON_AWS,
        include_str!("../../assets/overrides/route53_record_set/discover.ts"),
    )?;
    attach_extra_management(
        package,
        IMPORT_FROM_AWS,
        include_str!("../../assets/overrides/route53_record_set/import.ts"),
    )?;
    attach_extra_action(
        package,
        "Create Route53 RecordSet",
        ActionKind::Create,
        include_str!("../../assets/overrides/route53_record_set/create.ts"),
    )?;
    attach_extra_action(
        package,
        "Refresh Route53 RecordSet",
        ActionKind::Refresh,
        include_str!("../../assets/overrides/route53_record_set/refresh.ts"),
    )
}

fn acm_certificate(package: &mut CompiledPackage) -> Result<()> {
    attach_extra_action(
        package,
        "Create ACM Certificate",
        ActionKind::Create,
        include_str!("../../assets/overrides/acm_certificate/create.ts"),
    )?;
    attach_extra_action(
        package,
        "Refresh ACM Certificate",
        ActionKind::Refresh,
        include_str!("../../assets/overrides/acm_certificate/refresh.ts"),
    )
}

fn ecs_service(package: &mut CompiledPackage) -> Result<()> {
    attach_extra_action(
        package,
        "Force New Deployment",
        ActionKind::Other,
        include_str!("../../assets/overrides/ecs_service/forceNewDeployment.ts"),
    )
}

fn ec2_launch_template(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    let domain = &mut variant_for_override(package)?.domain;
    let data = object_prop_for_override(&schema, domain, "LaunchTemplateData")?;
    prop_for_override(&schema, data, "UserData")?.data.widget_kind = Some(WidgetKind::CodeEditor);

    replace_default(
        package,
        IMPORT_FROM_AWS,
        include_str!("../../assets/overrides/ec2_launch_template/import.ts"),
    )?;
    replace_default(
        package,
        DISCOVER_ON_AWS,
        include_str!("../../assets/overrides/ec2_launch_template/discover.ts"),
    )
}

fn rds_db_parameter_group(package: &mut CompiledPackage) -> Result<()> {
    let parameters = domain_prop(package, &["Parameters"])?;
    let element = PropertyNode::scalar("parameter", PropKind::String, &parameters.metadata.prop_path);
    parameters.kind = PropKind::Map {
        type_prop: Box::new(element),
    };
    parameters.data.widget_kind = Some(WidgetKind::Map);
    Ok(())
}

fn secrets_manager_secret(package: &mut CompiledPackage) -> Result<()> {
    add_secret_prop(package, "Secret String", "secretString", &["SecretString"])
}

fn master_user_password(package: &mut CompiledPackage) -> Result<()> {
    add_secret_prop(package, "Secret String", "secretString", &["MasterUserPassword"])
}

fn ec2_security_group_ingress(package: &mut CompiledPackage) -> Result<()> {
    attach_qualification(
        package,
        "GroupId OR GroupName",
        include_str!(
            "../../assets/overrides/ec2_security_group_ingress/checkForEitherGroupIdOrGroupName.ts"
        ),
        &[LeafInput::Domain],
    )
}

fn autoscaling_group(package: &mut CompiledPackage) -> Result<()> {
    replace_default(
        package,
        UPDATE_ASSET,
        include_str!("../../assets/overrides/autoscaling_group/update.ts"),
    )?;
    attach_extra_action(
        package,
        "Refresh Autoscaling Group Instances",
        ActionKind::Other,
        include_str!("../../assets/overrides/autoscaling_group/instanceRefresh.ts"),
    )
}

fn image_builder_component(package: &mut CompiledPackage) -> Result<()> {
    domain_prop(package, &["Data"])?.data.widget_kind = Some(WidgetKind::CodeEditor);
    Ok(())
}

fn ecs_cluster(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    let domain = &mut variant_for_override(package)?.domain;
    let configuration = object_prop_for_override(&schema, domain, "Configuration")?;
    let storage = object_prop_for_override(&schema, configuration, "ManagedStorageConfiguration")?;
    for name in ["FargateEphemeralStorageKmsKeyId", "KmsKeyId"] {
        prop_for_override(&schema, storage, name)?
            .add_suggest_source(Suggestion::new("AWS::KMS::Key", "/resource_value/KeyId"));
    }
    Ok(())
}

fn api_gateway_v2_route(package: &mut CompiledPackage) -> Result<()> {
    for name in ["RequestModels", "RequestParameters"] {
        let prop = domain_prop(package, &[name])?;
        prop.kind = PropKind::Json;
        prop.data.widget_kind = Some(WidgetKind::CodeEditor);
    }
    Ok(())
}

fn wafv2_web_acl(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    let domain = &mut variant_for_override(package)?.domain;
    let rules = array_prop_for_override(&schema, domain, "Rules")?;
    // Rules are edited as raw JSON; the functions below convert them.
    if let Some(item) = rules.element_mut() {
        item.kind = PropKind::Json;
        item.data.widget_kind = Some(WidgetKind::CodeEditor);
        item.data.validation_format = None;
        item.metadata.required = false;
    }

    replace_default(
        package,
        CODEGEN_CREATE,
        include_str!("../../assets/overrides/wafv2_web_acl/codegenCreate.ts"),
    )?;
    replace_default(
        package,
        CODEGEN_UPDATE,
        include_str!("../../assets/overrides/wafv2_web_acl/codegenUpdate.ts"),
    )?;
    replace_default(
        package,
        DISCOVER_ON_AWS,
        include_str!("../../assets/overrides/wafv2_web_acl/discover.ts"),
    )?;
    replace_default(
        package,
        IMPORT_FROM_AWS,
        include_str!("../../assets/overrides/wafv2_web_acl/import.ts"),
    )?;
    replace_default(
        package,
        CLOUDFORMATION_LINT,
        include_str!("../../assets/overrides/wafv2_web_acl/lint.ts"),
    )
}

/// Task definitions are replaced rather than recreated, so these props are
/// updatable despite the schema.
const TASK_DEFINITION_UPDATABLE: [&str; 16] = [
    "ContainerDefinitions",
    "Cpu",
    "EnableFaultInjection",
    "ExecutionRoleArn",
    "InferenceAccelerators",
    "Memory",
    "NetworkMode",
    "PlacementConstraints",
    "ProxyConfiguration",
    "RequiresCompatibilities",
    "RuntimePlatform",
    "TaskRoleArn",
    "Volumes",
    "PidMode",
    "IpcMode",
    "EphemeralStorage",
];

fn ecs_task_definition(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    let variant = variant_for_override(package)?;

    let containers = array_prop_for_override(&schema, &mut variant.domain, "ContainerDefinitions")?;
    if let Some(item) = containers.element_mut() {
        item.add_suggest_source(Suggestion::new("TaskDefinition ContainerDefinitions", "/domain"));
    }

    let mut usage = PropUsageMap::read(variant, &schema)?;

    for name in TASK_DEFINITION_UPDATABLE {
        let prop = prop_for_override(&schema, &mut variant.domain, name)?;
        prop.data
            .widget_options
            .retain(|option| option.label != CREATE_ONLY_PROP_LABEL);
        usage.create_only.retain(|p| p != name);
        if !usage.updatable.iter().any(|p| p == name) {
            usage.updatable.push(name.to_string());
        }
    }
    usage.write(variant, &schema)?;

    replace_default(
        package,
        UPDATE_ASSET,
        include_str!("../../assets/overrides/ecs_task_definition/update.ts"),
    )
}

/// A create-only combo box defaulting to `ipsec.1`, unbound from sockets.
fn ipsec_type(schema: &str, domain: &mut PropertyNode) -> Result<()> {
    let prop = string_prop_for_override(schema, domain, "Type")?;
    prop.data.widget_kind = Some(WidgetKind::ComboBox);
    prop.data.default_value = Some(Value::String("ipsec.1".to_string()));
    clear_binding(prop);
    Ok(())
}

fn clear_binding(prop: &mut PropertyNode) {
    prop.data.inputs.clear();
    prop.data.func_unique_id = None;
    prop.data.widget_options = vec![WidgetOption::new(CREATE_ONLY_PROP_LABEL, "true")];
}

fn ec2_vpn_connection(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    let variant = variant_for_override(package)?;
    ipsec_type(&schema, &mut variant.domain)?;

    let mut attachment = PropertyNode::scalar(
        "TransitGatewayAttachmentId",
        PropKind::String,
        &TreeRoot::ResourceValue.path(),
    );
    attachment.data.widget_kind = Some(WidgetKind::Text);
    variant
        .resource_value
        .entries_mut()
        .ok_or_else(|| CompileError::MissingDomain(schema.clone()))?
        .push(attachment);

    replace_default(
        package,
        REFRESH_ASSET,
        include_str!("../../assets/overrides/ec2_vpn_connection/refresh.ts"),
    )
}

fn ec2_customer_gateway(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    ipsec_type(&schema, &mut variant_for_override(package)?.domain)
}

fn s3_bucket(package: &mut CompiledPackage) -> Result<()> {
    let schema = package.name.clone();
    let domain = &mut variant_for_override(package)?.domain;
    let bucket_name = string_prop_for_override(&schema, domain, "BucketName")?;
    bucket_name.data.widget_kind = Some(WidgetKind::Text);
    clear_binding(bucket_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{apply_overrides, tests::compiled};
    use super::*;
    use asset_spec_core::validate_package;
    use serde_json::json;

    const ALL_HANDLERS: &str = r#"{ "create": {}, "read": {}, "update": {}, "delete": {}, "list": {} }"#;

    fn handlers() -> serde_json::Value {
        serde_json::from_str(ALL_HANDLERS).unwrap()
    }

    #[test]
    fn test_table_is_keyed_by_distinct_type_names() {
        let names: Vec<&str> = schema_overrides().iter().map(|o| o.schema).collect();
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("AWS::")));
    }

    #[test]
    fn test_instance_gains_actions_and_qualification() {
        let mut package = compiled(json!({
            "typeName": "AWS::EC2::Instance",
            "properties": {
                "UserData": { "type": "string" },
                "InstanceType": { "type": "string" }
            },
            "handlers": handlers()
        }));
        apply_overrides(&mut package).unwrap();

        let variant = package.variant().unwrap();
        let user_data = variant.domain.find_child("UserData").unwrap();
        assert_eq!(user_data.data.widget_kind, Some(WidgetKind::CodeEditor));

        let others = variant
            .action_funcs
            .iter()
            .filter(|b| b.kind == ActionKind::Other)
            .count();
        assert_eq!(others, 3);

        let qualification = override_func_id("AWS::EC2::Instance", "Is Valid EC2 Instance Type");
        let binding = variant
            .leaf_functions
            .iter()
            .find(|b| b.func_unique_id == qualification)
            .unwrap();
        assert_eq!(binding.inputs, vec![LeafInput::Domain, LeafInput::Secrets]);
        assert!(package.func_by_name("Set UserData prop and base64 encode if needed").is_some());
        assert!(validate_package(&package).is_empty());
    }

    #[test]
    fn test_task_definition_props_become_updatable() {
        let mut properties = serde_json::Map::new();
        for name in TASK_DEFINITION_UPDATABLE {
            properties.insert(name.to_string(), json!({ "type": "string" }));
        }
        properties.insert(
            "ContainerDefinitions".to_string(),
            json!({ "type": "array", "items": { "type": "object", "properties": { "Name": { "type": "string" } } } }),
        );
        let create_only: Vec<String> = TASK_DEFINITION_UPDATABLE
            .iter()
            .map(|n| format!("/properties/{n}"))
            .collect();
        let mut package = compiled(json!({
            "typeName": "AWS::ECS::TaskDefinition",
            "properties": properties,
            "createOnlyProperties": create_only,
            "handlers": handlers()
        }));
        apply_overrides(&mut package).unwrap();

        let variant = package.variant().unwrap();
        let usage = PropUsageMap::read(variant, "AWS::ECS::TaskDefinition").unwrap();
        assert!(usage.create_only.is_empty());
        assert_eq!(usage.updatable.len(), TASK_DEFINITION_UPDATABLE.len());

        let cpu = variant.domain.find_child("Cpu").unwrap();
        assert!(
            cpu.data
                .widget_options
                .iter()
                .all(|o| o.label != CREATE_ONLY_PROP_LABEL)
        );
        let item = variant.domain.find_child("ContainerDefinitions").unwrap().element().unwrap();
        assert_eq!(
            item.data.ui_optionals.suggest_sources[0],
            Suggestion::new("TaskDefinition ContainerDefinitions", "/domain")
        );

        let update = override_func_id("AWS::ECS::TaskDefinition", UPDATE_ASSET);
        assert!(variant.action_funcs.iter().any(|b| b.func_unique_id == update));
        assert!(package.func(&func_id(UPDATE_ASSET)).is_none());
    }

    #[test]
    fn test_web_acl_replaces_lint_and_codegen() {
        let mut package = compiled(json!({
            "typeName": "AWS::WAFv2::WebACL",
            "properties": {
                "Rules": {
                    "type": "array",
                    "items": { "type": "object", "properties": { "Name": { "type": "string" } } }
                }
            },
            "handlers": handlers()
        }));
        apply_overrides(&mut package).unwrap();

        let rule = package
            .variant()
            .unwrap()
            .domain
            .find_child("Rules")
            .unwrap()
            .element()
            .unwrap();
        assert_eq!(rule.kind, PropKind::Json);
        assert!(!rule.metadata.required);

        for name in [CODEGEN_CREATE, CODEGEN_UPDATE, CLOUDFORMATION_LINT, DISCOVER_ON_AWS, IMPORT_FROM_AWS] {
            assert!(package.func(&func_id(name)).is_none(), "{name}");
            assert!(package.func(&override_func_id("AWS::WAFv2::WebACL", name)).is_some());
        }
        assert!(validate_package(&package).is_empty());
    }

    #[test]
    fn test_parameter_group_parameters_become_a_map() {
        let mut package = compiled(json!({
            "typeName": "AWS::RDS::DBParameterGroup",
            "properties": { "Parameters": { "type": "object" } },
            "handlers": handlers()
        }));
        apply_overrides(&mut package).unwrap();

        let parameters = package.variant().unwrap().domain.find_child("Parameters").unwrap();
        assert_eq!(parameters.kind_name(), "map");
        let element = parameters.element().unwrap();
        assert_eq!(element.name, "parameter");
        assert_eq!(element.path_str(), "/domain/Parameters/parameter");
    }

    #[test]
    fn test_vpn_connection_type_is_a_fixed_combo_box() {
        let mut package = compiled(json!({
            "typeName": "AWS::EC2::VPNConnection",
            "properties": { "Type": { "type": "string" } },
            "createOnlyProperties": ["/properties/Type"],
            "handlers": handlers()
        }));
        apply_overrides(&mut package).unwrap();

        let variant = package.variant().unwrap();
        let kind = variant.domain.find_child("Type").unwrap();
        assert_eq!(kind.data.widget_kind, Some(WidgetKind::ComboBox));
        assert_eq!(kind.data.default_value, Some(json!("ipsec.1")));
        assert_eq!(
            kind.data.widget_options,
            vec![WidgetOption::new(CREATE_ONLY_PROP_LABEL, "true")]
        );
        assert!(variant.resource_value.find_child("TransitGatewayAttachmentId").is_some());
        assert!(validate_package(&package).is_empty());
    }

    #[test]
    fn test_missing_override_target_is_fatal() {
        let mut package = compiled(json!({
            "typeName": "AWS::ImageBuilder::Component",
            "properties": { "Name": { "type": "string" } }
        }));
        let err = apply_overrides(&mut package).unwrap_err();
        assert!(matches!(err, CompileError::OverrideTargetNotFound { .. }));
        assert!(!err.is_recoverable());
    }
}
