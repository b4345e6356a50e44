use super::{PropOverride, PropOverrideFn, arn_prop, arn_prop_named, policy_document_prop, suggest};

/// The prop override table, in registration order.
pub fn prop_overrides() -> Vec<PropOverride> {
    let mut table = Vec::new();
    let mut add = |schema: &str, prop: &str, apply: PropOverrideFn| {
        table.push(PropOverride::new(schema, prop, apply));
    };

    // AWS::EC2
    add(
        "AWS::EC2::FlowLog",
        "DeliverLogsPermissionArn",
        arn_prop("AWS::IAM::Role"),
    );
    add(
        "AWS::EC2::LaunchTemplate",
        "LaunchTemplateData/LicenseSpecifications/LicenseSpecificationsItem/LicenseConfigurationArn",
        arn_prop("AWS::LicenseManager::LicenseConfiguration"),
    );
    add(
        "AWS::EC2::NetworkInterface",
        "GroupSet/GroupSetItem",
        suggest("AWS::EC2::SecurityGroup", "GroupId"),
    );
    add(
        "AWS::EC2::Route",
        "GatewayId",
        suggest("AWS::EC2::InternetGateway", "InternetGatewayId"),
    );
    add(
        "AWS::EC2::Route",
        "GatewayId",
        suggest("AWS::EC2::VPNGateway", "VPNGatewayId"),
    );
    add(
        "AWS::EC2::VPCCidrBlock",
        "Ipv4IpamPoolId",
        suggest("AWS::EC2::IPAMPool", "IpamPoolId"),
    );
    add(
        "AWS::EC2::VPCCidrBlock",
        "Ipv6IpamPoolId",
        suggest("AWS::EC2::IPAMPool", "IpamPoolId"),
    );
    add(
        "AWS::EC2::VPCEndpointConnectionNotification",
        "ConnectionNotificationArn",
        arn_prop_named("AWS::SNS::Topic", "TopicArn"),
    );

    // AWS::ECS
    let value_from = "ContainerDefinitions/ContainerDefinitionsItem/Secrets/SecretsItem/ValueFrom";
    add(
        "AWS::ECS::TaskDefinition",
        value_from,
        suggest("AWS::SecretsManager::Secret", "Id"),
    );
    add(
        "AWS::ECS::TaskDefinition",
        value_from,
        suggest("AWS::SSM::Parameter", "/domain/Name"),
    );

    // AWS::ElasticLoadBalancingV2
    for (schema, prop) in [
        ("AWS::EC2::Instance", "InstanceId"),
        ("AWS::Lambda::Function", "Arn"),
        ("AWS::ElasticLoadBalancingV2::LoadBalancer", "LoadBalancerArn"),
    ] {
        add(
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            "Targets/TargetsItem/Id",
            suggest(schema, prop),
        );
    }

    add("AWS::KMS::Key", "KeyPolicy", policy_document_prop());
    add("AWS::Logs::LogGroup", "DataProtectionPolicy", policy_document_prop());

    // AWS::Organizations
    let parents = [
        ("AWS::Organizations::Organization", "RootId"),
        ("AWS::Organizations::OrganizationalUnit", "/resource_value/Id"),
    ];
    for (schema, prop) in parents {
        add(
            "AWS::Organizations::OrganizationalUnit",
            "ParentId",
            suggest(schema, prop),
        );
    }
    for (schema, prop) in parents {
        add(
            "AWS::Organizations::Account",
            "ParentIds/ParentIdsItem",
            suggest(schema, prop),
        );
    }
    for (schema, prop) in parents
        .into_iter()
        .chain([("AWS::Organizations::Account", "/resource_value/AccountId")])
    {
        add(
            "AWS::Organizations::Policy",
            "TargetIds/TargetIdsItem",
            suggest(schema, prop),
        );
    }

    // Props shared across all of AWS
    add(".*", ".*(PolicyDocument|PolicyText)", policy_document_prop());

    add(".*", ".*IpamArn", arn_prop("AWS::EC2::IPAM"));
    add(".*", ".*IpamPoolArn", arn_prop("AWS::EC2::IPAMPool"));
    add(".*", ".*IpamScopeArn", arn_prop("AWS::EC2::IPAMScope"));
    add(
        ".*",
        ".*LaunchTemplate*/Version",
        suggest("AWS::EC2::LaunchTemplate", "LatestVersionNumber"),
    );
    add(
        ".*",
        ".*LaunchTemplate*/Version",
        suggest("AWS::EC2::LaunchTemplate", "DefaultVersionNumber"),
    );
    add(
        ".*",
        ".*LocalGatewayRouteTableArn",
        arn_prop_named("AWS::EC2::LocalGatewayRouteTable", "LocalGatewayRouteTableArn"),
    );
    // GroupId is not the primary identifier, but it is what other schemas
    // connect to.
    add(".*", ".*GroupId", suggest("AWS::EC2::SecurityGroup", "GroupId"));
    add(
        ".*",
        ".*GroupName",
        suggest("AWS::EC2::SecurityGroup", "/domain/GroupName"),
    );

    add(
        ".*",
        ".*LoadBalancerArn",
        arn_prop_named("AWS::ElasticLoadBalancingV2::LoadBalancer", "LoadBalancerArn"),
    );
    add(
        ".*",
        ".*(TargetGroupArn|TargetGroup/Arn)",
        arn_prop_named("AWS::ElasticLoadBalancingV2::TargetGroup", "TargetGroupArn"),
    );

    add(".*", ".*KmsKeyArn", arn_prop("AWS::KMS::Key"));

    add(
        ".*",
        ".*(InstanceProfileArn|InstanceProfile/Arn|InstanceProfileSpecification/Arn)",
        arn_prop("AWS::IAM::InstanceProfile"),
    );
    add(".*", ".*RoleArn", arn_prop("AWS::IAM::Role"));
    add(".*", ".*SAMLProviderArn", arn_prop("AWS::IAM::SAMLProvider"));

    add(
        ".*",
        ".*(LambdaArn|LambdaFunctionArn)",
        arn_prop("AWS::Lambda::Function"),
    );
    add(
        ".*",
        ".*(LicenseArn|LicenseConfigurationArn)",
        arn_prop_named("AWS::LicenseManager::License", "LicenseArn"),
    );
    add(".*", ".*LogGroupArn", arn_prop("AWS::Logs::LogGroup"));
    add(
        ".*",
        ".*CoreNetworkArn",
        arn_prop_named("AWS::NetworkManager::CoreNetwork", "CoreNetworkArn"),
    );

    add(
        ".*",
        ".*DbInstanceArn",
        arn_prop_named("AWS::RDS::DBInstance", "DBInstanceArn"),
    );
    add(
        ".*",
        ".*DbClusterArn",
        arn_prop_named("AWS::RDS::DBCluster", "DBClusterArn"),
    );
    add(
        ".*",
        ".*DbProxyArn",
        arn_prop_named("AWS::RDS::DBProxy", "DBProxyArn"),
    );

    add(".*", ".*ResourceGroupArn", arn_prop("AWS::ResourceGroups::Group"));
    add(
        ".*",
        ".*TopicArn",
        arn_prop_named("AWS::SNS::Topic", "TopicArn"),
    );
    add(
        ".*",
        ".*ResourceConfigurationArn",
        arn_prop("AWS::VpcLattice::ResourceConfiguration"),
    );
    add(
        ".*",
        ".*ServiceNetworkArn",
        arn_prop("AWS::VpcLattice::ServiceNetwork"),
    );

    table
}

#[cfg(test)]
mod tests {
    use super::super::{apply_prop_overrides, tests::compiled};
    use super::*;
    use asset_spec_core::{PropKind, Suggestion};
    use serde_json::json;

    #[test]
    fn test_table_patterns_compile() {
        let table = prop_overrides();
        assert!(table.len() > 40);
        assert!(table.iter().all(|entry| entry.prop.as_str().starts_with("^/domain/")));
    }

    #[test]
    fn test_shared_rules_apply_to_any_schema() {
        let mut package = compiled(json!({
            "typeName": "AWS::Demo::Widget",
            "properties": {
                "ExecutionRoleArn": { "type": "string" },
                "AssumeRolePolicyDocument": { "type": ["object", "string"] },
                "SecurityGroupIds": { "type": "array", "items": { "type": "string" } }
            }
        }));
        let table = prop_overrides();
        apply_prop_overrides(&mut package, "AWS::Demo::Widget", &table).unwrap();

        let domain = &package.variant().unwrap().domain;
        let role = domain.find_child("ExecutionRoleArn").unwrap();
        assert_eq!(
            role.data.ui_optionals.suggest_sources,
            vec![Suggestion::new("AWS::IAM::Role", "/resource_value/Arn")]
        );

        let policy = domain.find_child("AssumeRolePolicyDocument").unwrap();
        assert_eq!(policy.kind, PropKind::Json);

        // The array name ends in "Ids", so neither it nor its element match.
        let groups = domain.find_child("SecurityGroupIds").unwrap();
        assert!(groups.data.ui_optionals.suggest_sources.is_empty());
    }

    #[test]
    fn test_schema_specific_rules_stack() {
        let mut package = compiled(json!({
            "typeName": "AWS::EC2::Route",
            "properties": { "GatewayId": { "type": "string" } }
        }));
        let table = prop_overrides();
        apply_prop_overrides(&mut package, "AWS::EC2::Route", &table).unwrap();

        let gateway = package.variant().unwrap().domain.find_child("GatewayId").unwrap();
        let schemas: Vec<&str> = gateway
            .data
            .ui_optionals
            .suggest_sources
            .iter()
            .map(|s| s.schema.as_str())
            .collect();
        // Both Route rules fire, in registration order.
        assert_eq!(schemas, vec!["AWS::EC2::InternetGateway", "AWS::EC2::VPNGateway"]);
    }
}
