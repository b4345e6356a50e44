//! Fixed, read-only registries of default functions.
//!
//! Registry entries are templates: every attachment site calls
//! [`FuncTemplate::to_spec`] to get a package-local [`FuncSpec`], so later
//! modifications never reach the registry or another package's copy.
//!
//! # Examples
//!
//! ```
//! use asset_spec_compiler::funcs::{ACTION_FUNCS, CREATE_ASSET, action_func};
//!
//! let create = action_func(CREATE_ASSET).unwrap();
//! let spec = create.func.to_spec();
//! assert_eq!(spec.unique_id, create.func.unique_id());
//! assert!(spec.data.code_base64.is_some());
//! assert_eq!(ACTION_FUNCS.len(), 4);
//! ```

use asset_spec_core::{
    ActionKind, ArgumentKind, FuncArgument, FuncData, FuncKind, FuncSpec, HandlerKind, LeafInput,
    LeafKind, RawSchema,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

pub const CREATE_ASSET: &str = "Create Asset";
pub const UPDATE_ASSET: &str = "Update Asset";
pub const DELETE_ASSET: &str = "Delete Asset";
pub const REFRESH_ASSET: &str = "Refresh Asset";
pub const CODEGEN_CREATE: &str = "awsCloudControlCreate";
pub const CODEGEN_UPDATE: &str = "awsCloudControlUpdate";
pub const CLOUDFORMATION_LINT: &str = "awsCloudFormationLint";
pub const REGION_QUALIFICATION: &str = "awsRegionQualification";
pub const DISCOVER_ON_AWS: &str = "Discover on AWS";
pub const IMPORT_FROM_AWS: &str = "Import from AWS";
pub const RESOURCE_BODY: &str = "awsCloudFormationResourceBody";
pub const IDENTITY: &str = "si:identity";

/// A registry entry. Never mutated; cloned into packages via
/// [`FuncTemplate::to_spec`].
#[derive(Debug)]
pub struct FuncTemplate {
    pub name: &'static str,
    pub display_name: Option<&'static str>,
    pub kind: FuncKind,
    pub backend_kind: &'static str,
    pub response_type: &'static str,
    pub code: Option<&'static str>,
    pub arguments: &'static [(&'static str, ArgumentKind)],
    /// Handlers that must all be declared for the function to attach.
    pub requires: &'static [HandlerKind],
}

impl FuncTemplate {
    /// Stable id derived from the function name.
    pub fn unique_id(&self) -> String {
        func_id(self.name)
    }

    /// Whether `schema` declares every handler this function requires.
    pub fn is_supported_by(&self, schema: &RawSchema) -> bool {
        self.requires.iter().all(|kind| schema.has_handler(*kind))
    }

    /// A fresh, package-local copy of this function.
    pub fn to_spec(&self) -> FuncSpec {
        new_func(
            self.name,
            self.display_name,
            self.kind,
            self.backend_kind,
            self.response_type,
            self.code,
            self.unique_id(),
            self.arguments,
        )
    }
}

/// A default action and the action kind it is bound as.
#[derive(Debug)]
pub struct ActionTemplate {
    pub kind: ActionKind,
    pub func: FuncTemplate,
}

impl ActionTemplate {
    /// `create`, `update` and `delete` need the same-named handler; `refresh`
    /// and `other` need `read`.
    pub fn required_handler(&self) -> HandlerKind {
        action_handler(self.kind)
    }
}

/// Handler an action of `kind` depends on.
pub fn action_handler(kind: ActionKind) -> HandlerKind {
    match kind {
        ActionKind::Create => HandlerKind::Create,
        ActionKind::Update => HandlerKind::Update,
        ActionKind::Delete => HandlerKind::Delete,
        ActionKind::Refresh | ActionKind::Other => HandlerKind::Read,
    }
}

/// A default leaf (code generation or qualification) function.
#[derive(Debug)]
pub struct LeafTemplate {
    pub leaf_kind: LeafKind,
    pub inputs: &'static [LeafInput],
    pub func: FuncTemplate,
}

const DOMAIN_ARG: &[(&str, ArgumentKind)] = &[("domain", ArgumentKind::Object)];

const fn action(kind: ActionKind, name: &'static str, code: &'static str) -> ActionTemplate {
    ActionTemplate {
        kind,
        func: FuncTemplate {
            name,
            display_name: Some(name),
            kind: FuncKind::Action,
            backend_kind: "jsAction",
            response_type: "action",
            code: Some(code),
            arguments: &[],
            requires: &[],
        },
    }
}

pub static ACTION_FUNCS: [ActionTemplate; 4] = [
    action(
        ActionKind::Create,
        CREATE_ASSET,
        include_str!("../assets/actions/create.ts"),
    ),
    action(
        ActionKind::Update,
        UPDATE_ASSET,
        include_str!("../assets/actions/update.ts"),
    ),
    action(
        ActionKind::Delete,
        DELETE_ASSET,
        include_str!("../assets/actions/delete.ts"),
    ),
    action(
        ActionKind::Refresh,
        REFRESH_ASSET,
        include_str!("../assets/actions/refresh.ts"),
    ),
];

pub static CODE_GENERATION_FUNCS: [LeafTemplate; 3] = [
    LeafTemplate {
        leaf_kind: LeafKind::CodeGeneration,
        inputs: &[LeafInput::Domain],
        func: FuncTemplate {
            name: CODEGEN_CREATE,
            display_name: Some("Code Gen for CloudControl create"),
            kind: FuncKind::CodeGeneration,
            backend_kind: "jsAttribute",
            response_type: "codeGeneration",
            code: Some(include_str!("../assets/codegen/awsCloudControlCreate.ts")),
            arguments: DOMAIN_ARG,
            requires: &[HandlerKind::Create],
        },
    },
    LeafTemplate {
        leaf_kind: LeafKind::CodeGeneration,
        inputs: &[LeafInput::Domain, LeafInput::Resource],
        func: FuncTemplate {
            name: CODEGEN_UPDATE,
            display_name: Some("Code Gen for CloudControl update"),
            kind: FuncKind::CodeGeneration,
            backend_kind: "jsAttribute",
            response_type: "codeGeneration",
            code: Some(include_str!("../assets/codegen/awsCloudControlUpdate.ts")),
            arguments: DOMAIN_ARG,
            requires: &[HandlerKind::Update],
        },
    },
    LeafTemplate {
        leaf_kind: LeafKind::CodeGeneration,
        inputs: &[LeafInput::Domain],
        func: FuncTemplate {
            name: CLOUDFORMATION_LINT,
            display_name: Some("CloudFormation Lint"),
            kind: FuncKind::CodeGeneration,
            backend_kind: "jsAttribute",
            response_type: "codeGeneration",
            code: Some(include_str!("../assets/codegen/awsCloudFormationLint.ts")),
            arguments: DOMAIN_ARG,
            requires: &[],
        },
    },
];

pub static QUALIFICATION_FUNCS: [LeafTemplate; 1] = [LeafTemplate {
    leaf_kind: LeafKind::Qualification,
    inputs: &[LeafInput::Domain],
    func: FuncTemplate {
        name: REGION_QUALIFICATION,
        display_name: Some("Region is set"),
        kind: FuncKind::Qualification,
        backend_kind: "jsAttribute",
        response_type: "qualification",
        code: Some(include_str!("../assets/qualifications/awsRegionQualification.ts")),
        arguments: DOMAIN_ARG,
        requires: &[],
    },
}];

pub static MANAGEMENT_FUNCS: [FuncTemplate; 2] = [
    FuncTemplate {
        name: DISCOVER_ON_AWS,
        display_name: Some(DISCOVER_ON_AWS),
        kind: FuncKind::Management,
        backend_kind: "management",
        response_type: "management",
        code: Some(include_str!("../assets/management/discover.ts")),
        arguments: &[],
        requires: &[HandlerKind::List, HandlerKind::Read],
    },
    FuncTemplate {
        name: IMPORT_FROM_AWS,
        display_name: Some(IMPORT_FROM_AWS),
        kind: FuncKind::Management,
        backend_kind: "management",
        response_type: "management",
        code: Some(include_str!("../assets/management/import.ts")),
        arguments: &[],
        requires: &[HandlerKind::Read],
    },
];

pub static RESOURCE_BODY_FUNC: FuncTemplate = FuncTemplate {
    name: RESOURCE_BODY,
    display_name: Some("CloudFormation resource body"),
    kind: FuncKind::Attribute,
    backend_kind: "jsAttribute",
    response_type: "string",
    code: Some(include_str!("../assets/attribute/awsCloudFormationResourceBody.ts")),
    arguments: &[
        ("typeName", ArgumentKind::String),
        ("domain", ArgumentKind::Object),
    ],
    requires: &[],
};

pub static IDENTITY_FUNC: FuncTemplate = FuncTemplate {
    name: IDENTITY,
    display_name: None,
    kind: FuncKind::Intrinsic,
    backend_kind: "identity",
    response_type: "any",
    code: None,
    arguments: &[("identity", ArgumentKind::Any)],
    requires: &[],
};

pub fn action_func(name: &str) -> Option<&'static ActionTemplate> {
    ACTION_FUNCS.iter().find(|t| t.func.name == name)
}

pub fn code_generation_func(name: &str) -> Option<&'static LeafTemplate> {
    CODE_GENERATION_FUNCS.iter().find(|t| t.func.name == name)
}

pub fn management_func(name: &str) -> Option<&'static FuncTemplate> {
    MANAGEMENT_FUNCS.iter().find(|t| t.name == name)
}

/// Stable function id: hex SHA-256 of `name`.
pub fn func_id(name: &str) -> String {
    format!("{:x}", Sha256::digest(name.as_bytes()))
}

/// Base64 payload stored in [`FuncData::code_base64`].
pub fn encode_code(code: &str) -> String {
    STANDARD.encode(code.trim_end())
}

/// Builds a function spec outside the registries (override payloads,
/// generated asset definitions).
#[allow(clippy::too_many_arguments)]
pub fn new_func(
    name: &str,
    display_name: Option<&str>,
    kind: FuncKind,
    backend_kind: &str,
    response_type: &str,
    code: Option<&str>,
    unique_id: String,
    arguments: &[(&str, ArgumentKind)],
) -> FuncSpec {
    FuncSpec {
        name: name.to_string(),
        unique_id,
        kind,
        data: FuncData {
            name: name.to_string(),
            display_name: display_name.map(str::to_string),
            description: None,
            handler: code.map(|_| "main".to_string()),
            code_base64: code.map(encode_code),
            backend_kind: backend_kind.to_string(),
            response_type: response_type.to_string(),
            hidden: false,
        },
        arguments: arguments
            .iter()
            .map(|(name, kind)| FuncArgument {
                name: name.to_string(),
                kind: *kind,
                element_kind: None,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_templates() -> Vec<&'static FuncTemplate> {
        ACTION_FUNCS
            .iter()
            .map(|t| &t.func)
            .chain(CODE_GENERATION_FUNCS.iter().map(|t| &t.func))
            .chain(QUALIFICATION_FUNCS.iter().map(|t| &t.func))
            .chain(MANAGEMENT_FUNCS.iter())
            .chain([&RESOURCE_BODY_FUNC, &IDENTITY_FUNC])
            .collect()
    }

    #[test]
    fn test_registry_ids_are_unique_and_stable() {
        let ids: Vec<String> = all_templates().iter().map(|t| t.unique_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert_eq!(func_id(CREATE_ASSET), func_id("Create Asset"));
        assert_eq!(func_id(CREATE_ASSET).len(), 64);
    }

    #[test]
    fn test_to_spec_returns_independent_copies() {
        let template = &ACTION_FUNCS[0].func;
        let mut first = template.to_spec();
        first.unique_id = "changed".into();
        let second = template.to_spec();
        assert_eq!(second.unique_id, template.unique_id());
    }

    #[test]
    fn test_action_handler_gating() {
        assert_eq!(action_handler(ActionKind::Create), HandlerKind::Create);
        assert_eq!(action_handler(ActionKind::Refresh), HandlerKind::Read);
        assert_eq!(action_handler(ActionKind::Other), HandlerKind::Read);
        assert_eq!(action_func(REFRESH_ASSET).unwrap().required_handler(), HandlerKind::Read);
    }

    #[test]
    fn test_management_requires_all_handlers() {
        let mut schema = RawSchema::new("AWS::Demo::Widget");
        schema.handlers.insert(HandlerKind::Read, Default::default());
        assert!(management_func(IMPORT_FROM_AWS).unwrap().is_supported_by(&schema));
        assert!(!management_func(DISCOVER_ON_AWS).unwrap().is_supported_by(&schema));

        schema.handlers.insert(HandlerKind::List, Default::default());
        assert!(management_func(DISCOVER_ON_AWS).unwrap().is_supported_by(&schema));
    }

    #[test]
    fn test_payloads_are_base64_encoded() {
        let spec = code_generation_func(CLOUDFORMATION_LINT).unwrap().func.to_spec();
        let decoded = STANDARD.decode(spec.data.code_base64.unwrap()).unwrap();
        let code = String::from_utf8(decoded).unwrap();
        assert!(code.starts_with("async function main"));
        assert_eq!(spec.data.handler.as_deref(), Some("main"));
    }

    #[test]
    fn test_identity_has_no_payload() {
        let spec = IDENTITY_FUNC.to_spec();
        assert!(spec.data.code_base64.is_none());
        assert!(spec.data.handler.is_none());
        assert_eq!(spec.kind, FuncKind::Intrinsic);
    }
}
