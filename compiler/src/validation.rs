//! Joi validation expressions and documentation links for built props.

use asset_spec_core::{RawProperty, TypeNameParts};

use crate::pattern::{PatternError, translate_pattern};

const DOC_BASE: &str = "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/";

/// Rekognition publishes a regex in the `format` keyword.
const REKOGNITION_COLLECTION_FORMAT: &str =
    "(^arn:[a-z\\d-]+:rekognition:[a-z\\d-]+:\\d{12}:collection\\/([a-zA-Z0-9_.\\-]+){1,255})";

/// Why a validation expression could not be built.
#[derive(Debug)]
pub enum ValidationIssue {
    /// Unknown `format` keyword.
    Format(String),
    /// Pattern that has no JavaScript translation.
    Pattern(PatternError),
}

/// `Joi.number()` with integer, bound, and multiple checks.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::validation::number_validation;
/// use asset_spec_core::RawProperty;
///
/// let mut prop = RawProperty::typed("integer");
/// prop.minimum = Some(1.into());
/// prop.maximum = Some(65535.into());
///
/// let joi = number_validation(&prop, true, true).unwrap();
/// assert_eq!(joi.as_deref(), Some("Joi.number().integer().min(1).max(65535).required()"));
/// ```
pub fn number_validation(
    prop: &RawProperty,
    integer: bool,
    required: bool,
) -> Result<Option<String>, ValidationIssue> {
    match prop.format.as_deref() {
        None | Some("int64") | Some("double") => {}
        Some(other) => return Err(ValidationIssue::Format(other.to_string())),
    }

    let mut validation = String::new();
    if integer {
        validation.push_str(".integer()");
    }
    if let Some(min) = &prop.minimum {
        validation.push_str(&format!(".min({min})"));
    }
    if let Some(max) = &prop.maximum {
        validation.push_str(&format!(".max({max})"));
    }
    if let Some(min) = &prop.exclusive_minimum {
        validation.push_str(&format!(".greater({min})"));
    }
    if let Some(max) = &prop.exclusive_maximum {
        validation.push_str(&format!(".less({max})"));
    }
    if let Some(multiple) = &prop.multiple_of {
        validation.push_str(&format!(".multiple({multiple})"));
    }
    Ok(finish("Joi.number()", validation, required))
}

/// `Joi.string()` with format, length, and pattern checks; `Joi.date().iso()`
/// for timestamps.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::validation::string_validation;
/// use asset_spec_core::RawProperty;
///
/// let mut prop = RawProperty::typed("string");
/// prop.max_length = Some(64);
/// prop.pattern = Some("^[a-z]+$".into());
///
/// let joi = string_validation(&prop, false).unwrap();
/// assert_eq!(
///     joi.as_deref(),
///     Some("Joi.string().max(64).pattern(new RegExp(\"^[a-z]+$\"))")
/// );
/// ```
pub fn string_validation(
    prop: &RawProperty,
    required: bool,
) -> Result<Option<String>, ValidationIssue> {
    if matches!(prop.format.as_deref(), Some("date-time") | Some("timestamp")) {
        return Ok(finish("Joi.date().iso()", String::new(), required)
            .or_else(|| Some("Joi.date().iso()".to_string())));
    }

    let mut validation = String::new();
    match prop.format.as_deref() {
        None | Some("iso-8601") | Some("decimal") | Some("string") | Some("base64url") => {}
        Some("uri") => validation.push_str(".uri()"),
        Some("json-pointer") => validation.push_str(".pattern(/^\\//)"),
        Some(REKOGNITION_COLLECTION_FORMAT) => {
            let pattern = serde_json::Value::String(REKOGNITION_COLLECTION_FORMAT.to_string());
            validation.push_str(&format!(".pattern(new RegExp({pattern}))"));
        }
        Some(other) => return Err(ValidationIssue::Format(other.to_string())),
    }
    if let Some(min) = prop.min_length {
        validation.push_str(&format!(".min({min})"));
    }
    if let Some(max) = prop.max_length {
        validation.push_str(&format!(".max({max})"));
    }
    if let Some(pattern) = &prop.pattern {
        let translated = translate_pattern(pattern).map_err(ValidationIssue::Pattern)?;
        if let Some(translated) = translated {
            validation.push_str(&translated.to_joi());
        }
    }
    Ok(finish("Joi.string()", validation, required))
}

/// Validation for kinds with no constraints beyond presence.
pub fn presence_validation(base: &str, required: bool) -> Option<String> {
    finish(base, String::new(), required)
}

fn finish(base: &str, mut validation: String, required: bool) -> Option<String> {
    if required {
        validation.push_str(".required()");
    }
    if validation.is_empty() {
        None
    } else {
        Some(format!("{base}{validation}"))
    }
}

/// Documentation link for a property of `type_name`, optionally nested
/// inside the named definition.
///
/// # Examples
///
/// ```
/// use asset_spec_compiler::validation::doc_link;
///
/// assert_eq!(
///     doc_link("AWS::EC2::Instance", None, "ImageId"),
///     "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-ec2-instance.html#cfn-ec2-instance-imageid"
/// );
/// assert_eq!(
///     doc_link("AWS::EC2::Instance", Some("BlockDeviceMapping"), "DeviceName"),
///     "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-properties-ec2-instance-blockdevicemapping.html#cfn-ec2-instance-blockdevicemapping-devicename"
/// );
/// ```
pub fn doc_link(type_name: &str, def_name: Option<&str>, prop_name: &str) -> String {
    let parts = TypeNameParts::parse(type_name);
    let service = parts.category.to_lowercase();
    let resource = parts.resource.to_lowercase();
    let prop = prop_name.to_lowercase();
    match def_name {
        Some(def) => {
            let def = def.to_lowercase();
            format!(
                "{DOC_BASE}aws-properties-{service}-{resource}-{def}.html#cfn-{service}-{resource}-{def}-{prop}"
            )
        }
        None => format!(
            "{DOC_BASE}aws-resource-{service}-{resource}.html#cfn-{service}-{resource}-{prop}"
        ),
    }
}

/// Link to a resource's own documentation page.
pub fn resource_doc_link(type_name: &str) -> String {
    let parts = TypeNameParts::parse(type_name);
    format!(
        "{DOC_BASE}aws-resource-{}-{}.html",
        parts.category.to_lowercase(),
        parts.resource.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrequired_unconstrained_string_has_no_validation() {
        let prop = RawProperty::typed("string");
        assert_eq!(string_validation(&prop, false).unwrap(), None);
        assert_eq!(
            string_validation(&prop, true).unwrap().as_deref(),
            Some("Joi.string().required()")
        );
    }

    #[test]
    fn test_date_time_forces_date_validation() {
        let mut prop = RawProperty::typed("string");
        prop.format = Some("date-time".into());
        prop.max_length = Some(10);
        assert_eq!(
            string_validation(&prop, false).unwrap().as_deref(),
            Some("Joi.date().iso()")
        );
        assert_eq!(
            string_validation(&prop, true).unwrap().as_deref(),
            Some("Joi.date().iso().required()")
        );
    }

    #[test]
    fn test_unknown_string_format_is_rejected() {
        let mut prop = RawProperty::typed("string");
        prop.format = Some("email".into());
        assert!(matches!(
            string_validation(&prop, false),
            Err(ValidationIssue::Format(f)) if f == "email"
        ));
    }

    #[test]
    fn test_unknown_number_format_is_rejected() {
        let mut prop = RawProperty::typed("number");
        prop.format = Some("float".into());
        assert!(number_validation(&prop, false, false).is_err());

        prop.format = Some("double".into());
        assert_eq!(number_validation(&prop, false, false).unwrap(), None);
    }

    #[test]
    fn test_exclusive_bounds_and_multiple() {
        let mut prop = RawProperty::typed("number");
        prop.exclusive_minimum = Some(0.into());
        prop.multiple_of = Some(5.into());
        assert_eq!(
            number_validation(&prop, false, false).unwrap().as_deref(),
            Some("Joi.number().greater(0).multiple(5)")
        );
    }

    #[test]
    fn test_uri_and_json_pointer_formats() {
        let mut prop = RawProperty::typed("string");
        prop.format = Some("uri".into());
        assert_eq!(
            string_validation(&prop, false).unwrap().as_deref(),
            Some("Joi.string().uri()")
        );
        prop.format = Some("json-pointer".into());
        assert_eq!(
            string_validation(&prop, false).unwrap().as_deref(),
            Some("Joi.string().pattern(/^\\//)")
        );
    }

    #[test]
    fn test_resource_doc_link() {
        assert_eq!(
            resource_doc_link("AWS::S3::Bucket"),
            "https://docs.aws.amazon.com/AWSCloudFormation/latest/UserGuide/aws-resource-s3-bucket.html"
        );
    }
}
