use rekog_registry::{CatalogError, OperationRegistry, ParamType, build_clap};

fn load() -> OperationRegistry {
    OperationRegistry::from_embedded_catalog().expect("load embedded catalog")
}

#[test]
fn paginated_operations_declare_token_parameters() {
    let registry = load();
    let paginated: Vec<_> = registry.operations.iter().filter(|op| op.is_paginated()).collect();
    assert!(!paginated.is_empty());
    for operation in paginated {
        let pagination = operation.pagination.as_ref().expect("pagination");
        let token = operation.token_param().expect("input token param");
        assert_eq!(token.member, pagination.input_token, "{}", operation.name);
        assert_eq!(token.r#type, ParamType::String, "{}", operation.name);
        assert!(
            operation.has_response_field(&pagination.output_token),
            "{} should return {}",
            operation.name,
            pagination.output_token
        );
    }
}

#[test]
fn mutating_operations_are_flagged() {
    let registry = load();
    for name in ["CreateCollection", "DeleteCollection", "IndexFaces", "DeleteFaces", "TagResource"] {
        assert!(registry.find(name).expect(name).mutating, "{name} should require confirmation");
    }
    for name in ["DescribeCollection", "ListFaces", "DetectLabels"] {
        assert!(!registry.find(name).expect(name).mutating, "{name} should not require confirmation");
    }
}

#[test]
fn image_parameters_share_a_request_group() {
    let registry = load();
    let detect = registry.find("detect-faces").expect("detect-faces");
    let bucket = detect.param("ImageBucket").expect("ImageBucket");
    let content = detect.param("ImageContent").expect("ImageContent");
    assert_eq!(bucket.member_path().collect::<Vec<_>>(), vec!["Image", "S3Object", "Bucket"]);
    assert_eq!(content.member_path().collect::<Vec<_>>(), vec!["Image", "Bytes"]);
    assert_eq!(content.r#type, ParamType::Bytes);
}

#[test]
fn aliases_resolve_to_their_parameter() {
    let registry = load();
    let list = registry.find("list-faces").expect("list-faces");
    let limit = list
        .params
        .iter()
        .find(|param| param.answers_to("maxitems"))
        .expect("alias lookup");
    assert_eq!(limit.name, "MaxResult");
}

#[test]
fn unknown_operation_is_reported() {
    let registry = load();
    let err = registry.find("detect-unicorns").expect_err("unknown operation");
    assert!(matches!(err, CatalogError::UnknownOperation(name) if name == "detect-unicorns"));
}

#[test]
fn every_operation_has_a_subcommand() {
    let registry = load();
    let command = build_clap(&registry);
    for operation in &registry.operations {
        let sub = command
            .find_subcommand(&operation.command)
            .unwrap_or_else(|| panic!("missing subcommand {}", operation.command));
        for param in &operation.params {
            assert!(
                sub.get_arguments().any(|arg| arg.get_id().as_str() == param.name),
                "{} is missing --{}",
                operation.command,
                param.name
            );
        }
    }
    assert!(command.find_subcommand("operations").is_some());
    assert!(command.find_subcommand("config").is_some());
}
