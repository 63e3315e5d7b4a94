//! Integration tests for types

#[cfg(test)]
mod tests {
    use pkc_types::*;

    #[test]
    fn test_request_carries_resolved_identifier() {
        let id: PackageId = "firefox;3.0.1;i386;fedora".parse().unwrap();
        let request = OperationRequest::install(id.clone());
        assert_eq!(request.role, Role::InstallPackage);
        assert_eq!(request.target, Target::Package { package_id: id });
        assert!(request.filters.is_empty());
    }

    #[test]
    fn test_requeued_copy_is_identical() {
        let request = OperationRequest::remove("vim;9.0;x86_64;fedora".parse().unwrap(), true);
        let copy = request.clone();
        assert_eq!(copy, request);
        assert_eq!(
            serde_json::to_string(&copy).unwrap(),
            serde_json::to_string(&request).unwrap()
        );
    }

    #[test]
    fn test_capabilities_deserialize_from_service_reply() {
        let json = r#"{"roles":["resolve","what-provides"],"filters":["installed","~devel"],"groups":["system"]}"#;
        let caps: Capabilities = serde_json::from_str(json).unwrap();
        assert!(caps.supports(Role::Resolve));
        assert!(caps.supports(Role::WhatProvides));
        assert!(!caps.supports(Role::GetRequires));
        assert_eq!(caps.filters.to_string(), "installed;~devel");
        assert_eq!(caps.groups, vec!["system".to_string()]);
    }

    #[test]
    fn test_color_choice_serde() {
        let choice: ColorChoice = serde_json::from_str(r#""never""#).unwrap();
        assert_eq!(choice, ColorChoice::Never);
        assert_eq!(ColorChoice::default(), ColorChoice::Auto);
    }
}
