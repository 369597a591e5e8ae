use proptest::prelude::*;
use sdk::errors::{EngineError, ScoutErrorExt};
use sdk::types::{ConnectorSchema, EntityScope, ParamType};
use serde_json::json;

// Hints are static text and never echo the payload they were built from
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "[A-Za-z0-9_]{8,40}") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::MissingCredential(error_str.clone()),
            EngineError::Database(error_str.clone()),
            EngineError::KeyringError(error_str.clone()),
            EngineError::Serialization(error_str.clone()),
            EngineError::InvalidInput(error_str.clone()),
            EngineError::AllProvidersExhausted,
            EngineError::Cancelled,
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!hint.contains(&error_str));
        }
    }
}

// Any string URL passes validation for a single required string parameter,
// and the validated object carries it through unchanged
proptest! {
    #[test]
    fn test_validate_accepts_any_string(url in "\\PC*") {
        let schema = ConnectorSchema::new("get_linkedin_profile", "Profile", EntityScope::Profile)
            .required("linkedin_url", ParamType::String, "Profile URL");

        let args = schema.validate(&json!({ "linkedin_url": url.clone() })).unwrap();
        prop_assert_eq!(args["linkedin_url"].as_str(), Some(url.as_str()));
    }

    #[test]
    fn test_validate_rejects_integer_for_string(n in any::<i64>()) {
        let schema = ConnectorSchema::new("get_company_news", "News", EntityScope::Company)
            .required("company_name", ParamType::String, "Company");

        prop_assert!(schema.validate(&json!({ "company_name": n })).is_err(), "expected validation error");
    }
}
