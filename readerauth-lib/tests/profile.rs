#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Profile composition, reports, the active-profile holder and configuration.

mod common;

use common::{chain_with, valid_chain};
use rcgen::KeyIdMethod;
use readerauth_lib::profile::{Period, SubjectKey};
use readerauth_lib::{
    ActiveProfile, Profile, ProfileConfig, ProfileValidation, ReaderAuthError, Validator,
    ValidatorConfig,
};
use std::sync::Arc;

fn reader_auth() -> Profile {
    ProfileConfig::reader_auth().build().unwrap()
}

const PRESET_ORDER: [&str; 8] = [
    "authority_key",
    "common_name",
    "critical_extensions",
    "key_usage",
    "mandatory_extensions",
    "period",
    "signature_algorithm",
    "subject_key",
];

// ---- Profile ----

#[test]
fn preset_trusts_conforming_chain() {
    let (leaf, anchor) = valid_chain();
    assert!(reader_auth().validate(&[leaf], &anchor.parsed).unwrap());
}

#[test]
fn preset_trusts_truncated_sha256_ski() {
    let (leaf, anchor) = chain_with(|params, key| {
        params.key_identifier_method = KeyIdMethod::PreSpecified(common::ski_sha256_160(key));
    });
    assert!(reader_auth().validate(&[leaf], &anchor.parsed).unwrap());
}

#[test]
fn preset_rejects_bad_ski() {
    let (leaf, anchor) = chain_with(|params, _| {
        params.key_identifier_method = KeyIdMethod::PreSpecified(vec![0x11; 20]);
    });
    assert!(!reader_auth().validate(&[leaf], &anchor.parsed).unwrap());
}

#[test]
fn preset_rejects_expired_leaf() {
    let (leaf, anchor) = chain_with(|params, _| common::validity(params, -10, -1));
    assert!(!reader_auth().validate(&[leaf], &anchor.parsed).unwrap());
}

#[test]
fn preset_rejects_wrong_anchor() {
    let (leaf, _) = valid_chain();
    let other = common::root("Reader Root CA");
    assert!(!reader_auth().validate(&[leaf], &other.parsed).unwrap());
}

#[test]
fn preset_rejects_unrelated_certificate_after_leaf() {
    let (leaf, anchor) = valid_chain();
    let unrelated = common::root("Completely Unrelated CA");
    let chain = [leaf, unrelated.parsed];
    assert!(!reader_auth().validate(&chain, &anchor.parsed).unwrap());

    let (leaf, anchor) = valid_chain();
    let chain = [leaf, anchor.parsed.clone()];
    assert!(reader_auth().validate(&chain, &anchor.parsed).unwrap());
}

#[test]
fn preset_does_not_require_reader_auth_eku() {
    let names: Vec<&str> = reader_auth().validators().iter().map(|v| v.name()).collect();
    assert_eq!(names, PRESET_ORDER);
}

#[test]
fn empty_chain_is_invalid_argument() {
    let anchor = common::root("Reader Root CA");
    let err = reader_auth().validate(&[], &anchor.parsed).unwrap_err();
    assert!(matches!(err, ReaderAuthError::InvalidArgument(_)));
    let err = reader_auth().evaluate(&[], &anchor.parsed).unwrap_err();
    assert!(matches!(err, ReaderAuthError::InvalidArgument(_)));
}

#[test]
fn empty_profile_trusts_everything() {
    let (leaf, anchor) = chain_with(|params, _| common::validity(params, -10, -1));
    let profile = Profile::new(vec![]);
    assert!(profile.is_empty());
    assert!(profile.validate(&[leaf], &anchor.parsed).unwrap());
}

#[test]
fn profile_from_validators_in_order() {
    let profile: Profile = vec![Validator::from(SubjectKey), Period::default().into()]
        .into_iter()
        .collect();
    assert_eq!(profile.len(), 2);
    assert_eq!(profile.validators()[0].name(), "subject_key");
    assert_eq!(profile.validators()[1].name(), "period");
}

#[test]
fn profile_is_reusable_across_chains() {
    let profile = reader_auth();
    let (good, anchor) = valid_chain();
    let (bad, bad_anchor) = chain_with(|params, _| common::validity(params, -10, -1));
    for _ in 0..3 {
        assert!(profile.validate(std::slice::from_ref(&good), &anchor.parsed).unwrap());
        assert!(!profile.validate(std::slice::from_ref(&bad), &bad_anchor.parsed).unwrap());
    }
}

#[test]
fn profile_is_shared_across_threads() {
    let profile = Arc::new(reader_auth());
    let (leaf, anchor) = valid_chain();
    let chain = Arc::new(vec![leaf]);
    let anchor = Arc::new(anchor.parsed);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let profile = Arc::clone(&profile);
            let chain = Arc::clone(&chain);
            let anchor = Arc::clone(&anchor);
            std::thread::spawn(move || profile.validate(&chain, &anchor).unwrap())
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
}

// ---- ProfileReport ----

#[test]
fn report_lists_every_validator_in_order() {
    let (leaf, anchor) = valid_chain();
    let report = reader_auth().evaluate(&[leaf], &anchor.parsed).unwrap();
    let names: Vec<&str> = report.outcomes.iter().map(|o| o.validator).collect();
    assert_eq!(names, PRESET_ORDER);
    assert!(report.trusted);
    assert!(report.failures().is_empty());
    assert!(report.to_string().ends_with(", OK"));
}

#[test]
fn report_names_failures_without_short_circuit() {
    let (leaf, anchor) = chain_with(|params, _| {
        params.key_identifier_method = KeyIdMethod::PreSpecified(vec![0x11; 20]);
        common::validity(params, -10, -1);
    });
    let profile = reader_auth();
    let report = profile
        .evaluate(std::slice::from_ref(&leaf), &anchor.parsed)
        .unwrap();

    assert!(!report.trusted);
    assert_eq!(report.outcomes.len(), PRESET_ORDER.len());
    assert_eq!(report.failures(), vec!["period", "subject_key"]);
    assert_eq!(
        report.trusted,
        profile.validate(&[leaf], &anchor.parsed).unwrap()
    );
    assert!(report.to_string().contains("FAIL, period; subject_key"));
}

#[test]
fn report_identifies_leaf() {
    let (leaf, anchor) = valid_chain();
    let report = reader_auth()
        .evaluate(std::slice::from_ref(&leaf), &anchor.parsed)
        .unwrap();
    assert_eq!(report.subject, leaf.subject_string());
    assert_eq!(report.serial, leaf.serial);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["trusted"], true);
    assert_eq!(json["outcomes"][7]["validator"], "subject_key");
}

// ---- ActiveProfile ----

#[test]
fn active_profile_validates_with_installed_profile() {
    let (leaf, anchor) = chain_with(|params, _| common::validity(params, -10, -1));
    let active = ActiveProfile::new(reader_auth());
    assert!(!active.validate(std::slice::from_ref(&leaf), &anchor.parsed).unwrap());

    let previous = active.install(Profile::new(vec![SubjectKey.into()]));
    assert_eq!(previous.len(), PRESET_ORDER.len());
    assert!(active.validate(&[leaf], &anchor.parsed).unwrap());
}

#[test]
fn snapshot_survives_install() {
    let (leaf, anchor) = chain_with(|params, _| common::validity(params, -10, -1));
    let active = ActiveProfile::from(reader_auth());

    let snapshot = active.snapshot();
    active.install(Profile::new(vec![SubjectKey.into()]));

    assert_eq!(snapshot.len(), PRESET_ORDER.len());
    assert!(!snapshot
        .validate(std::slice::from_ref(&leaf), &anchor.parsed)
        .unwrap());
    assert_eq!(active.snapshot().len(), 1);
}

#[test]
fn install_while_validating_from_other_threads() {
    let (leaf, anchor) = valid_chain();
    let active = Arc::new(ActiveProfile::new(reader_auth()));
    let chain = Arc::new(vec![leaf]);
    let anchor = Arc::new(anchor.parsed);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let active = Arc::clone(&active);
            let chain = Arc::clone(&chain);
            let anchor = Arc::clone(&anchor);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let profile = active.snapshot();
                    let len = profile.len();
                    assert!(len == PRESET_ORDER.len() || len == 1);
                    assert!(profile.validate(&chain, &anchor).unwrap());
                }
            })
        })
        .collect();
    for _ in 0..10 {
        active.install(Profile::new(vec![SubjectKey.into()]));
        active.install(reader_auth());
    }
    for r in readers {
        r.join().unwrap();
    }
}

// ---- ProfileConfig ----

#[test]
fn config_json_round_trip() {
    let config = ProfileConfig::reader_auth();
    let json = config.to_json().unwrap();
    let back = ProfileConfig::from_json(&json).unwrap();
    assert_eq!(back, config);
    let names: Vec<&str> = back.validators.iter().map(|v| v.name()).collect();
    assert_eq!(names, PRESET_ORDER);
}

#[test]
fn config_defaults_fill_omitted_parameters() {
    let config = ProfileConfig::from_json(
        r#"{"validators": [{"name": "key_usage"}, {"name": "period"}, {"name": "extended_key_usage"}]}"#,
    )
    .unwrap();
    assert_eq!(
        config.validators,
        vec![
            ValidatorConfig::KeyUsage {
                required: vec![readerauth_lib::KeyUsageFlag::DigitalSignature]
            },
            ValidatorConfig::Period { at_time: None },
            ValidatorConfig::ExtendedKeyUsage {
                required: readerauth_lib::oid::EKU_MDL_READER_AUTH.to_string()
            },
        ]
    );
}

#[test]
fn config_with_parameters_builds_custom_profile() {
    let (leaf, anchor) = valid_chain();
    let config = ProfileConfig::from_json(&format!(
        r#"{{"validators": [
            {{"name": "subject_key"}},
            {{"name": "period", "at_time": {}}}
        ]}}"#,
        leaf.not_after.timestamp + 1
    ))
    .unwrap();
    let profile = config.build().unwrap();
    assert_eq!(profile.len(), 2);
    assert!(!profile.validate(&[leaf], &anchor.parsed).unwrap());
}

#[test]
fn config_unknown_validator_rejected() {
    let err = ProfileConfig::from_json(r#"{"validators": [{"name": "revocation"}]}"#).unwrap_err();
    assert!(matches!(err, ReaderAuthError::Json(_)));
}

#[test]
fn config_unknown_field_rejected() {
    let err = ProfileConfig::from_json(r#"{"validators": [], "strict": true}"#).unwrap_err();
    assert!(matches!(err, ReaderAuthError::Json(_)));
}

#[test]
fn config_misspelled_parameter_rejected() {
    let err = ProfileConfig::from_json(
        r#"{"validators": [{"name": "key_usage", "requird": ["key_cert_sign"]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ReaderAuthError::Json(_)));
}

#[test]
fn config_parameter_on_parameterless_validator_rejected() {
    let err = ProfileConfig::from_json(
        r#"{"validators": [{"name": "subject_key", "method": "sha1"}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ReaderAuthError::Json(_)));
}

#[test]
fn config_empty_rejected() {
    let config = ProfileConfig::from_json(r#"{"validators": []}"#).unwrap();
    let err = config.build().unwrap_err();
    assert!(matches!(err, ReaderAuthError::Config(_)));
}

#[test]
fn config_duplicate_rejected() {
    let config = ProfileConfig {
        validators: vec![ValidatorConfig::SubjectKey {}, ValidatorConfig::SubjectKey {}],
    };
    let err = config.build().unwrap_err();
    assert!(matches!(err, ReaderAuthError::Config(_)));
}

#[test]
fn config_malformed_oid_rejected() {
    let config = ProfileConfig::from_json(
        r#"{"validators": [{"name": "signature_algorithm", "accepted": ["ecdsa-with-SHA256"]}]}"#,
    )
    .unwrap();
    let err = config.build().unwrap_err();
    assert!(matches!(err, ReaderAuthError::Config(_)));
}

#[test]
fn config_from_missing_file_is_io_error() {
    let err = ProfileConfig::from_file(std::path::Path::new("/nonexistent/readerauth.json"))
        .unwrap_err();
    assert!(matches!(err, ReaderAuthError::Io(_)));
}
