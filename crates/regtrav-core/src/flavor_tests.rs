use indoc::indoc;

use crate::{Error, Flavor};

#[test]
fn default_is_ecmascript() {
    assert_eq!(Flavor::default(), Flavor::ECMASCRIPT);
}

#[test]
fn by_name_resolves_presets_and_aliases() {
    assert_eq!(Flavor::by_name("python").unwrap(), Flavor::PYTHON);
    assert_eq!(Flavor::by_name("Ruby").unwrap(), Flavor::RUBY);
    assert_eq!(Flavor::by_name("js").unwrap(), Flavor::ECMASCRIPT);
    assert_eq!(Flavor::by_name("oracle").unwrap(), Flavor::ORACLE_DB);
}

#[test]
fn by_name_rejects_unknown() {
    let err = Flavor::by_name("perl").unwrap_err();
    assert!(matches!(err, Error::UnknownFlavor(ref n) if n == "perl"));
    insta::assert_snapshot!(err.to_string(), @"unknown regex flavor `perl`");
}

#[test]
fn presets_keep_declaration_order() {
    let names: Vec<_> = Flavor::presets().keys().copied().collect();
    assert_eq!(names, ["ecmascript", "python", "ruby", "oracledb"]);
}

#[test]
fn from_json_fills_missing_fields_with_defaults() {
    let flavor = Flavor::from_json(indoc! {r#"
        {
          "failing_empty_checks_dont_backtrack": true,
          "uses_last_group_result_field": true
        }
    "#})
    .unwrap();

    assert!(flavor.failing_empty_checks_dont_backtrack);
    assert!(flavor.uses_last_group_result_field);
    assert!(!flavor.empty_checks_monitor_capture_groups);
    assert!(!flavor.supports_recursive_backreferences);
}

#[test]
fn from_json_rejects_unknown_fields() {
    let err = Flavor::from_json(r#"{ "possessive": true }"#).unwrap_err();
    assert!(matches!(err, Error::FlavorJson(_)));
}

#[test]
fn from_json_rejects_malformed_input() {
    assert!(Flavor::from_json("{ not json").is_err());
}

#[test]
fn json_round_trips_presets() {
    for (_, flavor) in Flavor::presets() {
        let json = flavor.to_json().unwrap();
        assert_eq!(Flavor::from_json(&json).unwrap(), flavor);
    }
}

#[test]
fn ruby_serialized() {
    insta::assert_snapshot!(Flavor::RUBY.to_json().unwrap(), @r#"
    {
      "empty_checks_monitor_capture_groups": true,
      "empty_checks_on_mandatory_loop_iterations": true,
      "failing_empty_checks_dont_backtrack": true,
      "backreferences_to_unmatched_groups_fail": true,
      "uses_last_group_result_field": false,
      "nested_capture_groups_kept_on_loop_reentry": true,
      "matches_transitions_step_by_step": true,
      "supports_recursive_backreferences": true
    }
    "#);
}
