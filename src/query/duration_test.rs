use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use super::duration::{DurationRange, Step, build_duration_at, parse_duration_at};

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 7, 6)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap()
}

#[test]
fn negative_duration_looks_backwards() {
    let range = parse_duration_at("-1h", false, fixed_now());
    assert_eq!(range.step, Step::Minute);
    assert_eq!(range.start, "2025-07-06 1500");
    assert_eq!(range.end, "2025-07-06 1600");
}

#[test]
fn positive_duration_looks_forwards() {
    let range = parse_duration_at("30m", false, fixed_now());
    assert_eq!(range.step, Step::Second);
    assert_eq!(range.start, "2025-07-06 160000");
    assert_eq!(range.end, "2025-07-06 163000");
}

#[test]
fn compound_duration_is_summed() {
    let range = parse_duration_at("-1h30m", false, fixed_now());
    assert_eq!(range.step, Step::Minute);
    assert_eq!(range.start, "2025-07-06 1430");
    assert_eq!(range.end, "2025-07-06 1600");
}

#[test]
fn step_adapts_to_span() {
    // >= 7 days
    let range = parse_duration_at("-168h", false, fixed_now());
    assert_eq!(range.step, Step::Day);
    assert_eq!(range.start, "2025-06-29");
    assert_eq!(range.end, "2025-07-06");

    // >= 24 hours
    let range = parse_duration_at("-48h", false, fixed_now());
    assert_eq!(range.step, Step::Hour);
    assert_eq!(range.start, "2025-07-04 16");

    // exactly one hour sits on the minute boundary
    let range = parse_duration_at("-60m", false, fixed_now());
    assert_eq!(range.step, Step::Minute);

    // below one hour
    let range = parse_duration_at("-59m", false, fixed_now());
    assert_eq!(range.step, Step::Second);
}

#[test]
fn legacy_day_shorthand() {
    let range = parse_duration_at("7d", false, fixed_now());
    assert_eq!(range.step, Step::Day);
    assert_eq!(range.start, "2025-06-29");
    assert_eq!(range.end, "2025-07-06");

    let range = parse_duration_at("3D", false, fixed_now());
    assert_eq!(range.step, Step::Day);
    assert_eq!(range.start, "2025-07-03");
}

#[test]
fn legacy_day_shorthand_with_bad_count_defaults_to_seven() {
    let range = parse_duration_at("xyzd", false, fixed_now());
    assert_eq!(range.step, Step::Day);
    assert_eq!(range.start, "2025-06-29");
}

#[test]
fn bare_24h_parses_as_forward_duration() {
    // "24h" is a valid duration literal, so it never reaches the legacy
    // path: the window opens forward from now at hour granularity.
    let range = parse_duration_at("24h", false, fixed_now());
    assert_eq!(range.step, Step::Hour);
    assert_eq!(range.start, "2025-07-06 16");
    assert_eq!(range.end, "2025-07-07 16");
}

#[test]
fn legacy_hour_shorthand() {
    let range = parse_duration_at("badH", false, fixed_now());
    assert_eq!(range.step, Step::Hour);
    assert_eq!(range.start, "2025-07-06 15");
    assert_eq!(range.end, "2025-07-06 16");
}

#[test]
fn garbage_defaults_to_seven_day_window() {
    for input in ["", "garbage", "1w", "--5m", "d", "h"] {
        let range = parse_duration_at(input, false, fixed_now());
        assert_eq!(range.step, Step::Day, "input {input:?}");
        assert_eq!(range.start, "2025-06-29", "input {input:?}");
        assert_eq!(range.end, "2025-07-06", "input {input:?}");
    }
}

#[test]
fn cold_stage_flag_only_serialized_when_true() {
    let warm = parse_duration_at("-1h", false, fixed_now());
    assert_eq!(warm.cold_stage, None);
    let warm_json = serde_json::to_value(&warm).unwrap();
    assert!(warm_json.get("coldStage").is_none());

    let cold = parse_duration_at("-1h", true, fixed_now());
    assert_eq!(cold.cold_stage, Some(true));
    let cold_json = serde_json::to_value(&cold).unwrap();
    assert_eq!(cold_json.get("coldStage"), Some(&json!(true)));
}

#[test]
fn duration_serializes_camel_case_with_uppercase_step() {
    let range = parse_duration_at("-1h", false, fixed_now());
    assert_eq!(
        serde_json::to_value(&range).unwrap(),
        json!({
            "start": "2025-07-06 1500",
            "end": "2025-07-06 1600",
            "step": "MINUTE",
        })
    );
}

#[test]
fn explicit_bounds_with_full_timestamps() {
    let range = build_duration_at(
        "2025-07-06 10:00:00",
        "2025-07-06 10:30:00",
        None,
        false,
        0,
        fixed_now(),
    );
    assert_eq!(range.step, Step::Second);
    assert_eq!(range.start, "2025-07-06 100000");
    assert_eq!(range.end, "2025-07-06 103000");
}

#[test]
fn explicit_bounds_accept_all_layouts() {
    let cases = [
        ("2025-07-06 10:00:00", "2025-07-06 100000"),
        ("2025-07-06 10:00", "2025-07-06 100000"),
        ("2025-07-06 100000", "2025-07-06 100000"),
        ("2025-07-06 1000", "2025-07-06 100000"),
        ("2025-07-06 10", "2025-07-06 100000"),
        ("2025-07-06", "2025-07-06 000000"),
    ];
    for (input, expected_start) in cases {
        let range = build_duration_at(input, "now", Some("SECOND"), false, 0, fixed_now());
        assert_eq!(range.start, expected_start, "input {input:?}");
        assert_eq!(range.end, "2025-07-06 160000", "input {input:?}");
    }
}

#[test]
fn now_keyword_and_relative_offsets() {
    let range = build_duration_at("-15m", "now", None, false, 0, fixed_now());
    assert_eq!(range.step, Step::Second);
    assert_eq!(range.start, "2025-07-06 154500");
    assert_eq!(range.end, "2025-07-06 160000");
}

#[test]
fn missing_start_defaults_to_thirty_minutes_ago() {
    let range = build_duration_at("", "now", None, false, 0, fixed_now());
    assert_eq!(range.start, "2025-07-06 153000");
    assert_eq!(range.end, "2025-07-06 160000");
}

#[test]
fn unparseable_bound_falls_back_to_default() {
    let range = build_duration_at("not-a-time", "now", Some("SECOND"), false, 0, fixed_now());
    assert_eq!(range.start, "2025-07-06 153000");
}

#[test]
fn explicit_step_overrides_adaptive() {
    let range = build_duration_at(
        "2025-07-01 00:00:00",
        "2025-07-06 00:00:00",
        Some("MINUTE"),
        false,
        0,
        fixed_now(),
    );
    assert_eq!(range.step, Step::Minute);
    assert_eq!(range.start, "2025-07-01 0000");
}

#[test]
fn unknown_step_falls_back_to_adaptive() {
    let range = build_duration_at(
        "2025-07-01 00:00:00",
        "2025-07-06 00:00:00",
        Some("FORTNIGHT"),
        false,
        0,
        fixed_now(),
    );
    assert_eq!(range.step, Step::Hour);
}

#[test]
fn empty_bounds_use_default_minutes() {
    let range = build_duration_at("", "", None, false, 0, fixed_now());
    assert_eq!(range.step, Step::Second);
    assert_eq!(range.start, "2025-07-06 153000");
    assert_eq!(range.end, "2025-07-06 160000");

    let range = build_duration_at("", "", None, false, 120, fixed_now());
    assert_eq!(range.step, Step::Minute);
    assert_eq!(range.start, "2025-07-06 1400");
}

#[test]
fn normalization_is_deterministic_for_fixed_clock() {
    let a = parse_duration_at("-6h", true, fixed_now());
    let b = parse_duration_at("-6h", true, fixed_now());
    assert_eq!(a, b);
    assert_eq!(
        a,
        DurationRange {
            start: "2025-07-06 1000".to_string(),
            end: "2025-07-06 1600".to_string(),
            step: Step::Minute,
            cold_stage: Some(true),
        }
    );
}
