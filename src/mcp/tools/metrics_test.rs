use serde_json::json;

use super::metrics::{
    Order, Scope, TopNMetricsParams, build_metrics_condition, build_top_n_condition,
    parse_service_id, scope_for_top_n,
};

fn top_n_params(metrics_name: &str) -> TopNMetricsParams {
    TopNMetricsParams {
        metrics_name: metrics_name.to_string(),
        ..Default::default()
    }
}

#[test]
fn scope_is_inferred_from_metric_prefix() {
    assert_eq!(scope_for_top_n("service_cpm"), Scope::Service);
    assert_eq!(scope_for_top_n("service_resp_time"), Scope::Service);
    assert_eq!(
        scope_for_top_n("service_instance_cpm"),
        Scope::ServiceInstance
    );
    assert_eq!(scope_for_top_n("endpoint_resp_time"), Scope::Endpoint);
    assert_eq!(scope_for_top_n("unknown_metric"), Scope::Service);
}

#[test]
fn parses_valid_service_id() {
    // "dGVzdA==" is base64 for "test".
    let (name, normal) = parse_service_id("dGVzdA==.1").unwrap();
    assert_eq!(name, "test");
    assert!(normal);

    let (name, normal) = parse_service_id("dGVzdA==.0").unwrap();
    assert_eq!(name, "test");
    assert!(!normal);
}

#[test]
fn rejects_malformed_service_ids() {
    assert!(parse_service_id("no-separator").is_err());
    assert!(parse_service_id("a.b.c").is_err());
    assert!(parse_service_id("!!!.1").is_err());
}

#[test]
fn top_n_defaults() {
    let condition = build_top_n_condition(&top_n_params("service_cpm")).unwrap();
    assert_eq!(condition.top_n, 5);
    assert_eq!(condition.order, Order::Des);
    assert_eq!(condition.scope, Scope::Service);
    assert_eq!(condition.parent_service, "");
    assert!(!condition.normal);
}

#[test]
fn top_n_zero_falls_back_to_default() {
    let mut params = top_n_params("service_cpm");
    params.top_n = Some(0);
    assert_eq!(build_top_n_condition(&params).unwrap().top_n, 5);
}

#[test]
fn negative_top_n_is_rejected() {
    let mut params = top_n_params("service_cpm");
    params.top_n = Some(-3);
    let err = build_top_n_condition(&params).unwrap_err();
    assert_eq!(err, "top_n must be a positive integer");
}

#[test]
fn unknown_order_falls_back_to_descending() {
    let mut params = top_n_params("service_cpm");
    params.order = Some("SIDEWAYS".to_string());
    assert_eq!(build_top_n_condition(&params).unwrap().order, Order::Des);

    params.order = Some("ASC".to_string());
    assert_eq!(build_top_n_condition(&params).unwrap().order, Order::Asc);
}

#[test]
fn service_id_takes_precedence_over_service_name() {
    let mut params = top_n_params("endpoint_cpm");
    params.service_id = Some("dGVzdA==.1".to_string());
    params.service_name = Some("ignored".to_string());
    let condition = build_top_n_condition(&params).unwrap();
    assert_eq!(condition.parent_service, "test");
    assert!(condition.normal);
    assert_eq!(condition.scope, Scope::Endpoint);
}

#[test]
fn malformed_service_id_degrades_to_no_parent() {
    let mut params = top_n_params("service_cpm");
    params.service_id = Some("garbage".to_string());
    let condition = build_top_n_condition(&params).unwrap();
    assert_eq!(condition.parent_service, "");
    assert!(!condition.normal);
}

#[test]
fn explicit_scope_overrides_inference() {
    let mut params = top_n_params("service_cpm");
    params.scope = Some("ServiceInstance".to_string());
    assert_eq!(
        build_top_n_condition(&params).unwrap().scope,
        Scope::ServiceInstance
    );

    params.scope = Some("Bogus".to_string());
    assert!(build_top_n_condition(&params).unwrap_err().contains("invalid scope"));
}

#[test]
fn top_n_condition_serializes_every_field() {
    let condition = build_top_n_condition(&top_n_params("service_cpm")).unwrap();
    let value = serde_json::to_value(&condition).unwrap();
    assert_eq!(
        value,
        json!({
            "name": "service_cpm",
            "parentService": "",
            "normal": false,
            "scope": "Service",
            "topN": 5,
            "order": "DES",
        })
    );
}

#[test]
fn metrics_condition_keeps_only_set_entity_fields() {
    let params = super::metrics::SingleMetricsParams {
        metrics_name: "service_resp_time".to_string(),
        scope: Some("Service".to_string()),
        service_name: Some("gateway".to_string()),
        endpoint_name: Some(String::new()),
        ..Default::default()
    };
    let condition = build_metrics_condition(&params).unwrap();
    let value = serde_json::to_value(&condition).unwrap();
    assert_eq!(
        value,
        json!({
            "name": "service_resp_time",
            "entity": {
                "scope": "Service",
                "serviceName": "gateway",
            },
        })
    );
}

#[test]
fn metrics_condition_rejects_bad_scope() {
    let params = super::metrics::SingleMetricsParams {
        metrics_name: "service_cpm".to_string(),
        scope: Some("Galaxy".to_string()),
        ..Default::default()
    };
    let err = build_metrics_condition(&params).unwrap_err();
    assert!(err.starts_with("invalid scope 'Galaxy'"));
}
