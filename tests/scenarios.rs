use fingerprint_risk_rs::{
    ClientSignals, FieldGroup, RiskLevel, ServerSignals, SignalSession, format_value, list_by_group,
    lookup, merge, resolve, resolve_and_format, score,
};
use serde_json::{Value, json};

#[test]
fn scoring_is_idempotent() {
    let client = json!({ "vpn": { "result": true }, "incognito": true, "suspectScore": 17 });
    let server = json!({ "velocity": { "result": true } });

    let first = score(&merge(Some(&client), Some(&server)));
    let second = score(&merge(Some(&client), Some(&server)));
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn resolver_is_total() {
    let roots = [
        Value::Null,
        json!(0),
        json!("string"),
        json!(true),
        json!([[1, [2, { "k": null }]]]),
        json!({ "a": { "b": [{ "c": [0, false, ""] }] } }),
    ];
    let paths = ["", ".", "a", "a.b", "a.b.0.c.2", "0.1.1.k", "..", "a.b.99", "a.b.-1.c"];

    for root in &roots {
        for path in paths {
            let _ = resolve(Some(root), path);
        }
    }
    assert_eq!(resolve(Some(&roots[5]), "a.b.0.c.2"), Some(&json!("")));
    assert_eq!(resolve(Some(&roots[4]), "0.1.1.k"), Some(&Value::Null));
    assert_eq!(resolve(None, "a"), None);
}

#[test]
fn merge_replaces_whole_top_level_values() {
    let merged = merge(
        Some(&json!({ "vpn": { "result": false, "methods": { "a": 1 } } })),
        Some(&json!({ "vpn": { "result": true } })),
    );
    assert_eq!(merged.get("vpn"), Some(&json!({ "result": true })));
}

#[test]
fn turning_a_factor_on_never_lowers_the_score() {
    let before = json!({ "vpn": { "result": false }, "proxy": { "result": true }, "suspectScore": 20 });
    let after = json!({ "vpn": { "result": true }, "proxy": { "result": true }, "suspectScore": 20 });

    let low = score(&merge(Some(&before), None));
    let high = score(&merge(Some(&after), None));
    assert!(high.score >= low.score);
    assert_eq!(high.score - low.score, 25);
}

#[test]
fn threshold_boundaries_through_real_weights() {
    // incognito 10 + developerTools 15 = 25, proxy 20, tor 30
    let level_of = |data: Value| score(&merge(Some(&data), None)).level;

    assert_eq!(level_of(json!({ "suspectScore": 38 })), RiskLevel::Low); // 19
    assert_eq!(level_of(json!({ "proxy": { "result": true } })), RiskLevel::Medium); // 20
    assert_eq!(
        level_of(json!({ "proxy": { "result": true }, "suspectScore": 58 })),
        RiskLevel::Medium
    ); // 49
    assert_eq!(
        level_of(json!({ "proxy": { "result": true }, "tor": { "result": true } })),
        RiskLevel::High
    ); // 50
    assert_eq!(
        level_of(json!({
            "proxy": { "result": true },
            "tor": { "result": true },
            "suspectScore": 58
        })),
        RiskLevel::High
    ); // 79
    assert_eq!(
        level_of(json!({
            "proxy": { "result": true },
            "tor": { "result": true },
            "suspectScore": 60
        })),
        RiskLevel::Critical
    ); // 80
}

#[test]
fn risk_boolean_formatting() {
    let field = lookup("tor.result");
    assert_eq!(format_value(Some(&json!(true)), field), "⚠️ 检测到");
    assert_eq!(format_value(Some(&json!(false)), field), "✅ 未检测到");
}

#[test]
fn end_to_end_scenario() {
    let client = json!({ "visitorId": "v1", "vpn": { "result": true }, "suspectScore": 60 });
    let server = json!({ "tor": { "result": true } });

    let assessment = score(&merge(Some(&client), Some(&server)));
    assert_eq!(assessment.score, 85);
    assert_eq!(assessment.level, RiskLevel::Critical);

    let fired: Vec<&str> = assessment.triggered().map(|factor| factor.key).collect();
    assert_eq!(fired, vec!["vpn.result", "tor.result"]);

    let session = SignalSession::new(
        ClientSignals::loaded(client),
        ServerSignals::default().with_current_visit(server),
    );
    assert_eq!(session.assess(), assessment);
    assert_eq!(session.summary().unwrap().overall_score, 15);
}

#[test]
fn empty_inputs_degrade_to_low() {
    let merged = merge(None, None);
    assert!(merged.is_empty());

    let assessment = score(&merged);
    assert_eq!(assessment.score, 0);
    assert_eq!(assessment.level, RiskLevel::Low);
    assert!(!assessment.factors.is_empty());
    assert!(assessment.factors.iter().all(|factor| !factor.triggered));
}

#[test]
fn every_registered_network_field_renders() {
    let data = json!({
        "ip": "198.51.100.20",
        "ipLocation": {
            "country": { "name": "Japan", "code": "JP" },
            "subdivisions": [{ "name": "Tokyo" }],
            "latitude": 35.6895,
            "accuracyRadius": 50
        }
    });

    for field in list_by_group(FieldGroup::Network) {
        let rendered = resolve_and_format(Some(&data), field.key);
        assert!(
            rendered.should_show || field.hide_empty,
            "{} hidden without hide_empty",
            field.key
        );
    }
    assert_eq!(resolve_and_format(Some(&data), "ipLocation.latitude").formatted, "35.689500");
    assert_eq!(
        resolve_and_format(Some(&data), "ipLocation.subdivisions.0.name").formatted,
        "Tokyo"
    );
}
