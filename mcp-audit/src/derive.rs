//! Audit record derivation rules, exact string-matching detail.

use serde_json::Value;
use std::collections::BTreeMap;

const SANITIZE_MARKERS: &[&str] = &["password", "token", "secret", "api_key", "auth", "credential"];

pub fn operation_type(tool_name: &str) -> &'static str {
    let name = tool_name.to_ascii_lowercase();
    if name.contains("get") || name.contains("read") || name.contains("list") {
        "read"
    } else if name.contains("check") || name.contains("validate") {
        "validate"
    } else if name.contains("execute") || name.contains("transfer") {
        "execute"
    } else {
        "operation"
    }
}

pub fn data_scope(tool_name: &str) -> &'static str {
    let name = tool_name.to_ascii_lowercase();
    if name.contains("account") {
        "account_data"
    } else if name.contains("beneficiary") {
        "contact_data"
    } else if name.contains("transfer") || name.contains("execute") {
        "payment_data"
    } else {
        "general"
    }
}

pub fn compliance_flags(tool_name: &str, args: &BTreeMap<String, Value>) -> Vec<String> {
    let name = tool_name.to_ascii_lowercase();
    let mut flags = vec!["PCI_DSS".to_string()];
    if name.contains("account") || name.contains("beneficiary") {
        flags.push("GDPR_PERSONAL_DATA".to_string());
    }
    let amount = args.get("amount").and_then(value_as_f64);
    if amount.is_some_and(|amount| amount > 10_000.0) {
        flags.push("HIGH_VALUE_TRANSACTION".to_string());
    }
    flags
}

const DATA_ACCESSED_KEYS: &[&str] = &[
    "customer_id",
    "account_id",
    "sender_account_id",
    "recipient_account_id",
    "amount",
];

pub fn data_accessed(tool_name: &str, args: &BTreeMap<String, Value>) -> Vec<String> {
    let mut accessed = vec![format!("tool:{tool_name}")];
    for key in DATA_ACCESSED_KEYS {
        if let Some(value) = args.get(*key) {
            accessed.push(format!("{key}:{}", value_as_display(value)));
        }
    }
    accessed
}

/// Redacts values whose key contains one of the sensitive-key markers.
pub fn sanitize(args: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    args.iter()
        .map(|(key, value)| {
            let lower = key.to_ascii_lowercase();
            if SANITIZE_MARKERS.iter().any(|marker| lower.contains(marker)) {
                (key.clone(), Value::String("***REDACTED***".to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn operation_type_checks_read_before_validate_before_execute() {
        assert_eq!(operation_type("get_account_balance"), "read");
        assert_eq!(operation_type("validate_beneficiary"), "validate");
        assert_eq!(operation_type("execute_transfer"), "execute");
        assert_eq!(operation_type("summarize_spending"), "operation");
    }

    #[test]
    fn data_scope_matches_tool_name_substrings() {
        assert_eq!(data_scope("get_account_balance"), "account_data");
        assert_eq!(data_scope("list_beneficiaries"), "contact_data");
        assert_eq!(data_scope("execute_transfer"), "payment_data");
        assert_eq!(data_scope("get_product_faq"), "general");
    }

    #[test]
    fn high_value_flag_is_strictly_greater_than_10000() {
        let exact = args(&[("amount", json!(10000.00))]);
        assert!(!compliance_flags("execute_transfer", &exact).contains(&"HIGH_VALUE_TRANSACTION".to_string()));

        let over = args(&[("amount", json!(10000.01))]);
        assert!(compliance_flags("execute_transfer", &over).contains(&"HIGH_VALUE_TRANSACTION".to_string()));
    }

    #[test]
    fn gdpr_flag_added_for_account_or_beneficiary_tools() {
        let none = args(&[]);
        assert!(compliance_flags("get_account_balance", &none).contains(&"GDPR_PERSONAL_DATA".to_string()));
        assert!(!compliance_flags("execute_transfer", &none).contains(&"GDPR_PERSONAL_DATA".to_string()));
    }

    #[test]
    fn data_accessed_includes_tool_and_known_keys_only() {
        let call_args = args(&[
            ("customer_id", json!("cust-1")),
            ("note", json!("irrelevant")),
            ("amount", json!(42.5)),
        ]);
        let accessed = data_accessed("get_account_balance", &call_args);
        assert!(accessed.contains(&"tool:get_account_balance".to_string()));
        assert!(accessed.contains(&"customer_id:cust-1".to_string()));
        assert!(accessed.contains(&"amount:42.5".to_string()));
        assert!(!accessed.iter().any(|entry| entry.starts_with("note:")));
    }

    #[test]
    fn sanitize_redacts_sensitive_keys_case_insensitively() {
        let call_args = args(&[
            ("API_KEY", json!("sk-123")),
            ("account_id", json!("acc-1")),
        ]);
        let sanitized = sanitize(&call_args);
        assert_eq!(sanitized["API_KEY"], json!("***REDACTED***"));
        assert_eq!(sanitized["account_id"], json!("acc-1"));
    }
}
