//! JSON snapshot and diff helpers for audit entries
//!
//! Compares the before/after state of a row and produces a structured
//! change list. Nested objects are compared recursively; floats use an
//! epsilon so serialization round trips do not produce phantom changes.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;

/// Tolerance for float comparison
const FLOAT_EPSILON: f64 = 1e-9;

/// Recursive JSON equality with float tolerance
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(fa), Some(fb)) => (fa - fb).abs() < FLOAT_EPSILON,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return false;
            }
            a.iter().zip(b.iter()).all(|(va, vb)| values_equal(va, vb))
        }
        (Value::Object(a), Value::Object(b)) => {
            if a.len() != b.len() {
                return false;
            }
            a.iter()
                .all(|(key, va)| b.get(key).is_some_and(|vb| values_equal(va, vb)))
        }
        _ => false,
    }
}

/// One changed field
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: Value,
    pub to: Value,
}

/// Per-table snapshot configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Fields stripped from snapshots (ids, secrets)
    pub exclude_fields: &'static [&'static str],
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            exclude_fields: &["id"],
        }
    }
}

/// Snapshot configuration for a table
pub fn get_config(table_name: &str) -> AuditConfig {
    match table_name {
        "users" => AuditConfig {
            exclude_fields: &["id", "password_hash"],
        },
        "orders" => AuditConfig {
            exclude_fields: &["id", "items", "payments"],
        },
        _ => AuditConfig::default(),
    }
}

/// Recursive diff of two JSON values
fn diff_json_recursive(from: &Value, to: &Value, path: &str, changes: &mut Vec<FieldChange>) {
    match (from, to) {
        (Value::Object(from_obj), Value::Object(to_obj)) => {
            let mut all_keys: HashSet<&String> = from_obj.keys().collect();
            all_keys.extend(to_obj.keys());

            for key in all_keys {
                let field_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                match (from_obj.get(key), to_obj.get(key)) {
                    (Some(f), Some(t)) => {
                        diff_json_recursive(f, t, &field_path, changes);
                    }
                    (Some(f), None) => {
                        changes.push(FieldChange {
                            field: field_path,
                            from: f.clone(),
                            to: Value::Null,
                        });
                    }
                    (None, Some(t)) => {
                        changes.push(FieldChange {
                            field: field_path,
                            from: Value::Null,
                            to: t.clone(),
                        });
                    }
                    (None, None) => unreachable!(),
                }
            }
        }

        (Value::Array(_), Value::Array(_)) => {
            if !values_equal(from, to) {
                changes.push(FieldChange {
                    field: path.to_string(),
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        (Value::Number(from_num), Value::Number(to_num)) => {
            let are_equal = match (from_num.as_f64(), to_num.as_f64()) {
                (Some(f), Some(t)) => (f - t).abs() < FLOAT_EPSILON,
                _ => from_num == to_num,
            };
            if !are_equal {
                changes.push(FieldChange {
                    field: path.to_string(),
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        (f, t) => {
            if f != t {
                changes.push(FieldChange {
                    field: path.to_string(),
                    from: f.clone(),
                    to: t.clone(),
                });
            }
        }
    }
}

fn filter_fields(value: &mut Value, exclude: &[&str]) {
    if let Value::Object(obj) = value {
        for field in exclude {
            obj.remove(*field);
        }
    }
}

/// Filtered snapshot of a row, for create/delete entries
pub fn create_snapshot<T: Serialize>(value: &T, table_name: &str) -> Value {
    let config = get_config(table_name);

    match serde_json::to_value(value) {
        Ok(mut json) => {
            filter_fields(&mut json, config.exclude_fields);
            json
        }
        Err(e) => {
            tracing::error!("Failed to serialize audit snapshot: {:?}", e);
            json!({"error": "serialization_failed"})
        }
    }
}

/// Change list between two row states, for update entries
///
/// Returns `{"changes": [{"field", "from", "to"}, ...]}`.
pub fn create_diff<T: Serialize>(from: &T, to: &T, table_name: &str) -> Value {
    let config = get_config(table_name);

    let from_json = match serde_json::to_value(from) {
        Ok(mut v) => {
            filter_fields(&mut v, config.exclude_fields);
            v
        }
        Err(e) => {
            tracing::error!("Failed to serialize 'from' for diff: {:?}", e);
            return json!({"error": "serialization_failed"});
        }
    };

    let to_json = match serde_json::to_value(to) {
        Ok(mut v) => {
            filter_fields(&mut v, config.exclude_fields);
            v
        }
        Err(e) => {
            tracing::error!("Failed to serialize 'to' for diff: {:?}", e);
            return json!({"error": "serialization_failed"});
        }
    };

    let mut changes = Vec::new();
    diff_json_recursive(&from_json, &to_json, "", &mut changes);

    if changes.is_empty() {
        json!({"changes": [], "note": "no_changes_detected"})
    } else {
        json!({"changes": changes})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestProduct {
        id: i64,
        code: String,
        name: String,
        price: f64,
        is_available: bool,
    }

    #[derive(Serialize)]
    struct TestUser {
        id: i64,
        username: String,
        password_hash: String,
        role: String,
    }

    #[test]
    fn snapshot_filters_id() {
        let product = TestProduct {
            id: 7,
            code: "TAC-001".to_string(),
            name: "Taco al pastor".to_string(),
            price: 25.0,
            is_available: true,
        };

        let snapshot = create_snapshot(&product, "products");
        let obj = snapshot.as_object().unwrap();

        assert!(obj.contains_key("name"));
        assert!(obj.contains_key("price"));
        assert!(!obj.contains_key("id"));
    }

    #[test]
    fn snapshot_filters_password_hash() {
        let user = TestUser {
            id: 1,
            username: "admin".to_string(),
            password_hash: "$argon2$secret".to_string(),
            role: "admin".to_string(),
        };

        let snapshot = create_snapshot(&user, "users");
        let obj = snapshot.as_object().unwrap();

        assert!(obj.contains_key("username"));
        assert!(obj.contains_key("role"));
        assert!(!obj.contains_key("id"));
        assert!(!obj.contains_key("password_hash"));
    }

    #[test]
    fn diff_reports_changed_fields() {
        let from = TestProduct {
            id: 7,
            code: "TAC-001".to_string(),
            name: "Taco al pastor".to_string(),
            price: 25.0,
            is_available: true,
        };
        let to = TestProduct {
            id: 7,
            code: "TAC-001".to_string(),
            name: "Taco de suadero".to_string(),
            price: 28.0,
            is_available: true,
        };

        let diff = create_diff(&from, &to, "products");
        let changes = diff["changes"].as_array().unwrap();

        assert_eq!(changes.len(), 2);

        let fields: Vec<&str> = changes
            .iter()
            .map(|c| c["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"price"));
    }

    #[test]
    fn diff_with_no_changes() {
        let product = TestProduct {
            id: 7,
            code: "TAC-001".to_string(),
            name: "Taco al pastor".to_string(),
            price: 25.0,
            is_available: true,
        };

        let diff = create_diff(&product, &product, "products");
        let changes = diff["changes"].as_array().unwrap();

        assert!(changes.is_empty());
        assert!(diff.get("note").is_some());
    }

    #[test]
    fn float_noise_below_epsilon_is_ignored() {
        let from = TestProduct {
            id: 7,
            code: "TAC-001".to_string(),
            name: "Taco al pastor".to_string(),
            price: 25.0,
            is_available: true,
        };
        let to = TestProduct {
            id: 7,
            code: "TAC-001".to_string(),
            name: "Taco al pastor".to_string(),
            price: 25.0 + 1e-12,
            is_available: true,
        };

        let diff = create_diff(&from, &to, "products");
        assert!(diff["changes"].as_array().unwrap().is_empty());
    }
}
