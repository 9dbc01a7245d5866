use std::io;

use facturo_client::{ClientError, SuccessEnvelope};
use serde::Serialize;
use serde_json::{Value, json};

const JSON_VERSION: &str = "v1";

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    let value = match success.command.as_str() {
        // The list output is the one contract consumed as a bare array.
        "import list" => render_import_list_json(&success.data),
        "import create" | "import show" | "import reset" => json!({
            "ok": true,
            "version": JSON_VERSION,
            "data": success.data.clone()
        }),
        _ => {
            return Err(io::Error::other(format!(
                "JSON output is not supported for command `{}`",
                success.command
            )));
        }
    };

    serialize_json_pretty(&value)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    let payload = json!({
        "error": {
            "code": error.code,
            "message": error.message,
            "recovery_steps": error.recovery_steps,
        }
    });
    serialize_json_pretty(&payload)
}

fn render_import_list_json(data: &Value) -> Value {
    let mut rows = data
        .get("rows")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    rows.sort_by(|left, right| {
        let left_created = created_at(left);
        let right_created = created_at(right);
        right_created
            .cmp(&left_created)
            .then_with(|| value_string(right, "batch_id").cmp(&value_string(left, "batch_id")))
    });

    Value::Array(rows)
}

fn created_at(row: &Value) -> i64 {
    row.get("created_at").and_then(Value::as_i64).unwrap_or(0)
}

fn value_string(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use facturo_client::SuccessEnvelope;
    use serde_json::{Value, json};

    use super::{render_error_json, render_success_json};

    fn success(command: &str, data: Value) -> SuccessEnvelope {
        SuccessEnvelope {
            ok: true,
            command: command.to_string(),
            version: "0.1.0".to_string(),
            data,
        }
    }

    #[test]
    fn import_list_json_returns_raw_array() {
        let payload = success(
            "import list",
            json!({
                "rows": [
                    {"batch_id": "imp_1", "created_at": 1, "state": "imported"}
                ]
            }),
        );

        let rendered = render_success_json(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            let parsed: Result<Value, _> = serde_json::from_str(&text);
            assert!(parsed.is_ok());
            if let Ok(value) = parsed {
                assert!(value.is_array());
                assert_eq!(value[0]["batch_id"], Value::String("imp_1".to_string()));
            }
        }
    }

    #[test]
    fn import_list_json_orders_newest_first() {
        let payload = success(
            "import list",
            json!({
                "rows": [
                    {"batch_id": "imp_a", "created_at": 1},
                    {"batch_id": "imp_b", "created_at": 2}
                ]
            }),
        );

        let rendered = render_success_json(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            let parsed: Result<Value, _> = serde_json::from_str(&text);
            assert!(parsed.is_ok());
            if let Ok(value) = parsed {
                assert_eq!(value[0]["batch_id"], Value::String("imp_b".to_string()));
            }
        }
    }

    #[test]
    fn import_create_json_uses_structured_envelope() {
        let payload = success(
            "import create",
            json!({
                "batch_id": "imp_1",
                "batch_state": "imported"
            }),
        );

        let rendered = render_success_json(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            let parsed: Result<Value, _> = serde_json::from_str(&text);
            assert!(parsed.is_ok());
            if let Ok(value) = parsed {
                assert_eq!(value["ok"], Value::Bool(true));
                assert_eq!(value["version"], Value::String("v1".to_string()));
                assert_eq!(value["data"]["batch_id"], Value::String("imp_1".to_string()));
            }
        }
    }

    #[test]
    fn runtime_error_json_uses_universal_shape() {
        let error = facturo_client::ClientError::new(
            "batch_not_found",
            "missing",
            vec!["run facturo import list".to_string()],
        );
        let rendered = render_error_json(&error);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            let parsed: Result<Value, _> = serde_json::from_str(&text);
            assert!(parsed.is_ok());
            if let Ok(value) = parsed {
                assert_eq!(
                    value["error"]["code"],
                    Value::String("batch_not_found".to_string())
                );
                assert!(value.get("ok").is_none());
            }
        }
    }
}
