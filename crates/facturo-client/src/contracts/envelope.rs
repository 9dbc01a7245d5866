use serde::Serialize;
use serde_json::Value;

use crate::API_VERSION;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub ok: bool,
    pub command: String,
    pub version: String,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub ok: bool,
    pub error: ErrorContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorContract {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
}

pub fn success<T>(command: &str, data: T) -> ClientResult<SuccessEnvelope>
where
    T: Serialize,
{
    let json_data = serde_json::to_value(data)
        .map_err(|err| ClientError::internal_serialization(&err.to_string()))?;
    Ok(SuccessEnvelope {
        ok: true,
        command: command.to_string(),
        version: API_VERSION.to_string(),
        data: json_data,
    })
}

pub fn failure_from_error(error: &ClientError) -> FailureEnvelope {
    FailureEnvelope {
        ok: false,
        error: ErrorContract {
            code: error.code.clone(),
            message: error.message.clone(),
            recovery_steps: error.recovery_steps.clone(),
        },
        data: error.data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::ClientError;

    use super::{failure_from_error, success};

    #[test]
    fn success_envelope_carries_command_and_version() {
        let envelope = success("import list", json!({"rows": []}));
        assert!(envelope.is_ok());
        if let Ok(envelope) = envelope {
            assert!(envelope.ok);
            assert_eq!(envelope.command, "import list");
            assert_eq!(envelope.version, crate::API_VERSION);
        }
    }

    #[test]
    fn failure_envelope_mirrors_the_error() {
        let error = ClientError::batch_not_found("imp_missing");
        let envelope = failure_from_error(&error);
        assert!(!envelope.ok);
        assert_eq!(envelope.error.code, "batch_not_found");
        assert!(!envelope.error.recovery_steps.is_empty());

        let serialized = serde_json::to_value(&envelope);
        assert!(serialized.is_ok());
        if let Ok(value) = serialized {
            assert_eq!(value["ok"], Value::Bool(false));
            assert_eq!(
                value["data"]["batch_id"],
                Value::String("imp_missing".to_string())
            );
        }
    }

    #[test]
    fn unserializable_data_maps_to_internal_serialization_error() {
        // JSON object keys must be strings; a tuple key cannot serialize.
        let mut bad_data = std::collections::BTreeMap::new();
        bad_data.insert((1, 2), "value");

        let envelope = success("import show", bad_data);
        assert!(envelope.is_err());
        if let Err(error) = envelope {
            assert_eq!(error.code, "internal_serialization_error");
        }
    }
}
