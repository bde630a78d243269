//! Output type constraints on an agent's final answer.

use std::fmt;
use std::sync::Arc;

use baton_llm::OutputSchemaSpec;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::RunError;

type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// JSON schema the final output must satisfy.
///
/// The runtime does not evaluate JSON schemas itself; the schema is sent to
/// the model and the final text is checked by decoding it and, if set, by
/// a validator.
#[derive(Clone)]
pub struct OutputSchema {
    name: String,
    json_schema: Value,
    strict: bool,
    validator: Option<Validator>,
}

impl OutputSchema {
    /// A schema checked only for well-formed JSON.
    pub fn new(name: impl Into<String>, json_schema: Value) -> Self {
        Self {
            name: name.into(),
            json_schema,
            strict: true,
            validator: None,
        }
    }

    /// A schema whose final output must also deserialize into `T`.
    pub fn of<T: DeserializeOwned + 'static>(name: impl Into<String>, json_schema: Value) -> Self {
        let mut schema = Self::new(name, json_schema);
        schema.validator = Some(Arc::new(|value: &Value| {
            serde_json::from_value::<T>(value.clone())
                .map(|_| ())
                .map_err(|e| e.to_string())
        }));
        schema
    }

    /// Ask the provider not to enforce the schema strictly.
    #[must_use]
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire description sent with each model call.
    pub fn spec(&self) -> OutputSchemaSpec {
        OutputSchemaSpec {
            name: self.name.clone(),
            schema: self.json_schema.clone(),
            strict: self.strict,
        }
    }

    /// Parse and check the model's final text.
    pub fn validate(&self, text: &str) -> Result<Value, RunError> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            RunError::model_behavior(format!("Invalid JSON when parsing {text:?} for {}: {e}", self.name))
        })?;
        if let Some(validator) = &self.validator {
            validator(&value).map_err(|e| {
                RunError::model_behavior(format!("Output does not match {}: {e}", self.name))
            })?;
        }
        Ok(value)
    }
}

impl fmt::Debug for OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSchema")
            .field("name", &self.name)
            .field("strict", &self.strict)
            .field("typed", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// What an agent's final output must be.
#[derive(Clone, Debug, Default)]
pub enum OutputType {
    /// Plain text, the default.
    #[default]
    Text,
    /// JSON matching a schema.
    Json(OutputSchema),
}

impl OutputType {
    /// Whether the output is plain text.
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Schema to send to the model, if any.
    pub fn spec(&self) -> Option<OutputSchemaSpec> {
        match self {
            Self::Text => None,
            Self::Json(schema) => Some(schema.spec()),
        }
    }

    /// Turn the last message's text into the final output value.
    pub fn parse_final(&self, text: &str) -> Result<Value, RunError> {
        match self {
            Self::Text => Ok(Value::String(text.to_owned())),
            Self::Json(schema) => schema.validate(text),
        }
    }

    /// Short label for spans.
    pub fn label(&self) -> &str {
        match self {
            Self::Text => "str",
            Self::Json(schema) => schema.name(),
        }
    }
}
