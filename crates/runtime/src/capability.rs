use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Named arguments for one invocation.
pub type Arguments = Map<String, Value>;

/// The three namespaces a capability can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tool,
    Resource,
    Prompt,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Tool, Category::Resource, Category::Prompt];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tool => "tool",
            Category::Resource => "resource",
            Category::Prompt => "prompt",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    String,
    Boolean,
}

impl ParamType {
    /// JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Boolean => "boolean",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::String => value.is_string(),
            ParamType::Boolean => value.is_boolean(),
        }
    }

    /// Convert a raw text segment (e.g. from a resource URI) into a typed value.
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            ParamType::Integer => raw.parse::<i64>().ok().map(Value::from),
            ParamType::Number => raw.parse::<f64>().ok().map(Value::from),
            ParamType::String => Some(Value::String(raw.to_string())),
            ParamType::Boolean => raw.parse::<bool>().ok().map(Value::from),
        }
    }
}

/// One entry in a capability's ordered input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Static description of a capability: who it is and what it accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique within `category`.
    pub name: String,
    pub category: Category,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Resources only: the URI template it is addressed by, e.g. `quote://{quote_id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_template: Option<String>,
}

impl CapabilityDescriptor {
    fn new(category: Category, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category,
            description: description.into(),
            params: Vec::new(),
            uri_template: None,
        }
    }

    pub fn tool(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Category::Tool, name, description)
    }

    pub fn resource(
        name: impl Into<String>,
        uri_template: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            uri_template: Some(uri_template.into()),
            ..Self::new(Category::Resource, name, description)
        }
    }

    pub fn prompt(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Category::Prompt, name, description)
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// JSON Schema object built from the ordered parameter list.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            let mut prop = json!({ "type": p.ty.as_str() });
            if let Some(desc) = &p.description {
                prop["description"] = Value::String(desc.clone());
            }
            properties.insert(p.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Display for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty.as_str()))
            .collect();
        write!(f, "{} {}({})", self.category, self.name, params.join(", "))
    }
}

/// Coarse failure classes, kept alongside the rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Connectivity,
    Configuration,
    InvalidArgument,
    Panicked,
}

/// Failure of a handler body.
///
/// `Display` is the exact text shown to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapabilityError {
    /// A logical miss (unknown city, absent row).
    #[error("{0}")]
    NotFound(String),
    /// Network, database or upstream fault.
    #[error("{context}: {detail}")]
    Connectivity { context: String, detail: String },
    /// A required credential or setting is missing.
    #[error("{0}")]
    Configuration(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CapabilityError {
    pub fn connectivity(context: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self::Connectivity {
            context: context.into(),
            detail: detail.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CapabilityError::NotFound(_) => ErrorKind::NotFound,
            CapabilityError::Connectivity { .. } => ErrorKind::Connectivity,
            CapabilityError::Configuration(_) => ErrorKind::Configuration,
            CapabilityError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// The extension point: every tool, resource and prompt implements this.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Name, category and schema. Read once at registration.
    fn descriptor(&self) -> CapabilityDescriptor;

    /// Run the handler. Arguments have already been checked against the schema.
    async fn invoke(&self, args: &Arguments) -> Result<String, CapabilityError>;
}

/// Fetch a validated integer argument.
pub fn arg_i64(args: &Arguments, name: &str) -> Result<i64, CapabilityError> {
    args.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| CapabilityError::InvalidArgument(format!("'{name}' must be an integer")))
}

/// Fetch a validated string argument.
pub fn arg_str<'a>(args: &'a Arguments, name: &str) -> Result<&'a str, CapabilityError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| CapabilityError::InvalidArgument(format!("'{name}' must be a string")))
}
