// ABOUTME: defines the action protocol shared by the sidefx executor and sidefx-lint.
// ABOUTME: decodes one json block into a typed action selected by its "action" tag.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

mod blocks;
mod protocol;

pub use blocks::{blocks, BlockAccumulator, Blocks};
pub use protocol::{AddressFamily, Protocol, Transport, UnsupportedProtocol};

/// One scripted side effect. The `action` field of the json document selects
/// the variant.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "action")]
pub enum Action {
    CreateFile(CreateFileAction),
    ModifyFile(ModifyFileAction),
    DeleteFile(DeleteFileAction),
    RunCommand(RunCommandAction),
    NetworkWrite(NetworkWriteAction),
}

impl Action {
    pub const KINDS: [&'static str; 5] = [
        "CreateFile",
        "ModifyFile",
        "DeleteFile",
        "RunCommand",
        "NetworkWrite",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateFile(_) => "CreateFile",
            Action::ModifyFile(_) => "ModifyFile",
            Action::DeleteFile(_) => "DeleteFile",
            Action::RunCommand(_) => "RunCommand",
            Action::NetworkWrite(_) => "NetworkWrite",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct CreateFileAction {
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ModifyFileAction {
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct DeleteFileAction {
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct RunCommandAction {
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkWriteAction {
    /// One of tcp, tcp4, tcp6, udp, udp4, udp6. Checked by the executor.
    #[serde(deserialize_with = "null_as_default")]
    pub protocol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub host: String,
    #[serde(deserialize_with = "null_as_default")]
    pub port: u16,
    /// Sent as the raw utf-8 bytes of the string.
    #[serde(deserialize_with = "null_as_default")]
    pub data: String,
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unable to process json ({reason}): {content}")]
    Malformed { reason: String, content: String },
    #[error("unknown action {action:?}: {content}")]
    UnknownAction { action: String, content: String },
}

impl DecodeError {
    pub fn content(&self) -> &str {
        match self {
            DecodeError::Malformed { content, .. } | DecodeError::UnknownAction { content, .. } => content,
        }
    }
}

pub fn decode_action(block: &str) -> Result<Action, DecodeError> {
    let malformed = |reason: String| DecodeError::Malformed {
        reason,
        content: block.to_string(),
    };

    let doc: serde_json::Value = serde_json::from_str(block).map_err(|err| malformed(err.to_string()))?;

    let tag = match &doc {
        serde_json::Value::Object(obj) => match obj.get("action") {
            None | Some(serde_json::Value::Null) => "",
            Some(serde_json::Value::String(tag)) => tag.as_str(),
            Some(_) => return Err(malformed("action must be a string".to_string())),
        },
        serde_json::Value::Null => "",
        _ => return Err(malformed("document is not an object".to_string())),
    };

    let action = match tag {
        "CreateFile" => Action::CreateFile(shape(&doc).map_err(malformed)?),
        "ModifyFile" => Action::ModifyFile(shape(&doc).map_err(malformed)?),
        "DeleteFile" => Action::DeleteFile(shape(&doc).map_err(malformed)?),
        "RunCommand" => Action::RunCommand(shape(&doc).map_err(malformed)?),
        "NetworkWrite" => Action::NetworkWrite(shape(&doc).map_err(malformed)?),
        other => {
            return Err(DecodeError::UnknownAction {
                action: other.to_string(),
                content: block.to_string(),
            })
        }
    };

    Ok(action)
}

fn shape<T: DeserializeOwned>(doc: &serde_json::Value) -> Result<T, String> {
    T::deserialize(doc).map_err(|err| err.to_string())
}
