//! JSON request templates patched in place before submission.
//!
//! Fields are addressed with JSON pointers (`/S3Parameters/ManifestFileLocation/Bucket`).
//! Everything that is not explicitly written is forwarded unchanged.

use crate::errors::Error;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct Template {
    path: PathBuf,
    document: Value,
}

impl Template {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let contents = fs::read_to_string(&path)?;

        let document = serde_json::from_str(&contents)?;

        Ok(Template { path, document })
    }

    pub fn new(path: impl Into<PathBuf>, document: Value) -> Self {
        Template {
            path: path.into(),
            document,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_value(self) -> Value {
        self.document
    }

    pub fn get_str(&self, pointer: &str) -> Result<&str, Error> {
        let node = self
            .document
            .pointer(pointer)
            .ok_or_else(|| missing_field(&self.path, pointer))?;

        node.as_str().ok_or_else(|| Error::NotAString {
            file: self.path.clone(),
            pointer: pointer.to_string(),
        })
    }

    /// Overwrite the node at `pointer`. The parent must already exist; a final object key
    /// that is absent is inserted, an array index must be in range.
    pub fn set(&mut self, pointer: &str, value: impl Into<Value>) -> Result<(), Error> {
        let file = &self.path;

        let (parent, token) = pointer
            .rsplit_once('/')
            .ok_or_else(|| missing_field(file, pointer))?;

        let parent_node = self
            .document
            .pointer_mut(parent)
            .ok_or_else(|| missing_field(file, pointer))?;

        match parent_node {
            Value::Object(fields) => {
                fields.insert(unescape(token), value.into());
            }
            Value::Array(items) => {
                let slot = token
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get_mut(index))
                    .ok_or_else(|| missing_field(file, pointer))?;
                *slot = value.into();
            }
            _ => return Err(missing_field(file, pointer)),
        }

        Ok(())
    }

    /// Concatenate `suffix` onto the string at `pointer` and return the result.
    /// No separator is inserted.
    pub fn append(&mut self, pointer: &str, suffix: &str) -> Result<String, Error> {
        let joined = format!("{}{}", self.get_str(pointer)?, suffix);

        self.set(pointer, joined.clone())?;

        Ok(joined)
    }

    /// Rebind every string field named `key` beneath the node at `pointer`.
    /// Returns how many fields were rewritten.
    pub fn replace_key_under(
        &mut self,
        pointer: &str,
        key: &str,
        value: &str,
    ) -> Result<usize, Error> {
        let file = &self.path;

        let root = self
            .document
            .pointer_mut(pointer)
            .ok_or_else(|| missing_field(file, pointer))?;

        Ok(replace_key(root, key, value))
    }
}

fn replace_key(node: &mut Value, key: &str, value: &str) -> usize {
    match node {
        Value::Object(fields) => fields
            .iter_mut()
            .map(|(name, child)| {
                if name == key && child.is_string() {
                    *child = Value::String(value.to_string());
                    1
                } else {
                    replace_key(child, key, value)
                }
            })
            .sum(),
        Value::Array(items) => items
            .iter_mut()
            .map(|child| replace_key(child, key, value))
            .sum(),
        _ => 0,
    }
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn missing_field(file: &Path, pointer: &str) -> Error {
    Error::MissingField {
        file: file.to_path_buf(),
        pointer: pointer.to_string(),
    }
}
