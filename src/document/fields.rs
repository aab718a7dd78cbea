//! Tagged document fields.
//!
//! A field is a list of items sharing one class tag. The tag is stored next
//! to the items so a reader can tell which `FieldItem` type decodes them
//! without running anything stored in the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::error::{DocumentError, DocumentResult};

/// the items of one named field, tagged with their class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    pub class: String,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl FieldSet {
    pub fn new(class: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            class: class.into(),
            items,
        }
    }

    /// encode typed items
    pub fn from_items<T: FieldItem>(items: &[T]) -> Self {
        Self::new(T::CLASS, items.iter().map(FieldItem::to_item).collect())
    }

    /// decode every item as `T`, checking the class tag first
    pub fn decode<T: FieldItem>(&self) -> DocumentResult<Vec<T>> {
        if self.class != T::CLASS {
            return Err(DocumentError::FieldDecode {
                class: self.class.clone(),
                reason: format!("expected items of class '{}'", T::CLASS),
            });
        }

        self.items
            .iter()
            .map(|item| {
                T::from_item(item).map_err(|reason| DocumentError::FieldDecode {
                    class: self.class.clone(),
                    reason,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A value type that can be stored as a field item.
pub trait FieldItem: Sized {
    /// Class tag written next to the items.
    const CLASS: &'static str;

    fn to_item(&self) -> Value;

    fn from_item(item: &Value) -> Result<Self, String>;
}

/// plain text item: `{"value": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    pub value: String,
}

impl TextField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl FieldItem for TextField {
    const CLASS: &'static str = "gitdoc.field.text";

    fn to_item(&self) -> Value {
        serde_json::json!({ "value": self.value })
    }

    fn from_item(item: &Value) -> Result<Self, String> {
        serde_json::from_value(item.clone()).map_err(|e| e.to_string())
    }
}
