use serde::{Deserialize, Serialize};

use crate::elements::{EntityId, ObjectRef, PageId};
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormFieldKind {
    Text,
    Checkbox,
    Radio,
    Dropdown,
}

impl FormFieldKind {
    /// Value of the `/FT` key.
    pub fn field_type(self) -> &'static str {
        match self {
            Self::Text => "Tx",
            Self::Checkbox | Self::Radio => "Btn",
            Self::Dropdown => "Ch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: EntityId,
    pub page_id: PageId,
    pub kind: FormFieldKind,
    /// Serialized as the field's `/T` key.
    pub name: String,
    pub rect: Rect,
    pub default_value: Option<String>,
    pub options: Vec<String>,
    pub required: bool,
    pub z_index: u32,
    pub graph_ref: Option<ObjectRef>,
}
