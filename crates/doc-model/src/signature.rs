use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::elements::{EntityId, ObjectRef, PageId};
use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureMethod {
    Drawn,
    Typed,
    Uploaded,
}

/// A visual signature stamp. `verified` reflects an external check and is
/// never set by placing the stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub id: EntityId,
    pub page_id: PageId,
    pub rect: Rect,
    pub image: Arc<[u8]>,
    pub method: SignatureMethod,
    pub author: Option<String>,
    pub signed_at: u64,
    pub verified: bool,
    pub z_index: u32,
    pub graph_ref: Option<ObjectRef>,
}
