//! List-of-figures collection over a document tree.
//!
//! The collector is mounted once, runs a single deferred pass after the host's
//! first rendering cycle, and from then on renders its items through a
//! caller-supplied template. The pass writes generated identifiers back onto
//! captions that lack one; that mutation is part of the contract, which is why
//! [`ItemCollector::collect`] takes the tree by `&mut`.

mod collector;
mod ids;
mod render;
mod tree;

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

pub use collector::DeferredPass;
pub use collector::ItemCollector;
pub use ids::IdGenerator;
pub use ids::SequentialIds;
pub use ids::UuidV4Ids;
pub use render::Rendered;
pub use render::anchor_list;
pub use tree::CaptionTree;

/// Attribute that overrides a caption's text as its display title.
pub const DEFAULT_TITLE_ATTRIBUTE: &str = "data-lof-title";
pub const DEFAULT_MARKER_TAG: &str = "figcaption";

/// One entry of the list of figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionItem {
    pub id: String,
    /// Always `#` followed by `id`.
    pub href: String,
    pub title: String,
    /// Every attribute of the caption element, including an id written by the pass.
    pub attrs: BTreeMap<String, String>,
}

/// Gate in front of rendering. Moves to `Ready` once, never back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Readiness {
    #[default]
    Unready,
    Ready,
}

/// Collector knobs. The defaults index `<figcaption>` elements across the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub marker_tag: String,
    pub title_attribute: String,
    pub id_attribute: String,
    /// Tag of the node wrapping the template output.
    pub wrapper_tag: String,
    /// Restrict the scan to the subtree of the element with this id.
    pub scope_id: Option<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            marker_tag: DEFAULT_MARKER_TAG.to_owned(),
            title_attribute: DEFAULT_TITLE_ATTRIBUTE.to_owned(),
            id_attribute: "id".to_owned(),
            wrapper_tag: "div".to_owned(),
            scope_id: None,
        }
    }
}
