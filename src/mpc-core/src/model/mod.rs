//! Records of remote marketplace state.
//!
//! Everything here is populated by deserialization or by the REST mapping
//! layer and treated as immutable afterwards. Several in-memory graphs may
//! describe the same logical entity; compare them with the `equals_*`
//! helpers rather than by value.

mod catalog;
mod category;
mod favorites;
mod identifiable;
mod iu;
mod node;

pub use catalog::{Catalog, CatalogBranding, News};
pub use category::{Category, Market};
pub use favorites::FavoriteList;
pub use identifiable::{equals_id, equals_name, equals_url, Identifiable};
pub use iu::{IdentityError, Iu, Ius};
pub use node::{Node, NodeId, Platforms, SearchResult, Tag, Tags};
