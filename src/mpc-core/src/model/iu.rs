use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when two installable-unit views with different ids are merged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot join installable units with different ids: {left} and {right}")]
pub struct IdentityError {
    pub left: String,
    pub right: String,
}

/// An installable unit attached to a listing.
///
/// Required units (`optional == false`) are always selected, regardless of the
/// stored `selected` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iu {
    pub id: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub selected: bool,
}

impl Iu {
    /// A required unit.
    pub fn required(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            optional: false,
            selected: true,
        }
    }

    /// An optional unit with an explicit default selection.
    pub fn optional(id: impl Into<String>, selected: bool) -> Self {
        Self {
            id: id.into(),
            optional: true,
            selected,
        }
    }

    pub fn is_selected(&self) -> bool {
        !self.optional || self.selected
    }

    /// Merges two views of the same unit. Any "required" or "selected"
    /// signal on either side wins over the default.
    pub fn join(&self, other: &Iu) -> Result<Iu, IdentityError> {
        if self.id != other.id {
            return Err(IdentityError {
                left: self.id.clone(),
                right: other.id.clone(),
            });
        }
        let optional = self.optional && other.optional;
        Ok(Iu {
            id: self.id.clone(),
            optional,
            selected: self.is_selected() || other.is_selected(),
        })
    }
}

/// Ordered installable units of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ius {
    pub items: Vec<Iu>,
}

impl Ius {
    pub fn new(items: Vec<Iu>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Iu> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Iu> {
        self.items.iter().find(|iu| iu.id == id)
    }

    /// Ids of every unit that would be installed by default.
    pub fn selected_ids(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|iu| iu.is_selected())
            .map(|iu| iu.id.as_str())
            .collect()
    }

    /// Merges `other` into this list: units present on both sides are joined,
    /// units only in `other` are appended in their original order.
    pub fn join(&self, other: &Ius) -> Ius {
        let mut merged = self.items.clone();
        for iu in &other.items {
            match merged.iter_mut().find(|existing| existing.id == iu.id) {
                // ids match, join cannot fail
                Some(existing) => {
                    if let Ok(joined) = existing.join(iu) {
                        *existing = joined;
                    }
                }
                None => merged.push(iu.clone()),
            }
        }
        Ius { items: merged }
    }
}

impl FromIterator<Iu> for Ius {
    fn from_iter<T: IntoIterator<Item = Iu>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_units_are_always_selected() {
        let iu = Iu {
            id: "org.example.feature".into(),
            optional: false,
            selected: false,
        };
        assert!(iu.is_selected());
    }

    #[test]
    fn optional_units_follow_flag() {
        assert!(!Iu::optional("a", false).is_selected());
        assert!(Iu::optional("a", true).is_selected());
    }

    #[test]
    fn join_rejects_mismatched_ids() {
        let err = Iu::required("a")
            .join(&Iu::required("b"))
            .expect_err("ids differ");
        assert_eq!(err.left, "a");
        assert_eq!(err.right, "b");
    }

    #[test]
    fn join_prefers_required_and_selected() {
        let left = Iu::optional("a", false);
        let right = Iu::required("a");
        let joined = left.join(&right).expect("same id");
        assert!(!joined.optional);
        assert!(joined.is_selected());

        let joined = Iu::optional("a", false)
            .join(&Iu::optional("a", true))
            .expect("same id");
        assert!(joined.optional);
        assert!(joined.selected);

        let joined = Iu::optional("a", false)
            .join(&Iu::optional("a", false))
            .expect("same id");
        assert!(!joined.is_selected());
    }

    #[test]
    fn ius_join_merges_by_id() {
        let left = Ius::new(vec![Iu::optional("a", false), Iu::required("b")]);
        let right = Ius::new(vec![Iu::optional("a", true), Iu::optional("c", false)]);
        let merged = left.join(&right);
        assert_eq!(merged.len(), 3);
        assert!(merged.get("a").expect("a").selected);
        assert_eq!(merged.selected_ids(), vec!["a", "b"]);
    }
}
