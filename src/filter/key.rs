use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Fields and relation bases a caller is allowed to filter on.
///
/// Empty by default: until an entity lists something, every key is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AllowList {
    #[serde(default, rename = "filterable")]
    pub fields: BTreeSet<String>,
    #[serde(default, rename = "filterable_relations")]
    pub relations: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKey<'a> {
    Direct { field: &'a str },
    Relation { path: &'a str, field: &'a str },
}

impl AllowList {
    pub fn new<F, R>(fields: F, relations: R) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            relations: relations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allow_field(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into());
    }

    pub fn allow_relation(&mut self, relation: impl Into<String>) {
        self.relations.insert(relation.into());
    }

    /// Classifies a filter key, returning `None` when it is not allowed.
    ///
    /// Only the segment before the first dot is checked for relation keys;
    /// deeper segments are trusted to the storage layer.
    pub fn resolve<'a>(&self, key: &'a str) -> Option<ResolvedKey<'a>> {
        let Some((base, _)) = key.split_once('.') else {
            if self.fields.contains(key) {
                return Some(ResolvedKey::Direct { field: key });
            }
            debug!(key, "filter field not allowed");
            return None;
        };

        if !self.relations.contains(base) {
            debug!(key, relation = base, "filter relation not allowed");
            return None;
        }

        let (path, field) = key.rsplit_once('.')?;
        Some(ResolvedKey::Relation { path, field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow() -> AllowList {
        AllowList::new(["status", "age"], ["author", "a"])
    }

    #[test]
    fn test_direct_allowed() {
        assert_eq!(
            allow().resolve("status"),
            Some(ResolvedKey::Direct { field: "status" })
        );
    }

    #[test]
    fn test_direct_rejected() {
        assert_eq!(allow().resolve("secret"), None);
        assert_eq!(AllowList::default().resolve("status"), None);
    }

    #[test]
    fn test_relation_decomposition() {
        assert_eq!(
            allow().resolve("author.profile.country"),
            Some(ResolvedKey::Relation {
                path: "author.profile",
                field: "country"
            })
        );
        assert_eq!(
            allow().resolve("a.b.c"),
            Some(ResolvedKey::Relation { path: "a.b", field: "c" })
        );
    }

    #[test]
    fn test_relation_base_rejected() {
        assert_eq!(allow().resolve("editor.name"), None);
    }

    #[test]
    fn test_only_base_is_checked() {
        // "status" is a field, not a relation base
        assert_eq!(allow().resolve("status.code"), None);
        assert!(allow().resolve("author.anything.at.all").is_some());
    }

    #[test]
    fn test_deserialize_from_entity_yaml() {
        let list: AllowList =
            serde_yaml::from_str("filterable: [status]\nfilterable_relations: [author]").unwrap();
        assert_eq!(list, AllowList::new(["status"], ["author"]));

        let empty: AllowList = serde_yaml::from_str("{}").unwrap();
        assert_eq!(empty, AllowList::default());
    }
}
