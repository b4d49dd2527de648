use crate::data::join_path;
use serde::{ser::SerializeMap, Serialize, Serializer};

/// Prefix tree of every path segment seen so far. Children keep their
/// first-registration order and nodes are only ever removed by `clear`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathCache {
    root: PathNode,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct PathNode {
    children: Vec<(String, PathNode)>,
}

impl PathNode {
    fn child(&self, segment: &str) -> Option<&PathNode> {
        self.children
            .iter()
            .find(|(name, _)| name == segment)
            .map(|(_, node)| node)
    }

    fn child_or_insert(&mut self, segment: &str) -> &mut PathNode {
        let index = match self.children.iter().position(|(name, _)| name == segment) {
            Some(index) => index,
            None => {
                self.children.push((segment.into(), PathNode::default()));
                self.children.len() - 1
            }
        };

        &mut self.children[index].1
    }

    fn collect_descendants(&self, prefix: &str, paths: &mut Vec<String>) {
        for (name, node) in &self.children {
            let path = join_path(prefix, name);
            paths.push(path.clone());
            node.collect_descendants(&path, paths);
        }
    }
}

impl Serialize for PathNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for (name, node) in &self.children {
            map.serialize_entry(name, node)?;
        }
        map.end()
    }
}

/// A subpath query, split into its prefix and optional trailing wildcard token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardQuery {
    /// `prefix/*`
    Children(String),
    /// `prefix/**`
    Descendants(String),
    /// No wildcard: the immediate children of the whole path.
    Exact(String),
}

impl WildcardQuery {
    pub fn parse(query: &str) -> Self {
        let (prefix, last) = match query.rfind('/') {
            Some(index) => (&query[..index], &query[index + 1..]),
            None => ("", query),
        };

        match last {
            "*" => WildcardQuery::Children(prefix.into()),
            "**" => WildcardQuery::Descendants(prefix.into()),
            _ => WildcardQuery::Exact(query.into()),
        }
    }

    /// The path the query is resolved against.
    pub fn prefix(&self) -> &str {
        match self {
            WildcardQuery::Children(prefix)
            | WildcardQuery::Descendants(prefix)
            | WildcardQuery::Exact(prefix) => prefix,
        }
    }
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsRef<str>>(&mut self, path: S) {
        let mut node = &mut self.root;
        for segment in segments(path.as_ref()) {
            node = node.child_or_insert(segment);
        }
    }

    pub fn list_immediate_children<S: AsRef<str>>(&self, path: S) -> Vec<String> {
        self.find(path.as_ref())
            .map(|node| node.children.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Every path below `path`, relative to it, depth-first.
    pub fn list_all_descendants<S: AsRef<str>>(&self, path: S) -> Vec<String> {
        let mut paths = Vec::new();
        if let Some(node) = self.find(path.as_ref()) {
            node.collect_descendants("", &mut paths);
        }
        paths
    }

    /// Resolves `prefix/*`, `prefix/**` or a plain path.
    ///
    /// `*` yields bare child names; `**` and plain paths yield paths prefixed
    /// with the queried prefix.
    pub fn resolve_wildcard_query<S: AsRef<str>>(&self, query: S) -> Vec<String> {
        match WildcardQuery::parse(query.as_ref()) {
            WildcardQuery::Children(prefix) => self.list_immediate_children(prefix),
            WildcardQuery::Descendants(prefix) => self
                .list_all_descendants(&prefix)
                .iter()
                .map(|subpath| join_path(prefix.trim_matches('/'), subpath))
                .collect(),
            WildcardQuery::Exact(path) => self
                .list_immediate_children(&path)
                .iter()
                .map(|child| join_path(path.trim_matches('/'), child))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    pub fn clear(&mut self) {
        self.root = PathNode::default();
    }

    fn find(&self, path: &str) -> Option<&PathNode> {
        let mut node = &self.root;
        for segment in segments(path) {
            node = node.child(segment)?;
        }
        Some(node)
    }
}

impl Serialize for PathCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> PathCache {
        let mut cache = PathCache::new();
        cache.register("a/b");
        cache.register("a/c");
        cache.register("a/b/d");
        cache
    }

    #[test]
    fn register_is_idempotent() {
        let mut once = PathCache::new();
        once.register("a/b/c");

        let mut twice = PathCache::new();
        twice.register("a/b/c");
        twice.register("a/b/c");

        assert_eq!(once, twice);
        assert_eq!(twice.list_immediate_children("a"), vec!["b"]);
    }

    #[test]
    fn register_ignores_empty_segments() {
        let mut cache = PathCache::new();
        cache.register("/a//b/");
        cache.register("a/b");

        assert_eq!(cache.list_immediate_children(""), vec!["a"]);
        assert_eq!(cache.list_immediate_children("a"), vec!["b"]);
    }

    #[test]
    fn unknown_path_has_no_children() {
        let cache = populated();

        assert!(cache.list_immediate_children("x/y").is_empty());
        assert!(cache.list_all_descendants("x").is_empty());
        assert!(cache.resolve_wildcard_query("x/**").is_empty());
    }

    #[test]
    fn lookups_do_not_create_nodes() {
        let cache = populated();
        let before = cache.clone();

        cache.list_immediate_children("x/y");
        cache.resolve_wildcard_query("z/*");

        assert_eq!(cache, before);
    }

    #[test]
    fn descendants_are_depth_first_in_insertion_order() {
        let cache = populated();

        assert_eq!(cache.list_all_descendants("a"), vec!["b", "b/d", "c"]);
        assert_eq!(cache.list_all_descendants(""), vec!["a", "a/b", "a/b/d", "a/c"]);
    }

    #[test]
    fn single_star_lists_child_names() {
        let cache = populated();

        assert_eq!(cache.resolve_wildcard_query("a/*"), vec!["b", "c"]);
        assert_eq!(cache.resolve_wildcard_query("*"), vec!["a"]);
    }

    #[test]
    fn double_star_lists_prefixed_subtree() {
        let cache = populated();

        assert_eq!(
            cache.resolve_wildcard_query("a/**"),
            vec!["a/b", "a/b/d", "a/c"]
        );
        assert_eq!(
            cache.resolve_wildcard_query("**"),
            vec!["a", "a/b", "a/b/d", "a/c"]
        );
    }

    #[test]
    fn plain_path_lists_prefixed_children() {
        let cache = populated();

        assert_eq!(cache.resolve_wildcard_query("a"), vec!["a/b", "a/c"]);
        assert_eq!(cache.resolve_wildcard_query(""), vec!["a"]);
        assert_eq!(cache.resolve_wildcard_query("a/b"), vec!["a/b/d"]);
    }

    #[test]
    fn wildcard_query_parse() {
        assert_eq!(
            WildcardQuery::parse("a/b/*"),
            WildcardQuery::Children("a/b".into())
        );
        assert_eq!(WildcardQuery::parse("**"), WildcardQuery::Descendants("".into()));
        assert_eq!(WildcardQuery::parse("a/b*"), WildcardQuery::Exact("a/b*".into()));
    }

    #[test]
    fn serializes_as_nested_objects() {
        let cache = populated();

        assert_eq!(
            serde_json::to_string(&cache).unwrap(),
            r#"{"a":{"b":{"d":{}},"c":{}}}"#
        );
    }

    #[test]
    fn clear_empties_the_tree() {
        let mut cache = populated();
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.list_immediate_children("a").is_empty());
    }
}
