//! Render a [`PathTree`] to JSON and overwrite files with the result.

use crate::tree::{LOGS_KEY, NodeId, PathTree};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::{fs, io, path::Path};

struct NodeView<'a> {
    tree: &'a PathTree,
    id: NodeId,
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.tree.has_records(self.id) {
            map.serialize_entry(LOGS_KEY, self.tree.records(self.id))?;
        }
        for (name, child) in self.tree.children(self.id) {
            map.serialize_entry(
                name,
                &NodeView {
                    tree: self.tree,
                    id: child,
                },
            )?;
        }
        map.end()
    }
}

/// Render the whole tree as pretty-printed JSON. An empty tree renders as `{}`.
pub fn render(tree: &PathTree) -> String {
    let view = NodeView {
        tree,
        id: tree.root(),
    };
    // Keys are strings and records hold only strings and numbers, so encoding cannot fail.
    serde_json::to_string_pretty(&view).unwrap_or_else(|_| "{}".to_string())
}

/// Replace the contents of `path` with `contents`.
pub fn write_file(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::record::{Record, SystemClock};
    use serde_json::Value;

    fn append(tree: &mut PathTree, path: &[&str], message: &str) {
        let node = tree.resolve_path(path).unwrap();
        tree.append_record(
            node,
            Record::new(&SystemClock, Level::Info, None, message, 256),
        );
    }

    #[test]
    fn empty_tree_renders_empty_object() {
        let rendered = render(&PathTree::new());
        assert_eq!(rendered, "{}");
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert!(parsed.as_object().unwrap().is_empty());
    }

    #[test]
    fn nesting_matches_paths() {
        let mut tree = PathTree::new();
        append(&mut tree, &["foo", "bar", "baz"], "qux");
        append(&mut tree, &["foo"], "top");

        let parsed: Value = serde_json::from_str(&render(&tree)).unwrap();
        assert_eq!(parsed["foo"]["bar"]["baz"]["logs"][0]["Log"], "qux");
        assert_eq!(parsed["foo"]["logs"][0]["Log"], "top");
        assert_eq!(parsed["foo"]["logs"][0]["LogLevel"], "INFO");
    }

    #[test]
    fn logs_key_precedes_children() {
        let mut tree = PathTree::new();
        append(&mut tree, &["a", "child"], "deep");
        append(&mut tree, &["a"], "shallow");

        let rendered = render(&tree);
        let logs_at = rendered.find("\"logs\"").unwrap();
        let child_at = rendered.find("\"child\"").unwrap();
        assert!(logs_at < child_at);
    }

    #[test]
    fn write_file_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        write_file(&path, "{\"old\": 1, \"padding\": \"xxxxxxxxxxxxxxxx\"}").unwrap();
        write_file(&path, "{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }
}
