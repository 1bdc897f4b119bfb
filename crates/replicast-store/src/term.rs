use serde::{Deserialize, Serialize};

/// A taxonomy term as stored by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Parent term within the same taxonomy, for hierarchical taxonomies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

impl Term {
    /// `true` if the term sits at the root of its taxonomy.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Input for a find-or-create term operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTerm {
    pub taxonomy: String,
    pub name: String,
    /// Generated from `name` when absent.
    pub slug: Option<String>,
    pub description: String,
    pub parent: Option<u64>,
}

impl NewTerm {
    pub fn new(taxonomy: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            name: name.into(),
            slug: None,
            description: String::new(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Turn a title into a URL-safe slug: lowercase alphanumerics joined by
/// single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Draft: a title!  "), "draft-a-title");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("a --- b"), "a-b");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn term_is_root() {
        let mut term = Term {
            id: 1,
            taxonomy: "category".into(),
            name: "News".into(),
            slug: "news".into(),
            description: String::new(),
            parent: None,
        };
        assert!(term.is_root());
        term.parent = Some(9);
        assert!(!term.is_root());
    }

    #[test]
    fn new_term_builder() {
        let t = NewTerm::new("category", "News")
            .with_parent(3)
            .with_description("desc");
        assert_eq!(t.parent, Some(3));
        assert_eq!(t.description, "desc");
        assert!(t.slug.is_none());
    }
}
