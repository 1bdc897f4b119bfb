/// Header names of the key-auth contract.
pub mod headers {
    pub const API_KEY: &str = "X-API-KEY";
    pub const TIMESTAMP: &str = "X-API-TIMESTAMP";
    pub const SIGNATURE: &str = "X-API-SIGNATURE";
    /// Marks a request as engine traffic so a receiving instance can tell
    /// replication apart from ordinary API clients.
    pub const MARKER: &str = "X-Replicast";

    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CONTENT_DISPOSITION: &str = "Content-Disposition";
    pub const CONTENT_MD5: &str = "Content-MD5";
}

/// Resource bases under a destination's API root.
pub mod resources {
    pub const POSTS: &str = "posts";
    pub const PAGES: &str = "pages";
    pub const MEDIA: &str = "media";
    pub const CATEGORIES: &str = "categories";
    pub const TAGS: &str = "tags";
}

/// Resource base for a taxonomy name.
pub fn taxonomy_resource(taxonomy: &str) -> &str {
    match taxonomy {
        "category" => resources::CATEGORIES,
        "post_tag" => resources::TAGS,
        other => other,
    }
}
