use serde_json::Value;

/// A typed reference field inside an entity's attribute set.
///
/// The set of field shapes is closed: each variant names the entity kind it
/// references and whether it is scalar or list shaped. All variants share
/// the same base lookup; they differ only in shape and in which descriptor
/// field is surfaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// A single binary asset reference (e.g. an image field).
    Image(u64),
    /// An ordered list of asset references.
    Gallery(Vec<u64>),
    /// An ordered list of content-entity references.
    Relationship(Vec<u64>),
    /// A list of term references. Resolution surfaces the
    /// taxonomy-relationship id, not the term id.
    Taxonomy(Vec<u64>),
}

impl FieldValue {
    /// The name of the field shape, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Gallery(_) => "gallery",
            Self::Relationship(_) => "relationship",
            Self::Taxonomy(_) => "taxonomy",
        }
    }

    /// Recognize a typed reference field inside entity metadata.
    ///
    /// Typed fields are persisted as `{"type": <shape>, "value": <ids>}`.
    /// Anything else — including an unknown shape name — is plain metadata
    /// and passes through untouched.
    pub fn from_meta(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let shape = obj.get("type")?.as_str()?;
        let value = obj.get("value")?;
        match shape {
            "image" => value.as_u64().map(Self::Image),
            "gallery" => id_list(value).map(Self::Gallery),
            "relationship" => id_list(value).map(Self::Relationship),
            "taxonomy" => id_list(value).map(Self::Taxonomy),
            _ => None,
        }
    }
}

fn id_list(value: &Value) -> Option<Vec<u64>> {
    value.as_array()?.iter().map(Value::as_u64).collect()
}

/// The destination-specific rendering of a [`FieldValue`].
///
/// Scalar fields keep an explicit unset marker; list fields drop
/// unresolvable elements so no dangling local id ever leaves the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedField {
    Scalar(Option<u64>),
    List(Vec<u64>),
}

impl ResolvedField {
    /// The wire value: scalar unset becomes JSON `null`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(Some(id)) => Value::from(*id),
            Self::Scalar(None) => Value::Null,
            Self::List(ids) => Value::from(ids.clone()),
        }
    }
}
