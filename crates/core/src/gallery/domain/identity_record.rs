use serde::Deserialize;

/// One active identity as read from the data source.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct IdentityRecord {
    pub id: String,
    pub display_name: String,
    /// JSON-serialized embedding, e.g. `"[0.01, -0.2, ...]"`.
    #[serde(default)]
    pub encoded_embedding: Option<String>,
    /// Photo path, absolute or relative to the image base directory.
    #[serde(default)]
    pub image_reference: Option<String>,
}

impl IdentityRecord {
    /// Builds a record from raw column values, treating empty or
    /// whitespace-only text as absent.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        encoded_embedding: Option<String>,
        image_reference: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            encoded_embedding: non_blank(encoded_embedding),
            image_reference: non_blank(image_reference),
        }
    }

    pub(crate) fn normalized(self) -> Self {
        Self::new(
            self.id,
            self.display_name,
            self.encoded_embedding,
            self.image_reference,
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
