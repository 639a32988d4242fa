use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, ProjectError};
use crate::ids::generate_search_set_id;
use crate::image::ServerImage;
use crate::storage::ProjectStorage;

const BUILT_IN_NAME: &str = "default";

/// Images the learnt CAV is evaluated against.
///
/// Serialized as the string `"default"` for the built-in set, or as the full
/// custom set object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SearchSetRepr", into = "SearchSetRepr")]
pub enum SearchSet {
    #[default]
    BuiltIn,
    Custom(CustomSearchSet),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SearchSetRepr {
    Named(String),
    Custom(CustomSearchSet),
}

impl TryFrom<SearchSetRepr> for SearchSet {
    type Error = DecodeError;

    fn try_from(repr: SearchSetRepr) -> Result<Self, Self::Error> {
        match repr {
            SearchSetRepr::Named(name) if name == BUILT_IN_NAME => Ok(SearchSet::BuiltIn),
            SearchSetRepr::Named(name) => Err(DecodeError::UnknownSearchSet(name)),
            SearchSetRepr::Custom(set) => {
                set.validate()?;
                Ok(SearchSet::Custom(set))
            }
        }
    }
}

impl From<SearchSet> for SearchSetRepr {
    fn from(set: SearchSet) -> Self {
        match set {
            SearchSet::BuiltIn => SearchSetRepr::Named(BUILT_IN_NAME.to_string()),
            SearchSet::Custom(set) => SearchSetRepr::Custom(set.with_image_count()),
        }
    }
}

impl SearchSet {
    pub fn name(&self) -> &str {
        match self {
            SearchSet::BuiltIn => "Sample set",
            SearchSet::Custom(set) => &set.name,
        }
    }

    pub fn creator_name(&self) -> &str {
        match self {
            SearchSet::BuiltIn => "Nord Projects",
            SearchSet::Custom(set) => &set.creator_name,
        }
    }

    /// Images to send with a learning request; `None` means the server's own set.
    pub fn images(&self) -> Option<&[ServerImage]> {
        match self {
            SearchSet::BuiltIn => None,
            SearchSet::Custom(set) => Some(&set.images),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, SearchSet::Custom(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSearchSet {
    pub search_set_id: String,
    pub name: String,
    pub images: Vec<ServerImage>,
    #[serde(default)]
    pub image_count: usize,
    #[serde(default)]
    pub creator_name: String,
    /// Unset until the first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Default for CustomSearchSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomSearchSet {
    pub fn new() -> Self {
        CustomSearchSet {
            search_set_id: generate_search_set_id(),
            name: "untitled-search-set".to_string(),
            images: Vec::new(),
            image_count: 0,
            creator_name: "you".to_string(),
            owner: None,
            parent_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.search_set_id.is_empty() {
            return Err(DecodeError::MissingField("searchSetId"));
        }
        if self.images.iter().any(|i| i.id.is_empty()) {
            return Err(DecodeError::MissingField("id"));
        }
        Ok(())
    }

    fn with_image_count(mut self) -> Self {
        self.image_count = self.images.len();
        self
    }

    /// Independent copy with a fresh id, parented to this set.
    pub fn create_copy(&self) -> Self {
        CustomSearchSet {
            search_set_id: generate_search_set_id(),
            parent_id: Some(self.search_set_id.clone()),
            owner: None,
            ..self.clone()
        }
    }

    pub async fn save(&self, storage: &dyn ProjectStorage) -> Result<(), ProjectError> {
        if self.images.is_empty() {
            return Err(ProjectError::EmptySearchSet);
        }
        storage
            .set_search_set(&self.search_set_id, &self.clone().with_image_count())
            .await?;
        Ok(())
    }

    /// Rename and persist; a no-op when the name is unchanged.
    pub async fn rename(
        &mut self,
        name: impl Into<String>,
        storage: &dyn ProjectStorage,
    ) -> Result<(), ProjectError> {
        let name = name.into();
        if name == self.name {
            return Ok(());
        }
        self.name = name;
        self.save(storage).await
    }
}
