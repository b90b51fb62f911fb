//! Paged list envelope used by the list endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
}

impl<T> PagedResponse<T> {
    pub fn into_content(self) -> Vec<T> {
        self.content
    }
}
