use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOpts {
    pub num_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl PaginationOpts {
    pub fn first(num_items: usize) -> Self {
        Self {
            num_items,
            cursor: None,
        }
    }

    pub fn after(num_items: usize, cursor: impl Into<String>) -> Self {
        Self {
            num_items,
            cursor: Some(cursor.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: Vec<T>,
    pub is_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn done(page: Vec<T>) -> Self {
        Self {
            page,
            is_done: true,
            continue_cursor: None,
        }
    }

    pub fn empty() -> Self {
        Self::done(Vec::new())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page.into_iter().map(f).collect(),
            is_done: self.is_done,
            continue_cursor: self.continue_cursor,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}
