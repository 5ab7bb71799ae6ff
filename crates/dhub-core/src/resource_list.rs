use std::fmt;

use dhub_api::{RawList, RawPagination, ResourceServer};

use crate::error::CoreError;
use crate::model::Resource;
use crate::resources::Resources;

/// Parsed resources in server order plus the pagination of the most
/// recent page.
#[derive(Debug, Clone, Default)]
pub struct ResourceList {
    items: Vec<Resource>,
    pub pagination: RawPagination,
    pub url: Option<String>,
}

impl ResourceList {
    pub fn new(items: Vec<Resource>, pagination: RawPagination, url: Option<String>) -> Self {
        Self {
            items,
            pagination,
            url,
        }
    }

    /// Parse every item by its `type`, registering devices and lots.
    pub fn from_server<S: ResourceServer>(raw: RawList, resources: &Resources<S>) -> Result<Self, CoreError> {
        let items = raw
            .items
            .iter()
            .map(|item| resources.from_object(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(items, raw.pagination, raw.url))
    }

    /// Append a page; its pagination and url replace ours.
    pub fn add(&mut self, page: ResourceList) {
        self.items.extend(page.items);
        self.pagination = page.pagination;
        self.url = page.url;
    }

    /// Replace everything with `page`.
    pub fn set(&mut self, page: ResourceList) {
        *self = page;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Resource] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a ResourceList {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Titles, comma separated.
impl fmt::Display for ResourceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let titles: Vec<String> = self.items.iter().map(Resource::title).collect();
        f.write_str(&titles.join(", "))
    }
}
