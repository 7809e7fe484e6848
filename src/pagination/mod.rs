//! Auto-pagination over `Link` header relations.

use crate::api_info::ApiInfo;
use crate::connection::Connection;
use crate::errors::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// One fetched slice of a paginated collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Metadata of the response that produced this page, including the
    /// `next` link used to advance.
    pub api_info: ApiInfo,
}

impl<T> Page<T> {
    /// Creates a new page.
    pub fn new(items: Vec<T>, api_info: ApiInfo) -> Self {
        Self { items, api_info }
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.api_info.links.has_next()
    }

    /// Returns the URL for the next page.
    pub fn next_url(&self) -> Option<&str> {
        self.api_info.links.next.as_deref()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the page and returns the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Fetches the next page over the given connection.
    ///
    /// Returns `None` when this page carries no `next` link, ending
    /// iteration.
    pub async fn next_page(&self, connection: &Connection) -> Result<Option<Page<T>>> {
        match self.next_url() {
            Some(url) => connection.fetch_page(url).await.map(Some),
            None => Ok(None),
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Pagination parameters for list requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PaginationParams {
    /// Page number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Items per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// Creates new pagination parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets items per page. The API caps this at 100.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page.min(100));
        self
    }

    /// Converts to query parameters.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            params.push(("per_page".to_string(), per_page.to_string()));
        }
        params
    }
}

/// Appends query parameters to an endpoint string.
pub(crate) fn endpoint_with_query(endpoint: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return endpoint.to_string();
    }

    let mut out = String::from(endpoint);
    for (i, (key, value)) in query.iter().enumerate() {
        out.push(if i == 0 && !endpoint.contains('?') { '?' } else { '&' });
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Lazy cursor over a paginated collection.
///
/// Fetches pages strictly one at a time, never re-fetching the first page
/// and never prefetching, so rate limits and page ordering are respected.
pub struct PageCursor<'a, T> {
    connection: &'a Connection,
    /// Pending first request; taken on the first fetch.
    first: Option<(String, PaginationParams)>,
    /// `next` link of the most recent page.
    next: Option<String>,
    _marker: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> PageCursor<'a, T> {
    pub(crate) fn new(
        connection: &'a Connection,
        endpoint: impl Into<String>,
        params: PaginationParams,
    ) -> Self {
        Self {
            connection,
            first: Some((endpoint.into(), params)),
            next: None,
            _marker: PhantomData,
        }
    }

    /// Fetches the next page, or `None` once the collection is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>> {
        let page = if let Some((endpoint, params)) = self.first.take() {
            self.connection.get_page(&endpoint, &params).await?
        } else if let Some(url) = self.next.take() {
            self.connection.fetch_page(&url).await?
        } else {
            return Ok(None);
        };

        self.next = page.next_url().map(String::from);
        Ok(Some(page))
    }

    /// Follows `next` links until exhausted, concatenating all items in
    /// page-then-intra-page order.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut all_items = Vec::new();

        while let Some(page) = self.next_page().await? {
            all_items.extend(page.into_items());
        }

        Ok(all_items)
    }
}
