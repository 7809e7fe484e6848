//! Pagination engine tests over a scripted transport.

use octorest::mocks::{MockResponse, MockTransport};
use octorest::{Connection, PaginationParams};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn link(next_page: Option<u32>, last_page: u32) -> String {
    let mut parts = Vec::new();
    if let Some(page) = next_page {
        parts.push(format!(
            "<https://api.github.com/items?page={}&per_page=2>; rel=\"next\"",
            page
        ));
    }
    parts.push(format!(
        "<https://api.github.com/items?page={}&per_page=2>; rel=\"last\"",
        last_page
    ));
    parts.join(", ")
}

fn connection_over(transport: Arc<MockTransport>) -> Connection {
    Connection::builder()
        .transport(transport)
        .build()
        .unwrap()
}

fn three_pages(transport: &MockTransport) {
    transport.enqueue(
        MockResponse::new(200, "[1, 2]").with_header("Link", link(Some(2), 3)),
    );
    transport.enqueue(
        MockResponse::new(200, "[3, 4]").with_header("Link", link(Some(3), 3)),
    );
    transport.enqueue(MockResponse::new(200, "[5, 6]"));
}

#[tokio::test]
async fn all_pages_are_materialized_in_order() {
    let transport = Arc::new(MockTransport::new());
    three_pages(&transport);

    let connection = connection_over(transport.clone());
    let items: Vec<u32> = connection
        .get_all_pages("/items", PaginationParams::new().per_page(2))
        .await
        .unwrap();

    assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(transport.request_count(), 3);

    // Strictly sequential: the first page is fetched once and each
    // subsequent fetch targets the previous page's next link.
    let urls: Vec<String> = transport.requests().iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.github.com/items?per_page=2",
            "https://api.github.com/items?page=2&per_page=2",
            "https://api.github.com/items?page=3&per_page=2",
        ]
    );
}

#[tokio::test]
async fn cursor_fetches_lazily() {
    let transport = Arc::new(MockTransport::new());
    three_pages(&transport);

    let connection = connection_over(transport.clone());
    let mut cursor = connection.pages::<u32>("/items", PaginationParams::new().per_page(2));

    // Nothing is fetched until the cursor is advanced.
    assert_eq!(transport.request_count(), 0);

    let first = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(first.items, vec![1, 2]);
    assert!(first.has_next());
    assert_eq!(first.api_info.last_page(), 3);
    assert_eq!(transport.request_count(), 1);

    let second = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(second.items, vec![3, 4]);

    let third = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(third.items, vec![5, 6]);
    assert!(!third.has_next());

    assert!(cursor.next_page().await.unwrap().is_none());
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn page_advances_over_a_connection() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        MockResponse::new(200, "[10]").with_header("Link", link(Some(2), 2)),
    );
    transport.enqueue(MockResponse::new(200, "[20]"));

    let connection = connection_over(transport);
    let first = connection
        .get_page::<u32>("/items", &PaginationParams::new())
        .await
        .unwrap();

    let second = first.next_page(&connection).await.unwrap().unwrap();
    assert_eq!(second.items, vec![20]);
    assert!(second.next_page(&connection).await.unwrap().is_none());
}

#[tokio::test]
async fn single_page_collection_makes_one_request() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(MockResponse::new(200, "[7]"));

    let connection = connection_over(transport.clone());
    let items: Vec<u32> = connection
        .get_all_pages("/items", PaginationParams::new())
        .await
        .unwrap();

    assert_eq!(items, vec![7]);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn mid_iteration_error_propagates() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        MockResponse::new(200, "[1]").with_header("Link", link(Some(2), 2)),
    );
    transport.enqueue(MockResponse::not_found("gone"));

    let connection = connection_over(transport);
    let result = connection
        .get_all_pages::<u32>("/items", PaginationParams::new())
        .await;

    assert_eq!(result.unwrap_err().status_code(), Some(404));
}
