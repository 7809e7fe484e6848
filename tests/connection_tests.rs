//! HTTP round-trip tests against a local mock server.

use octorest::{Connection, Credentials, ErrorKind};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connection_for(server: &MockServer, credentials: Credentials) -> Connection {
    Connection::builder()
        .base_url(server.uri())
        .user_agent("octorest-tests/0.1")
        .credentials(credentials)
        .build()
        .unwrap()
}

#[tokio::test]
async fn basic_credentials_produce_the_expected_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("Authorization", "Basic dGNsZW06cHdk"))
        .and(header("Accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": 1, "login": "tclem"}"#))
        .mount(&server)
        .await;

    let connection =
        connection_for(&server, Credentials::basic("tclem", "pwd").unwrap()).await;
    let user: octorest::types::User = connection.get("/user").await.unwrap();
    assert_eq!(user.login, "tclem");
}

#[tokio::test]
async fn api_metadata_is_parsed_from_response_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"id": 1, "login": "octocat"}"#)
                .insert_header("X-RateLimit-Limit", "5000")
                .insert_header("X-RateLimit-Remaining", "4997")
                .insert_header("X-Accepted-OAuth-Scopes", "user")
                .insert_header("X-OAuth-Scopes", "user, public_repo, repo, gist")
                .insert_header("ETag", "5634b0b187fd2e91e3126a75006cc4fa"),
        )
        .mount(&server)
        .await;

    let connection = connection_for(&server, Credentials::token("t").unwrap()).await;
    let response = connection
        .get_with_info::<octorest::types::User>("/user")
        .await
        .unwrap();

    assert_eq!(response.body.login, "octocat");
    let info = response.api_info;
    assert_eq!(info.rate_limit.limit, 5000);
    assert_eq!(info.rate_limit.remaining, 4997);
    assert_eq!(info.accepted_oauth_scopes, vec!["user"]);
    assert_eq!(info.oauth_scopes, vec!["user", "public_repo", "repo", "gist"]);
    assert_eq!(info.etag.as_deref(), Some("5634b0b187fd2e91e3126a75006cc4fa"));
}

#[tokio::test]
async fn unauthorized_maps_to_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"message": "Bad credentials"}"#),
        )
        .mount(&server)
        .await;

    let connection = connection_for(&server, Credentials::token("bad").unwrap()).await;
    let err = connection
        .get::<octorest::types::User>("/user")
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), ErrorKind::Authentication);
    assert_eq!(err.status_code(), Some(401));
    assert!(err.is_authentication());
    assert!(format!("{}", err).contains("Bad credentials"));
}

#[tokio::test]
async fn post_serializes_the_body_to_wire_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(header("Content-Type", "application/json"))
        .and(body_string(r#"{"name":"new-repo","private":false}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string(
            r#"{"id": 7, "name": "new-repo", "full_name": "octocat/new-repo", "private": false}"#,
        ))
        .mount(&server)
        .await;

    let connection = connection_for(&server, Credentials::token("t").unwrap()).await;
    let repo = connection
        .repositories()
        .create(&octorest::types::CreateRepositoryRequest {
            name: "new-repo".to_string(),
            description: None,
            private: false,
        })
        .await
        .unwrap();

    assert_eq!(repo.full_name, "octocat/new-repo");
}

#[tokio::test]
async fn malformed_response_is_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let connection = connection_for(&server, Credentials::token("t").unwrap()).await;
    let err = connection
        .get::<octorest::types::User>("/user")
        .await
        .unwrap_err();

    assert_eq!(*err.kind(), ErrorKind::Serialization);
}

#[tokio::test]
async fn concurrent_calls_share_one_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zen"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#""Keep it simple.""#))
        .mount(&server)
        .await;

    let connection = connection_for(&server, Credentials::Anonymous).await;
    let (a, b, c) = tokio::join!(
        connection.get::<String>("/zen"),
        connection.get::<String>("/zen"),
        connection.get::<String>("/zen"),
    );

    assert_eq!(a.unwrap(), "Keep it simple.");
    assert_eq!(b.unwrap(), "Keep it simple.");
    assert_eq!(c.unwrap(), "Keep it simple.");
    assert_eq!(connection.metrics().total_requests(), 3);
}
