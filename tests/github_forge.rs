//! Integration tests for `GitHubForge` using wiremock.
//!
//! These tests mock the GitHub git database endpoints to verify request
//! shapes and error mapping without hitting the real API.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schemaship::core::types::{BranchName, Oid};
use schemaship::engine::{AtomicPublisher, PublishFile, PublishStep, PublishUnit};
use schemaship::forge::github::GitHubForge;
use schemaship::forge::{FileMode, Forge, ForgeError, TreeEntry};

const COMMIT: &str = "1111111111111111111111111111111111111111";
const TREE: &str = "2222222222222222222222222222222222222222";
const NEW_TREE: &str = "3333333333333333333333333333333333333333";
const NEW_COMMIT: &str = "4444444444444444444444444444444444444444";

fn forge(server: &MockServer) -> GitHubForge {
    GitHubForge::with_api_base("test-token", "octocat/plugin".parse().unwrap(), server.uri())
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

fn oid(s: &str) -> Oid {
    Oid::new(s).unwrap()
}

async fn mount_get_ref(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/octocat/plugin/git/ref/heads/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ref": "refs/heads/main",
            "object": { "type": "commit", "sha": COMMIT }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/octocat/plugin/git/commits/{}", COMMIT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": COMMIT,
            "tree": { "sha": TREE },
            "parents": []
        })))
        .mount(server)
        .await;
}

mod requests {
    use super::*;

    #[tokio::test]
    async fn get_ref_resolves_commit_and_tree() {
        let server = MockServer::start().await;
        mount_get_ref(&server).await;

        let head = forge(&server).get_ref(&main_branch()).await.unwrap();

        assert_eq!(head.commit, oid(COMMIT));
        assert_eq!(head.tree, oid(TREE));
    }

    #[tokio::test]
    async fn requests_carry_auth_and_api_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/plugin/git/ref/heads/main"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": COMMIT }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octocat/plugin/git/commits/{}", COMMIT)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": { "sha": TREE }
            })))
            .mount(&server)
            .await;

        forge(&server).get_ref(&main_branch()).await.unwrap();
    }

    #[tokio::test]
    async fn create_tree_sends_base_and_inline_entries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/plugin/git/trees"))
            .and(body_json(json!({
                "base_tree": TREE,
                "tree": [
                    { "path": "bin/cli.js", "mode": "100755", "type": "blob", "content": "#!" },
                    { "path": "manifest.json", "mode": "100644", "type": "blob", "content": "{}\n" }
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_TREE })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = vec![
            TreeEntry {
                path: "bin/cli.js".into(),
                mode: FileMode::Executable,
                content: "#!".into(),
            },
            TreeEntry::file("manifest.json", "{}\n"),
        ];
        let tree = forge(&server).create_tree(&oid(TREE), &entries).await.unwrap();

        assert_eq!(tree, oid(NEW_TREE));
    }

    #[tokio::test]
    async fn create_commit_sends_single_parent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/plugin/git/commits"))
            .and(body_json(json!({
                "message": "chore: update",
                "tree": NEW_TREE,
                "parents": [COMMIT]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_COMMIT })))
            .expect(1)
            .mount(&server)
            .await;

        let commit = forge(&server)
            .create_commit("chore: update", &oid(NEW_TREE), &[oid(COMMIT)])
            .await
            .unwrap();

        assert_eq!(commit, oid(NEW_COMMIT));
    }

    #[tokio::test]
    async fn update_ref_patches_with_force() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/plugin/git/refs/heads/main"))
            .and(body_json(json!({ "sha": NEW_COMMIT, "force": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ref": "refs/heads/main",
                "object": { "sha": NEW_COMMIT }
            })))
            .expect(1)
            .mount(&server)
            .await;

        forge(&server)
            .update_ref(&main_branch(), &oid(NEW_COMMIT), true)
            .await
            .unwrap();
    }
}

mod branch_names {
    use super::*;

    const OTHER: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    async fn mount_other_branch(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/octocat/plugin/git/ref/heads/feat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": OTHER }
            })))
            .expect(0)
            .mount(server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/plugin/git/refs/heads/feat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": OTHER }
            })))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn hash_in_branch_stays_in_the_path() {
        let server = MockServer::start().await;
        mount_other_branch(&server).await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/plugin/git/ref/heads/feat%231"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": COMMIT }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/octocat/plugin/git/commits/{}", COMMIT)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": { "sha": TREE }
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/plugin/git/refs/heads/feat%231"))
            .and(body_json(json!({ "sha": NEW_COMMIT, "force": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": NEW_COMMIT }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let forge = forge(&server);
        let branch = BranchName::new("feat#1").unwrap();

        let head = forge.get_ref(&branch).await.unwrap();
        assert_eq!(head.commit, oid(COMMIT));

        forge.update_ref(&branch, &oid(NEW_COMMIT), true).await.unwrap();
    }

    #[tokio::test]
    async fn percent_in_branch_is_not_decoded_into_another_ref() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/plugin/git/ref/heads/feat%252Fx"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = forge(&server)
            .get_ref(&BranchName::new("feat%2Fx").unwrap())
            .await
            .unwrap_err();

        assert_eq!(err, ForgeError::NotFound("Not Found".into()));
    }

    #[tokio::test]
    async fn slash_separated_branch_keeps_its_components() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/plugin/git/refs/heads/release/plugin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": NEW_COMMIT }
            })))
            .expect(1)
            .mount(&server)
            .await;

        forge(&server)
            .update_ref(&BranchName::new("release/plugin").unwrap(), &oid(NEW_COMMIT), true)
            .await
            .unwrap();
    }
}

mod errors {
    use super::*;

    async fn get_ref_with(status: u16, body: serde_json::Value) -> ForgeError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/plugin/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;

        forge(&server).get_ref(&main_branch()).await.unwrap_err()
    }

    #[tokio::test]
    async fn unauthorized_is_auth_failed() {
        let err = get_ref_with(401, json!({ "message": "Bad credentials" })).await;
        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn forbidden_is_auth_failed() {
        let err = get_ref_with(403, json!({ "message": "Resource not accessible by integration" })).await;
        assert!(matches!(err, ForgeError::AuthFailed(msg) if msg.contains("not accessible")));
    }

    #[tokio::test]
    async fn forbidden_rate_limit_is_rate_limited() {
        let err = get_ref_with(403, json!({ "message": "API rate limit exceeded" })).await;
        assert_eq!(err, ForgeError::RateLimited);
    }

    #[tokio::test]
    async fn missing_branch_is_not_found() {
        let err = get_ref_with(404, json!({ "message": "Not Found" })).await;
        assert_eq!(err, ForgeError::NotFound("Not Found".into()));
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let err = get_ref_with(429, json!({ "message": "slow down" })).await;
        assert_eq!(err, ForgeError::RateLimited);
    }

    #[tokio::test]
    async fn server_error_is_api_error() {
        let err = get_ref_with(502, json!({ "message": "Bad Gateway" })).await;
        assert!(matches!(err, ForgeError::ApiError { status: 502, .. }));
    }

    #[tokio::test]
    async fn unprocessable_keeps_message() {
        let err = get_ref_with(422, json!({ "message": "Update is not a fast forward" })).await;
        assert_eq!(
            err,
            ForgeError::ApiError {
                status: 422,
                message: "Update is not a fast forward".into()
            }
        );
    }

    #[tokio::test]
    async fn malformed_sha_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/plugin/git/ref/heads/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": "not-a-sha" }
            })))
            .mount(&server)
            .await;

        let err = forge(&server).get_ref(&main_branch()).await.unwrap_err();
        assert!(matches!(err, ForgeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let forge = GitHubForge::with_api_base(
            "test-token",
            "octocat/plugin".parse().unwrap(),
            "http://127.0.0.1:9",
        );
        let err = forge.get_ref(&main_branch()).await.unwrap_err();
        assert!(matches!(err, ForgeError::NetworkError(_)));
    }
}

mod publish {
    use super::*;

    #[tokio::test]
    async fn four_step_protocol_over_http() {
        let server = MockServer::start().await;
        mount_get_ref(&server).await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/plugin/git/trees"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_TREE })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/plugin/git/commits"))
            .and(body_json(json!({
                "message": "chore: update plugin manifest and build output",
                "tree": NEW_TREE,
                "parents": [COMMIT]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": NEW_COMMIT })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octocat/plugin/git/refs/heads/main"))
            .and(body_json(json!({ "sha": NEW_COMMIT, "force": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": { "sha": NEW_COMMIT }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let forge = forge(&server);
        let unit = PublishUnit::from_files(vec![PublishFile {
            path: "manifest.json".into(),
            mode: FileMode::Blob,
            content: "{}\n".into(),
        }]);

        let commit = AtomicPublisher::new(&forge)
            .publish(
                &main_branch(),
                &unit,
                "chore: update plugin manifest and build output",
            )
            .await
            .unwrap();

        assert_eq!(commit, oid(NEW_COMMIT));
    }

    #[tokio::test]
    async fn rejected_tree_stops_the_protocol() {
        let server = MockServer::start().await;
        mount_get_ref(&server).await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/plugin/git/trees"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({ "message": "Invalid tree info" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octocat/plugin/git/commits"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let forge = forge(&server);
        let err = AtomicPublisher::new(&forge)
            .publish(&main_branch(), &PublishUnit::default(), "update")
            .await
            .unwrap_err();

        assert_eq!(err.step, PublishStep::CreateTree);
    }
}
