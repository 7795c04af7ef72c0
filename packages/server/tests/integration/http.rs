use chrono::Duration;
use contest_server::clock::Clock;
use serde_json::{Value, json};

use crate::common::{TestApp, routes};

fn create_body(app: &TestApp, title: &str) -> Value {
    let start = app.ctx.clock.now() + Duration::hours(1);
    json!({
        "title": title,
        "description": "Weekly ladder",
        "contest_type": "SOLO",
        "max_members": 10,
        "team_size": 1,
        "point_budget": 100,
        "start_time": start,
        "end_time": start + Duration::days(1),
        "discord_guild_id": "guild-1",
        "discord_channel_id": "channel-1",
    })
}

async fn create_contest(app: &TestApp, token: &str) -> i32 {
    let res = app
        .post_with_token(routes::CONTESTS, &create_body(app, "Spring Cup"), token)
        .await;
    assert_eq!(res.status, 201, "create failed: {}", res.text);
    res.id()
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.get_without_token(routes::MY_APPLICATIONS).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .get_with_token(routes::MY_APPLICATIONS, "not-a-jwt")
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod contests {
    use super::*;

    #[tokio::test]
    async fn create_and_fetch() {
        let app = TestApp::spawn().await;
        let (alice, token) = app.user("alice").await;

        let id = create_contest(&app, &token).await;
        let res = app.get_with_token(&routes::contest(id), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["title"], "Spring Cup");
        assert_eq!(res.body["status"], "PENDING");
        assert_eq!(res.body["contest_type"], "SOLO");
        assert_eq!(res.body["created_by"], alice);
    }

    #[tokio::test]
    async fn invalid_payloads_are_validation_errors() {
        let app = TestApp::spawn().await;
        let (_, token) = app.user("alice").await;

        let mut body = create_body(&app, "   ");
        let res = app.post_with_token(routes::CONTESTS, &body, &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        body["title"] = json!("Fine title");
        body["contest_type"] = json!("SQUAD");
        let res = app.post_with_token(routes::CONTESTS, &body, &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let id = create_contest(&app, &token).await;
        let res = app
            .patch_with_token(&routes::contest(id), &json!({}), &token)
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_contest_is_404() {
        let app = TestApp::spawn().await;
        let (_, token) = app.user("alice").await;
        let res = app.get_with_token(&routes::contest(4242), &token).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod workflow {
    use super::*;

    #[tokio::test]
    async fn unlinked_user_gets_428_with_hint() {
        let app = TestApp::spawn().await;
        let (_, leader) = app.user("alice").await;
        let (_, carol) = app.unlinked_user("carol").await;
        let id = create_contest(&app, &leader).await;

        let res = app
            .post_with_token(&routes::applications(id), &json!({}), &carol)
            .await;
        assert_eq!(res.status, 428);
        assert_eq!(res.body["code"], "LINKING_REQUIRED");
        assert!(res.body["hint"].as_str().unwrap().contains("Discord"));
    }

    #[tokio::test]
    async fn apply_accept_start_end_to_end() {
        let app = TestApp::spawn().await;
        let (alice, leader) = app.user("alice").await;
        let (bob, bob_token) = app.user("bob").await;
        let (carol, carol_token) = app.user("carol").await;
        let id = create_contest(&app, &leader).await;

        let res = app
            .post_with_token(&routes::applications(id), &json!({}), &bob_token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "PENDING");
        assert_eq!(res.body["sender"]["username"], "bob");

        let res = app
            .post_with_token(&routes::applications(id), &json!({}), &bob_token)
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        let res = app
            .post_with_token(&routes::applications(id), &json!({}), &carol_token)
            .await;
        assert_eq!(res.status, 201);

        // Only the leader sees the queue.
        let res = app
            .get_with_token(&routes::applications(id), &bob_token)
            .await;
        assert_eq!(res.status, 403);

        let res = app.get_with_token(&routes::applications(id), &leader).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);

        let res = app
            .post_with_token(&routes::accept(id, bob), &json!({}), &leader)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "ACCEPTED");
        assert_eq!(res.body["processed_by"], alice);

        let res = app
            .post_with_token(&routes::reject(id, carol), &json!({}), &leader)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "REJECTED");

        let res = app.get_with_token(routes::MY_APPLICATIONS, &bob_token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"][0]["contest_id"], id);

        // Too early.
        let res = app
            .post_with_token(&routes::contest_start(id), &json!({}), &leader)
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "INVALID_STATE");

        let contest = app.ctx.service.get_contest(id).await.unwrap();
        app.ctx.pass_start(&contest);

        let res = app
            .post_with_token(&routes::contest_start(id), &json!({}), &bob_token)
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .post_with_token(&routes::contest_start(id), &json!({}), &leader)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["contest"]["status"], "ACTIVE");

        let res = app
            .get_with_token(
                &format!("{}?sort_by=username&sort_order=desc", routes::members(id)),
                &bob_token,
            )
            .await;
        assert_eq!(res.status, 200);
        let names: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["username"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["bob", "alice"]);
        assert_eq!(res.body["pagination"]["total"], 2);

        let res = app
            .post_with_token(&routes::contest_stop(id), &json!({}), &leader)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "FINISHED");
    }

    #[tokio::test]
    async fn cancel_withdraw_and_role_change() {
        let app = TestApp::spawn().await;
        let (_, leader) = app.user("alice").await;
        let (bob, bob_token) = app.user("bob").await;
        let (_, carol_token) = app.user("carol").await;
        let id = create_contest(&app, &leader).await;

        app.post_with_token(&routes::applications(id), &json!({}), &carol_token)
            .await;
        let res = app
            .delete_with_token(&routes::applications(id), &carol_token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "PENDING");
        let res = app
            .delete_with_token(&routes::applications(id), &carol_token)
            .await;
        assert_eq!(res.status, 404);

        app.post_with_token(&routes::applications(id), &json!({}), &bob_token)
            .await;
        app.post_with_token(&routes::accept(id, bob), &json!({}), &leader)
            .await;

        let res = app
            .patch_with_token(
                &routes::member(id, bob),
                &json!({ "member_type": "STAFF" }),
                &leader,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["member_type"], "STAFF");

        let res = app
            .patch_with_token(
                &routes::member(id, bob),
                &json!({ "member_type": "STAFF" }),
                &leader,
            )
            .await;
        assert_eq!(res.status, 409);

        let res = app.delete_with_token(&routes::my_membership(id), &leader).await;
        assert_eq!(res.status, 403);

        let res = app
            .delete_with_token(&routes::my_membership(id), &bob_token)
            .await;
        assert_eq!(res.status, 204);

        let res = app
            .post_with_token(&routes::contest_cancel(id), &json!({}), &leader)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "CANCELLED");

        let res = app
            .post_with_token(&routes::contest_cancel(id), &json!({}), &leader)
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "INVALID_STATE");
    }

    #[tokio::test]
    async fn bad_member_query_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, leader) = app.user("alice").await;
        let id = create_contest(&app, &leader).await;

        let res = app
            .get_with_token(&format!("{}?sort_by=karma", routes::members(id)), &leader)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}
