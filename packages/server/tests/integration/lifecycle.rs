use chrono::Duration;
use common::{ContestStatus, LeaderType, LifecycleEventType, MemberType};
use contest_server::clock::Clock;
use contest_server::domain::ContestChangeSet;
use contest_server::store::ApplicationStore;
use contest_server::store::membership::MemberQuery;

use crate::common::TestContext;

async fn apply_and_accept(ctx: &TestContext, contest_id: i32, leader: i32, user_id: i32) {
    ctx.service
        .request_participate(contest_id, user_id)
        .await
        .unwrap();
    ctx.service
        .accept_application(contest_id, leader, user_id)
        .await
        .unwrap();
}

mod creation {
    use super::*;

    #[tokio::test]
    async fn creator_becomes_staff_leader() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let contest = ctx.create_contest(alice).await;

        assert_eq!(contest.status, ContestStatus::Pending);
        assert_eq!(contest.created_by, alice);

        let leader = ctx.member(contest.id, alice).await.expect("leader row missing");
        assert_eq!(leader.member_type, MemberType::Staff);
        assert_eq!(leader.leader_type, LeaderType::Leader);

        let events = ctx.events.wait_for(1).await;
        assert_eq!(events[0].event_type, LifecycleEventType::ContestCreated);
        assert_eq!(events[0].discord_channel_id.as_deref(), Some("channel-1"));
    }

    #[tokio::test]
    async fn start_in_the_past_is_rejected() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;

        let mut draft = ctx.draft("Late Cup");
        draft.start_time = ctx.clock.now() - Duration::minutes(5);
        let err = ctx.service.create_contest(alice, draft).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;

        let mut draft = ctx.draft("Backwards Cup");
        draft.end_time = draft.start_time - Duration::hours(1);
        let err = ctx.service.create_contest(alice, draft).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_creator_is_not_found() {
        let ctx = TestContext::new().await;
        let err = ctx
            .service
            .create_contest(404, ctx.draft("Ghost Cup"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}

mod starting {
    use super::*;

    #[tokio::test]
    async fn start_migrates_accepted_applicants_once_and_clears_cache() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let carol = ctx.seed_user("carol").await;
        let dave = ctx.seed_user("dave").await;
        let contest = ctx.create_contest(alice).await;

        apply_and_accept(&ctx, contest.id, alice, bob).await;
        apply_and_accept(&ctx, contest.id, alice, carol).await;
        ctx.service
            .request_participate(contest.id, dave)
            .await
            .unwrap();

        // Simulate an accept whose roster write was lost.
        contest_server::store::membership::delete_by_id(&ctx.db, contest.id, bob)
            .await
            .unwrap();

        ctx.pass_start(&contest);
        let outcome = ctx.service.start_contest(contest.id, alice).await.unwrap();
        assert_eq!(outcome.contest.status, ContestStatus::Active);
        assert_eq!(outcome.members_created, 1);

        assert!(ctx.member(contest.id, bob).await.is_some());
        assert!(ctx.member(contest.id, carol).await.is_some());
        assert!(ctx.member(contest.id, dave).await.is_none());

        let (_, total) = ctx
            .service
            .list_members(contest.id, MemberQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 3);

        assert!(
            ctx.store
                .get_accepted_applicants(contest.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            ctx.store
                .get_pending_applications(contest.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(ctx.store.get_user_applications(carol).await.unwrap().is_empty());

        let err = ctx
            .service
            .start_contest(contest.id, alice)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[tokio::test]
    async fn start_before_scheduled_time_fails() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let contest = ctx.create_contest(alice).await;

        let err = ctx
            .service
            .start_contest(contest.id, alice)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert_eq!(
            ctx.service.get_contest(contest.id).await.unwrap().status,
            ContestStatus::Pending
        );
    }

    #[tokio::test]
    async fn only_leader_can_start() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let contest = ctx.create_contest(alice).await;
        apply_and_accept(&ctx, contest.id, alice, bob).await;

        ctx.pass_start(&contest);
        let err = ctx.service.start_contest(contest.id, bob).await.unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");

        // The failed attempt leaves the accepted snapshot in place.
        assert_eq!(
            ctx.store.get_accepted_applicants(contest.id).await.unwrap(),
            vec![bob]
        );
    }

    #[tokio::test]
    async fn withdrawn_member_is_not_readded_at_start() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let contest = ctx.create_contest(alice).await;
        apply_and_accept(&ctx, contest.id, alice, bob).await;

        ctx.service
            .withdraw_from_contest(contest.id, bob)
            .await
            .unwrap();

        ctx.pass_start(&contest);
        let outcome = ctx.service.start_contest(contest.id, alice).await.unwrap();
        assert_eq!(outcome.members_created, 0);
        assert!(ctx.member(contest.id, bob).await.is_none());
    }
}

mod auto_start {
    use super::*;

    #[tokio::test]
    async fn sweep_starts_only_due_auto_start_contests() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;

        let mut draft = ctx.draft("Auto Cup");
        draft.auto_start = true;
        let auto = ctx.service.create_contest(alice, draft).await.unwrap();
        let manual = ctx.create_contest(alice).await;

        let mut later = ctx.draft("Later Cup");
        later.auto_start = true;
        later.start_time = ctx.clock.now() + Duration::hours(5);
        later.end_time = later.start_time + Duration::days(1);
        let later = ctx.service.create_contest(alice, later).await.unwrap();

        apply_and_accept(&ctx, auto.id, alice, bob).await;

        assert_eq!(ctx.service.auto_start_due_contests().await.unwrap(), 0);

        ctx.pass_start(&auto);
        assert_eq!(ctx.service.auto_start_due_contests().await.unwrap(), 1);

        let auto = ctx.service.get_contest(auto.id).await.unwrap();
        assert_eq!(auto.status, ContestStatus::Active);
        assert!(ctx.member(auto.id, bob).await.is_some());
        assert_eq!(
            ctx.service.get_contest(manual.id).await.unwrap().status,
            ContestStatus::Pending
        );
        assert_eq!(
            ctx.service.get_contest(later.id).await.unwrap().status,
            ContestStatus::Pending
        );

        assert_eq!(ctx.service.auto_start_due_contests().await.unwrap(), 0);
    }
}

mod stopping_and_cancelling {
    use super::*;

    #[tokio::test]
    async fn stop_finishes_running_contest_at_now() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let contest = ctx.create_contest(alice).await;

        let err = ctx.service.stop_contest(contest.id, alice).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");

        ctx.pass_start(&contest);
        ctx.service.start_contest(contest.id, alice).await.unwrap();
        ctx.clock.advance(Duration::hours(2));

        let stopped = ctx.service.stop_contest(contest.id, alice).await.unwrap();
        assert_eq!(stopped.status, ContestStatus::Finished);
        assert_eq!(stopped.end_time, ctx.clock.now());

        let err = ctx
            .service
            .cancel_contest(contest.id, alice)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[tokio::test]
    async fn cancel_pending_contest_clears_applications() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let carol = ctx.seed_user("carol").await;
        let contest = ctx.create_contest(alice).await;
        apply_and_accept(&ctx, contest.id, alice, bob).await;
        ctx.service
            .request_participate(contest.id, carol)
            .await
            .unwrap();

        let cancelled = ctx.service.cancel_contest(contest.id, alice).await.unwrap();
        assert_eq!(cancelled.status, ContestStatus::Cancelled);

        assert!(ctx.store.get_application(contest.id, bob).await.unwrap().is_none());
        assert!(ctx.store.get_application(contest.id, carol).await.unwrap().is_none());
        assert!(ctx.service.list_my_applications(carol).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_leader_cannot_stop_or_cancel() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let contest = ctx.create_contest(alice).await;

        let err = ctx.service.cancel_contest(contest.id, bob).await.unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");

        ctx.pass_start(&contest);
        ctx.service.start_contest(contest.id, alice).await.unwrap();
        let err = ctx.service.stop_contest(contest.id, bob).await.unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
    }
}

mod editing {
    use super::*;

    #[tokio::test]
    async fn moving_start_keeps_applications_alive() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let contest = ctx.create_contest(alice).await;
        ctx.service
            .request_participate(contest.id, bob)
            .await
            .unwrap();

        let new_start = contest.start_time + Duration::hours(3);
        let updated = ctx
            .service
            .update_contest(
                contest.id,
                alice,
                ContestChangeSet {
                    start_time: Some(new_start),
                    end_time: Some(new_start + Duration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.start_time, new_start);

        // Past the original start, well before the new one.
        ctx.clock.advance(Duration::hours(2));
        let app = ctx.store.get_application(contest.id, bob).await.unwrap();
        assert!(app.is_some(), "application expired at the old start time");
        assert_eq!(ctx.store.get_pending_applications(contest.id).await.unwrap().len(), 1);

        ctx.clock.set(new_start + Duration::seconds(1));
        assert!(ctx.store.get_application(contest.id, bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn edit_rules() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let contest = ctx.create_contest(alice).await;

        let err = ctx
            .service
            .update_contest(contest.id, alice, ContestChangeSet::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let rename = || ContestChangeSet {
            title: Some("  Summer Cup  ".to_string()),
            ..Default::default()
        };
        let err = ctx
            .service
            .update_contest(contest.id, bob, rename())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");

        let updated = ctx
            .service
            .update_contest(contest.id, alice, rename())
            .await
            .unwrap();
        assert_eq!(updated.title, "Summer Cup");
        assert_eq!(updated.start_time, contest.start_time);

        ctx.pass_start(&contest);
        ctx.service.start_contest(contest.id, alice).await.unwrap();
        let err = ctx
            .service
            .update_contest(contest.id, alice, rename())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }
}
