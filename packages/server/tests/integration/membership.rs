use chrono::Duration;
use common::{LeaderType, LifecycleEventType, MemberType};
use contest_server::clock::Clock;
use contest_server::store::ApplicationStore;
use contest_server::store::membership::{self, MemberQuery, MemberSort, NewMember, SortOrder};

use crate::common::TestContext;

/// Contest led by alice with bob, carol and dave accepted, one second apart.
async fn roster(ctx: &TestContext) -> (i32, [i32; 4]) {
    let alice = ctx.seed_user("alice").await;
    let contest = ctx.create_contest(alice).await;
    let mut ids = [alice, 0, 0, 0];
    for (slot, name) in ["bob", "carol", "dave"].into_iter().enumerate() {
        let uid = ctx.seed_user(name).await;
        ctx.clock.advance(Duration::seconds(1));
        ctx.service.request_participate(contest.id, uid).await.unwrap();
        ctx.service
            .accept_application(contest.id, alice, uid)
            .await
            .unwrap();
        ids[slot + 1] = uid;
    }
    (contest.id, ids)
}

mod withdrawing {
    use super::*;

    #[tokio::test]
    async fn member_withdraws_and_application_is_dropped() {
        let ctx = TestContext::new().await;
        let (contest_id, [_, bob, ..]) = roster(&ctx).await;

        ctx.service
            .withdraw_from_contest(contest_id, bob)
            .await
            .unwrap();

        assert!(ctx.member(contest_id, bob).await.is_none());
        assert!(ctx.store.get_application(contest_id, bob).await.unwrap().is_none());
        assert!(
            !ctx.store
                .get_accepted_applicants(contest_id)
                .await
                .unwrap()
                .contains(&bob)
        );

        // Applying again is allowed once withdrawn.
        ctx.service
            .request_participate(contest_id, bob)
            .await
            .unwrap();

        let events = ctx.events.wait_for(9).await;
        let withdrawn = events
            .iter()
            .find(|e| e.event_type == LifecycleEventType::MemberWithdrawn)
            .expect("no member.withdrawn event");
        assert_eq!(withdrawn.user_id, bob);
        assert_eq!(withdrawn.data["status"], "WITHDRAWN");
    }

    #[tokio::test]
    async fn cache_failure_keeps_member_on_roster() {
        let ctx = TestContext::with_failing_removal().await;
        let (contest_id, [_, bob, ..]) = roster(&ctx).await;

        let err = ctx
            .service
            .withdraw_from_contest(contest_id, bob)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");

        assert!(ctx.member(contest_id, bob).await.is_some());
        assert!(
            ctx.store
                .get_accepted_applicants(contest_id)
                .await
                .unwrap()
                .contains(&bob)
        );

        // Nothing was withdrawn, so nothing is announced.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(
            !ctx.events
                .types()
                .contains(&LifecycleEventType::MemberWithdrawn)
        );
    }

    #[tokio::test]
    async fn leader_cannot_withdraw() {
        let ctx = TestContext::new().await;
        let (contest_id, [alice, ..]) = roster(&ctx).await;

        let err = ctx
            .service
            .withdraw_from_contest(contest_id, alice)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");
        assert!(ctx.member(contest_id, alice).await.is_some());
    }

    #[tokio::test]
    async fn outsider_and_started_contest() {
        let ctx = TestContext::new().await;
        let (contest_id, [alice, bob, ..]) = roster(&ctx).await;
        let eve = ctx.seed_user("eve").await;

        let err = ctx
            .service
            .withdraw_from_contest(contest_id, eve)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let contest = ctx.service.get_contest(contest_id).await.unwrap();
        ctx.pass_start(&contest);
        ctx.service.start_contest(contest_id, alice).await.unwrap();

        let err = ctx
            .service
            .withdraw_from_contest(contest_id, bob)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }
}

mod roles {
    use super::*;

    #[tokio::test]
    async fn leader_promotes_member_to_staff() {
        let ctx = TestContext::new().await;
        let (contest_id, [alice, bob, ..]) = roster(&ctx).await;

        let updated = ctx
            .service
            .change_member_role(contest_id, alice, bob, MemberType::Staff)
            .await
            .unwrap();
        assert_eq!(updated.member_type, MemberType::Staff);
        assert_eq!(updated.leader_type, LeaderType::Member);

        let err = ctx
            .service
            .change_member_role(contest_id, alice, bob, MemberType::Staff)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        let demoted = ctx
            .service
            .change_member_role(contest_id, alice, bob, MemberType::Normal)
            .await
            .unwrap();
        assert_eq!(demoted.member_type, MemberType::Normal);
    }

    #[tokio::test]
    async fn role_change_guards() {
        let ctx = TestContext::new().await;
        let (contest_id, [alice, bob, carol, _]) = roster(&ctx).await;
        let eve = ctx.seed_user("eve").await;

        let err = ctx
            .service
            .change_member_role(contest_id, bob, carol, MemberType::Staff)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");

        let err = ctx
            .service
            .change_member_role(contest_id, alice, alice, MemberType::Normal)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PERMISSION_DENIED");

        let err = ctx
            .service
            .change_member_role(contest_id, alice, eve, MemberType::Staff)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}

mod listing {
    use super::*;

    async fn usernames(ctx: &TestContext, contest_id: i32, query: MemberQuery) -> (Vec<String>, u64) {
        let (items, total) = ctx.service.list_members(contest_id, query).await.unwrap();
        (items.into_iter().map(|m| m.username).collect(), total)
    }

    #[tokio::test]
    async fn default_order_is_join_time() {
        let ctx = TestContext::new().await;
        let (contest_id, _) = roster(&ctx).await;

        let (names, total) = usernames(&ctx, contest_id, MemberQuery::default()).await;
        assert_eq!(total, 4);
        assert_eq!(names, ["alice", "bob", "carol", "dave"]);
    }

    #[tokio::test]
    async fn sorted_by_username_descending_in_pages() {
        let ctx = TestContext::new().await;
        let (contest_id, _) = roster(&ctx).await;

        let query = |page| MemberQuery {
            sort: MemberSort::Username,
            order: SortOrder::Desc,
            page,
            per_page: 3,
        };

        let (first, total) = usernames(&ctx, contest_id, query(1)).await;
        assert_eq!(total, 4);
        assert_eq!(first, ["dave", "carol", "bob"]);

        let (second, _) = usernames(&ctx, contest_id, query(2)).await;
        assert_eq!(second, ["alice"]);

        let (beyond, total) = usernames(&ctx, contest_id, query(3)).await;
        assert!(beyond.is_empty());
        assert_eq!(total, 4);

        let (far, total) = usernames(&ctx, contest_id, query(u64::MAX)).await;
        assert!(far.is_empty());
        assert_eq!(total, 4);
    }

    #[tokio::test]
    async fn profiles_are_joined() {
        let ctx = TestContext::new().await;
        let (contest_id, [alice, ..]) = roster(&ctx).await;

        let (items, _) = ctx
            .service
            .list_members(contest_id, MemberQuery::default())
            .await
            .unwrap();
        let leader = &items[0];
        assert_eq!(leader.user_id, alice);
        assert_eq!(leader.discord_tag.as_deref(), Some("alice#0001"));
        assert_eq!(leader.leader_type, LeaderType::Leader);
    }

    #[tokio::test]
    async fn unknown_contest_is_not_found() {
        let ctx = TestContext::new().await;
        let err = ctx
            .service
            .list_members(77, MemberQuery::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}

mod batch_save {
    use super::*;

    #[tokio::test]
    async fn existing_and_repeated_rows_are_skipped() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let carol = ctx.seed_user("carol").await;
        let contest = ctx.create_contest(alice).await;
        let now = ctx.clock.now();

        let batch = vec![
            NewMember::participant(contest.id, alice, now),
            NewMember::participant(contest.id, bob, now),
            NewMember::participant(contest.id, carol, now),
            NewMember::participant(contest.id, carol, now),
        ];
        let created = membership::save_batch(&ctx.db, batch.clone()).await.unwrap();
        assert_eq!(created, 2);

        // The existing leader row is untouched.
        let leader = ctx.member(contest.id, alice).await.unwrap();
        assert_eq!(leader.leader_type, LeaderType::Leader);

        assert_eq!(membership::save_batch(&ctx.db, batch).await.unwrap(), 0);
        assert_eq!(membership::save_batch(&ctx.db, vec![]).await.unwrap(), 0);
        assert_eq!(membership::count_by_contest(&ctx.db, contest.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn leader_must_be_staff() {
        let ctx = TestContext::new().await;
        let alice = ctx.seed_user("alice").await;
        let bob = ctx.seed_user("bob").await;
        let contest = ctx.create_contest(alice).await;

        let mut bad = NewMember::leader(contest.id, bob, ctx.clock.now());
        bad.member_type = MemberType::Normal;
        let err = membership::save_batch(&ctx.db, vec![bad]).await.unwrap_err();
        assert!(err.to_string().contains("leader must be a staff member"));
        assert!(ctx.member(contest.id, bob).await.is_none());
    }
}
