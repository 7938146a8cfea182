//! Market creation, resolution and cancellation.

mod support;

use std::sync::Arc;

use kastia::domain::{AuditAction, MarketFilter, MarketStatus, Permission, Privacy};
use kastia::error::ErrorKind;
use kastia::testkit::domain::{binary_market, new_group, new_market, outcome};
use kastia::testkit::TestWorld;
use support::assertions::{assert_invalid_state, assert_kind, assert_separation_of_duty, audit_of};

#[tokio::test]
async fn create_market_records_creator_and_audit() {
    let world = TestWorld::new("create-market");
    let alice = world.user("alice").await;
    let admin = world.admin("root").await;

    let market = world
        .services
        .markets
        .create(&alice, new_market("Who wins?", &["A", "B", "C"]))
        .await
        .unwrap();

    assert_eq!(market.status(), MarketStatus::Open);
    assert_eq!(market.winner(), None);
    assert_eq!(market.resolved_by(), None);
    assert_eq!(market.created_by, Some(alice.user_id));
    assert_eq!(market.outcomes.len(), 3);
    assert!(market.outcomes.iter().all(|o| (o.probability - 50.0).abs() < f64::EPSILON));

    let entries = audit_of(&world, &admin, AuditAction::CreateMarket).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, alice.user_id);
    assert_eq!(entries[0].target, format!("Market: {} - Who wins?", market.id));
}

#[tokio::test]
async fn resolver_resolves_market_created_by_someone_else() {
    let world = TestWorld::new("resolve-ok");
    let creator = world.user("creator").await;
    let resolver = world.user_with("resolver", &[Permission::ResolveMarket]).await;
    let admin = world.admin("root").await;

    let market = world
        .services
        .markets
        .create(&creator, binary_market("Rain tomorrow?"))
        .await
        .unwrap();
    let yes = outcome(&market, "Yes");

    let resolved = world
        .services
        .markets
        .resolve(market.id, yes, &resolver)
        .await
        .unwrap();
    assert_eq!(resolved.status(), MarketStatus::Resolved);
    assert_eq!(resolved.winner(), Some(yes));
    assert_eq!(resolved.resolved_by(), Some(resolver.user_id));

    let entries = audit_of(&world, &admin, AuditAction::ResolveMarket).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].details.as_deref(), Some("Winner: Yes"));
}

#[tokio::test]
async fn creator_with_resolve_permission_is_blocked_by_separation_of_duty() {
    let world = TestWorld::new("resolve-sod");
    let creator = world.user_with("creator", &[Permission::ResolveMarket]).await;
    let admin = world.admin("root").await;
    let market = world
        .services
        .markets
        .create(&creator, binary_market("Self-dealing?"))
        .await
        .unwrap();

    let result = world
        .services
        .markets
        .resolve(market.id, outcome(&market, "Yes"), &creator)
        .await;
    assert_separation_of_duty(result);

    let still_open = world.services.markets.get(market.id, Some(&creator)).await.unwrap();
    assert_eq!(still_open.status(), MarketStatus::Open);
    assert!(audit_of(&world, &admin, AuditAction::ResolveMarket).await.is_empty());
}

#[tokio::test]
async fn admin_creator_may_resolve_own_market() {
    let world = TestWorld::new("resolve-admin-own");
    let admin = world.admin("root").await;
    let market = world
        .services
        .markets
        .create(&admin, binary_market("Admin market"))
        .await
        .unwrap();

    let resolved = world
        .services
        .markets
        .resolve(market.id, outcome(&market, "No"), &admin)
        .await
        .unwrap();
    assert_eq!(resolved.resolved_by(), Some(admin.user_id));
}

#[tokio::test]
async fn resolve_checks_run_in_order() {
    let world = TestWorld::new("resolve-order");
    let creator = world.user("creator").await;
    let nobody = world.user("nobody").await;
    let resolver = world.user_with("resolver", &[Permission::ResolveMarket]).await;
    let markets = &world.services.markets;

    let market = markets.create(&creator, binary_market("Order")).await.unwrap();
    let other = markets.create(&creator, binary_market("Other")).await.unwrap();

    let missing = kastia::domain::MarketId::new(9_999);
    assert_kind(
        markets.resolve(missing, outcome(&market, "Yes"), &nobody).await,
        ErrorKind::NotFound,
    );
    assert_kind(
        markets.resolve(market.id, outcome(&market, "Yes"), &nobody).await,
        ErrorKind::PermissionDenied,
    );
    assert_kind(
        markets.resolve(market.id, outcome(&other, "Yes"), &resolver).await,
        ErrorKind::Validation,
    );

    markets
        .resolve(market.id, outcome(&market, "Yes"), &resolver)
        .await
        .unwrap();
    assert_invalid_state(
        markets
            .resolve(market.id, outcome(&market, "No"), &resolver)
            .await,
    );
}

#[tokio::test]
async fn cancel_requires_halt_trading_and_is_terminal() {
    let world = TestWorld::new("cancel");
    let creator = world.user("creator").await;
    let compliance = world.user_with("compliance", &[Permission::HaltTrading]).await;
    let resolver = world.user_with("resolver", &[Permission::ResolveMarket]).await;
    let admin = world.admin("root").await;
    let markets = &world.services.markets;

    let market = markets.create(&creator, binary_market("Cancel me")).await.unwrap();
    assert_kind(
        markets.cancel(market.id, &creator, None).await,
        ErrorKind::PermissionDenied,
    );

    let cancelled = markets
        .cancel(market.id, &compliance, Some("Duplicate market".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), MarketStatus::Cancelled);
    assert_eq!(cancelled.winner(), None);

    assert_invalid_state(
        markets
            .resolve(market.id, outcome(&market, "Yes"), &resolver)
            .await,
    );
    assert_invalid_state(markets.cancel(market.id, &compliance, None).await);

    let entries = audit_of(&world, &admin, AuditAction::CancelMarket).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].details.as_deref(), Some("Duplicate market"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolutions_succeed_exactly_once() {
    let world = Arc::new(TestWorld::new("resolve-race"));
    let creator = world.user("creator").await;
    let admin = world.admin("root").await;
    let market = world
        .services
        .markets
        .create(&creator, binary_market("Race"))
        .await
        .unwrap();

    let mut resolvers = Vec::new();
    for i in 0..4 {
        resolvers.push(
            world
                .user_with(&format!("resolver{i}"), &[Permission::ResolveMarket])
                .await,
        );
    }

    let handles: Vec<_> = resolvers
        .into_iter()
        .enumerate()
        .map(|(i, resolver)| {
            let world = Arc::clone(&world);
            let winner = outcome(&market, if i % 2 == 0 { "Yes" } else { "No" });
            let id = market.id;
            tokio::spawn(async move { world.services.markets.resolve(id, winner, &resolver).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected error: {err}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(audit_of(&world, &admin, AuditAction::ResolveMarket).await.len(), 1);
}

#[tokio::test]
async fn restricted_markets_are_hidden_from_outsiders() {
    let world = TestWorld::new("restricted-visibility");
    let owner = world.user("owner").await;
    let outsider = world.user("outsider").await;
    let admin = world.admin("root").await;

    let public = world
        .services
        .markets
        .create(&owner, binary_market("Public"))
        .await
        .unwrap();
    let private = world
        .services
        .markets
        .create(&owner, binary_market("Private"))
        .await
        .unwrap();
    let group = world
        .services
        .groups
        .create(&owner, new_group("Insiders", Privacy::Invite))
        .await
        .unwrap();
    world
        .services
        .groups
        .add_market(group.id, private.id, &owner)
        .await
        .unwrap();
    let owner = world.refresh(&owner).await;

    let seen = |markets: Vec<kastia::domain::Market>| {
        markets.into_iter().map(|m| m.id).collect::<Vec<_>>()
    };
    let filter = MarketFilter::default();
    let anonymous = seen(world.services.markets.list(filter, None).await.unwrap());
    assert_eq!(anonymous, vec![public.id]);
    let outsider_view = seen(world.services.markets.list(filter, Some(&outsider)).await.unwrap());
    assert_eq!(outsider_view, vec![public.id]);
    assert_eq!(
        seen(world.services.markets.list(filter, Some(&owner)).await.unwrap()).len(),
        2
    );
    assert_eq!(
        seen(world.services.markets.list(filter, Some(&admin)).await.unwrap()).len(),
        2
    );

    assert_kind(
        world.services.markets.get(private.id, Some(&outsider)).await,
        ErrorKind::NotFound,
    );
}

#[tokio::test]
async fn list_filters_by_status() {
    let world = TestWorld::new("list-filter");
    let creator = world.user("creator").await;
    let admin = world.admin("root").await;
    let markets = &world.services.markets;

    let a = markets.create(&creator, binary_market("A")).await.unwrap();
    markets.create(&creator, binary_market("B")).await.unwrap();
    markets.resolve(a.id, outcome(&a, "Yes"), &admin).await.unwrap();

    let resolved = markets
        .list(
            MarketFilter {
                status: Some(MarketStatus::Resolved),
                ..MarketFilter::default()
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].id, a.id);
}
