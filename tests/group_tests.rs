//! Group membership and the access-request workflow.

mod support;

use kastia::domain::{AccessRequestStatus, AuditAction, Privacy};
use kastia::error::{Error, ErrorKind, StateError};
use kastia::testkit::domain::{binary_market, new_group};
use kastia::testkit::TestWorld;
use support::assertions::{assert_invalid_state, assert_kind, audit_of};

#[tokio::test]
async fn approval_adds_member_and_is_final() {
    let world = TestWorld::new("group-approve");
    let owner = world.user("owner").await;
    let joiner = world.user("joiner").await;
    let admin = world.admin("root").await;
    let groups = &world.services.groups;

    let group = groups
        .create(&owner, new_group("Analysts", Privacy::Invite))
        .await
        .unwrap();
    let request = groups
        .request_access(group.id, &joiner, Some("Let me in".into()))
        .await
        .unwrap();
    assert_eq!(request.status, AccessRequestStatus::Pending);
    assert_eq!(request.message, "Let me in");
    let err = groups.request_access(group.id, &joiner, None).await.unwrap_err();
    assert!(matches!(err, Error::State(StateError::DuplicateRequest)));

    let outcome = groups.approve(group.id, request.id, &owner).await.unwrap();
    assert_eq!(outcome.request.status, AccessRequestStatus::Approved);
    assert_eq!(outcome.request.responded_by, Some(owner.user_id));
    assert!(outcome.request.responded_at.is_some());
    assert_eq!(outcome.member_count, 2);

    let view = groups.detail(group.id, Some(&joiner)).await.unwrap();
    assert!(view.is_member);
    assert!(!view.is_admin);
    assert!(view.pending_requests.is_none());

    assert_invalid_state(groups.deny(group.id, request.id, &owner).await);
    assert_invalid_state(groups.approve(group.id, request.id, &owner).await);

    let approvals = audit_of(&world, &admin, AuditAction::ApproveAccess).await;
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].details.as_deref(), Some("User: joiner"));
}

#[tokio::test]
async fn denial_leaves_membership_unchanged() {
    let world = TestWorld::new("group-deny");
    let owner = world.user("owner").await;
    let joiner = world.user("joiner").await;
    let groups = &world.services.groups;

    let group = groups
        .create(&owner, new_group("Quiet", Privacy::Invite))
        .await
        .unwrap();
    let request = groups.request_access(group.id, &joiner, None).await.unwrap();
    let outcome = groups.deny(group.id, request.id, &owner).await.unwrap();
    assert_eq!(outcome.request.status, AccessRequestStatus::Denied);
    assert_eq!(outcome.member_count, 1);

    assert_kind(
        groups.detail(group.id, Some(&joiner)).await,
        ErrorKind::NotFound,
    );
    let view = groups.detail(group.id, Some(&owner)).await.unwrap();
    assert_eq!(view.member_count, 1);
    assert!(!view.detail.members.iter().any(|m| m.id == joiner.user_id));

    let again = groups.request_access(group.id, &joiner, None).await;
    let err = assert_kind(again, ErrorKind::Conflict);
    assert!(err.to_string().contains("denied"), "{err}");
}

#[tokio::test]
async fn duplicate_and_member_requests_are_rejected() {
    let world = TestWorld::new("group-duplicates");
    let owner = world.user("owner").await;
    let joiner = world.user("joiner").await;
    let groups = &world.services.groups;
    let group = groups
        .create(&owner, new_group("Busy", Privacy::Public))
        .await
        .unwrap();

    groups.request_access(group.id, &joiner, None).await.unwrap();
    let err = groups.request_access(group.id, &joiner, None).await.unwrap_err();
    assert!(matches!(err, Error::State(StateError::DuplicateRequest)));

    let err = groups.request_access(group.id, &owner, None).await.unwrap_err();
    assert!(matches!(err, Error::State(StateError::AlreadyMember)));
}

#[tokio::test]
async fn only_managers_decide_requests() {
    let world = TestWorld::new("group-managers");
    let owner = world.user("owner").await;
    let joiner = world.user("joiner").await;
    let stranger = world.user("stranger").await;
    let groups = &world.services.groups;
    let group = groups
        .create(&owner, new_group("Managed", Privacy::Invite))
        .await
        .unwrap();
    let request = groups.request_access(group.id, &joiner, None).await.unwrap();

    assert_kind(
        groups.approve(group.id, request.id, &stranger).await,
        ErrorKind::PermissionDenied,
    );
    assert_kind(
        groups.pending_requests(group.id, &stranger).await,
        ErrorKind::PermissionDenied,
    );
    let pending = groups.pending_requests(group.id, &owner).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].username, "joiner");
}

#[tokio::test]
async fn request_of_another_group_is_not_found() {
    let world = TestWorld::new("group-foreign-request");
    let owner = world.user("owner").await;
    let joiner = world.user("joiner").await;
    let groups = &world.services.groups;
    let first = groups
        .create(&owner, new_group("First", Privacy::Public))
        .await
        .unwrap();
    let second = groups
        .create(&owner, new_group("Second", Privacy::Public))
        .await
        .unwrap();
    let request = groups.request_access(first.id, &joiner, None).await.unwrap();

    assert_kind(
        groups.approve(second.id, request.id, &owner).await,
        ErrorKind::NotFound,
    );
    let still = groups.pending_requests(first.id, &owner).await.unwrap();
    assert_eq!(still[0].status, AccessRequestStatus::Pending);
}

#[tokio::test]
async fn invite_groups_are_hidden_from_outsiders() {
    let world = TestWorld::new("group-invite");
    let owner = world.user("owner").await;
    let outsider = world.user("outsider").await;
    let groups = &world.services.groups;
    let hidden = groups
        .create(&owner, new_group("Secret", Privacy::Invite))
        .await
        .unwrap();
    let open = groups
        .create(&owner, new_group("Open", Privacy::Public))
        .await
        .unwrap();

    assert_kind(
        groups.detail(hidden.id, Some(&outsider)).await,
        ErrorKind::NotFound,
    );
    assert_kind(groups.detail(hidden.id, None).await, ErrorKind::NotFound);

    let listed: Vec<_> = groups
        .list(Some(&outsider))
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(listed, vec![open.id]);

    let owner_view = groups.detail(hidden.id, Some(&owner)).await.unwrap();
    assert!(owner_view.is_owner);
    assert_eq!(owner_view.pending_requests, Some(Vec::new()));
}

#[tokio::test]
async fn market_links_are_managed_by_group_admins() {
    let world = TestWorld::new("group-markets");
    let owner = world.user("owner").await;
    let stranger = world.user("stranger").await;
    let market = world
        .services
        .markets
        .create(&stranger, binary_market("Linked"))
        .await
        .unwrap();
    let groups = &world.services.groups;
    let group = groups
        .create(&owner, new_group("Linkers", Privacy::Public))
        .await
        .unwrap();

    assert_kind(
        groups.add_market(group.id, market.id, &stranger).await,
        ErrorKind::PermissionDenied,
    );
    let link = groups.add_market(group.id, market.id, &owner).await.unwrap();
    assert_eq!(link.market_title, "Linked");
    assert_kind(
        groups.add_market(group.id, market.id, &owner).await,
        ErrorKind::Conflict,
    );

    let view = groups.detail(group.id, Some(&owner)).await.unwrap();
    assert_eq!(view.detail.markets.len(), 1);

    groups.remove_market(group.id, market.id, &owner).await.unwrap();
    assert_kind(
        groups.remove_market(group.id, market.id, &owner).await,
        ErrorKind::NotFound,
    );
}

#[tokio::test]
async fn owner_promotes_members_to_admin() {
    let world = TestWorld::new("group-admins");
    let owner = world.user("owner").await;
    let member = world.user("member").await;
    let outsider = world.user("outsider").await;
    let groups = &world.services.groups;
    let group = groups
        .create(&owner, new_group("Ranks", Privacy::Invite))
        .await
        .unwrap();
    let request = groups.request_access(group.id, &member, None).await.unwrap();
    groups.approve(group.id, request.id, &owner).await.unwrap();

    assert_kind(
        groups.add_admin(group.id, outsider.user_id, &owner).await,
        ErrorKind::Validation,
    );
    assert_kind(
        groups.add_admin(group.id, member.user_id, &member).await,
        ErrorKind::PermissionDenied,
    );

    let roster = groups.add_admin(group.id, member.user_id, &owner).await.unwrap();
    assert!(roster.is_admin(member.user_id));
    assert_kind(
        groups.add_admin(group.id, member.user_id, &owner).await,
        ErrorKind::Conflict,
    );

    // New admins may decide requests but not promote others.
    let request = groups.request_access(group.id, &outsider, None).await.unwrap();
    groups.approve(group.id, request.id, &member).await.unwrap();
    assert_kind(
        groups.add_admin(group.id, outsider.user_id, &member).await,
        ErrorKind::PermissionDenied,
    );
}
