use kastia::domain::{Actor, AuditAction, AuditFilter, AuditEntry};
use kastia::error::{AccessError, Error, ErrorKind, StateError};
use kastia::testkit::TestWorld;

pub fn assert_kind<T: std::fmt::Debug>(result: Result<T, Error>, kind: ErrorKind) -> Error {
    match result {
        Ok(value) => panic!("expected {kind:?}, got Ok({value:?})"),
        Err(err) => {
            assert_eq!(err.kind(), kind, "unexpected error: {err}");
            err
        }
    }
}

pub fn assert_invalid_state<T: std::fmt::Debug>(result: Result<T, Error>) {
    let err = assert_kind(result, ErrorKind::Conflict);
    assert!(
        matches!(err, Error::State(StateError::InvalidState(_))),
        "expected InvalidState, got {err}"
    );
}

pub fn assert_separation_of_duty<T: std::fmt::Debug>(result: Result<T, Error>) {
    let err = assert_kind(result, ErrorKind::PermissionDenied);
    assert!(matches!(err, Error::Access(AccessError::SeparationOfDuty)));
}

/// Audit entries of one action, read through an admin.
pub async fn audit_of(world: &TestWorld, reader: &Actor, action: AuditAction) -> Vec<AuditEntry> {
    world
        .services
        .audit
        .entries(
            reader,
            AuditFilter {
                action: Some(action),
                ..AuditFilter::default()
            },
        )
        .await
        .expect("read audit log")
}
