//! Integration tests for the identity service against in-memory
//! SurrealDB.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use agentxmap_auth::{
    AcceptInvitationInput, AuthError, IdentityConfig, IdentityEvent, IdentityObserver,
    IdentityService, InviteInput, LoginInput, SignUpInput, SignUpOutput,
};
use agentxmap_core::RequestContext;
use agentxmap_core::error::{AgentXmapError, AgentXmapResult};
use agentxmap_core::models::invitation::{CreateInvitation, Invitation, InvitationStatus};
use agentxmap_core::models::user::{CreateUser, UserRole};
use agentxmap_core::repository::{InvitationRepository, OrganizationRepository, UserRepository};
use agentxmap_db::repository::{
    SurrealInvitationRepository, SurrealOrganizationRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<IdentityEvent>>,
}

impl Recorder {
    fn events(&self) -> Vec<IdentityEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl IdentityObserver for Recorder {
    fn record(&self, event: &IdentityEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Invitation repository that injects failures around the real one.
#[derive(Default)]
struct Faults {
    /// Number of upcoming `create` calls to fail as token collisions.
    collisions: AtomicU32,
    /// Successful `create` calls allowed before the store goes down.
    creates_before_outage: Option<u32>,
    creates: AtomicU32,
    /// Revoke the invitation right after it is looked up by token.
    revoke_after_lookup: AtomicBool,
    /// Fail the `pending -> accepted` write with a transport error.
    fail_accept_mark: AtomicBool,
}

struct FaultyInvitations {
    inner: SurrealInvitationRepository<Db>,
    faults: Arc<Faults>,
}

impl InvitationRepository for FaultyInvitations {
    async fn create(&self, input: CreateInvitation) -> AgentXmapResult<Invitation> {
        let pending = self.faults.collisions.load(Ordering::SeqCst);
        if pending > 0 {
            self.faults.collisions.store(pending - 1, Ordering::SeqCst);
            return Err(AgentXmapError::AlreadyExists {
                entity: "invitation".into(),
            });
        }
        let done = self.faults.creates.fetch_add(1, Ordering::SeqCst);
        if self.faults.creates_before_outage.is_some_and(|limit| done >= limit) {
            return Err(AgentXmapError::Database("connection reset".into()));
        }
        self.inner.create(input).await
    }

    async fn get_by_id(&self, id: Uuid) -> AgentXmapResult<Invitation> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_token(&self, token: &str) -> AgentXmapResult<Invitation> {
        let found = self.inner.get_by_token(token).await?;
        if self.faults.revoke_after_lookup.load(Ordering::SeqCst) {
            self.inner
                .transition_status(found.id, InvitationStatus::Pending, InvitationStatus::Revoked)
                .await?;
        }
        Ok(found)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> AgentXmapResult<Invitation> {
        if to == InvitationStatus::Accepted && self.faults.fail_accept_mark.load(Ordering::SeqCst)
        {
            return Err(AgentXmapError::Database("connection reset".into()));
        }
        self.inner.transition_status(id, from, to).await
    }
}

struct Harness<I = SurrealInvitationRepository<Db>> {
    db: Surreal<Db>,
    service: IdentityService<SurrealUserRepository<Db>, I, SurrealTenantRepository<Db>, Arc<Recorder>>,
    recorder: Arc<Recorder>,
}

impl<I> Harness<I> {
    fn users(&self) -> SurrealUserRepository<Db> {
        SurrealUserRepository::new(self.db.clone())
    }

    fn invitations(&self) -> SurrealInvitationRepository<Db> {
        SurrealInvitationRepository::new(self.db.clone())
    }

    fn orgs(&self) -> SurrealOrganizationRepository<Db> {
        SurrealOrganizationRepository::new(self.db.clone())
    }
}

/// Cheap Argon2 parameters keep the suite fast.
fn test_config() -> IdentityConfig {
    IdentityConfig {
        password_memory_kib: 1024,
        password_iterations: 1,
        ..Default::default()
    }
}

async fn memory_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    agentxmap_db::run_migrations(&db).await.unwrap();
    db
}

fn build<I: InvitationRepository>(db: Surreal<Db>, invitations: I) -> Harness<I> {
    let recorder = Arc::new(Recorder::default());
    let service = IdentityService::new(
        SurrealUserRepository::new(db.clone()),
        invitations,
        SurrealTenantRepository::new(db.clone()),
        test_config(),
    )
    .unwrap()
    .with_observer(recorder.clone());

    Harness {
        db,
        service,
        recorder,
    }
}

async fn setup() -> Harness {
    let db = memory_db().await;
    build(db.clone(), SurrealInvitationRepository::new(db))
}

async fn setup_faulty(faults: Faults) -> (Harness<FaultyInvitations>, Arc<Faults>) {
    let db = memory_db().await;
    let faults = Arc::new(faults);
    let invitations = FaultyInvitations {
        inner: SurrealInvitationRepository::new(db.clone()),
        faults: faults.clone(),
    };
    (build(db, invitations), faults)
}

fn ctx() -> RequestContext {
    RequestContext::background()
}

async fn sign_up<I: InvitationRepository>(
    h: &Harness<I>,
    org: &str,
    email: &str,
    password: &str,
) -> SignUpOutput {
    h.service
        .sign_up(
            &ctx(),
            SignUpInput {
                organization_name: org.into(),
                email: email.into(),
                password: password.into(),
            },
        )
        .await
        .unwrap()
}

async fn invite_one<I: InvitationRepository>(
    h: &Harness<I>,
    invitor_id: Uuid,
    email: &str,
    role: UserRole,
) -> Invitation {
    let mut invitations = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id,
                emails: vec![email.into()],
                role,
            },
        )
        .await
        .unwrap();
    assert_eq!(invitations.len(), 1);
    invitations.remove(0)
}

fn accept_input(token: &str, password: &str) -> AcceptInvitationInput {
    AcceptInvitationInput {
        token: token.into(),
        password: password.into(),
        first_name: "Bob".into(),
        last_name: "Builder".into(),
    }
}

fn login_input(email: &str, password: &str) -> LoginInput {
    LoginInput {
        email: email.into(),
        password: password.into(),
    }
}

// -----------------------------------------------------------------------
// Sign-up and login
// -----------------------------------------------------------------------

#[tokio::test]
async fn sign_up_creates_organization_and_admin() {
    let h = setup().await;

    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    assert_eq!(out.organization.name, "Acme Corp");
    assert_eq!(out.organization.slug, "acme-corp");
    assert_eq!(out.user.organization_id, out.organization.id);
    assert_eq!(out.user.role, UserRole::Admin);
    assert_ne!(out.user.password_hash, "pw12345678");
    assert!(out.user.password_hash.starts_with("$argon2id$"));

    let admin = h
        .service
        .login(&ctx(), login_input("admin@acme.com", "pw12345678"))
        .await
        .unwrap();
    assert_eq!(admin.id, out.user.id);
    assert_eq!(admin.role, UserRole::Admin);

    assert!(h.recorder.events().contains(&IdentityEvent::TenantCreated {
        organization_id: out.organization.id,
        admin_id: out.user.id,
    }));
}

#[tokio::test]
async fn sign_up_with_taken_email_creates_nothing() {
    let h = setup().await;
    sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let err = h
        .service
        .sign_up(
            &ctx(),
            SignUpInput {
                organization_name: "Other Org".into(),
                email: "admin@acme.com".into(),
                password: "another".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UserAlreadyExists));
    assert!(h.orgs().get_by_slug("other-org").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn sign_up_with_taken_slug_is_organization_conflict() {
    let h = setup().await;
    sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let err = h
        .service
        .sign_up(
            &ctx(),
            SignUpInput {
                organization_name: "ACME corp!".into(),
                email: "second@acme.com".into(),
                password: "another".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::OrganizationAlreadyExists));
    assert!(
        h.users()
            .get_by_email("second@acme.com")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn sign_up_rejects_bad_input() {
    let h = setup().await;

    for (org, email, password, field) in [
        ("", "a@example.com", "pw", "organization_name"),
        ("!!!", "a@example.com", "pw", "organization_name"),
        ("Acme", "not-an-email", "pw", "email"),
        ("Acme", "a@example.com", "", "password"),
    ] {
        let err = h
            .service
            .sign_up(
                &ctx(),
                SignUpInput {
                    organization_name: org.into(),
                    email: email.into(),
                    password: password.into(),
                },
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthError::Validation { field: f, .. } if f == field),
            "expected validation error on {field}, got {err:?}"
        );
    }
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let h = setup().await;
    sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let wrong_password = h
        .service
        .login(&ctx(), login_input("admin@acme.com", "nope"))
        .await
        .unwrap_err();
    let unknown_email = h
        .service
        .login(&ctx(), login_input("ghost@acme.com", "pw12345678"))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn expired_context_fails_before_any_write() {
    let h = setup().await;
    let expired = RequestContext::with_deadline(tokio::time::Instant::now());

    let err = h
        .service
        .sign_up(
            &expired,
            SignUpInput {
                organization_name: "Late Inc".into(),
                email: "late@example.com".into(),
                password: "pw".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::Repository(AgentXmapError::DeadlineExceeded)
    ));
    assert!(h.orgs().get_by_slug("late-inc").await.unwrap_err().is_not_found());
}

// -----------------------------------------------------------------------
// Invitations
// -----------------------------------------------------------------------

#[tokio::test]
async fn invite_creates_pending_invitations() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let before = Utc::now();
    let invitations = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id: out.user.id,
                emails: vec!["bob@acme.com".into(), "carol@acme.com".into()],
                role: UserRole::Manager,
            },
        )
        .await
        .unwrap();

    assert_eq!(invitations.len(), 2);
    assert_ne!(invitations[0].token, invitations[1].token);
    for inv in &invitations {
        assert_eq!(inv.status, InvitationStatus::Pending);
        assert_eq!(inv.organization_id, out.organization.id);
        assert_eq!(inv.invitor_id, out.user.id);
        assert_eq!(inv.role, UserRole::Manager);
        assert_eq!(inv.token.len(), 43);
        assert!(inv.expires_at > before + Duration::hours(47));
        assert!(inv.expires_at <= Utc::now() + Duration::hours(48));
    }
}

#[tokio::test]
async fn invite_skips_existing_users() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let invitations = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id: out.user.id,
                emails: vec!["admin@acme.com".into(), "new@acme.com".into()],
                role: UserRole::User,
            },
        )
        .await
        .unwrap();

    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].email, "new@acme.com");
    assert!(h.recorder.events().contains(&IdentityEvent::InvitationSkipped {
        organization_id: out.organization.id,
        email: "admin@acme.com".into(),
    }));
}

#[tokio::test]
async fn plain_users_cannot_invite() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;
    let bob = h
        .service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw2"))
        .await
        .unwrap();

    let err = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id: bob.id,
                emails: vec!["eve@acme.com".into()],
                role: UserRole::Admin,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InsufficientPermissions));
    let created = h
        .recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, IdentityEvent::InvitationCreated { .. }))
        .count();
    assert_eq!(created, 1, "only the admin's invitation should exist");
}

#[tokio::test]
async fn unknown_invitor_is_rejected() {
    let h = setup().await;

    let err = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id: Uuid::new_v4(),
                emails: vec!["bob@acme.com".into()],
                role: UserRole::User,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvitorNotFound));
}

#[tokio::test]
async fn invalid_email_aborts_the_whole_batch() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let err = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id: out.user.id,
                emails: vec!["good@acme.com".into(), "broken".into()],
                role: UserRole::User,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Validation { field: "email", .. }));
    assert!(
        !h.recorder
            .events()
            .iter()
            .any(|e| matches!(e, IdentityEvent::InvitationCreated { .. }))
    );
}

// -----------------------------------------------------------------------
// Accepting invitations
// -----------------------------------------------------------------------

#[tokio::test]
async fn accept_creates_user_and_consumes_invitation() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::Manager).await;

    let bob = h
        .service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw2"))
        .await
        .unwrap();

    assert_eq!(bob.email, "bob@acme.com");
    assert_eq!(bob.organization_id, out.organization.id);
    assert_eq!(bob.role, UserRole::Manager);
    assert_eq!(bob.first_name.as_deref(), Some("Bob"));
    assert_eq!(bob.last_name.as_deref(), Some("Builder"));

    let stored = h.invitations().get_by_id(inv.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Accepted);

    let again = h
        .service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw3"))
        .await
        .unwrap_err();
    assert!(matches!(
        again,
        AuthError::InvitationNotPending {
            status: InvitationStatus::Accepted
        }
    ));
}

#[tokio::test]
async fn unknown_token_is_invalid() {
    let h = setup().await;

    let err = h
        .service
        .accept_invitation(&ctx(), accept_input("no-such-token", "pw"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidInvitationToken));
}

#[tokio::test]
async fn expired_invitation_is_marked_and_refused() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let stale = h
        .invitations()
        .create(CreateInvitation {
            organization_id: out.organization.id,
            invitor_id: out.user.id,
            email: "late@acme.com".into(),
            token: "stale-token".into(),
            role: UserRole::User,
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    let first = h
        .service
        .accept_invitation(&ctx(), accept_input("stale-token", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(first, AuthError::InvitationExpired));

    let stored = h.invitations().get_by_id(stale.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Expired);
    assert!(
        h.users()
            .get_by_email("late@acme.com")
            .await
            .unwrap_err()
            .is_not_found()
    );

    let second = h
        .service
        .accept_invitation(&ctx(), accept_input("stale-token", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(
        second,
        AuthError::InvitationNotPending {
            status: InvitationStatus::Expired
        }
    ));
}

#[tokio::test]
async fn accept_for_registered_email_is_refused() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;

    // The address is registered elsewhere after the invitation was sent.
    h.users()
        .create(CreateUser {
            organization_id: Uuid::new_v4(),
            email: "bob@acme.com".into(),
            password_hash: "$argon2id$stub".into(),
            role: UserRole::User,
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap();

    let err = h
        .service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserAlreadyExists));

    let stored = h.invitations().get_by_id(inv.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Pending);
}

#[tokio::test]
async fn concurrent_accepts_create_one_user() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;

    let ctx_a = ctx();
    let ctx_b = ctx();
    let (a, b) = tokio::join!(
        h.service
            .accept_invitation(&ctx_a, accept_input(&inv.token, "first")),
        h.service
            .accept_invitation(&ctx_b, accept_input(&inv.token, "second")),
    );

    let winner = match (a, b) {
        (Ok(user), Err(_)) | (Err(_), Ok(user)) => user,
        (a, b) => panic!("exactly one accept must succeed: {a:?} / {b:?}"),
    };

    let stored_user = h.users().get_by_email("bob@acme.com").await.unwrap();
    assert_eq!(stored_user.id, winner.id);

    let stored = h.invitations().get_by_id(inv.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Accepted);
}

// -----------------------------------------------------------------------
// Revocation
// -----------------------------------------------------------------------

#[tokio::test]
async fn revoked_invitation_cannot_be_accepted() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;

    let revoked = h
        .service
        .revoke_invitation(&ctx(), out.user.id, inv.id)
        .await
        .unwrap();
    assert_eq!(revoked.status, InvitationStatus::Revoked);

    let err = h
        .service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw2"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::InvitationNotPending {
            status: InvitationStatus::Revoked
        }
    ));

    let twice = h
        .service
        .revoke_invitation(&ctx(), out.user.id, inv.id)
        .await
        .unwrap_err();
    assert!(matches!(twice, AuthError::InvitationNotPending { .. }));
}

#[tokio::test]
async fn other_tenants_cannot_revoke() {
    let h = setup().await;
    let acme = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let globex = sign_up(&h, "Globex", "admin@globex.com", "pw12345678").await;
    let inv = invite_one(&h, acme.user.id, "bob@acme.com", UserRole::User).await;

    let err = h
        .service
        .revoke_invitation(&ctx(), globex.user.id, inv.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidInvitationToken));

    let stored = h.invitations().get_by_id(inv.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Pending);
}

// -----------------------------------------------------------------------
// End to end
// -----------------------------------------------------------------------

#[tokio::test]
async fn invited_user_can_log_in() {
    let h = setup().await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;

    h.service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw2"))
        .await
        .unwrap();

    let bob = h
        .service
        .login(&ctx(), login_input("bob@acme.com", "pw2"))
        .await
        .unwrap();
    assert_eq!(bob.role, UserRole::User);
    assert_eq!(bob.organization_id, out.organization.id);
}

// -----------------------------------------------------------------------
// Store faults and races
// -----------------------------------------------------------------------

#[tokio::test]
async fn oversized_invitation_lifetime_is_rejected_at_construction() {
    let db = memory_db().await;
    let config = IdentityConfig {
        invitation_lifetime_secs: 10_000_000_000_000,
        ..test_config()
    };
    let built = IdentityService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealInvitationRepository::new(db.clone()),
        SurrealTenantRepository::new(db),
        config,
    );
    let err = match built {
        Ok(_) => panic!("service accepted an unrepresentable lifetime"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        AuthError::Validation { field, .. } if field == "invitation_lifetime_secs"
    ));
}

#[tokio::test]
async fn token_collision_is_retried_with_a_fresh_token() {
    let (h, faults) = setup_faulty(Faults {
        collisions: AtomicU32::new(1),
        ..Faults::default()
    })
    .await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;

    assert_eq!(faults.creates.load(Ordering::SeqCst), 1);
    let stored = h.invitations().get_by_token(&inv.token).await.unwrap();
    assert_eq!(stored.id, inv.id);
    assert!(
        h.recorder
            .events()
            .contains(&IdentityEvent::InvitationTokenCollision { attempt: 1 })
    );
}

#[tokio::test]
async fn repeated_token_collisions_fail_the_invite() {
    let (h, _faults) = setup_faulty(Faults {
        collisions: AtomicU32::new(u32::MAX),
        ..Faults::default()
    })
    .await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let err = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id: out.user.id,
                emails: vec!["bob@acme.com".into()],
                role: UserRole::User,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::TokenCollision));
    let attempts: Vec<u32> = h
        .recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            IdentityEvent::InvitationTokenCollision { attempt } => Some(attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
}

#[tokio::test]
async fn store_outage_aborts_the_rest_of_the_batch() {
    let (h, _faults) = setup_faulty(Faults {
        creates_before_outage: Some(1),
        ..Faults::default()
    })
    .await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;

    let err = h
        .service
        .invite_users(
            &ctx(),
            InviteInput {
                invitor_id: out.user.id,
                emails: vec![
                    "bob@acme.com".into(),
                    "carol@acme.com".into(),
                    "dave@acme.com".into(),
                ],
                role: UserRole::User,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::Repository(AgentXmapError::Database(_))
    ));
    let created = h
        .recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, IdentityEvent::InvitationCreated { .. }))
        .count();
    assert_eq!(created, 1);
}

#[tokio::test]
async fn failed_accept_mark_keeps_the_user() {
    let (h, faults) = setup_faulty(Faults::default()).await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;
    faults.fail_accept_mark.store(true, Ordering::SeqCst);

    let user = h
        .service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw2"))
        .await
        .unwrap();

    let stored_user = h.users().get_by_email("bob@acme.com").await.unwrap();
    assert_eq!(stored_user.id, user.id);
    let stored = h.invitations().get_by_id(inv.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Pending);
    assert!(h.recorder.events().iter().any(|e| matches!(
        e,
        IdentityEvent::InvitationMarkFailed { invitation_id, user_id, .. }
            if *invitation_id == inv.id && *user_id == user.id
    )));
}

#[tokio::test]
async fn revoke_during_accept_discards_the_new_user() {
    let (h, faults) = setup_faulty(Faults::default()).await;
    let out = sign_up(&h, "Acme Corp", "admin@acme.com", "pw12345678").await;
    let inv = invite_one(&h, out.user.id, "bob@acme.com", UserRole::User).await;
    faults.revoke_after_lookup.store(true, Ordering::SeqCst);

    let err = h
        .service
        .accept_invitation(&ctx(), accept_input(&inv.token, "pw2"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::InvitationNotPending {
            status: InvitationStatus::Revoked
        }
    ));
    let lookup = h.users().get_by_email("bob@acme.com").await;
    assert!(matches!(lookup, Err(AgentXmapError::NotFound { .. })));
    let stored = h.invitations().get_by_id(inv.id).await.unwrap();
    assert_eq!(stored.status, InvitationStatus::Revoked);
    assert!(h.recorder.events().iter().any(|e| matches!(
        e,
        IdentityEvent::InvitationAcceptRolledBack {
            invitation_id,
            status: InvitationStatus::Revoked,
            error: None,
            ..
        } if *invitation_id == inv.id
    )));
    assert!(
        !h.recorder
            .events()
            .iter()
            .any(|e| matches!(e, IdentityEvent::InvitationAccepted { .. }))
    );
}
