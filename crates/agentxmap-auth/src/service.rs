//! Identity service: sign-up, login and invitation orchestration.

use agentxmap_core::RequestContext;
use agentxmap_core::error::AgentXmapError;
use agentxmap_core::models::invitation::{Invitation, InvitationStatus};
use agentxmap_core::models::organization::{CreateOrganization, Organization};
use agentxmap_core::models::tenant::CreateTenant;
use agentxmap_core::models::user::{CreateUser, User, UserRole};
use agentxmap_core::repository::{InvitationRepository, TenantRepository, UserRepository};
use agentxmap_core::slugify;
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::{AuthError, AuthResult};
use crate::events::{IdentityEvent, IdentityObserver, TracingObserver};
use crate::invitation::{self, AcceptCheck, Transition};
use crate::password::PasswordCodec;
use crate::token;
use crate::validation::{require_non_empty, validate_email};

/// Input for tenant sign-up.
#[derive(Debug)]
pub struct SignUpInput {
    pub organization_name: String,
    pub email: String,
    pub password: String,
}

/// The organization created by sign-up together with its admin.
#[derive(Debug)]
pub struct SignUpOutput {
    pub organization: Organization,
    pub user: User,
}

#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for the batch invite flow.
#[derive(Debug)]
pub struct InviteInput {
    pub invitor_id: Uuid,
    pub emails: Vec<String>,
    pub role: UserRole,
}

#[derive(Debug)]
pub struct AcceptInvitationInput {
    pub token: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Identity service.
///
/// Generic over repository implementations so that the identity layer
/// has no dependency on the database crate. Diagnostics go to the
/// injected observer `O`.
pub struct IdentityService<U, I, T, O = TracingObserver> {
    user_repo: U,
    invitation_repo: I,
    tenant_repo: T,
    codec: PasswordCodec,
    config: IdentityConfig,
    invitation_lifetime: TimeDelta,
    observer: O,
}

impl<U, I, T> IdentityService<U, I, T>
where
    U: UserRepository,
    I: InvitationRepository,
    T: TenantRepository,
{
    /// Fails if the Argon2 cost parameters or the invitation lifetime are
    /// out of range.
    pub fn new(
        user_repo: U,
        invitation_repo: I,
        tenant_repo: T,
        config: IdentityConfig,
    ) -> AuthResult<Self> {
        Ok(Self {
            user_repo,
            invitation_repo,
            tenant_repo,
            codec: PasswordCodec::new(&config)?,
            invitation_lifetime: config.invitation_lifetime()?,
            config,
            observer: TracingObserver,
        })
    }
}

impl<U, I, T, O> IdentityService<U, I, T, O>
where
    U: UserRepository,
    I: InvitationRepository,
    T: TenantRepository,
    O: IdentityObserver,
{
    /// Replace the diagnostics sink.
    pub fn with_observer<O2: IdentityObserver>(self, observer: O2) -> IdentityService<U, I, T, O2> {
        IdentityService {
            user_repo: self.user_repo,
            invitation_repo: self.invitation_repo,
            tenant_repo: self.tenant_repo,
            codec: self.codec,
            config: self.config,
            invitation_lifetime: self.invitation_lifetime,
            observer,
        }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Bootstrap a new tenant: an organization plus its first admin.
    ///
    /// The first user of an organization is always its `Admin`; creating
    /// the organization is what makes them its owner.
    pub async fn sign_up(
        &self,
        ctx: &RequestContext,
        input: SignUpInput,
    ) -> AuthResult<SignUpOutput> {
        require_non_empty("organization_name", &input.organization_name)?;
        validate_email(&input.email)?;
        require_non_empty("password", &input.password)?;

        let name = input.organization_name.trim().to_string();
        let slug = slugify(&name);
        if slug.is_empty() {
            return Err(AuthError::validation(
                "organization_name",
                "must contain at least one letter or digit",
            ));
        }

        // 1. Refuse taken emails up front so callers get a domain error
        //    rather than an index violation.
        if self.find_user_by_email(ctx, &input.email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        // 2. Hash the password.
        let password_hash = self.codec.hash(&input.password)?;

        // 3. Organization and admin in one atomic write.
        let tenant = ctx
            .run(self.tenant_repo.create_tenant(CreateTenant {
                organization: CreateOrganization { name, slug },
                admin: CreateUser {
                    organization_id: Uuid::nil(),
                    email: input.email,
                    password_hash,
                    role: UserRole::Admin,
                    first_name: None,
                    last_name: None,
                },
            }))
            .await
            .map_err(|e| match e {
                AgentXmapError::AlreadyExists { entity } if entity == "organization" => {
                    AuthError::OrganizationAlreadyExists
                }
                AgentXmapError::AlreadyExists { .. } => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        self.observer.record(&IdentityEvent::TenantCreated {
            organization_id: tenant.organization.id,
            admin_id: tenant.admin.id,
        });

        Ok(SignUpOutput {
            organization: tenant.organization,
            user: tenant.admin,
        })
    }

    /// Authenticate with email + password.
    ///
    /// Unknown emails, failed lookups and wrong passwords all yield the
    /// same [`AuthError::InvalidCredentials`].
    pub async fn login(&self, ctx: &RequestContext, input: LoginInput) -> AuthResult<User> {
        // 1. Look up user.
        let user = match ctx.run(self.user_repo.get_by_email(&input.email)).await {
            Ok(user) => user,
            Err(e) => {
                // Spend the same Argon2 work as a real verification.
                self.codec.verify_dummy(&input.password);
                self.observer.record(&IdentityEvent::LoginFailed {
                    lookup_error: (!e.is_not_found()).then(|| e.to_string()),
                });
                return Err(AuthError::InvalidCredentials);
            }
        };

        // 2. Verify password.
        if !self.codec.verify(&input.password, &user.password_hash) {
            self.observer
                .record(&IdentityEvent::LoginFailed { lookup_error: None });
            return Err(AuthError::InvalidCredentials);
        }

        self.observer
            .record(&IdentityEvent::LoginSucceeded { user_id: user.id });
        Ok(user)
    }

    /// Invite a batch of emails into the invitor's organization.
    ///
    /// Emails that already belong to a user are skipped without error and
    /// are simply absent from the result. Any persistence failure aborts
    /// the batch.
    pub async fn invite_users(
        &self,
        ctx: &RequestContext,
        input: InviteInput,
    ) -> AuthResult<Vec<Invitation>> {
        // 1. Load invitor.
        let invitor = match ctx.run(self.user_repo.get_by_id(input.invitor_id)).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(AuthError::InvitorNotFound),
            Err(e) => return Err(e.into()),
        };

        // 2. Authorize before touching any email.
        if !invitor.role.can_invite() {
            return Err(AuthError::InsufficientPermissions);
        }

        for email in &input.emails {
            validate_email(email)?;
        }

        let now = Utc::now();
        let mut invitations = Vec::with_capacity(input.emails.len());

        for email in &input.emails {
            // 3. Existing members are skipped.
            if self.find_user_by_email(ctx, email).await?.is_some() {
                self.observer.record(&IdentityEvent::InvitationSkipped {
                    organization_id: invitor.organization_id,
                    email: email.clone(),
                });
                continue;
            }

            // 4. Create the pending invitation.
            let created = self
                .create_invitation(ctx, &invitor, email, input.role, now)
                .await?;
            self.observer.record(&IdentityEvent::InvitationCreated {
                invitation_id: created.id,
                organization_id: created.organization_id,
            });
            invitations.push(created);
        }

        Ok(invitations)
    }

    /// Redeem an invitation token, creating the invited user.
    pub async fn accept_invitation(
        &self,
        ctx: &RequestContext,
        input: AcceptInvitationInput,
    ) -> AuthResult<User> {
        require_non_empty("password", &input.password)?;
        require_non_empty("first_name", &input.first_name)?;
        require_non_empty("last_name", &input.last_name)?;

        // 1. Look up invitation.
        let invitation = match ctx.run(self.invitation_repo.get_by_token(&input.token)).await {
            Ok(invitation) => invitation,
            Err(e) if e.is_not_found() => return Err(AuthError::InvalidInvitationToken),
            Err(e) => return Err(e.into()),
        };

        // 2-3. Status gate, then lazy expiry.
        if invitation::check_accept(&invitation, Utc::now())? == AcceptCheck::Expire {
            match Transition::EXPIRE
                .apply(&self.invitation_repo, ctx, invitation.id)
                .await
            {
                // A concurrent writer already moved it to a terminal state;
                // it is unusable either way.
                Ok(_) | Err(AuthError::InvitationConflict) => {}
                Err(e) => return Err(e),
            }
            self.observer.record(&IdentityEvent::InvitationExpired {
                invitation_id: invitation.id,
            });
            return Err(AuthError::InvitationExpired);
        }

        // 4. Hash the password.
        let password_hash = self.codec.hash(&input.password)?;

        // 5. Create the user. The unique email index makes this the
        //    single winner when two accepts race on one token.
        let user = ctx
            .run(self.user_repo.create(CreateUser {
                organization_id: invitation.organization_id,
                email: invitation.email.clone(),
                password_hash,
                role: invitation.role,
                first_name: Some(input.first_name.trim().to_string()),
                last_name: Some(input.last_name.trim().to_string()),
            }))
            .await
            .map_err(|e| match e {
                AgentXmapError::AlreadyExists { .. } => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        // 6. Mark accepted. Losing the compare-and-set to a revoke or an
        //    expiry undoes the user; any other failure is reported but does
        //    not fail the call.
        let mark_error = match Transition::ACCEPT
            .apply(&self.invitation_repo, ctx, invitation.id)
            .await
        {
            Ok(_) => {
                self.observer.record(&IdentityEvent::InvitationAccepted {
                    invitation_id: invitation.id,
                    user_id: user.id,
                });
                return Ok(user);
            }
            Err(AuthError::InvitationConflict) => {
                match ctx.run(self.invitation_repo.get_by_id(invitation.id)).await {
                    Ok(current) if current.status != InvitationStatus::Accepted => {
                        self.discard_user(ctx, &user, &current).await;
                        return Err(AuthError::InvitationNotPending {
                            status: current.status,
                        });
                    }
                    Ok(_) => AuthError::InvitationConflict.to_string(),
                    Err(e) => e.to_string(),
                }
            }
            Err(e) => e.to_string(),
        };

        self.observer.record(&IdentityEvent::InvitationMarkFailed {
            invitation_id: invitation.id,
            user_id: user.id,
            error: mark_error,
        });
        Ok(user)
    }

    /// Soft-delete a user created from an invitation that was closed
    /// concurrently.
    async fn discard_user(&self, ctx: &RequestContext, user: &User, invitation: &Invitation) {
        let error = ctx
            .run(self.user_repo.delete(user.id))
            .await
            .err()
            .map(|e| e.to_string());
        self.observer.record(&IdentityEvent::InvitationAcceptRolledBack {
            invitation_id: invitation.id,
            user_id: user.id,
            status: invitation.status,
            error,
        });
    }

    /// Cancel a pending invitation. Only admins and managers of the
    /// invitation's organization may do so.
    pub async fn revoke_invitation(
        &self,
        ctx: &RequestContext,
        actor_id: Uuid,
        invitation_id: Uuid,
    ) -> AuthResult<Invitation> {
        let actor = match ctx.run(self.user_repo.get_by_id(actor_id)).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(AuthError::InvitorNotFound),
            Err(e) => return Err(e.into()),
        };
        if !actor.role.can_invite() {
            return Err(AuthError::InsufficientPermissions);
        }

        let invitation = match ctx.run(self.invitation_repo.get_by_id(invitation_id)).await {
            Ok(invitation) => invitation,
            Err(e) if e.is_not_found() => return Err(AuthError::InvalidInvitationToken),
            Err(e) => return Err(e.into()),
        };
        // Other tenants' invitations look the same as missing ones.
        if invitation.organization_id != actor.organization_id {
            return Err(AuthError::InvalidInvitationToken);
        }

        let revoked = Transition::new(invitation.status, InvitationStatus::Revoked)?
            .apply(&self.invitation_repo, ctx, invitation.id)
            .await?;

        self.observer.record(&IdentityEvent::InvitationRevoked {
            invitation_id: revoked.id,
            actor_id: actor.id,
        });
        Ok(revoked)
    }

    async fn find_user_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> AuthResult<Option<User>> {
        match ctx.run(self.user_repo.get_by_email(email)).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist one invitation, regenerating the token on a uniqueness
    /// collision up to the configured number of attempts.
    async fn create_invitation(
        &self,
        ctx: &RequestContext,
        invitor: &User,
        email: &str,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> AuthResult<Invitation> {
        let attempts = self.config.invitation_token_attempts.max(1);
        for attempt in 1..=attempts {
            let token = token::generate_invitation_token()?;
            let input = invitation::new_invitation(
                invitor,
                email,
                role,
                token,
                now,
                self.invitation_lifetime,
            )?;
            match ctx.run(self.invitation_repo.create(input)).await {
                Ok(created) => return Ok(created),
                Err(AgentXmapError::AlreadyExists { .. }) => {
                    self.observer
                        .record(&IdentityEvent::InvitationTokenCollision { attempt });
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AuthError::TokenCollision)
    }
}
