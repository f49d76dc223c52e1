//! View state coordinator.
//!
//! Owns the identity session, the mail session and the [`SessionState`]
//! they feed. Every handler issues its round trips in order and applies the
//! results when they are back; after a mutation it runs the refresh steps
//! from [`refresh_after`]. A request made after the delegation expired ends
//! the session instead of reaching the store.

use threemail_identity::{Authenticator, Identity, SessionManager, SessionStore};
use threemail_store::{Connect, Message, MessageStore};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::resolver::normalize_alias;
use crate::service::MailSession;
use crate::state::{ComposeForm, Operation, Phase, Refresh, SessionState, View, refresh_after};

/// Status shown when the recipient resolves to nothing.
pub const RECIPIENT_NOT_FOUND: &str = "Recipient is not a valid 3Mail address.";

/// Status shown when sending fails for any other reason.
pub const SEND_FAILED: &str = "Failed to send message.";

/// Status shown when the session ended because its delegation expired.
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

const COMPOSE_INCOMPLETE: &str = "Please enter a recipient and a subject.";
const LOGIN_FAILED: &str = "Login failed.";
const LOAD_FAILED: &str = "Failed to load messages.";
const MARK_FAILED: &str = "Failed to mark message as viewed.";
const DELETE_FAILED: &str = "Failed to delete message.";
const DELETE_ALL_FAILED: &str = "Failed to delete messages.";
const CLAIM_FAILED: &str = "Failed to claim username.";
const COUNTS_FAILED: &str = "Failed to refresh counters.";

/// Alert raised when an alias belongs to someone else.
#[must_use]
pub fn alias_taken(alias: &str) -> String {
    format!("Username \"{alias}\" is already taken.")
}

/// Drives one user's session from login to logout.
pub struct Coordinator<A, P, C: Connect> {
    sessions: SessionManager<A, P>,
    connector: C,
    mail: Option<MailSession<C::Store>>,
    state: SessionState,
}

impl<A, P, C> Coordinator<A, P, C>
where
    A: Authenticator,
    P: SessionStore,
    C: Connect,
{
    /// Creates a logged-out coordinator.
    #[must_use]
    pub fn new(sessions: SessionManager<A, P>, connector: C) -> Self {
        Self {
            sessions,
            connector,
            mail: None,
            state: SessionState::new(),
        }
    }

    /// Everything there is to render.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Mutable view state, for editing the compose form.
    pub const fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// The mail session, once initialized.
    #[must_use]
    pub const fn mail(&self) -> Option<&MailSession<C::Store>> {
        self.mail.as_ref()
    }

    /// Restores a persisted session, if there is one, and initializes it.
    ///
    /// Returns true when a session is active afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached at all.
    pub async fn start(&mut self) -> Result<bool> {
        if self.state.phase() != Phase::Unauthenticated {
            return Ok(true);
        }

        let Some(identity) = self.sessions.restore_session() else {
            return Ok(false);
        };
        self.initialize(&identity).await?;
        Ok(true)
    }

    /// Runs the interactive login and initializes the new session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Identity`] if the login fails or is cancelled,
    /// [`Error::NotAuthenticated`] if the provider hands back the anonymous
    /// principal, and [`Error::InvalidTransition`] if already logged in.
    pub async fn login(&mut self) -> Result<()> {
        if self.state.phase() != Phase::Unauthenticated {
            return Err(Error::InvalidTransition {
                from: self.state.phase(),
                to: Phase::Initializing,
            });
        }

        let ticket = self.state.begin(Operation::Login)?;
        let outcome = self.sessions.login().await;
        self.state.finish(ticket);

        let identity = match outcome {
            Ok(identity) => identity,
            Err(e) => {
                self.state.set_status(LOGIN_FAILED);
                return Err(e.into());
            }
        };

        if identity.principal().is_anonymous() {
            warn!("Identity provider returned the anonymous principal");
            if let Err(e) = self.sessions.logout() {
                warn!("Could not discard anonymous session: {e}");
            }
            self.state.set_status(LOGIN_FAILED);
            return Err(Error::NotAuthenticated);
        }

        self.initialize(&identity).await
    }

    /// First fetches after authentication. Failures degrade to defaults
    /// instead of aborting: no alias (and the claim prompt), zero counters,
    /// an empty inbox.
    async fn initialize(&mut self, identity: &Identity) -> Result<()> {
        let store = self.connector.connect(identity.channel())?;
        self.state.transition(Phase::Initializing)?;
        let ticket = self.state.begin(Operation::Initialize)?;

        let mail = MailSession::new(store);
        let principal = identity.principal().clone();
        self.state.set_principal(principal.clone());

        let alias = match mail.alias_of(&principal).await {
            Ok(record) => record.map(|record| record.alias),
            Err(e) => {
                warn!("Could not fetch alias: {e}");
                None
            }
        };
        self.state.set_alias(alias);

        if let Err(e) = load_view(&mail, &mut self.state, View::Inbox).await {
            warn!("Could not fetch inbox: {e}");
        }
        self.mail = Some(mail);
        self.refresh(&[Refresh::ReceivedCount, Refresh::SentCount])
            .await;
        self.state.finish(ticket);
        self.state.transition(Phase::Ready)?;
        info!("Session ready for {principal}");
        Ok(())
    }

    /// Ends the session and drops all view state. Idempotent.
    ///
    /// Returns false when there was no session.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted session could not be removed; the
    /// in-memory session is gone regardless.
    pub fn logout(&mut self) -> Result<bool> {
        if self.state.phase() == Phase::Unauthenticated && !self.sessions.is_authenticated() {
            debug!("Logout without a session");
            return Ok(false);
        }

        let outcome = self.sessions.logout();
        self.mail = None;
        self.state.reset();
        Ok(outcome?)
    }

    /// Fetches and shows `view`.
    ///
    /// # Errors
    ///
    /// Returns an error if not ready, if a list request is already running,
    /// or if the store call fails. The previous list stays on failure.
    pub async fn show(&mut self, view: View) -> Result<()> {
        self.check_delegation()?;
        let mail = ready(self.mail.as_ref(), &self.state)?;
        let ticket = self.state.begin(Operation::List)?;
        let outcome = load_view(mail, &mut self.state, view).await;
        self.state.finish(ticket);

        match outcome {
            Ok(_) => {
                self.state.clear_status();
                Ok(())
            }
            Err(e) => {
                warn!("Could not load messages: {e}");
                self.state.set_status(LOAD_FAILED);
                Err(e.into())
            }
        }
    }

    /// Replaces the compose form.
    pub fn compose(&mut self, form: ComposeForm) {
        *self.state.compose_mut() = form;
    }

    /// Sends the compose form.
    ///
    /// The recipient is resolved first; nothing is submitted unless it
    /// resolves. On success the form is cleared and the counters are
    /// refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCompose`] for an incomplete form,
    /// [`Error::RecipientNotFound`] for an unknown recipient, or the store
    /// error. The form is kept on failure.
    pub async fn send(&mut self) -> Result<String> {
        self.check_delegation()?;
        let mail = ready(self.mail.as_ref(), &self.state)?;
        let ticket = self.state.begin(Operation::Send)?;
        let outcome = submit(mail, self.state.compose()).await;
        self.state.finish(ticket);

        match outcome {
            Ok(acknowledgement) => {
                self.state.set_status(acknowledgement.clone());
                self.state.compose_mut().clear();
                self.refresh(refresh_after(Operation::Send)).await;
                Ok(acknowledgement)
            }
            Err(e) => {
                warn!("Send failed: {e}");
                let status = match &e {
                    Error::RecipientNotFound(_) => RECIPIENT_NOT_FOUND,
                    Error::InvalidCompose(_) => COMPOSE_INCOMPLETE,
                    _ => SEND_FAILED,
                };
                self.state.set_status(status);
                Err(e)
            }
        }
    }

    /// Opens the first message in the current list with `subject`, marking
    /// it viewed if it was received and unread.
    ///
    /// # Errors
    ///
    /// Returns an error if marking it viewed fails.
    pub async fn open(&mut self, subject: &str) -> Result<Option<Message>> {
        let Some(message) = self
            .state
            .messages()
            .iter()
            .find(|m| m.subject == subject)
            .cloned()
        else {
            return Ok(None);
        };

        if !message.viewed && self.state.view() != &View::Sent {
            self.mark_viewed(subject).await?;
        }
        Ok(Some(message))
    }

    /// Marks received messages with `subject` as viewed, then refreshes the
    /// current list.
    ///
    /// # Errors
    ///
    /// Returns an error if not ready, busy, or the store call fails.
    pub async fn mark_viewed(&mut self, subject: &str) -> Result<String> {
        self.check_delegation()?;
        let mail = ready(self.mail.as_ref(), &self.state)?;
        let ticket = self.state.begin(Operation::MarkViewed)?;
        let outcome = mail.mark_viewed(subject).await;
        self.state.finish(ticket);
        self.complete(Operation::MarkViewed, outcome, MARK_FAILED)
            .await
    }

    /// Deletes received messages with `subject`, then refreshes the current
    /// list and the received counter.
    ///
    /// # Errors
    ///
    /// Returns an error if not ready, busy, or the store call fails.
    pub async fn delete(&mut self, subject: &str) -> Result<String> {
        self.check_delegation()?;
        let mail = ready(self.mail.as_ref(), &self.state)?;
        let ticket = self.state.begin(Operation::Delete)?;
        let outcome = mail.delete(subject).await;
        self.state.finish(ticket);
        self.complete(Operation::Delete, outcome, DELETE_FAILED)
            .await
    }

    /// Deletes every received message. The list is emptied locally once the
    /// store acknowledges.
    ///
    /// # Errors
    ///
    /// Returns an error if not ready, busy, or the store call fails.
    pub async fn delete_all(&mut self) -> Result<String> {
        self.check_delegation()?;
        let mail = ready(self.mail.as_ref(), &self.state)?;
        let ticket = self.state.begin(Operation::DeleteAll)?;
        let outcome = mail.delete_all().await;
        self.state.finish(ticket);
        self.complete(Operation::DeleteAll, outcome, DELETE_ALL_FAILED)
            .await
    }

    /// Claims an alias for the logged-in account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlias`] before any round trip if the
    /// candidate is unusable, and [`Error::AliasTaken`] (with a blocking
    /// alert) if someone else owns it. The alias is unchanged on failure.
    pub async fn claim_alias(&mut self, candidate: &str) -> Result<()> {
        self.check_delegation()?;
        let mail = ready(self.mail.as_ref(), &self.state)?;
        let alias = match normalize_alias(candidate) {
            Ok(alias) => alias,
            Err(e) => {
                self.state.set_status(e.to_string());
                return Err(e);
            }
        };

        let ticket = self.state.begin(Operation::ClaimAlias)?;
        let outcome = mail.claim_alias(&alias).await;
        self.state.finish(ticket);

        match outcome {
            Ok(true) => {
                info!("Claimed alias {alias}");
                self.state
                    .set_status(format!("Your username is now \"{alias}\"."));
                self.state.set_alias(Some(alias));
                self.refresh(refresh_after(Operation::ClaimAlias)).await;
                Ok(())
            }
            Ok(false) => {
                info!("Alias {alias} is taken");
                self.state.raise_alert(alias_taken(&alias));
                Err(Error::AliasTaken(alias))
            }
            Err(e) => {
                warn!("Alias claim failed: {e}");
                self.state.set_status(CLAIM_FAILED);
                Err(e.into())
            }
        }
    }

    /// Re-reads both counters.
    ///
    /// # Errors
    ///
    /// Returns an error if not ready, busy, or a counter cannot be read.
    /// Counters that could be read are updated regardless.
    pub async fn refresh_counts(&mut self) -> Result<()> {
        self.check_delegation()?;
        ready(self.mail.as_ref(), &self.state)?;
        let ticket = self.state.begin(Operation::RefreshCounts)?;
        let failure = self
            .refresh(&[Refresh::ReceivedCount, Refresh::SentCount])
            .await;
        self.state.finish(ticket);

        match failure {
            Some(e) => {
                self.state.set_status(COUNTS_FAILED);
                Err(e.into())
            }
            None => Ok(()),
        }
    }

    /// Ends the session once its delegation can no longer sign requests.
    fn check_delegation(&mut self) -> Result<()> {
        let expired = self
            .sessions
            .current()
            .is_some_and(|identity| identity.is_expired());
        if !expired {
            return Ok(());
        }

        info!("Delegation expired, ending session");
        if let Err(e) = self.logout() {
            warn!("Could not discard expired session: {e}");
        }
        self.state.set_status(SESSION_EXPIRED);
        Err(threemail_identity::Error::DelegationExpired.into())
    }

    async fn complete(
        &mut self,
        operation: Operation,
        outcome: threemail_store::Result<String>,
        failure: &str,
    ) -> Result<String> {
        match outcome {
            Ok(acknowledgement) => {
                self.state.set_status(acknowledgement.clone());
                self.refresh(refresh_after(operation)).await;
                Ok(acknowledgement)
            }
            Err(e) => {
                warn!("{operation} failed: {e}");
                self.state.set_status(failure);
                Err(e.into())
            }
        }
    }

    /// Runs refresh steps in order. A failing step is logged and skipped,
    /// leaving what it would have replaced; the last failure is returned.
    async fn refresh(&mut self, steps: &[Refresh]) -> Option<threemail_store::Error> {
        let mail = self.mail.as_ref()?;
        let mut failure = None;

        for step in steps {
            let outcome = match step {
                Refresh::CurrentList => {
                    let view = self.state.view().clone();
                    load_view(mail, &mut self.state, view).await.map(drop)
                }
                Refresh::ClearList => {
                    self.state.clear_list();
                    Ok(())
                }
                Refresh::ReceivedCount => mail
                    .total_received_count()
                    .await
                    .map(|count| self.state.set_received_count(count)),
                Refresh::SentCount => mail
                    .total_sent_count()
                    .await
                    .map(|count| self.state.set_sent_count(count)),
            };

            if let Err(e) = outcome {
                warn!("Refresh step {step:?} failed: {e}");
                failure = Some(e);
            }
        }
        failure
    }
}

/// The mail session, if the coordinator is ready to use it.
fn ready<'a, S>(
    mail: Option<&'a MailSession<S>>,
    state: &SessionState,
) -> Result<&'a MailSession<S>> {
    mail.filter(|_| state.phase() == Phase::Ready)
        .ok_or(Error::NotAuthenticated)
}

/// Fetches `view` and applies it unless a newer list already landed.
async fn load_view<S: MessageStore>(
    mail: &MailSession<S>,
    state: &mut SessionState,
    view: View,
) -> threemail_store::Result<bool> {
    let ticket = state.issue_list();
    let messages = match &view {
        View::Inbox => mail.list_mine().await?,
        View::Unviewed => mail.list_unviewed().await?,
        View::Sent => mail.list_sent().await?,
        View::Search(query) => mail.search_by_subject(query).await?,
    };
    Ok(state.apply_list(ticket, view, messages))
}

/// Validates the form, resolves the recipient and submits.
async fn submit<S: MessageStore>(mail: &MailSession<S>, form: &ComposeForm) -> Result<String> {
    form.validate()?;

    let recipient = form.recipient();
    let Some(resolved) = mail.resolver().resolve(recipient).await? else {
        return Err(Error::RecipientNotFound(recipient.to_string()));
    };

    info!("Sending \"{}\" to {resolved}", form.subject);
    Ok(mail.send(&resolved.principal, &form.subject, &form.body).await?)
}
