use super::engine::Marketplace;
use crate::domain::changeset::Changeset;
use crate::domain::codes;
use crate::domain::ids::{RegistrationId, TournamentId};
use crate::domain::tournament::{
    Registration, RegistrationStatus, Team, Tournament, TournamentDraft, TournamentStatus,
    Visibility,
};
use crate::error::{InputError, MarketError, Result};
use tracing::info;

/// Shortest access code handed out, whatever the configuration asks for.
const MIN_ACCESS_CODE_LEN: usize = 11;

impl Marketplace {
    /// Submits a tournament for moderation.
    ///
    /// The result carries the access code of a private tournament; it is the only
    /// place the creator learns it besides later owner reads.
    pub async fn create_tournament(
        &self,
        credential: &str,
        draft: TournamentDraft,
    ) -> Result<Tournament> {
        let caller = self.authenticate(credential).await?;
        draft.check()?;
        if let Some(fee_id) = draft.entry_fee_id
            && self.catalog.entry_fee(fee_id).await?.is_none()
        {
            return Err(MarketError::not_found("entry fee", fee_id));
        }
        let now = self.clock.now();
        if draft.start_at <= now {
            return Err(InputError::Malformed {
                field: "start_at",
                reason: "must be in the future".to_string(),
            }
            .into());
        }

        let access_code = match draft.visibility {
            Visibility::Private => Some(codes::access_code(
                self.config.access_code_len.max(MIN_ACCESS_CODE_LEN),
            )),
            Visibility::Public => None,
        };
        let tournament = Tournament {
            id: TournamentId::new(),
            created_by: caller.user_id,
            created_by_role: caller.role,
            title: draft.title.trim().to_string(),
            visibility: draft.visibility,
            mode: draft.mode,
            start_at: draft.start_at,
            entry_fee_id: draft.entry_fee_id,
            max_participants: draft.max_participants,
            description: draft
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            prize_pool: draft.prize_pool,
            status: TournamentStatus::UnderReview,
            access_code,
            created_at: now,
        };
        self.commit(Changeset::new().insert_tournament(tournament.clone()))
            .await?;
        info!(tournament = %tournament.id, creator = %caller.user_id, role = %caller.role, "tournament submitted");
        Ok(tournament)
    }

    pub async fn approve_tournament(&self, credential: &str, id: TournamentId) -> Result<Tournament> {
        self.review_tournament(credential, id, true).await
    }

    pub async fn reject_tournament(&self, credential: &str, id: TournamentId) -> Result<Tournament> {
        self.review_tournament(credential, id, false).await
    }

    async fn review_tournament(
        &self,
        credential: &str,
        id: TournamentId,
        approve: bool,
    ) -> Result<Tournament> {
        self.require_admin(credential).await?;
        let mut tournament = self
            .store
            .tournament(id)
            .await?
            .ok_or_else(|| MarketError::not_found("tournament", id))?;
        tournament.review(approve)?;
        self.commit(
            Changeset::new().update_tournament(tournament.clone(), TournamentStatus::UnderReview),
        )
        .await?;
        info!(tournament = %id, status = %tournament.status, "tournament reviewed");
        Ok(tournament)
    }

    /// Takes a seat in an open tournament.
    ///
    /// The access code of a private tournament is checked before anything else about
    /// the seat, so a full tournament still answers `Forbidden` to a wrong code.
    pub async fn register(
        &self,
        credential: &str,
        id: TournamentId,
        access_code: Option<&str>,
    ) -> Result<Registration> {
        self.enroll(credential, id, access_code, None).await
    }

    /// Takes a seat for a team in a duo or squad mode. The seat counts once
    /// towards capacity, whatever the roster size.
    pub async fn register_team(
        &self,
        credential: &str,
        id: TournamentId,
        access_code: Option<&str>,
        team: Team,
    ) -> Result<Registration> {
        self.enroll(credential, id, access_code, Some(team)).await
    }

    async fn enroll(
        &self,
        credential: &str,
        id: TournamentId,
        access_code: Option<&str>,
        team: Option<Team>,
    ) -> Result<Registration> {
        let caller = self.authenticate(credential).await?;
        let tournament = self
            .store
            .tournament(id)
            .await?
            .ok_or_else(|| MarketError::not_found("tournament", id))?;
        let now = self.clock.now();
        if !tournament.is_open(now) {
            return Err(MarketError::conflict(format!(
                "tournament {id} is not open for registration"
            )));
        }
        if !tournament.admits(access_code) {
            return Err(MarketError::forbidden("invalid access code"));
        }
        let team = team.map(|t| t.normalized(tournament.mode)).transpose()?;
        if self
            .store
            .active_registration(id, caller.user_id)
            .await?
            .is_some()
        {
            return Err(MarketError::conflict(
                "already registered for this tournament",
            ));
        }

        let registration = Registration {
            id: RegistrationId::new(),
            tournament_id: id,
            user_id: caller.user_id,
            status: RegistrationStatus::Registered,
            payment_id: None,
            team,
            created_at: now,
        };
        self.commit(
            Changeset::new().insert_registration(registration.clone(), tournament.max_participants),
        )
        .await?;
        info!(tournament = %id, user = %caller.user_id, "registered");
        Ok(registration)
    }

    /// Gives up an unpaid seat. The caller may register again afterwards.
    pub async fn cancel_registration(&self, credential: &str, id: TournamentId) -> Result<Registration> {
        let caller = self.authenticate(credential).await?;
        let mut registration = self
            .store
            .active_registration(id, caller.user_id)
            .await?
            .ok_or_else(|| MarketError::not_found("registration", id))?;
        let from = registration.status;
        registration.cancel()?;
        self.commit(Changeset::new().update_registration(registration.clone(), from))
            .await?;
        info!(tournament = %id, user = %caller.user_id, "registration cancelled");
        Ok(registration)
    }
}
