use std::sync::Arc;

use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use super::event_view;
use crate::models::event::EventResponse;
use crate::models::registration::{
    AttendeeDashboard, RegistrationCreateRequest, RegistrationResponse,
    RegistrationUpdateRequest,
};
use crate::models::{Registration, RegistrationFilter, RegistrationStatus, RegistrationWithEvent};
use crate::store::{already_registered, EventStore, RegistrationStore};
use crate::utils::error::AppError;

#[derive(Clone)]
pub struct RegistrationService {
    registrations: Arc<dyn RegistrationStore>,
    events: Arc<dyn EventStore>,
}

impl RegistrationService {
    pub fn new(registrations: Arc<dyn RegistrationStore>, events: Arc<dyn EventStore>) -> Self {
        Self {
            registrations,
            events,
        }
    }

    async fn load(&self, registration_id: &str) -> Result<Registration, AppError> {
        self.registrations
            .get(registration_id)
            .await?
            .ok_or_else(|| AppError::not_found("Registration", registration_id))
    }

    /// Registers `user_id` for an event, confirmed while seats remain and
    /// waitlisted after that.
    ///
    /// The seat check and the insert are a single store operation, so two
    /// registrants racing for the last seat cannot both be confirmed.
    #[instrument(skip(self, request), fields(event_id = %request.event_id))]
    pub async fn register(
        &self,
        user_id: &str,
        request: RegistrationCreateRequest,
    ) -> Result<RegistrationResponse, AppError> {
        let event = self
            .events
            .get(&request.event_id)
            .await?
            .ok_or_else(|| AppError::not_found("Event", &request.event_id))?;

        if self
            .registrations
            .exists_by_event_and_user(&event.id, user_id)
            .await?
        {
            return Err(already_registered());
        }

        let pending = Registration::pending(&event.id, user_id, request.notes);
        let registration = self.registrations.admit(pending, event.capacity).await?;

        info!(
            registration_id = %registration.id,
            status = %registration.status,
            capacity = event.capacity,
            "Registration admitted"
        );
        Ok(registration)
    }

    /// Overwrites status and notes. Cancelled registrations stay cancelled.
    #[instrument(skip(self, request))]
    pub async fn update_registration(
        &self,
        registration_id: &str,
        request: RegistrationUpdateRequest,
    ) -> Result<RegistrationResponse, AppError> {
        let mut registration = self.load(registration_id).await?;

        if !registration.status.can_transition_to(request.status) {
            return Err(AppError::InvalidArgument(format!(
                "Cannot move registration from {} to {}",
                registration.status, request.status
            )));
        }

        registration.status = request.status;
        registration.notes = request.notes;
        self.registrations.save(&registration).await?;
        Ok(registration)
    }

    /// Cancels the caller's own registration. Nobody on the waitlist is
    /// promoted into the freed seat.
    #[instrument(skip(self))]
    pub async fn cancel_registration(
        &self,
        registration_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let mut registration = self.load(registration_id).await?;
        if registration.user_id != user_id {
            warn!(registration_id, user_id, "Caller does not own this registration");
            return Err(AppError::Forbidden(
                "Not authorized to cancel this registration".into(),
            ));
        }

        registration.status = RegistrationStatus::Cancelled;
        self.registrations.save(&registration).await?;

        info!(registration_id, "Registration cancelled");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn mark_attendance(
        &self,
        registration_id: &str,
        attended: bool,
    ) -> Result<RegistrationResponse, AppError> {
        let mut registration = self.load(registration_id).await?;
        registration.attended = attended;
        self.registrations.save(&registration).await?;
        Ok(registration)
    }

    pub async fn registrations_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<RegistrationResponse>, AppError> {
        self.registrations.find_by_user(user_id).await
    }

    pub async fn registrations_by_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<RegistrationResponse>, AppError> {
        self.registrations.find_by_event(event_id).await
    }

    pub async fn confirmed_registrations_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<RegistrationResponse>, AppError> {
        let mut registrations = self.registrations.find_by_user(user_id).await?;
        registrations.retain(|r| RegistrationFilter::Confirmed.admits(r));
        Ok(registrations)
    }

    async fn resolve(
        &self,
        registration: Registration,
    ) -> Result<Option<RegistrationWithEvent>, AppError> {
        let Some(event) = self.events.get(&registration.event_id).await? else {
            debug!(
                registration_id = %registration.id,
                event_id = %registration.event_id,
                "Skipping registration whose event is gone"
            );
            return Ok(None);
        };

        let event = event_view(self.registrations.as_ref(), event).await?;
        Ok(Some(RegistrationWithEvent {
            registration,
            event,
        }))
    }

    /// Pairs each of the user's registrations that passes `filter` with its
    /// event.
    ///
    /// Events are fetched lazily as the stream is polled. Registrations whose
    /// event no longer exists are skipped, not reported. Every call starts a
    /// fresh listing.
    pub fn registrations_with_events<'a>(
        &'a self,
        user_id: &'a str,
        filter: RegistrationFilter,
    ) -> impl Stream<Item = Result<RegistrationWithEvent, AppError>> + Send + 'a {
        stream::once(self.registrations.find_by_user(user_id))
            .map_ok(move |registrations| {
                stream::iter(
                    registrations
                        .into_iter()
                        .filter(move |r| filter.admits(r))
                        .map(Ok::<_, AppError>),
                )
            })
            .try_flatten()
            .try_filter_map(move |registration| self.resolve(registration))
    }

    pub async fn registered_events_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<EventResponse>, AppError> {
        self.registrations_with_events(user_id, RegistrationFilter::All)
            .map_ok(|pair| pair.event)
            .try_collect()
            .await
    }

    pub async fn confirmed_registrations_with_event_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<RegistrationWithEvent>, AppError> {
        self.registrations_with_events(user_id, RegistrationFilter::Confirmed)
            .try_collect()
            .await
    }

    pub async fn active_registrations_with_event_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<RegistrationWithEvent>, AppError> {
        self.registrations_with_events(user_id, RegistrationFilter::Active)
            .try_collect()
            .await
    }

    pub async fn attendee_dashboard(&self, user_id: &str) -> Result<AttendeeDashboard, AppError> {
        let registrations = self.active_registrations_with_event_by_user(user_id).await?;
        Ok(AttendeeDashboard {
            count: registrations.len(),
            registrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{event_request, Fixture};

    fn request(event_id: &str) -> RegistrationCreateRequest {
        RegistrationCreateRequest {
            event_id: event_id.to_string(),
            notes: None,
        }
    }

    async fn event_with_capacity(fx: &Fixture, capacity: u32) -> String {
        fx.events
            .create_event("org-1", event_request("Capacity test", capacity))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_register_unknown_event_is_not_found() {
        let fx = Fixture::new();
        let err = fx
            .registrations
            .register("u1", request("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_new_registration_defaults() {
        let fx = Fixture::new();
        let event_id = event_with_capacity(&fx, 3).await;

        let reg = fx
            .registrations
            .register(
                "u1",
                RegistrationCreateRequest {
                    event_id: event_id.clone(),
                    notes: Some("vegetarian".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(reg.status, RegistrationStatus::Confirmed);
        assert_eq!(reg.event_id, event_id);
        assert_eq!(reg.user_id, "u1");
        assert_eq!(reg.notes.as_deref(), Some("vegetarian"));
        assert!(!reg.attended);
    }

    #[tokio::test]
    async fn test_capacity_plus_one_registrant_is_waitlisted() {
        let fx = Fixture::new();
        let capacity = 3;
        let event_id = event_with_capacity(&fx, capacity).await;

        let mut statuses = Vec::new();
        for i in 0..=capacity {
            let reg = fx
                .registrations
                .register(&format!("user-{}", i), request(&event_id))
                .await
                .unwrap();
            statuses.push(reg.status);
        }

        assert!(statuses[..capacity as usize]
            .iter()
            .all(|s| *s == RegistrationStatus::Confirmed));
        assert_eq!(statuses[capacity as usize], RegistrationStatus::Waitlisted);
        assert_eq!(
            fx.events.get_event(&event_id).await.unwrap().registered_count,
            u64::from(capacity)
        );
    }

    #[tokio::test]
    async fn test_registering_twice_is_conflict() {
        let fx = Fixture::new();
        let event_id = event_with_capacity(&fx, 5).await;

        fx.registrations
            .register("u1", request(&event_id))
            .await
            .unwrap();
        let err = fx
            .registrations
            .register("u1", request(&event_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_does_not_promote_waitlist() {
        let fx = Fixture::new();
        let event_id = event_with_capacity(&fx, 1).await;

        let a = fx
            .registrations
            .register("user-a", request(&event_id))
            .await
            .unwrap();
        let b = fx
            .registrations
            .register("user-b", request(&event_id))
            .await
            .unwrap();
        assert_eq!(a.status, RegistrationStatus::Confirmed);
        assert_eq!(b.status, RegistrationStatus::Waitlisted);

        fx.registrations
            .cancel_registration(&a.id, "user-a")
            .await
            .unwrap();

        let b_after = fx.registration_store.get(&b.id).await.unwrap().unwrap();
        assert_eq!(b_after.status, RegistrationStatus::Waitlisted);
        let a_after = fx.registration_store.get(&a.id).await.unwrap().unwrap();
        assert_eq!(a_after.status, RegistrationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_by_other_user_is_forbidden() {
        let fx = Fixture::new();
        let event_id = event_with_capacity(&fx, 1).await;
        let reg = fx
            .registrations
            .register("owner", request(&event_id))
            .await
            .unwrap();

        let err = fx
            .registrations
            .cancel_registration(&reg.id, "intruder")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let unchanged = fx.registration_store.get(&reg.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, RegistrationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_cancel_unknown_registration_is_not_found() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.registrations.cancel_registration("nope", "u1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_follows_state_machine() {
        let fx = Fixture::new();
        let event_id = event_with_capacity(&fx, 5).await;
        let reg = fx
            .registrations
            .register("u1", request(&event_id))
            .await
            .unwrap();

        let waitlisted = fx
            .registrations
            .update_registration(
                &reg.id,
                RegistrationUpdateRequest {
                    status: RegistrationStatus::Waitlisted,
                    notes: Some("moved".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(waitlisted.status, RegistrationStatus::Waitlisted);
        assert_eq!(waitlisted.notes.as_deref(), Some("moved"));

        fx.registrations
            .update_registration(
                &reg.id,
                RegistrationUpdateRequest {
                    status: RegistrationStatus::Cancelled,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let err = fx
            .registrations
            .update_registration(
                &reg.id,
                RegistrationUpdateRequest {
                    status: RegistrationStatus::Confirmed,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let stored = fx.registration_store.get(&reg.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RegistrationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_mark_attendance() {
        let fx = Fixture::new();
        let event_id = event_with_capacity(&fx, 5).await;
        let reg = fx
            .registrations
            .register("u1", request(&event_id))
            .await
            .unwrap();

        let marked = fx.registrations.mark_attendance(&reg.id, true).await.unwrap();
        assert!(marked.attended);
        assert_eq!(marked.status, RegistrationStatus::Confirmed);

        assert!(matches!(
            fx.registrations.mark_attendance("nope", true).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_composite_views_drop_missing_events() {
        let fx = Fixture::new();
        let kept = event_with_capacity(&fx, 5).await;
        let doomed = event_with_capacity(&fx, 5).await;

        fx.registrations.register("u1", request(&kept)).await.unwrap();
        fx.registrations.register("u1", request(&doomed)).await.unwrap();
        fx.event_store.remove(&doomed).await;

        let confirmed = fx
            .registrations
            .confirmed_registrations_with_event_by_user("u1")
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].event.id, kept);
        assert_eq!(confirmed[0].registration.event_id, kept);
        assert_eq!(confirmed[0].event.registered_count, 1);

        let events = fx.registrations.registered_events_for_user("u1").await.unwrap();
        assert_eq!(events.len(), 1);

        // Plain listings are not joined and keep everything.
        assert_eq!(fx.registrations.registrations_by_user("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_active_view_excludes_cancelled_and_confirmed_view_excludes_waitlisted() {
        let fx = Fixture::new();
        let full = event_with_capacity(&fx, 0).await;
        let open = event_with_capacity(&fx, 5).await;
        let dropped = event_with_capacity(&fx, 5).await;

        fx.registrations.register("u1", request(&full)).await.unwrap();
        fx.registrations.register("u1", request(&open)).await.unwrap();
        let reg = fx
            .registrations
            .register("u1", request(&dropped))
            .await
            .unwrap();
        fx.registrations
            .cancel_registration(&reg.id, "u1")
            .await
            .unwrap();

        let active = fx
            .registrations
            .active_registrations_with_event_by_user("u1")
            .await
            .unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|p| p.registration.is_active()));

        let confirmed = fx
            .registrations
            .confirmed_registrations_with_event_by_user("u1")
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].event.id, open);

        let plain_confirmed = fx
            .registrations
            .confirmed_registrations_by_user("u1")
            .await
            .unwrap();
        assert_eq!(plain_confirmed.len(), 1);

        let dashboard = fx.registrations.attendee_dashboard("u1").await.unwrap();
        assert_eq!(dashboard.count, 2);
    }

    #[tokio::test]
    async fn test_composite_stream_is_restartable() {
        let fx = Fixture::new();
        let event_id = event_with_capacity(&fx, 5).await;
        fx.registrations.register("u1", request(&event_id)).await.unwrap();

        let first: Vec<_> = fx
            .registrations
            .registrations_with_events("u1", RegistrationFilter::All)
            .try_collect()
            .await
            .unwrap();

        fx.registrations
            .register("u1", request(&event_with_capacity(&fx, 5).await))
            .await
            .unwrap();

        let second: Vec<_> = fx
            .registrations
            .registrations_with_events("u1", RegistrationFilter::All)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_never_exceed_capacity() {
        let fx = Fixture::new();
        let capacity = 5;
        let event_id = event_with_capacity(&fx, capacity).await;

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let service = fx.registrations.clone();
                let event_id = event_id.clone();
                tokio::spawn(async move {
                    service
                        .register(&format!("user-{}", i), request(&event_id))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let confirmed = fx
            .registration_store
            .count_by_event_and_status(&event_id, RegistrationStatus::Confirmed)
            .await
            .unwrap();
        let waitlisted = fx
            .registration_store
            .count_by_event_and_status(&event_id, RegistrationStatus::Waitlisted)
            .await
            .unwrap();
        assert_eq!(confirmed, u64::from(capacity));
        assert_eq!(waitlisted, 50 - u64::from(capacity));
    }
}
