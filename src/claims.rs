//! Number-claim leasing
//!
//! A claim keeps two agents from dialing the same number at once. The
//! backend arbitrates; this side only keeps the last fetched snapshot and
//! answers predicates against the wall clock, so answers can lag the backend
//! by up to one refresh interval.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::fetch::error_message;
use crate::models::{ClaimType, NumberClaim};
use crate::poll::PollHandle;
use crate::service::DataService;

/// Who is claiming numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub name: Option<String>,
}

impl Identity {
    pub fn new(user_id: &str, name: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.map(str::to_string),
        }
    }
}

/// Claim helper bound to one acting identity
#[derive(Clone)]
pub struct NumberClaims {
    service: DataService,
    identity: Identity,
    snapshot: Arc<RwLock<HashMap<String, NumberClaim>>>,
}

impl NumberClaims {
    pub fn new(service: DataService, identity: Identity) -> Self {
        Self {
            service,
            identity,
            snapshot: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Lock a number to this identity.
    ///
    /// Fails with [`Error::AlreadyClaimed`] when someone else holds it. There
    /// is no offline arbitration, so an unreachable backend is an error too.
    pub async fn claim_number(
        &self,
        phone: &str,
        contact_id: Option<&str>,
        claim_type: Option<ClaimType>,
    ) -> Result<NumberClaim> {
        let body = json!({
            "phoneNumber": phone,
            "contactId": contact_id,
            "claimType": claim_type,
            "claimedBy": self.identity.user_id,
            "claimedByName": self.identity.name,
        });

        let claim: NumberClaim = self
            .service
            .api()
            .post("/claim-number")
            .json(&body)?
            .execute_field("claim")
            .await
            .map_err(|e| self.conflict(phone, e))?;

        self.insert(claim.clone());
        self.refresh().await;
        Ok(claim)
    }

    /// Drop a claim; failures are ignored and the backend expires it anyway
    pub async fn release_number(&self, phone: &str) {
        let body = json!({ "phoneNumber": phone, "claimedBy": self.identity.user_id });
        let result = match self.service.api().post("/release-number").json(&body) {
            Ok(request) => request.execute_value().await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            debug!("Release of {} not confirmed: {}", phone, e);
        }

        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if snapshot.get(phone).is_some_and(|c| c.claimed_by == self.identity.user_id) {
            snapshot.remove(phone);
        }
    }

    /// Push out the expiry of a claim this identity holds.
    ///
    /// Refusals, such as the claim having lapsed, come back as the backend sent them.
    pub async fn extend_claim(&self, phone: &str) -> Result<NumberClaim> {
        let body = json!({ "phoneNumber": phone, "claimedBy": self.identity.user_id });
        let claim: NumberClaim = self
            .service
            .api()
            .post("/extend-number-claim")
            .json(&body)?
            .execute_field("claim")
            .await?;
        self.insert(claim.clone());
        Ok(claim)
    }

    /// Re-fetch every live claim. On failure the previous snapshot is kept.
    pub async fn refresh(&self) -> bool {
        let fetched: Result<Vec<NumberClaim>> = self.service.api().get("/number-claims").execute_field("claims").await;
        match fetched {
            Ok(claims) => {
                let now = self.service.clock().now();
                let fresh: HashMap<String, NumberClaim> = claims
                    .into_iter()
                    .filter(|c| c.is_active_at(now))
                    .map(|c| (c.phone_number.clone(), c))
                    .collect();
                *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = fresh;
                true
            }
            Err(e) => {
                debug!("Claim refresh failed, keeping last snapshot: {}", e);
                false
            }
        }
    }

    /// Refresh every `claim_refresh_interval` until the handle is dropped
    pub fn spawn_refresh(&self) -> PollHandle {
        let claims = self.clone();
        PollHandle::spawn(self.service.claim_refresh_interval(), move || {
            let claims = claims.clone();
            async move {
                claims.refresh().await;
            }
        })
    }

    /// Whether anyone holds the number right now
    pub fn is_number_claimed(&self, phone: &str) -> bool {
        self.active_claim(phone).is_some()
    }

    /// Whether this identity holds the number right now
    pub fn is_claimed_by_me(&self, phone: &str) -> bool {
        self.active_claim(phone)
            .is_some_and(|c| c.claimed_by == self.identity.user_id)
    }

    pub fn active_claim(&self, phone: &str) -> Option<NumberClaim> {
        let now = self.service.clock().now();
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        snapshot.get(phone).filter(|c| c.is_active_at(now)).cloned()
    }

    /// Every unexpired claim in the snapshot, ordered by phone number
    pub fn active_claims(&self) -> Vec<NumberClaim> {
        let now = self.service.clock().now();
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        let mut claims: Vec<NumberClaim> = snapshot.values().filter(|c| c.is_active_at(now)).cloned().collect();
        claims.sort_by(|a, b| a.phone_number.cmp(&b.phone_number));
        claims
    }

    fn insert(&self, claim: NumberClaim) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.insert(claim.phone_number.clone(), claim);
    }

    /// Map a refused claim onto [`Error::AlreadyClaimed`]; other errors pass through
    fn conflict(&self, phone: &str, err: Error) -> Error {
        let claimed_by = match &err {
            Error::Status { status: 409, body } => {
                let parsed = serde_json::from_str::<Value>(body).ok();
                if let Some(message) = parsed.as_ref().and_then(error_message) {
                    debug!("Claim of {} refused: {}", phone, message);
                }
                parsed.as_ref().and_then(|v| self.holder_in_body(v))
            }
            Error::Rejected(message) if message.to_ascii_lowercase().contains("already claimed") => None,
            _ => return err,
        };

        Error::AlreadyClaimed {
            phone: phone.to_string(),
            claimed_by: claimed_by.unwrap_or_else(|| self.other_holder(phone)),
        }
    }

    fn holder_in_body(&self, body: &Value) -> Option<String> {
        if body.get("claimedBy").and_then(Value::as_str) == Some(self.identity.user_id.as_str()) {
            return None;
        }
        ["claimedByName", "claimedBy"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    }

    fn other_holder(&self, phone: &str) -> String {
        self.active_claim(phone)
            .filter(|c| c.claimed_by != self.identity.user_id)
            .map(|c| c.claimed_by_name.unwrap_or(c.claimed_by))
            .unwrap_or_else(|| "another agent".to_string())
    }
}
