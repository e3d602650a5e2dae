//! Server-side ad countdowns.
//!
//! A client starts an ad session and receives a ticket. The ticket can be
//! completed only once its countdown has elapsed, so a client cannot skip
//! the ad by calling the reward path directly. Cancelling or abandoning a
//! ticket writes nothing.
//!
//! Upload tickets are not consumed on completion: they become an upload
//! pass that the next upload call takes with [`AdSessions::take_upload_pass`].

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use moneytube_types::rules::EconomyRules;
use moneytube_types::{UserId, VideoId};

use crate::{EconomyError, Result};

/// Tickets older than this are dropped by [`AdSessions::purge_expired`].
pub const TICKET_TTL_SECS: u64 = 3600;

/// Live tickets one user may hold. Starting another evicts their oldest.
pub const MAX_TICKETS_PER_USER: usize = 32;

/// What a completed ad unlocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdTarget {
    /// Unlock playback of a video (and earn the video ad reward once).
    VideoUnlock { video_id: VideoId },
    /// Earn the bonus ad reward.
    Bonus,
    /// Permit one upload.
    Upload,
}

impl AdTarget {
    /// Countdown length for this target.
    pub fn duration_secs(&self, rules: &EconomyRules) -> u64 {
        match self {
            AdTarget::VideoUnlock { .. } => rules.video_ad_secs,
            AdTarget::Bonus => rules.bonus_ad_secs,
            AdTarget::Upload => rules.upload_ad_secs,
        }
    }
}

/// A started ad session as returned to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdTicket {
    pub ticket: String,
    pub target: AdTarget,
    pub started_at: u64,
    /// Earliest time at which the ticket may be completed.
    pub ready_at: u64,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: UserId,
    target: AdTarget,
    started_at: u64,
    ready_at: u64,
    completed: bool,
}

/// In-memory ad session table.
#[derive(Debug, Default)]
pub struct AdSessions {
    sessions: HashMap<String, Session>,
}

impl AdSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown for `user_id`.
    pub fn start<R: Rng>(
        &mut self,
        rng: &mut R,
        rules: &EconomyRules,
        user_id: &str,
        target: AdTarget,
        now: u64,
    ) -> AdTicket {
        self.evict_oldest(user_id);
        let ticket = hex::encode(rng.gen::<[u8; 16]>());
        let ready_at = now + target.duration_secs(rules);
        self.sessions.insert(
            ticket.clone(),
            Session {
                user_id: user_id.to_string(),
                target: target.clone(),
                started_at: now,
                ready_at,
                completed: false,
            },
        );
        tracing::debug!(user_id, ticket = %ticket, ready_at, "ad session started");
        AdTicket {
            ticket,
            target,
            started_at: now,
            ready_at,
        }
    }

    /// Complete a ticket and return its target.
    ///
    /// Video and bonus tickets are removed. Upload tickets stay as a pass
    /// until an upload takes them.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] for an unknown or already used ticket
    /// - [`EconomyError::Authorization`] if the ticket belongs to another user
    /// - [`EconomyError::Validation`] if the countdown has not elapsed; the
    ///   ticket stays valid
    pub fn complete(&mut self, ticket: &str, user_id: &str, now: u64) -> Result<AdTarget> {
        let session = self.owned(ticket, user_id)?;
        if session.completed {
            return Err(EconomyError::NotFound("ad session already completed".to_string()));
        }
        if now < session.ready_at {
            return Err(EconomyError::Validation(format!(
                "ad not finished: {}s remaining",
                session.ready_at - now
            )));
        }

        let target = session.target.clone();
        if target == AdTarget::Upload {
            if let Some(s) = self.sessions.get_mut(ticket) {
                s.completed = true;
            }
        } else {
            self.sessions.remove(ticket);
        }
        Ok(target)
    }

    /// Drop a ticket. Returns `false` if it did not exist for this user.
    pub fn cancel(&mut self, ticket: &str, user_id: &str) -> bool {
        match self.sessions.get(ticket) {
            Some(s) if s.user_id == user_id => {
                self.sessions.remove(ticket);
                true
            }
            _ => false,
        }
    }

    /// Consume a completed upload ticket.
    ///
    /// # Errors
    ///
    /// - [`EconomyError::NotFound`] for an unknown ticket
    /// - [`EconomyError::Authorization`] if the ticket belongs to another user
    /// - [`EconomyError::Validation`] if it is not a completed upload ticket
    pub fn take_upload_pass(&mut self, ticket: &str, user_id: &str) -> Result<()> {
        let session = self.owned(ticket, user_id)?;
        if session.target != AdTarget::Upload || !session.completed {
            return Err(EconomyError::Validation(
                "watch the upload ad before uploading".to_string(),
            ));
        }
        self.sessions.remove(ticket);
        Ok(())
    }

    /// Drop tickets started more than [`TICKET_TTL_SECS`] ago.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now.saturating_sub(s.started_at) <= TICKET_TTL_SECS);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Make room for one more ticket for `user_id`.
    fn evict_oldest(&mut self, user_id: &str) {
        let mut mine: Vec<(u64, String)> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.user_id == user_id)
            .map(|(t, s)| (s.started_at, t.clone()))
            .collect();
        if mine.len() < MAX_TICKETS_PER_USER {
            return;
        }
        mine.sort();
        let excess = mine.len() + 1 - MAX_TICKETS_PER_USER;
        for (_, old) in mine.into_iter().take(excess) {
            self.sessions.remove(&old);
        }
        tracing::debug!(user_id, evicted = excess, "ad ticket limit reached");
    }

    fn owned(&self, ticket: &str, user_id: &str) -> Result<&Session> {
        let session = self
            .sessions
            .get(ticket)
            .ok_or_else(|| EconomyError::NotFound("ad session".to_string()))?;
        if session.user_id != user_id {
            return Err(EconomyError::Authorization(
                "ad session belongs to another user".to_string(),
            ));
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn video(id: &str) -> AdTarget {
        AdTarget::VideoUnlock {
            video_id: id.to_string(),
        }
    }

    #[test]
    fn test_countdown_enforced() {
        let mut rng = StdRng::seed_from_u64(1);
        let rules = EconomyRules::default();
        let mut ads = AdSessions::new();

        let t = ads.start(&mut rng, &rules, "u1", video("v1"), 100);
        assert_eq!(t.ready_at, 110);
        assert!(matches!(
            ads.complete(&t.ticket, "u1", 105),
            Err(EconomyError::Validation(_))
        ));
        assert_eq!(ads.complete(&t.ticket, "u1", 110).expect("complete"), video("v1"));
        assert!(matches!(
            ads.complete(&t.ticket, "u1", 111),
            Err(EconomyError::NotFound(_))
        ));
        assert!(ads.is_empty());
    }

    #[test]
    fn test_bonus_countdown_is_shorter() {
        let mut rng = StdRng::seed_from_u64(2);
        let rules = EconomyRules::default();
        let mut ads = AdSessions::new();
        let t = ads.start(&mut rng, &rules, "u1", AdTarget::Bonus, 0);
        assert_eq!(t.ready_at, 5);
    }

    #[test]
    fn test_ticket_bound_to_user() {
        let mut rng = StdRng::seed_from_u64(3);
        let rules = EconomyRules::default();
        let mut ads = AdSessions::new();
        let t = ads.start(&mut rng, &rules, "u1", AdTarget::Bonus, 0);
        assert!(matches!(
            ads.complete(&t.ticket, "u2", 100),
            Err(EconomyError::Authorization(_))
        ));
        assert!(!ads.cancel(&t.ticket, "u2"));
        assert!(ads.cancel(&t.ticket, "u1"));
        assert!(ads.is_empty());
    }

    #[test]
    fn test_upload_pass() {
        let mut rng = StdRng::seed_from_u64(4);
        let rules = EconomyRules::default();
        let mut ads = AdSessions::new();
        let t = ads.start(&mut rng, &rules, "u1", AdTarget::Upload, 0);

        assert!(matches!(
            ads.take_upload_pass(&t.ticket, "u1"),
            Err(EconomyError::Validation(_))
        ));
        ads.complete(&t.ticket, "u1", 10).expect("complete");
        assert_eq!(ads.len(), 1);
        ads.take_upload_pass(&t.ticket, "u1").expect("take");
        assert!(matches!(
            ads.take_upload_pass(&t.ticket, "u1"),
            Err(EconomyError::NotFound(_))
        ));
    }

    #[test]
    fn test_ticket_limit_evicts_oldest() {
        let mut rng = StdRng::seed_from_u64(6);
        let rules = EconomyRules::default();
        let mut ads = AdSessions::new();
        let other = ads.start(&mut rng, &rules, "u2", AdTarget::Bonus, 0);

        let tickets: Vec<AdTicket> = (0..40)
            .map(|i| ads.start(&mut rng, &rules, "u1", AdTarget::Bonus, i))
            .collect();
        assert_eq!(ads.len(), MAX_TICKETS_PER_USER + 1);

        assert!(matches!(
            ads.complete(&tickets[0].ticket, "u1", 100),
            Err(EconomyError::NotFound(_))
        ));
        assert_eq!(
            ads.complete(&tickets[39].ticket, "u1", 100).expect("newest"),
            AdTarget::Bonus
        );
        assert_eq!(
            ads.complete(&other.ticket, "u2", 100).expect("other user"),
            AdTarget::Bonus
        );
    }

    #[test]
    fn test_purge_expired() {
        let mut rng = StdRng::seed_from_u64(5);
        let rules = EconomyRules::default();
        let mut ads = AdSessions::new();
        ads.start(&mut rng, &rules, "u1", AdTarget::Bonus, 0);
        ads.start(&mut rng, &rules, "u1", AdTarget::Bonus, 3000);
        assert_eq!(ads.purge_expired(4000), 1);
        assert_eq!(ads.len(), 1);
    }
}
