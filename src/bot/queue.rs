//! FIFO request queue with one pending request per user

use super::{ReplyTarget, UserId};
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};

/// A generation request waiting for (or in) processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRequest {
    pub user_id: UserId,
    pub target: ReplyTarget,
    pub prompt: String,
    pub batch_size: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedRequest {
    #[must_use]
    pub fn new(user_id: UserId, target: ReplyTarget, prompt: impl Into<String>, batch_size: u32) -> Self {
        Self {
            user_id,
            target,
            prompt: prompt.into(),
            batch_size,
            enqueued_at: Utc::now(),
        }
    }
}

/// Result of trying to enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted at 1-based `position` among waiting requests; `busy` when a job is in flight
    Accepted { position: usize, busy: bool },
    /// The user already has a request waiting or in flight
    AlreadyPending,
}

/// Explicit FIFO owned by the bot
///
/// A user is "pending" from enqueue until [`RequestQueue::finish`], so the
/// in-flight request still blocks a second submission.
#[derive(Debug, Default)]
pub struct RequestQueue {
    waiting: VecDeque<QueuedRequest>,
    pending_users: HashSet<UserId>,
    in_flight: Option<UserId>,
}

impl RequestQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, request: QueuedRequest) -> EnqueueOutcome {
        if !self.pending_users.insert(request.user_id) {
            return EnqueueOutcome::AlreadyPending;
        }
        self.waiting.push_back(request);
        EnqueueOutcome::Accepted {
            position: self.waiting.len(),
            busy: self.in_flight.is_some(),
        }
    }

    /// Pop the oldest request and mark it in flight; `None` when busy or empty
    pub fn begin_next(&mut self) -> Option<QueuedRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let request = self.waiting.pop_front()?;
        self.in_flight = Some(request.user_id);
        Some(request)
    }

    /// Release the in-flight slot and the user's pending mark
    pub fn finish(&mut self, user_id: UserId) {
        self.pending_users.remove(&user_id);
        if self.in_flight == Some(user_id) {
            self.in_flight = None;
        }
    }

    #[must_use]
    pub fn is_pending(&self, user_id: UserId) -> bool {
        self.pending_users.contains(&user_id)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// 1-based position among waiting requests
    #[must_use]
    pub fn position_of(&self, user_id: UserId) -> Option<usize> {
        self.waiting
            .iter()
            .position(|r| r.user_id == user_id)
            .map(|i| i + 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: UserId) -> QueuedRequest {
        QueuedRequest::new(user, ReplyTarget::chat(1), format!("prompt {user}"), 3)
    }

    #[test]
    fn test_fifo_order_and_positions() {
        let mut queue = RequestQueue::new();
        assert_eq!(
            queue.enqueue(request(10)),
            EnqueueOutcome::Accepted {
                position: 1,
                busy: false
            }
        );
        assert_eq!(
            queue.enqueue(request(20)),
            EnqueueOutcome::Accepted {
                position: 2,
                busy: false
            }
        );
        assert_eq!(queue.position_of(20), Some(2));

        let first = queue.begin_next().unwrap();
        assert_eq!(first.user_id, 10);
        // single job in flight
        assert!(queue.begin_next().is_none());
        assert_eq!(
            queue.enqueue(request(30)),
            EnqueueOutcome::Accepted {
                position: 2,
                busy: true
            }
        );

        queue.finish(10);
        assert_eq!(queue.begin_next().unwrap().user_id, 20);
    }

    #[test]
    fn test_pending_user_refused_until_finished() {
        let mut queue = RequestQueue::new();
        queue.enqueue(request(7));
        assert_eq!(queue.enqueue(request(7)), EnqueueOutcome::AlreadyPending);

        let job = queue.begin_next().unwrap();
        // still pending while in flight
        assert_eq!(queue.enqueue(request(7)), EnqueueOutcome::AlreadyPending);
        queue.finish(job.user_id);

        assert!(!queue.is_pending(7));
        assert!(!queue.is_busy());
        assert!(matches!(queue.enqueue(request(7)), EnqueueOutcome::Accepted { .. }));
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = RequestQueue::new();
        assert!(queue.is_empty());
        assert!(queue.begin_next().is_none());
        assert_eq!(queue.position_of(1), None);
    }
}
