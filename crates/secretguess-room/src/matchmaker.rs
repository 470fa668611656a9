//! Anonymous pairing: at most one player waits at a time.

use crate::PlayerSender;

/// A player asking to be paired.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub name: String,
    pub sender: PlayerSender,
}

/// What happened to an offered request.
#[derive(Debug)]
pub(crate) enum Offer {
    /// The caller is now the one waiting.
    Queued,
    /// Someone was already waiting; they go first.
    Paired {
        waiting: MatchRequest,
        caller: MatchRequest,
    },
}

/// The waiting slot. Lives inside the registry, behind its lock.
#[derive(Debug, Default)]
pub(crate) struct MatchQueue {
    waiting: Option<MatchRequest>,
}

impl MatchQueue {
    /// Pairs `caller` with whoever is waiting, or parks it.
    ///
    /// A waiting entry whose connection has closed is discarded, and a
    /// connection asking twice just refreshes its own entry.
    pub(crate) fn offer(&mut self, caller: MatchRequest) -> Offer {
        match self.waiting.take() {
            Some(waiting)
                if !waiting.sender.is_closed() && !waiting.sender.same_channel(&caller.sender) =>
            {
                Offer::Paired { waiting, caller }
            }
            _ => {
                self.waiting = Some(caller);
                Offer::Queued
            }
        }
    }

    /// Drops the waiting entry if it belongs to `sender`.
    pub(crate) fn cancel(&mut self, sender: &PlayerSender) -> bool {
        if self
            .waiting
            .as_ref()
            .is_some_and(|w| w.sender.same_channel(sender))
        {
            self.waiting = None;
            true
        } else {
            false
        }
    }

    /// Someone with a live connection is waiting.
    pub(crate) fn is_waiting(&self) -> bool {
        self.waiting.as_ref().is_some_and(|w| !w.sender.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::RoomOutbound;

    fn request(name: &str) -> (MatchRequest, mpsc::UnboundedReceiver<RoomOutbound>) {
        let (sender, rx) = mpsc::unbounded_channel();
        (
            MatchRequest {
                name: name.into(),
                sender,
            },
            rx,
        )
    }

    #[test]
    fn test_offer_first_caller_is_queued() {
        let mut queue = MatchQueue::default();
        let (ada, _rx) = request("Ada");
        assert!(matches!(queue.offer(ada), Offer::Queued));
        assert!(queue.is_waiting());
    }

    #[test]
    fn test_offer_second_caller_pairs_in_arrival_order() {
        let mut queue = MatchQueue::default();
        let (ada, _a) = request("Ada");
        let (bo, _b) = request("Bo");
        queue.offer(ada);

        match queue.offer(bo) {
            Offer::Paired { waiting, caller } => {
                assert_eq!(waiting.name, "Ada");
                assert_eq!(caller.name, "Bo");
            }
            Offer::Queued => panic!("expected a pairing"),
        }
        assert!(!queue.is_waiting());
    }

    #[test]
    fn test_offer_same_connection_never_pairs_with_itself() {
        let mut queue = MatchQueue::default();
        let (ada, _rx) = request("Ada");
        let again = MatchRequest {
            name: "Ada again".into(),
            sender: ada.sender.clone(),
        };
        queue.offer(ada);

        assert!(matches!(queue.offer(again), Offer::Queued));
        assert!(queue.is_waiting());
    }

    #[test]
    fn test_offer_skips_closed_waiting_entry() {
        let mut queue = MatchQueue::default();
        let (ada, rx) = request("Ada");
        queue.offer(ada);
        drop(rx);
        assert!(!queue.is_waiting());

        let (bo, _b) = request("Bo");
        assert!(matches!(queue.offer(bo), Offer::Queued));
    }

    #[test]
    fn test_cancel_only_clears_own_entry() {
        let mut queue = MatchQueue::default();
        let (ada, _a) = request("Ada");
        let (bo, _b) = request("Bo");
        let ada_sender = ada.sender.clone();
        queue.offer(ada);

        assert!(!queue.cancel(&bo.sender));
        assert!(queue.is_waiting());
        assert!(queue.cancel(&ada_sender));
        assert!(!queue.is_waiting());
    }
}
