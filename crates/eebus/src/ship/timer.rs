// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deadline timers serviced by the connection's single service thread.
//!
//! These are passive deadline slots: the service thread's wait loop
//! bounds its queue receive by the earliest running deadline and
//! surfaces expiry as a timeout outcome of that same loop. Timer expiry
//! and data events are therefore handled strictly in turn by one
//! thread, so a timer can never observe state being changed
//! concurrently by a data event on the same connection.

use std::time::{Duration, Instant};

/// The three SME timers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Guards every wait-for-peer state (CMI, hello, handshake).
    WaitForReady,
    /// Fires when our remaining hello wait runs low and a prolongation
    /// request is due.
    SendProlongation,
    /// Guards the peer's reply to our prolongation request.
    ProlongationReply,
}

/// A one-shot deadline slot.
#[derive(Debug, Default)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub fn start(&mut self, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Remaining time; zero once expired, `None` when stopped.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }
}

/// The SME timer set; every state-leaving transition stops all three.
#[derive(Debug, Default)]
pub struct Timers {
    pub wait_for_ready: Timer,
    pub send_prolongation: Timer,
    pub prolongation_reply: Timer,
}

impl Timers {
    pub fn stop_all(&mut self) {
        self.wait_for_ready.stop();
        self.send_prolongation.stop();
        self.prolongation_reply.stop();
    }

    pub fn get_mut(&mut self, kind: TimerKind) -> &mut Timer {
        match kind {
            TimerKind::WaitForReady => &mut self.wait_for_ready,
            TimerKind::SendProlongation => &mut self.send_prolongation,
            TimerKind::ProlongationReply => &mut self.prolongation_reply,
        }
    }

    /// The next (kind, deadline) to fire, if any timer is running.
    pub fn next_deadline(&self) -> Option<(TimerKind, Instant)> {
        let candidates = [
            (TimerKind::WaitForReady, self.wait_for_ready.deadline()),
            (TimerKind::SendProlongation, self.send_prolongation.deadline()),
            (TimerKind::ProlongationReply, self.prolongation_reply.deadline()),
        ];

        candidates
            .into_iter()
            .filter_map(|(kind, deadline)| deadline.map(|d| (kind, d)))
            .min_by_key(|(_, deadline)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_lifecycle() {
        let mut timer = Timer::default();
        assert!(!timer.is_running());
        assert!(timer.remaining().is_none());

        timer.start(Duration::from_secs(60));
        assert!(timer.is_running());
        assert!(timer.remaining().unwrap() > Duration::from_secs(59));
        assert!(!timer.is_expired());

        timer.stop();
        assert!(!timer.is_running());
    }

    #[test]
    fn test_next_deadline_picks_earliest() {
        let mut timers = Timers::default();
        assert!(timers.next_deadline().is_none());

        timers.wait_for_ready.start(Duration::from_secs(60));
        timers.send_prolongation.start(Duration::from_secs(45));

        let (kind, _) = timers.next_deadline().unwrap();
        assert_eq!(kind, TimerKind::SendProlongation);

        timers.stop_all();
        assert!(timers.next_deadline().is_none());
    }

    #[test]
    fn test_expiry() {
        let mut timer = Timer::default();
        timer.start(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(1));
        assert!(timer.is_expired());
        assert_eq!(timer.remaining(), Some(Duration::ZERO));
    }
}
