use tokio::sync::oneshot;

use crate::error::{DiningError, Result};

/// 起動したばかりの哲学者に席番号を1つずつ渡す
///
/// 受け渡し口は同時に1つしか作れない。`slot` が返す [`Handoff`] が
/// コーディネータを可変借用しているため、ack を待ち終えるまで次の口は作れない
#[derive(Debug, Default)]
pub struct StartupCoordinator {
    handed_out: Vec<usize>,
}

/// コーディネータ側の受け渡し口
pub struct Handoff<'a> {
    coordinator: &'a mut StartupCoordinator,
    seat_tx: oneshot::Sender<usize>,
    ack_rx: oneshot::Receiver<usize>,
}

/// 哲学者側の受け取り口。起動時に値渡しで持たせる
pub struct SeatTicket {
    seat_rx: oneshot::Receiver<usize>,
    ack_tx: oneshot::Sender<usize>,
}

impl StartupCoordinator {
    pub fn new() -> Self {
        StartupCoordinator::default()
    }

    pub fn slot(&mut self) -> (Handoff<'_>, SeatTicket) {
        let (seat_tx, seat_rx) = oneshot::channel();
        let (ack_tx, ack_rx) = oneshot::channel();
        (
            Handoff {
                coordinator: self,
                seat_tx,
                ack_rx,
            },
            SeatTicket { seat_rx, ack_tx },
        )
    }

    /// これまでに受け渡しが完了した席番号 (渡した順)
    pub fn seats_handed_out(&self) -> &[usize] {
        &self.handed_out
    }
}

impl Handoff<'_> {
    /// 席番号を渡し、相手がそれを受け取ったと返事をするまで待つ
    pub async fn handoff(self, seat: usize) -> Result<()> {
        if self.coordinator.handed_out.contains(&seat) {
            return Err(DiningError::Handoff {
                seat,
                reason: "seat was already handed out".to_string(),
            });
        }

        self.seat_tx.send(seat).map_err(|_| DiningError::Handoff {
            seat,
            reason: "philosopher exited before receiving its seat".to_string(),
        })?;

        let echoed = self.ack_rx.await.map_err(|_| DiningError::Handoff {
            seat,
            reason: "philosopher exited before acknowledging".to_string(),
        })?;
        if echoed != seat {
            return Err(DiningError::Handoff {
                seat,
                reason: format!("philosopher acknowledged seat {echoed}"),
            });
        }

        self.coordinator.handed_out.push(seat);
        Ok(())
    }
}

impl SeatTicket {
    /// 席番号を自分の状態にコピーし、同じ値を返事として送り返す
    pub async fn claim(self) -> Result<usize> {
        let seat = self.seat_rx.await.map_err(|_| DiningError::Abandoned)?;
        // コーディネータがもういなくても、席番号は受け取れているので続行する
        let _ = self.ack_tx.send(seat);
        Ok(seat)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_handoff_in_order() {
        let mut startup = StartupCoordinator::new();
        let mut v = Vec::new();

        for seat in 0..5 {
            let (handoff, ticket) = startup.slot();
            v.push(tokio::spawn(ticket.claim()));
            handoff.handoff(seat).await.unwrap();
        }

        let mut claimed = Vec::new();
        for t in v {
            claimed.push(t.await.unwrap().unwrap());
        }
        assert_eq!(claimed, vec![0, 1, 2, 3, 4]);
        assert_eq!(startup.seats_handed_out(), &[0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_duplicate_seat_is_rejected() {
        let mut startup = StartupCoordinator::new();

        let (handoff, ticket) = startup.slot();
        let t = tokio::spawn(ticket.claim());
        handoff.handoff(3).await.unwrap();
        assert_eq!(t.await.unwrap().unwrap(), 3);

        let (handoff, _ticket) = startup.slot();
        let err = handoff.handoff(3).await.unwrap_err();
        assert!(matches!(err, DiningError::Handoff { seat: 3, .. }));
        assert_eq!(startup.seats_handed_out(), &[3]);
    }

    #[tokio::test]
    async fn test_dropped_ticket_fails_handoff() {
        let mut startup = StartupCoordinator::new();
        let (handoff, ticket) = startup.slot();
        drop(ticket);

        assert!(handoff.handoff(0).await.is_err());
        assert!(startup.seats_handed_out().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_handoff_abandons_ticket() {
        let mut startup = StartupCoordinator::new();
        let (handoff, ticket) = startup.slot();
        drop(handoff);

        assert!(matches!(ticket.claim().await, Err(DiningError::Abandoned)));
    }
}
