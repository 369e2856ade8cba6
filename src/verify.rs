use crate::{
    chopstick::Chopsticks,
    config::TableConfig,
    error::{DiningError, Result},
    event::{Action, Event},
    philosopher::chopstick_order,
};

/// 実行後のイベント列を検査する
///
/// 取得イベントは箸を持った後、解放イベントは手放す前に記録されているので、
/// 箸ごとに見ればイベント列の順序がそのまま所有の順序になる
pub fn verify(events: &[Event], sticks: &Chopsticks, config: &TableConfig) -> Result<()> {
    check_mutual_exclusion(events, config.seats)?;
    for seat in 0..config.seats {
        check_seat_sequence(events, seat, config)?;
    }
    check_acquisition_counts(sticks, config.cycles)?;
    check_all_released(sticks)
}

/// 全員が食べ終わった後に、まだ持たれている箸がないか
pub fn check_all_released(sticks: &Chopsticks) -> Result<()> {
    if sticks.all_free() {
        return Ok(());
    }
    let held: Vec<_> = sticks
        .iter()
        .filter_map(|c| c.holder().map(|h| (c.id(), h)))
        .collect();
    Err(DiningError::Verification(format!(
        "chopsticks still held after the run (chopstick, philosopher): {held:?}"
    )))
}

/// どの箸も同時に2人以上が持っていないか
pub fn check_mutual_exclusion(events: &[Event], num_sticks: usize) -> Result<()> {
    let mut holders: Vec<Option<usize>> = vec![None; num_sticks];

    for (i, e) in events.iter().enumerate() {
        match e.action {
            Action::Acquired(id) => {
                let holder = holder_mut(&mut holders, id, i)?;
                if let Some(h) = *holder {
                    return Err(DiningError::Verification(format!(
                        "event {i}: philosopher {} took chopstick {id} held by philosopher {h}",
                        e.seat
                    )));
                }
                *holder = Some(e.seat);
            }
            Action::Released(id) => {
                let holder = holder_mut(&mut holders, id, i)?;
                if *holder != Some(e.seat) {
                    return Err(DiningError::Verification(format!(
                        "event {i}: philosopher {} put down chopstick {id} held by {:?}",
                        e.seat, *holder
                    )));
                }
                *holder = None;
            }
            _ => {}
        }
    }

    match holders.iter().position(Option::is_some) {
        Some(id) => Err(DiningError::Verification(format!(
            "chopstick {id} is still held by {:?}",
            holders[id]
        ))),
        None => Ok(()),
    }
}

fn holder_mut(holders: &mut [Option<usize>], id: usize, i: usize) -> Result<&mut Option<usize>> {
    holders
        .get_mut(id)
        .ok_or_else(|| DiningError::Verification(format!("event {i}: unknown chopstick {id}")))
}

/// seat 番の哲学者のイベントが、各サイクルで
/// 取得(1本目) -> 取得(2本目) -> 食事 -> 解放(2本目) -> 解放(1本目) -> 思考
/// の順に並び、最後に終了が1回だけあるか
pub fn check_seat_sequence(events: &[Event], seat: usize, config: &TableConfig) -> Result<()> {
    let (first, second) = chopstick_order(seat, config.seats);

    let mut expected = Vec::with_capacity(config.cycles * 6 + 1);
    for cycle in 0..config.cycles {
        for action in [
            Action::Acquired(first),
            Action::Acquired(second),
            Action::Eating,
            Action::Released(second),
            Action::Released(first),
            Action::Thinking,
        ] {
            expected.push(Event {
                seat,
                cycle,
                action,
            });
        }
    }
    expected.push(Event {
        seat,
        cycle: config.cycles,
        action: Action::Done,
    });

    let actual: Vec<_> = events.iter().filter(|e| e.seat == seat).collect();
    if actual.len() != expected.len() {
        return Err(DiningError::Verification(format!(
            "philosopher {seat} emitted {} events, expected {}",
            actual.len(),
            expected.len()
        )));
    }

    for (i, (a, e)) in actual.iter().zip(&expected).enumerate() {
        if *a != e {
            return Err(DiningError::Verification(format!(
                "philosopher {seat} event {i}: got {a:?}, expected {e:?}"
            )));
        }
    }
    Ok(())
}

/// 箸は両隣の2人が使うので、それぞれ 2 * cycles 回取得されているはず
pub fn check_acquisition_counts(sticks: &Chopsticks, cycles: usize) -> Result<()> {
    for stick in sticks.iter() {
        if stick.acquisitions() != 2 * cycles {
            return Err(DiningError::Verification(format!(
                "chopstick {} was acquired {} times, expected {}",
                stick.id(),
                stick.acquisitions(),
                2 * cycles
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn ev(seat: usize, cycle: usize, action: Action) -> Event {
        Event {
            seat,
            cycle,
            action,
        }
    }

    fn one_cycle(seat: usize, seats: usize, cycle: usize) -> Vec<Event> {
        let (first, second) = chopstick_order(seat, seats);
        vec![
            ev(seat, cycle, Action::Acquired(first)),
            ev(seat, cycle, Action::Acquired(second)),
            ev(seat, cycle, Action::Eating),
            ev(seat, cycle, Action::Released(second)),
            ev(seat, cycle, Action::Released(first)),
            ev(seat, cycle, Action::Thinking),
        ]
    }

    fn config(seats: usize, cycles: usize) -> TableConfig {
        TableConfig {
            seats,
            cycles,
            ..TableConfig::default()
        }
    }

    #[test]
    fn test_mutual_exclusion_ok() {
        let mut events = one_cycle(0, 3, 0);
        events.extend(one_cycle(1, 3, 0));
        assert!(check_mutual_exclusion(&events, 3).is_ok());
    }

    #[test]
    fn test_mutual_exclusion_overlap() {
        // 0 番が 1 番の箸を持ったまま、1 番の哲学者も 1 番の箸を取っている
        let events = vec![
            ev(0, 0, Action::Acquired(0)),
            ev(0, 0, Action::Acquired(1)),
            ev(1, 0, Action::Acquired(1)),
        ];
        assert!(matches!(
            check_mutual_exclusion(&events, 3),
            Err(DiningError::Verification(_))
        ));
    }

    #[test]
    fn test_mutual_exclusion_foreign_release_and_leak() {
        let events = vec![ev(0, 0, Action::Acquired(0)), ev(1, 0, Action::Released(0))];
        assert!(check_mutual_exclusion(&events, 2).is_err());

        let events = vec![ev(0, 0, Action::Acquired(0))];
        assert!(check_mutual_exclusion(&events, 2).is_err());

        let events = vec![ev(0, 0, Action::Acquired(7))];
        assert!(check_mutual_exclusion(&events, 2).is_err());
    }

    #[test]
    fn test_seat_sequence_ok() {
        let config = config(5, 2);
        let mut events = one_cycle(4, 5, 0);
        events.extend(one_cycle(4, 5, 1));
        events.push(ev(4, 2, Action::Done));
        assert!(check_seat_sequence(&events, 4, &config).is_ok());
    }

    #[test]
    fn test_seat_sequence_wrong_order() {
        // 最後の席が 4 番の箸から取ってしまうケース
        let config = config(5, 1);
        let events = vec![
            ev(4, 0, Action::Acquired(4)),
            ev(4, 0, Action::Acquired(0)),
            ev(4, 0, Action::Eating),
            ev(4, 0, Action::Released(0)),
            ev(4, 0, Action::Released(4)),
            ev(4, 0, Action::Thinking),
            ev(4, 1, Action::Done),
        ];
        assert!(check_seat_sequence(&events, 4, &config).is_err());
    }

    #[test]
    fn test_seat_sequence_missing_cycle() {
        let config = config(5, 2);
        let mut events = one_cycle(2, 5, 0);
        events.push(ev(2, 2, Action::Done));
        assert!(check_seat_sequence(&events, 2, &config).is_err());
    }

    #[tokio::test]
    async fn test_acquisition_counts() {
        let sticks = Chopsticks::new(2);
        for seat in [0, 1] {
            for id in [0, 1] {
                sticks.acquire(id, seat).await.unwrap();
                sticks.release(id, seat);
            }
        }
        assert!(check_acquisition_counts(&sticks, 1).is_ok());
        assert!(check_acquisition_counts(&sticks, 2).is_err());
    }

    #[tokio::test]
    async fn test_held_chopstick_fails_verification() {
        let sticks = Chopsticks::new(3);
        assert!(check_all_released(&sticks).is_ok());

        // 2 番の哲学者が 0 番の箸を置き忘れている
        sticks.acquire(0, 2).await.unwrap();
        let err = check_all_released(&sticks).unwrap_err();
        assert!(err.to_string().contains("(0, 2)"));

        sticks.release(0, 2);
        assert!(check_all_released(&sticks).is_ok());
    }
}
