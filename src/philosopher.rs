use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    chopstick::Chopsticks,
    completion::CompletionHandle,
    config::TableConfig,
    error::Result,
    event::{Action, Event, EventSink},
    startup::SeatTicket,
};

/// seat 番の哲学者が使う2本の箸を、取る順に返す
///
/// 使う箸は seat と (seat + 1) % seats。基本は番号の小さい方から取るが、
/// 比較は剰余を取る前の seat + 1 ではなく剰余後の値と行うので、
/// 右隣が 0 に戻る最後の席だけ、0 番を先に取ることになる。
/// (剰余前の seat + 1 と比べても取る順は同じで、最後の席だけ逆になる)
/// 全員が常に番号の昇順で箸を取るため、待ちの循環は起こらない
pub fn chopstick_order(seat: usize, seats: usize) -> (usize, usize) {
    assert!(seat < seats, "seat {seat} is outside a table of {seats}");
    let next = (seat + 1) % seats;
    if seat < next {
        (seat, next)
    } else {
        // 最後の席: next == 0 < seat
        (next, seat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    AcquireFirst,
    AcquireSecond,
    Eating,
    ReleaseSecond,
    ReleaseFirst,
    Thinking,
    Done,
}

/// 哲学者1人分の状態。他の哲学者とは一切共有しない
#[derive(Debug)]
pub struct Philosopher {
    seat: usize,
    first: usize,  // 先に取る箸
    second: usize, // 後に取る箸
    cycle: usize,
    state: State,
}

impl Philosopher {
    pub fn new(seat: usize, seats: usize) -> Self {
        let (first, second) = chopstick_order(seat, seats);
        Philosopher {
            seat,
            first,
            second,
            cycle: 0,
            state: State::Init,
        }
    }

    pub fn seat(&self) -> usize {
        self.seat
    }

    pub fn order(&self) -> (usize, usize) {
        (self.first, self.second)
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn transition(&mut self, state: State) {
        trace!(seat = self.seat, cycle = self.cycle, from = ?self.state, to = ?state);
        self.state = state;
    }

    fn emit(&self, sink: &dyn EventSink, action: Action) {
        sink.record(Event {
            seat: self.seat,
            cycle: self.cycle,
            action,
        });
    }

    /// 取る -> 食べる -> 置く -> 考える を config.cycles 回繰り返す
    pub async fn dine(
        &mut self,
        sticks: &Chopsticks,
        sink: &dyn EventSink,
        config: &TableConfig,
    ) -> Result<()> {
        for cycle in 0..config.cycles {
            self.cycle = cycle;

            self.transition(State::AcquireFirst);
            sticks.acquire(self.first, self.seat).await?;
            self.emit(sink, Action::Acquired(self.first));

            // わざと間を空けて他の哲学者が割り込む隙を作る
            // 順序付けがなければ、ここでデッドロックする可能性が高い
            tokio::time::sleep(config.stress_delay).await;

            self.transition(State::AcquireSecond);
            sticks.acquire(self.second, self.seat).await?;
            self.emit(sink, Action::Acquired(self.second));

            self.transition(State::Eating);
            self.emit(sink, Action::Eating);
            tokio::time::sleep(config.eat_delay).await;

            // 解放は取得の逆順。イベントは持っている間に記録する
            self.transition(State::ReleaseSecond);
            self.emit(sink, Action::Released(self.second));
            sticks.release(self.second, self.seat);

            self.transition(State::ReleaseFirst);
            self.emit(sink, Action::Released(self.first));
            sticks.release(self.first, self.seat);

            self.transition(State::Thinking);
            self.emit(sink, Action::Thinking);
            tokio::time::sleep(config.think_delay).await;
        }

        self.cycle = config.cycles;
        self.transition(State::Done);
        self.emit(sink, Action::Done);
        Ok(())
    }
}

/// 哲学者タスクの本体
///
/// 席番号を受け取ってから食事を始め、終わったら終了を通知する。戻り値は席番号
pub async fn philosopher(
    ticket: SeatTicket,
    sticks: Arc<Chopsticks>,
    sink: Arc<dyn EventSink>,
    done: CompletionHandle,
    config: Arc<TableConfig>,
) -> Result<usize> {
    let seat = ticket.claim().await?;
    let mut p = Philosopher::new(seat, sticks.len());
    let (first, second) = p.order();
    debug!(seat = p.seat(), first, second, "philosopher seated");

    p.dine(&sticks, sink.as_ref(), &config).await?;
    debug!(seat, cycles = p.cycle(), state = ?p.state(), "philosopher leaves the table");

    done.notify();
    Ok(seat)
}
