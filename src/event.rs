use std::{fmt, sync::Mutex};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Acquired(usize),
    Eating,
    Released(usize),
    Thinking,
    Done,
}

/// 哲学者が発行する観測用イベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub seat: usize,
    pub cycle: usize,
    pub action: Action,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Action::Acquired(id) => write!(f, "philosopher {} takes chopstick {}", self.seat, id),
            Action::Eating => write!(f, "philosopher {} is eating, cycle {}", self.seat, self.cycle),
            Action::Released(id) => {
                write!(f, "philosopher {} puts down chopstick {}", self.seat, id)
            }
            Action::Thinking => write!(f, "philosopher {} is thinking", self.seat),
            Action::Done => write!(
                f,
                "philosopher {} is done after {} cycles",
                self.seat, self.cycle
            ),
        }
    }
}

/// イベントの出力先。順序は哲学者間でベストエフォート
pub trait EventSink: Send + Sync {
    fn record(&self, event: Event);
}

/// tracing に1行ずつ書き出しつつ、実行後の検証用に全イベントを保持する
#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<Event>>,
}

impl Journal {
    pub fn new() -> Self {
        Journal::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for Journal {
    fn record(&self, event: Event) {
        info!(seat = event.seat, cycle = event.cycle, "{event}");
        self.events.lock().unwrap().push(event);
    }
}
