use std::{fmt, sync::Arc, time::Duration};

use tokio::{task::JoinSet, time::Instant};
use tracing::{debug, info, info_span, Instrument};

use crate::{
    chopstick::Chopsticks,
    completion::CompletionCoordinator,
    config::TableConfig,
    error::Result,
    event::{Event, Journal},
    philosopher::philosopher,
    startup::StartupCoordinator,
    verify::verify,
};

/// 実行結果
#[derive(Debug)]
pub struct Report {
    pub seats: usize,
    pub cycles: usize,
    pub completions: usize,
    pub seats_handed_out: Vec<usize>,
    pub acquisitions: Vec<usize>, // 箸ごとの取得回数
    pub events: Vec<Event>,
    pub elapsed: Duration,
    pub bound: Duration, // 直列化した場合の所要時間。elapsed はこれを超えない
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "completed without deadlock: {} philosophers x {} cycles, {} completions, {} events in {:.2?} (bound {:.2?})",
            self.seats,
            self.cycles,
            self.completions,
            self.events.len(),
            self.elapsed,
            self.bound
        )
    }
}

/// 円卓。箸を用意し、哲学者を1人ずつ起動して全員の終了を待つ
pub struct Table {
    config: Arc<TableConfig>,
    sticks: Arc<Chopsticks>,
    journal: Arc<Journal>,
}

impl Table {
    pub fn new(config: TableConfig) -> Result<Self> {
        config.validate()?;
        let sticks = Arc::new(Chopsticks::new(config.seats));
        Ok(Table {
            config: Arc::new(config),
            sticks,
            journal: Arc::new(Journal::new()),
        })
    }

    pub async fn run(self) -> Result<Report> {
        let start = Instant::now();
        let seats = self.config.seats;
        info!(
            seats,
            cycles = self.config.cycles,
            "dining philosophers with a chopstick hierarchy"
        );

        let completion = CompletionCoordinator::new(seats);
        let mut startup = StartupCoordinator::new();
        let mut actors = JoinSet::new();

        for seat in 0..seats {
            let (handoff, ticket) = startup.slot();
            actors.spawn(
                philosopher(
                    ticket,
                    self.sticks.clone(),
                    self.journal.clone(),
                    completion.handle(),
                    self.config.clone(),
                )
                .instrument(info_span!("philosopher", id = seat)),
            );
            // 受け取ったと返事が来るまで次の哲学者は起動しない
            handoff.handoff(seat).await?;
            debug!(seat, "philosopher launched");
        }

        let completions = wait_for_completion(completion, &mut actors).await?;

        // 通知済みのタスクの終了を回収する
        while let Some(joined) = actors.join_next().await {
            joined??;
        }

        let events = self.journal.events();
        verify(&events, &self.sticks, &self.config)?;

        Ok(Report {
            seats,
            cycles: self.config.cycles,
            completions,
            seats_handed_out: startup.seats_handed_out().to_vec(),
            acquisitions: self.sticks.iter().map(|c| c.acquisitions()).collect(),
            events,
            elapsed: start.elapsed(),
            bound: self.config.worst_case_duration(),
        })
    }
}

/// 全員分の終了通知を待つ。途中で panic したタスクがあればそのエラーを返す
async fn wait_for_completion(
    completion: CompletionCoordinator,
    actors: &mut JoinSet<Result<usize>>,
) -> Result<usize> {
    let all_done = completion.await_all();
    tokio::pin!(all_done);

    loop {
        tokio::select! {
            completions = &mut all_done => return completions,
            Some(joined) = actors.join_next() => {
                let seat = joined??;
                debug!(seat, "philosopher finished");
            }
        }
    }
}
