mod chopstick;
mod completion;
mod config;
mod error;
mod event;
mod philosopher;
mod startup;
mod table;
mod verify;

use std::{io::Write, time::Duration};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::{
    TableConfig, EAT_DELAY, NUM_CYCLES, NUM_PHILOSOPHERS, STRESS_DELAY, TASK_STACK_SIZE,
    THINK_DELAY,
};
use error::{DiningError, Result};
use table::{Report, Table};

// 5人の哲学者問題を、箸に階層 (番号順) を付けることでデッドロックなしに解く
#[derive(Parser)]
#[command(version)]
#[command(about = "Dining philosophers with a chopstick hierarchy")]
struct Cli {
    /// Number of meals each philosopher eats before leaving the table
    #[arg(long, default_value_t = NUM_CYCLES)]
    cycles: usize,

    /// Pause between taking the first and the second chopstick, in ms
    #[arg(long, default_value_t = STRESS_DELAY.as_millis() as u64)]
    stress_ms: u64,

    /// Time spent eating with both chopsticks, in ms
    #[arg(long, default_value_t = EAT_DELAY.as_millis() as u64)]
    eat_ms: u64,

    /// Time spent thinking without chopsticks, in ms
    #[arg(long, default_value_t = THINK_DELAY.as_millis() as u64)]
    think_ms: u64,

    /// Number of runtime worker threads the philosophers are scheduled on
    #[arg(long, default_value_t = NUM_PHILOSOPHERS)]
    workers: usize,

    /// Stack size of each worker thread, in bytes
    #[arg(long, default_value_t = TASK_STACK_SIZE)]
    stack_size: usize,

    /// Also log startup handoffs and task completion
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn table_config(&self) -> TableConfig {
        TableConfig {
            cycles: self.cycles,
            stress_delay: Duration::from_millis(self.stress_ms),
            eat_delay: Duration::from_millis(self.eat_ms),
            think_delay: Duration::from_millis(self.think_ms),
            workers: self.workers,
            stack_size: self.stack_size,
            ..TableConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let config = cli.table_config();
    config.validate()?;

    // 哲学者はこのランタイムのワーカスレッド上で並行に動く
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .thread_name("philosopher-worker")
        .thread_stack_size(config.stack_size)
        .enable_time()
        .build()
        .map_err(DiningError::Runtime)?;

    let report = runtime.block_on(async {
        let table = Table::new(config)?;
        table.run().await
    })?;

    announce(&report, &mut std::io::stdout().lock()).map_err(DiningError::Output)?;
    Ok(())
}

/// 詳細はログに回し、標準出力には終了の1行だけを書く
fn announce(report: &Report, out: &mut impl Write) -> std::io::Result<()> {
    debug!(
        seats = ?report.seats_handed_out,
        acquisitions = ?report.acquisitions,
        "run details"
    );
    debug!("{report}");
    writeln!(out, "Finished without deadlock!")
}
