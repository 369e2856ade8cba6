use std::time::Duration;

use crate::error::{DiningError, Result};

pub const NUM_PHILOSOPHERS: usize = 5; // 哲学者 (= 箸) の数
pub const NUM_CYCLES: usize = 10; // 各哲学者が食事する回数
pub const TASK_STACK_SIZE: usize = 2 * 1024 * 1024; // ワーカスレッドのスタックサイズ
pub const MIN_STACK_SIZE: usize = 64 * 1024;

// 1本目の箸を取ってから2本目を取るまでの待ち時間
// ここを広げるほど、順序付けがなければデッドロックしやすくなる
pub const STRESS_DELAY: Duration = Duration::from_millis(3);
pub const EAT_DELAY: Duration = Duration::from_millis(100);
pub const THINK_DELAY: Duration = Duration::from_millis(200);

/// 食卓全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub seats: usize,
    pub cycles: usize,
    pub stress_delay: Duration,
    pub eat_delay: Duration,
    pub think_delay: Duration,
    pub workers: usize,
    pub stack_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            seats: NUM_PHILOSOPHERS,
            cycles: NUM_CYCLES,
            stress_delay: STRESS_DELAY,
            eat_delay: EAT_DELAY,
            think_delay: THINK_DELAY,
            workers: NUM_PHILOSOPHERS,
            stack_size: TASK_STACK_SIZE,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<()> {
        // 1人だと左右の箸が同じになり、自分自身を待ってしまう
        if self.seats < 2 {
            return Err(DiningError::InvalidConfig(format!(
                "at least 2 seats are required, got {}",
                self.seats
            )));
        }
        if self.cycles == 0 {
            return Err(DiningError::InvalidConfig(
                "cycles must be greater than 0".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(DiningError::InvalidConfig(
                "workers must be greater than 0".to_string(),
            ));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(DiningError::InvalidConfig(format!(
                "stack size {} is below the minimum of {MIN_STACK_SIZE} bytes",
                self.stack_size
            )));
        }
        Ok(())
    }

    /// 1サイクルにかかる時間の下限
    pub fn cycle_duration(&self) -> Duration {
        self.stress_delay + self.eat_delay + self.think_delay
    }

    /// 全員のサイクルが完全に直列化された場合にかかる時間。実行時間の上限になる
    pub fn worst_case_duration(&self) -> Duration {
        self.cycle_duration() * (self.cycles * self.seats) as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TableConfig::default();
        assert_eq!(config.seats, 5);
        assert_eq!(config.cycles, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_single_seat() {
        let config = TableConfig {
            seats: 1,
            ..TableConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DiningError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_cycles_and_workers() {
        let config = TableConfig {
            cycles: 0,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TableConfig {
            workers: 0,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_tiny_stack() {
        let config = TableConfig {
            stack_size: 2048,
            ..TableConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cycle_duration() {
        let config = TableConfig::default();
        assert_eq!(config.cycle_duration(), Duration::from_millis(303));
        assert_eq!(config.worst_case_duration(), Duration::from_millis(303 * 50));
    }
}
