use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::Semaphore;

use crate::error::{DiningError, Result};

struct Inner {
    done: Semaphore,    // 0 から始まる計数セマフォ
    count: AtomicUsize, // notify された回数。減ることはない
    expected: usize,
}

/// 全哲学者の終了を待ち合わせる
///
/// 哲学者ごとに [`CompletionHandle`] を1つ渡し、終了時に `notify` してもらう。
/// `await_all` は self を消費するので1回しか呼べない
pub struct CompletionCoordinator {
    inner: Arc<Inner>,
}

/// 終了通知用のハンドル。Clone できず、notify で消費される
pub struct CompletionHandle {
    inner: Arc<Inner>,
}

impl CompletionCoordinator {
    pub fn new(expected: usize) -> Self {
        CompletionCoordinator {
            inner: Arc::new(Inner {
                done: Semaphore::new(0),
                count: AtomicUsize::new(0),
                expected,
            }),
        }
    }

    pub fn handle(&self) -> CompletionHandle {
        CompletionHandle {
            inner: self.inner.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// expected 回の notify がそろうまで待ち、受け取った通知数を返す
    pub async fn await_all(self) -> Result<usize> {
        let expected = u32::try_from(self.inner.expected).map_err(|_| {
            DiningError::InvalidConfig(format!(
                "cannot wait for {} completions",
                self.inner.expected
            ))
        })?;
        let permits = self.inner.done.acquire_many(expected).await?;
        permits.forget();
        Ok(self.count())
    }
}

impl CompletionHandle {
    pub fn notify(self) {
        let prev = self.inner.count.fetch_add(1, Ordering::AcqRel);
        assert!(
            prev < self.inner.expected,
            "completion notified {} times, expected {}",
            prev + 1,
            self.inner.expected
        );
        self.inner.done.add_permits(1);
    }
}
