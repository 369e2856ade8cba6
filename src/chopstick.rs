use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use tokio::sync::Semaphore;

use crate::error::Result;

/// 排他的に使う箸1本
///
/// 許可数1のセマフォで排他を実現し、誰が持っているかを別に記録する。
/// 持っていない哲学者が解放しようとしたら panic する
pub struct Chopstick {
    id: usize,
    permit: Semaphore,
    holder: Mutex<Option<usize>>, // 持っている哲学者の席番号
    acquisitions: AtomicUsize,    // 取得された回数
}

impl Chopstick {
    pub fn new(id: usize) -> Self {
        Chopstick {
            id,
            permit: Semaphore::new(1),
            holder: Mutex::new(None),
            acquisitions: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// 空くまで待ってから seat 番の哲学者のものにする
    pub async fn acquire(&self, seat: usize) -> Result<()> {
        let permit = self.permit.acquire().await?;
        // 許可は release で明示的に戻すので、ここでは手放しておく
        permit.forget();

        let mut holder = self.holder.lock().unwrap();
        if let Some(h) = *holder {
            drop(holder);
            panic!(
                "chopstick {} granted to philosopher {seat} while held by philosopher {h}",
                self.id
            );
        }
        *holder = Some(seat);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// 持ち主だけが解放できる。それ以外は契約違反なので panic
    pub fn release(&self, seat: usize) {
        {
            let mut holder = self.holder.lock().unwrap();
            let current = *holder;
            match current {
                Some(h) if h == seat => *holder = None,
                Some(h) => {
                    drop(holder);
                    panic!(
                        "philosopher {seat} released chopstick {} held by philosopher {h}",
                        self.id
                    );
                }
                None => {
                    drop(holder);
                    panic!("philosopher {seat} released free chopstick {}", self.id);
                }
            }
        }
        self.permit.add_permits(1);
    }

    pub fn holder(&self) -> Option<usize> {
        *self.holder.lock().unwrap()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

/// 円卓に並べた箸の集合。添字が箸の番号 (= 階層) になる
pub struct Chopsticks {
    sticks: Vec<Chopstick>,
}

impl Chopsticks {
    pub fn new(num: usize) -> Self {
        Chopsticks {
            sticks: (0..num).map(Chopstick::new).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sticks.len()
    }

    pub fn get(&self, id: usize) -> &Chopstick {
        &self.sticks[id]
    }

    pub async fn acquire(&self, id: usize, seat: usize) -> Result<()> {
        self.get(id).acquire(seat).await
    }

    pub fn release(&self, id: usize, seat: usize) {
        self.get(id).release(seat)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chopstick> {
        self.sticks.iter()
    }

    pub fn all_free(&self) -> bool {
        self.sticks.iter().all(|c| c.holder().is_none())
    }
}
