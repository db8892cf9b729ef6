use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::unbounded;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// 工作线程数上限
pub const MAX_WORKERS: usize = 32;

/// 默认工作线程数：主机并行度，限制在 1..=32
pub fn default_workers() -> usize {
    num_cpus::get().clamp(1, MAX_WORKERS)
}

/// 可在线程间共享的取消标记
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 已取消时返回 `ScanError::Cancelled`
    pub fn check(&self) -> Result<(), ScanError> {
        if self.is_cancelled() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// 并行配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// 是否启用并行
    pub enabled: bool,

    /// 最大工作线程数
    pub max_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_workers: default_workers(),
        }
    }
}

impl ParallelConfig {
    /// 强制顺序执行
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            max_workers: 1,
        }
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            enabled: true,
            max_workers: workers,
        }
    }

    /// 实际使用的线程数；禁用并行时为 1
    pub fn effective_workers(&self) -> usize {
        if self.enabled {
            self.max_workers.clamp(1, MAX_WORKERS)
        } else {
            1
        }
    }
}

/// 按输入顺序排列的执行结果
#[derive(Debug)]
pub struct PoolOutput<R> {
    /// 与输入一一对应；失败的任务为 None
    pub results: Vec<Option<R>>,

    /// (输入下标, 错误)，按下标排序
    pub errors: Vec<(usize, ScanError)>,
}

/// 按完成顺序排列的执行结果
#[derive(Debug)]
pub struct CompletionOutput<R> {
    /// (任务下标, 结果)，按完成顺序
    pub completed: Vec<(usize, R)>,

    /// (任务下标, 错误)，按下标排序
    pub errors: Vec<(usize, ScanError)>,
}

/// 第二阶段使用的工作线程池
///
/// 只有一个任务或只有一个线程时直接在当前线程顺序执行，不创建线程池。
/// 任务失败不影响其他任务；`ScanError::Cancelled` 会停止提交新任务并向上传播。
pub struct WorkerPool {
    workers: usize,
    pool: Option<ThreadPool>,
    cancel: CancelToken,
}

impl WorkerPool {
    pub fn new(config: &ParallelConfig, cancel: CancelToken) -> Self {
        let workers = config.effective_workers();

        let pool = if workers > 1 {
            match ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("bloat-worker-{}", i))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!("无法创建线程池，改为顺序执行: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            workers: if pool.is_some() { workers } else { 1 },
            pool,
            cancel,
        }
    }

    /// 线程数（顺序执行时为 1）
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// 对每个输入执行 `task`，结果按输入顺序返回
    pub fn run_ordered<T, R, F>(&self, items: &[T], task: F) -> Result<PoolOutput<R>, ScanError>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R, ScanError> + Sync,
    {
        let mut results: Vec<Option<R>> = Vec::with_capacity(items.len());
        results.resize_with(items.len(), || None);
        let mut errors = Vec::new();

        let pool = match &self.pool {
            Some(pool) if items.len() > 1 => pool,
            _ => {
                for (index, item) in items.iter().enumerate() {
                    self.cancel.check()?;
                    match task(item) {
                        Ok(value) => results[index] = Some(value),
                        Err(e) => self.absorb(index, e, &mut errors)?,
                    }
                }
                return Ok(PoolOutput { results, errors });
            }
        };

        let (tx, rx) = unbounded();
        let cancel = &self.cancel;
        let task = &task;

        pool.scope(|s| {
            for (index, item) in items.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                let tx = tx.clone();
                s.spawn(move |_| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let outcome = task(item);
                    // 立即停止尚未开始的任务
                    if matches!(&outcome, Err(e) if e.is_cancelled()) {
                        cancel.cancel();
                    }
                    let _ = tx.send((index, outcome));
                });
            }
        });
        drop(tx);

        for (index, outcome) in rx.iter() {
            match outcome {
                Ok(value) => results[index] = Some(value),
                Err(e) => self.absorb(index, e, &mut errors)?,
            }
        }
        self.cancel.check()?;

        errors.sort_by_key(|(index, _)| *index);
        Ok(PoolOutput { results, errors })
    }

    /// 执行一组独立任务，结果按完成顺序返回
    pub fn run_unordered<R, F>(&self, tasks: Vec<F>) -> Result<CompletionOutput<R>, ScanError>
    where
        R: Send,
        F: FnOnce() -> Result<R, ScanError> + Send,
    {
        let mut completed = Vec::with_capacity(tasks.len());
        let mut errors = Vec::new();

        let pool = match &self.pool {
            Some(pool) if tasks.len() > 1 => pool,
            _ => {
                for (index, task) in tasks.into_iter().enumerate() {
                    self.cancel.check()?;
                    match task() {
                        Ok(value) => completed.push((index, value)),
                        Err(e) => self.absorb(index, e, &mut errors)?,
                    }
                }
                return Ok(CompletionOutput { completed, errors });
            }
        };

        let (tx, rx) = unbounded();
        let cancel = &self.cancel;

        pool.scope(|s| {
            for (index, task) in tasks.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                let tx = tx.clone();
                s.spawn(move |_| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let outcome = task();
                    // 立即停止尚未开始的任务
                    if matches!(&outcome, Err(e) if e.is_cancelled()) {
                        cancel.cancel();
                    }
                    let _ = tx.send((index, outcome));
                });
            }
        });
        drop(tx);

        for (index, outcome) in rx.iter() {
            match outcome {
                Ok(value) => completed.push((index, value)),
                Err(e) => self.absorb(index, e, &mut errors)?,
            }
        }
        self.cancel.check()?;

        errors.sort_by_key(|(index, _)| *index);
        Ok(CompletionOutput { completed, errors })
    }

    /// 记录任务错误；取消信号不记录，直接传播
    fn absorb(
        &self,
        index: usize,
        error: ScanError,
        errors: &mut Vec<(usize, ScanError)>,
    ) -> Result<(), ScanError> {
        if error.is_cancelled() {
            self.cancel.cancel();
            return Err(ScanError::Cancelled);
        }
        errors.push((index, error));
        Ok(())
    }
}
