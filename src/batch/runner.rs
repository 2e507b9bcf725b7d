//! # 批量执行器
//!
//! 并行执行批量处理任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代（输出顺序与输入一致）
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/scan.rs`、`commands/collect.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{QslabError, Result};
use crate::utils::progress;

use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 单个任务处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult<R> {
    /// 处理成功，携带产出
    Success(R),
    /// 跳过（如输出已存在）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (任务名, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug)]
pub struct BatchResult<R> {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
    /// 成功产出，按输入顺序
    pub outputs: Vec<R>,
}

impl<R> Default for BatchResult<R> {
    fn default() -> Self {
        BatchResult {
            success: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl<R> BatchResult<R> {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult<R>) {
        match result {
            ProcessResult::Success(output) => {
                self.success += 1;
                self.outputs.push(output);
            }
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(name, err) => {
                self.failed += 1;
                self.failures.push((name, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，`jobs = 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理任务列表
    pub fn run<T, R, F>(&self, items: &[T], message: &str, processor: F) -> Result<BatchResult<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> ProcessResult<R> + Sync + Send,
    {
        let pb = progress::create_progress_bar(items.len() as u64, message);
        let failed_count = AtomicUsize::new(0);

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| QslabError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<ProcessResult<R>> = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = processor(item);
                    if let ProcessResult::Failed(_, _) = &result {
                        let failed = failed_count.fetch_add(1, Ordering::Relaxed) + 1;
                        pb.set_message(format!("{} ({} failed)", message, failed));
                    }
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        // 汇总结果
        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }

        Ok(batch_result)
    }
}
