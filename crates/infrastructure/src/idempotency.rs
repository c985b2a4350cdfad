use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use taskevents_core::IdempotencyConfig;

/// 时钟抽象，测试中注入可控时钟来验证TTL行为
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 预留结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// 新事件，已预留去重条目
    Fresh,
    /// TTL窗口内的重复事件
    Duplicate,
    /// 事件ID为空，无法去重
    Unkeyed,
}

/// 进程内幂等缓存
///
/// 有界、按时间过期的已处理事件ID集合。尽力而为的至多一次
/// 过滤：TTL窗口内的重投事件被识别为重复，过期后同一ID按新
/// 事件处理。清理扫描是唯一的淘汰机制，条目都足够年轻时缓存
/// 可以超过名义上限（软上限）。
pub struct IdempotencyCache {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl IdempotencyCache {
    pub fn new(config: &IdempotencyConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &IdempotencyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(config.ttl_seconds as i64),
            max_entries: config.max_entries,
            clock,
        }
    }

    /// 检查事件是否已处理
    ///
    /// 空ID无法去重，按未处理对待。
    pub fn is_processed(&self, event_id: &str) -> bool {
        if event_id.is_empty() {
            warn!("事件ID为空，无法检查幂等性");
            return false;
        }

        let now = self.clock.now();
        let entries = self.lock_entries();
        match entries.get(event_id) {
            Some(processed_at) if !self.is_expired(*processed_at, now) => {
                info!(event_id, "事件已处理过");
                true
            }
            _ => false,
        }
    }

    /// 标记事件处理成功
    ///
    /// 缓存达到上限时先做一次清理扫描再插入。
    pub fn mark_processed(&self, event_id: &str) {
        if event_id.is_empty() {
            warn!("事件ID为空，无法标记为已处理");
            return;
        }

        let now = self.clock.now();
        let mut entries = self.lock_entries();
        if entries.len() >= self.max_entries {
            Self::sweep(&mut entries, self.ttl, now);
        }
        entries.insert(event_id.to_string(), now);
        debug!(event_id, "事件已标记为处理完成");
    }

    /// 原子的检查并预留
    ///
    /// 单次加锁内完成检查和插入，同一ID的并发重投不会双双通过
    /// 检查。预留即写入时间戳，处理成功后无需再次标记；处理失败
    /// 必须调用 [`release`](Self::release) 释放预留，事件才保持可重投。
    pub fn check_and_reserve(&self, event_id: &str) -> Reservation {
        if event_id.is_empty() {
            warn!("事件ID为空，跳过去重");
            return Reservation::Unkeyed;
        }

        let now = self.clock.now();
        let mut entries = self.lock_entries();
        if let Some(processed_at) = entries.get(event_id) {
            if !self.is_expired(*processed_at, now) {
                info!(event_id, "事件已处理过，跳过");
                return Reservation::Duplicate;
            }
            // 过期条目按从未见过处理，重新预留
        }

        if entries.len() >= self.max_entries {
            Self::sweep(&mut entries, self.ttl, now);
        }
        entries.insert(event_id.to_string(), now);
        Reservation::Fresh
    }

    /// 释放处理失败事件的预留
    pub fn release(&self, event_id: &str) {
        if event_id.is_empty() {
            return;
        }
        let mut entries = self.lock_entries();
        entries.remove(event_id);
        debug!(event_id, "已释放去重预留");
    }

    /// 清理扫描，移除所有超过TTL的条目
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock_entries();
        let removed = Self::sweep(&mut entries, self.ttl, now);
        if removed > 0 {
            info!("清理了 {} 条过期的幂等条目", removed);
        }
        removed
    }

    /// 缓存中的条目数量
    pub fn processed_count(&self) -> usize {
        self.lock_entries().len()
    }

    /// 清空缓存（测试与运维用）
    pub fn clear(&self) {
        self.lock_entries().clear();
        info!("幂等缓存已清空");
    }

    /// 锁中毒按放开处理：去重退化为尽力而为，请求照常服务
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("幂等缓存锁中毒，去重状态可能不完整");
                poisoned.into_inner()
            }
        }
    }

    fn is_expired(&self, processed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - processed_at > self.ttl
    }

    fn sweep(entries: &mut HashMap<String, DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|_, processed_at| now - *processed_at <= ttl);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// 可手动推进的测试时钟
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        fn advance(&self, duration: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += duration;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn config(ttl_seconds: u64, max_entries: usize) -> IdempotencyConfig {
        IdempotencyConfig {
            ttl_seconds,
            max_entries,
        }
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_unseen_event_is_not_processed() {
        let cache = IdempotencyCache::new(&config(60, 100));
        assert!(!cache.is_processed("evt-1"));
    }

    #[test]
    fn test_mark_then_check() {
        let cache = IdempotencyCache::new(&config(60, 100));
        cache.mark_processed("evt-1");
        assert!(cache.is_processed("evt-1"));
        assert_eq!(cache.processed_count(), 1);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let cache = IdempotencyCache::with_clock(&config(60, 100), clock.clone());

        cache.mark_processed("evt-1");
        assert!(cache.is_processed("evt-1"));

        // 恰好TTL时仍然算已处理，超过后算新事件
        clock.advance(Duration::seconds(60));
        assert!(cache.is_processed("evt-1"));
        clock.advance(Duration::seconds(1));
        assert!(!cache.is_processed("evt-1"));
    }

    #[test]
    fn test_empty_id_is_never_cached() {
        let cache = IdempotencyCache::new(&config(60, 100));
        cache.mark_processed("");
        assert!(!cache.is_processed(""));
        assert_eq!(cache.processed_count(), 0);
        assert_eq!(cache.check_and_reserve(""), Reservation::Unkeyed);
        assert_eq!(cache.processed_count(), 0);
    }

    #[test]
    fn test_check_and_reserve_detects_duplicates() {
        let cache = IdempotencyCache::new(&config(60, 100));
        assert_eq!(cache.check_and_reserve("evt-1"), Reservation::Fresh);
        assert_eq!(cache.check_and_reserve("evt-1"), Reservation::Duplicate);
    }

    #[test]
    fn test_release_makes_event_retryable() {
        let cache = IdempotencyCache::new(&config(60, 100));
        assert_eq!(cache.check_and_reserve("evt-1"), Reservation::Fresh);
        cache.release("evt-1");
        assert_eq!(cache.check_and_reserve("evt-1"), Reservation::Fresh);
    }

    #[test]
    fn test_expired_entry_is_reserved_again() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let cache = IdempotencyCache::with_clock(&config(60, 100), clock.clone());

        assert_eq!(cache.check_and_reserve("evt-1"), Reservation::Fresh);
        clock.advance(Duration::seconds(61));
        assert_eq!(cache.check_and_reserve("evt-1"), Reservation::Fresh);
    }

    #[test]
    fn test_cleanup_removes_only_expired_entries() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let cache = IdempotencyCache::with_clock(&config(60, 100), clock.clone());

        cache.mark_processed("old-1");
        cache.mark_processed("old-2");
        clock.advance(Duration::seconds(61));
        cache.mark_processed("young");

        assert_eq!(cache.cleanup(), 2);
        assert_eq!(cache.processed_count(), 1);
        assert!(cache.is_processed("young"));
    }

    #[test]
    fn test_size_trigger_sweeps_before_insert() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let cache = IdempotencyCache::with_clock(&config(60, 2), clock.clone());

        cache.mark_processed("old-1");
        cache.mark_processed("old-2");
        clock.advance(Duration::seconds(61));

        cache.mark_processed("new-1");
        assert_eq!(cache.processed_count(), 1);
        assert!(cache.is_processed("new-1"));
    }

    #[test]
    fn test_max_entries_is_a_soft_limit() {
        // 条目都未过期时清理扫描不移除任何条目，缓存可以超过名义上限
        let cache = IdempotencyCache::new(&config(3600, 2));
        cache.mark_processed("evt-1");
        cache.mark_processed("evt-2");
        cache.mark_processed("evt-3");
        assert_eq!(cache.processed_count(), 3);
    }

    #[test]
    fn test_clear() {
        let cache = IdempotencyCache::new(&config(60, 100));
        cache.mark_processed("evt-1");
        cache.clear();
        assert_eq!(cache.processed_count(), 0);
        assert!(!cache.is_processed("evt-1"));
    }
}
