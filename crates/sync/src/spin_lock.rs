//! 自旋锁
//!
//! [`SpinLock`] 是 `lock_api::Mutex` 在 [`RawSpinLock`] 上的实例化，
//! 通过 RAII 守卫 [`SpinLockGuard`] 访问被保护的数据。

use crate::raw_spin_lock::RawSpinLock;

/// 保护数据 `T` 的自旋锁
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// [`SpinLock`] 的 RAII 守卫，离开作用域时自动释放锁
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_and_modify() {
        let lock = SpinLock::new(5u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn test_try_lock_while_held() {
        let lock = SpinLock::new(());
        let guard = lock.lock();
        assert!(lock.is_locked());
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(!lock.is_locked());
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_into_inner() {
        let lock = SpinLock::new([1u8, 2, 3]);
        lock.lock()[1] = 9;
        assert_eq!(lock.into_inner(), [1, 9, 3]);
    }
}
