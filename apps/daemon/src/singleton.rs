//! 单实例文件锁
//!
//! 两个守护进程同时 export 同一组引脚、同时创建虚拟键盘会互相干扰，
//! 因此启动时先获取排他文件锁。进程崩溃时锁由内核自动释放。

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const LOCK_FILENAME: &str = "pat_input_daemon.lock";

/// 默认锁文件路径
///
/// 优先 `$XDG_RUNTIME_DIR`，否则使用系统临时目录。
pub fn default_lock_path() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir).join(LOCK_FILENAME)
}

/// 单实例锁，Drop 时释放
#[derive(Debug)]
pub struct SingletonLock {
    file: File,
    path: PathBuf,
}

impl SingletonLock {
    /// 尝试获取锁（非阻塞）
    ///
    /// # 返回
    /// - `Ok(Self)`: 成功获取锁，文件内容为当前 PID
    /// - `Err`: 锁已被其他进程持有（`WouldBlock`），或文件操作失败
    pub fn try_lock(lock_path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let path = lock_path.as_ref();

        // 拿到锁之前不能截断，文件里可能是持锁进程的 PID
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .read(true)
            .open(path)?;

        if !file.try_lock_exclusive()? {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "PAT input daemon is already running (locked)",
            ));
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(&file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SingletonLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lock_writes_pid() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(LOCK_FILENAME);

        let lock = SingletonLock::try_lock(&lock_path).unwrap();
        assert_eq!(lock.path(), lock_path);
        drop(lock);

        let content = fs::read_to_string(&lock_path).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_lock_can_be_reacquired_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(LOCK_FILENAME);
        fs::write(&lock_path, "stale-pid-from-crashed-run\n").unwrap();

        let lock1 = SingletonLock::try_lock(&lock_path).unwrap();
        drop(lock1);

        let lock2 = SingletonLock::try_lock(&lock_path).unwrap();
        drop(lock2);

        let content = fs::read_to_string(&lock_path).unwrap();
        assert!(!content.contains("stale"));
    }

    #[test]
    fn test_lock_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("missing").join(LOCK_FILENAME);
        assert!(SingletonLock::try_lock(&lock_path).is_err());
    }

    #[test]
    fn test_default_lock_path_filename() {
        assert!(default_lock_path().ends_with(LOCK_FILENAME));
    }
}
