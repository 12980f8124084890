use common::{Result, StreamError};

/// 进程控制动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    /// 挂起（SIGSTOP）
    Suspend,
    /// 继续（SIGCONT）
    Continue,
    /// 优雅终止（SIGTERM）
    Terminate,
    /// 强制杀死（SIGKILL）
    Kill,
}

impl ControlSignal {
    pub fn action(&self) -> &'static str {
        match self {
            ControlSignal::Suspend => "pause",
            ControlSignal::Continue => "resume",
            ControlSignal::Terminate => "terminate",
            ControlSignal::Kill => "kill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Delivered,
    /// 目标进程已不存在
    AlreadyExited,
}

/// 进程控制接口，单次非阻塞投递
pub trait ProcessControl: Send + Sync {
    fn send(&self, pid: u32, signal: ControlSignal) -> Result<SignalOutcome>;
}

/// 基于 POSIX 信号的实现
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixSignals;

#[cfg(unix)]
impl ProcessControl for UnixSignals {
    fn send(&self, pid: u32, signal: ControlSignal) -> Result<SignalOutcome> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        // 0 和负数会作用于整个进程组
        let raw = match i32::try_from(pid) {
            Ok(raw) if raw > 0 => raw,
            _ => {
                return Err(StreamError::SignalFailure {
                    action: signal.action(),
                    pid,
                    reason: "invalid process id".to_string(),
                })
            }
        };

        let sig = match signal {
            ControlSignal::Suspend => Signal::SIGSTOP,
            ControlSignal::Continue => Signal::SIGCONT,
            ControlSignal::Terminate => Signal::SIGTERM,
            ControlSignal::Kill => Signal::SIGKILL,
        };

        match kill(Pid::from_raw(raw), sig) {
            Ok(()) => Ok(SignalOutcome::Delivered),
            Err(Errno::ESRCH) => Ok(SignalOutcome::AlreadyExited),
            Err(e) => Err(StreamError::SignalFailure {
                action: signal.action(),
                pid,
                reason: e.desc().to_string(),
            }),
        }
    }
}

#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedControl;

#[cfg(not(unix))]
impl ProcessControl for UnsupportedControl {
    fn send(&self, pid: u32, signal: ControlSignal) -> Result<SignalOutcome> {
        Err(StreamError::SignalFailure {
            action: signal.action(),
            pid,
            reason: "process signals are not supported on this platform".to_string(),
        })
    }
}

/// 当前平台的默认实现
pub fn platform_control() -> std::sync::Arc<dyn ProcessControl> {
    #[cfg(unix)]
    {
        std::sync::Arc::new(UnixSignals)
    }
    #[cfg(not(unix))]
    {
        std::sync::Arc::new(UnsupportedControl)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_suspend_continue_terminate_real_process() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        let control = UnixSignals;

        assert_eq!(control.send(pid, ControlSignal::Suspend).unwrap(), SignalOutcome::Delivered);
        assert_eq!(control.send(pid, ControlSignal::Continue).unwrap(), SignalOutcome::Delivered);
        assert_eq!(control.send(pid, ControlSignal::Terminate).unwrap(), SignalOutcome::Delivered);

        let status = child.wait().unwrap();
        assert!(!status.success());

        // 已回收的进程
        assert_eq!(
            control.send(pid, ControlSignal::Terminate).unwrap(),
            SignalOutcome::AlreadyExited
        );
    }

    #[test]
    fn test_stopped_process_needs_continue_to_terminate() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        let control = UnixSignals;

        control.send(pid, ControlSignal::Suspend).unwrap();
        control.send(pid, ControlSignal::Terminate).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(child.try_wait().unwrap().is_none());

        control.send(pid, ControlSignal::Continue).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(nix::sys::signal::Signal::SIGTERM as i32));
    }

    #[test]
    fn test_group_pids_rejected() {
        let control = UnixSignals;
        assert!(matches!(
            control.send(0, ControlSignal::Kill),
            Err(StreamError::SignalFailure { action: "kill", pid: 0, .. })
        ));
        assert!(control.send(u32::MAX, ControlSignal::Kill).is_err());
    }

    #[test]
    fn test_action_names() {
        assert_eq!(ControlSignal::Suspend.action(), "pause");
        assert_eq!(ControlSignal::Continue.action(), "resume");
    }
}
