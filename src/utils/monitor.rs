#[cfg(feature = "cli")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// 單一處理階段的耗時與資源使用
#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub elapsed: Duration,
    pub memory_mb: Option<u64>,
    pub cpu_usage: Option<f32>,
}

pub struct ResourceMonitor {
    #[cfg(feature = "cli")]
    system: Mutex<System>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
    started: Instant,
    last_mark: Mutex<Instant>,
    peak_memory_mb: Mutex<u64>,
    phases: Mutex<Vec<PhaseStats>>,
    enabled: bool,
}

impl ResourceMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            #[cfg(feature = "cli")]
            system: Mutex::new(System::new()),
            #[cfg(feature = "cli")]
            pid: if enabled {
                sysinfo::get_current_pid().ok()
            } else {
                None
            },
            started: now,
            last_mark: Mutex::new(now),
            peak_memory_mb: Mutex::new(0),
            phases: Mutex::new(Vec::new()),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(feature = "cli")]
    fn sample_process(&self) -> Option<(u64, f32)> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        let process = system.process(pid)?;
        Some((process.memory() / 1024 / 1024, process.cpu_usage()))
    }

    #[cfg(not(feature = "cli"))]
    fn sample_process(&self) -> Option<(u64, f32)> {
        None
    }

    /// 記錄一個階段結束，回傳該階段統計
    pub fn mark_phase(&self, phase: &str) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }

        let elapsed = {
            let mut last = self.last_mark.lock().ok()?;
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let sample = self.sample_process();
        if let Some((memory_mb, _)) = sample {
            let mut peak = self.peak_memory_mb.lock().ok()?;
            *peak = (*peak).max(memory_mb);
        }

        let stats = PhaseStats {
            phase: phase.to_string(),
            elapsed,
            memory_mb: sample.map(|(m, _)| m),
            cpu_usage: sample.map(|(_, c)| c),
        };

        match (stats.memory_mb, stats.cpu_usage) {
            (Some(memory), Some(cpu)) => tracing::info!(
                "📊 {} - {:?}, CPU: {:.1}%, Memory: {}MB",
                phase,
                elapsed,
                cpu,
                memory
            ),
            _ => tracing::info!("📊 {} - {:?}", phase, elapsed),
        }

        if let Ok(mut phases) = self.phases.lock() {
            phases.push(stats.clone());
        }
        Some(stats)
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let peak = self.peak_memory_mb.lock().map(|p| *p).unwrap_or(0);
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
            self.started.elapsed(),
            peak
        );
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
