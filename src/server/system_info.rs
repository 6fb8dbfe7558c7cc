use serde::Serialize;
use std::sync::Mutex;
use sysinfo::System;

/// Host telemetry passed through to the status endpoint untouched by the
/// accounting engine.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SystemStats {
    /// Global CPU usage, percent.
    pub cpu: f32,
    /// Used memory, percent of total.
    pub ram: f32,
    /// Host uptime, seconds.
    pub uptime: u64,
}

pub struct SystemMonitor {
    sys: Mutex<System>,
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMonitor {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is computed between refreshes; prime the first sample.
        sys.refresh_cpu_usage();
        Self {
            sys: Mutex::new(sys),
        }
    }

    pub fn sample(&self) -> SystemStats {
        let mut sys = self
            .sys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let total = sys.total_memory();
        let ram = if total > 0 {
            (sys.used_memory() as f64 / total as f64 * 100.0) as f32
        } else {
            0.0
        };

        SystemStats {
            cpu: round1(sys.global_cpu_usage()),
            ram: round1(ram),
            uptime: System::uptime(),
        }
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_in_range() {
        let stats = SystemMonitor::new().sample();
        assert!((0.0..=100.0).contains(&stats.ram));
        assert!(stats.cpu >= 0.0);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(round1(0.06), 0.1);
    }
}
