//! 手套采集模块
//!
//! 模拟智能手套的连接、电量与采样。真实设备尚未接入，
//! 读数在源设备的量程内均匀生成

use anyhow::{anyhow, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;
use std::time::Instant;

use crate::config::GloveConfig;
use crate::records::Measurement;

/// 传感器量程（模拟读数的均匀分布区间）
const PRESSURE_RANGE: Range<f64> = 60.0..100.0;
const TEMPERATURE_RANGE: Range<f64> = 32.0..36.0;
const EMG_RANGE: Range<f64> = 30.0..80.0;

/// 连接状态下每分钟电量衰减（百分比）
const BATTERY_DRAIN_PER_MIN: u64 = 1;

/// 手套连接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    Bluetooth,
    Wifi,
    Usb,
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionMode::Bluetooth => "bluetooth",
            ConnectionMode::Wifi => "wifi",
            ConnectionMode::Usb => "usb",
        };
        f.write_str(label)
    }
}

/// 手套模拟器
///
/// 录制窗口保留最近 N 条采样；取走窗口即一次录制结束
pub struct GloveSimulator {
    mode: ConnectionMode,
    window_size: usize,
    battery_start_percent: u8,
    connected_at: Option<Instant>,
    window: VecDeque<Measurement>,
}

impl GloveSimulator {
    /// 按配置创建模拟器（未连接状态）
    pub fn new(config: &GloveConfig) -> Self {
        Self {
            mode: config.connection_mode,
            window_size: config.window_size,
            battery_start_percent: config.battery_start_percent,
            connected_at: None,
            window: VecDeque::with_capacity(config.window_size),
        }
    }

    /// 建立连接
    pub fn connect(&mut self) {
        if self.connected_at.is_none() {
            self.connected_at = Some(Instant::now());
            tracing::info!("手套已连接: mode={} battery={}%", self.mode, self.battery_percent());
        }
    }

    /// 断开连接
    pub fn disconnect(&mut self) {
        if self.connected_at.take().is_some() {
            tracing::info!("手套已断开");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected_at.is_some()
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    /// 当前电量（百分比）
    pub fn battery_percent(&self) -> u8 {
        match self.connected_at {
            Some(connected_at) => {
                let minutes = connected_at.elapsed().as_secs() / 60;
                let drained = minutes.saturating_mul(BATTERY_DRAIN_PER_MIN);
                (self.battery_start_percent as u64).saturating_sub(drained) as u8
            }
            None => self.battery_start_percent,
        }
    }

    /// 生成一条读数并推入录制窗口
    pub fn sample(&mut self) -> Result<Measurement> {
        if !self.is_connected() {
            return Err(anyhow!("手套未连接"));
        }

        let mut rng = rand::thread_rng();
        let measurement = Measurement::new(
            rng.gen_range(PRESSURE_RANGE),
            rng.gen_range(TEMPERATURE_RANGE),
            rng.gen_range(EMG_RANGE),
        );

        self.window.push_back(measurement);
        if self.window.len() > self.window_size {
            self.window.pop_front();
        }

        Ok(measurement)
    }

    /// 当前窗口内的采样数
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// 窗口是否已满
    pub fn window_full(&self) -> bool {
        self.window.len() >= self.window_size
    }

    /// 取走当前录制窗口（清空）
    pub fn take_recording(&mut self) -> Vec<Measurement> {
        self.window.drain(..).collect()
    }
}
