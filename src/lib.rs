//! Neuro Glove - 智能手套监测内核
//!
//! 面向内分泌科医生的糖尿病神经病变风险筛查数据平台

pub mod analysis;
pub mod auth;
pub mod config;
pub mod glove;
pub mod monitor;
pub mod records;
pub mod store;

pub use anyhow::Result;
