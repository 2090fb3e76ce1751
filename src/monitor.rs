//! 监测运行时
//!
//! 把配置、存储、各记录服务与手套模拟器装配为长驻的
//! 采样-落盘-分析循环，支持优雅关闭

use anyhow::Result;
use std::sync::Arc;

use crate::analysis::{AnalysisResult, AnalysisService};
use crate::auth::{LocalTokenVerifier, RequestContext, TokenVerifier};
use crate::config::Config;
use crate::glove::GloveSimulator;
use crate::records::{
    MeasurementService, NewPatient, Patient, PatientService, ProfileService,
};
use crate::store::{SharedStore, SqliteStore};

pub struct Monitor {
    config: Config,
    store: SharedStore,
    /// 经过验证的医生身份，逐请求传入各服务
    ctx: RequestContext,
    patients: PatientService,
    measurements: MeasurementService,
    analysis: AnalysisService,
    glove: GloveSimulator,
}

impl Monitor {
    pub async fn new(config: Config) -> Result<Self> {
        tracing::info!("正在初始化监测运行时...");

        // 创建存储实例
        let store: SharedStore = Arc::new(SqliteStore::new(&config.database).await?);

        // 验证医生身份（本地静态令牌，生产环境由外部认证服务替换）
        tracing::info!("正在验证医生身份...");
        let verifier = LocalTokenVerifier::from_config(&config.auth);
        let ctx = verifier.verify(verifier.token())?;
        tracing::info!("医生身份: {} ({})", ctx.name, ctx.doctor_id);

        // 首次运行时登记医生档案
        let profiles = ProfileService::new(store.clone());
        if profiles.get(&ctx.doctor_id).await?.is_none() {
            profiles.register(&ctx).await?;
        }

        let patients = PatientService::new(store.clone());
        let measurements = MeasurementService::new(store.clone());
        let analysis = AnalysisService::new(store.clone());
        let glove = GloveSimulator::new(&config.glove);

        tracing::info!("监测运行时初始化完成");
        Ok(Self {
            config,
            store,
            ctx,
            patients,
            measurements,
            analysis,
            glove,
        })
    }

    /// 运行采样-分析循环（直到 Ctrl+C / TERM 信号）
    ///
    /// 存储为空时先创建演示患者，监测循环才有对象
    pub async fn run(mut self) -> Result<()> {
        let patient = match self.patients.list(&self.ctx).await?.into_iter().next() {
            Some(patient) => patient,
            None => {
                let patient = self
                    .patients
                    .create(
                        &self.ctx,
                        NewPatient {
                            first_name: "Marie".to_string(),
                            last_name: "Dubois".to_string(),
                            date_of_birth: "1962-04-17".to_string(),
                            phone: "+33 6 12 34 56 78".to_string(),
                            email: "marie.dubois@example.com".to_string(),
                            medical_history: "Type 2 diabetes diagnosed in 2015".to_string(),
                            diagnosis: "Diabetic neuropathy risk monitoring".to_string(),
                        },
                    )
                    .await?;
                tracing::info!("已创建演示患者: {}", patient.full_name());
                patient
            }
        };

        tracing::info!(
            "开始监测患者: {} (采样间隔 {}ms)",
            patient.full_name(),
            self.config.glove.sample_interval_ms
        );

        self.glove.connect();

        let mut tick = tokio::time::interval(std::time::Duration::from_millis(
            self.config.glove.sample_interval_ms,
        ));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let measurement = self.glove.sample()?;
                    tracing::debug!(
                        "采样: pressure={:.1} temperature={:.1} emg={:.1} battery={}%",
                        measurement.pressure,
                        measurement.temperature,
                        measurement.emg,
                        self.glove.battery_percent()
                    );

                    // 窗口满即落盘并触发一次分析
                    if self.glove.window_full() {
                        self.flush_and_analyze(&patient).await?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("收到 Ctrl+C 信号，正在关闭...");
                    break;
                }
                _ = Self::wait_for_term_signal() => {
                    tracing::info!("收到 TERM 信号，正在关闭...");
                    break;
                }
            }
        }

        // 关闭前保存未满窗口的剩余采样
        if self.glove.window_len() > 0 {
            self.flush_and_analyze(&patient).await?;
        }

        self.glove.disconnect();
        tracing::info!("监测运行时已关闭");

        Ok(())
    }

    /// 录制窗口落盘并执行一次风险分析
    async fn flush_and_analyze(&mut self, patient: &Patient) -> Result<()> {
        let readings = self.glove.take_recording();
        let count = readings.len();

        self.measurements
            .record_batch(&self.ctx, &patient.id, readings)
            .await?;
        tracing::info!("已保存 {} 条测量: patient={}", count, patient.id);

        let result = self.analysis.run_analysis(&self.ctx, &patient.id).await?;
        tracing::info!(
            "诊断: {} (risk={} confidence={:.2})",
            result.diagnosis,
            result.risk,
            result.confidence
        );

        Ok(())
    }

    /// 等待 TERM 信号
    async fn wait_for_term_signal() {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            if let Ok(mut term) = signal(SignalKind::terminate()) {
                term.recv().await;
            }
        }

        #[cfg(not(unix))]
        {
            // Windows 不支持 SIGTERM，使用 Ctrl+C 替代
            let _ = tokio::signal::ctrl_c().await;
        }
    }

    /// 列出当前医生的全部患者
    pub async fn list_patients(&self) -> Result<Vec<Patient>> {
        Ok(self.patients.list(&self.ctx).await?)
    }

    /// 患者详情：档案、测量数量、历史分析
    pub async fn patient_info(
        &self,
        patient_id: &str,
    ) -> Result<(Patient, usize, Vec<AnalysisResult>)> {
        let patient = self.patients.get(&self.ctx, patient_id).await?;
        let measurement_count = self
            .measurements
            .list(&self.ctx, patient_id)
            .await?
            .len();
        let analyses = self.analysis.list(&self.ctx, patient_id).await?;

        Ok((patient, measurement_count, analyses))
    }

    /// 获取存储引用
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// 获取当前请求上下文
    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }
}
