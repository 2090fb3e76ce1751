use anyhow::Result;
use clap::Parser;
use neuro_glove::config::{Cli, Commands, Config};
use neuro_glove::monitor::Monitor;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load_with_cli(cli.clone())?;

    // 初始化日志系统
    config.init_logging()?;

    tracing::info!("Neuro Glove Starting...");

    // 处理命令行子命令
    if let Some(command) = cli.command {
        handle_command(command, &config).await?;
        return Ok(());
    }

    // 初始化监测运行时
    let monitor = Monitor::new(config).await?;

    tracing::info!("Neuro Glove Ready!");

    // 运行监测循环（包含优雅关闭）
    monitor.run().await?;

    Ok(())
}

async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run => {
            // 这是默认行为，直接运行监测循环
            let monitor = Monitor::new(config.clone()).await?;
            monitor.run().await?;
        }
        Commands::ListPatients => {
            // 列出当前医生的患者
            let monitor = Monitor::new(config.clone()).await?;
            let patients = monitor.list_patients().await?;

            println!("患者列表:");
            for patient in patients {
                println!(
                    "  {} - {} ({})",
                    patient.id,
                    patient.full_name(),
                    patient.date_of_birth
                );
            }
        }
        Commands::PatientInfo { id } => {
            // 显示患者详情与历史分析
            let monitor = Monitor::new(config.clone()).await?;

            match monitor.patient_info(&id).await {
                Ok((patient, measurement_count, analyses)) => {
                    println!("患者: {} ({})", patient.full_name(), patient.id);
                    println!("  出生日期: {}", patient.date_of_birth);
                    println!("  病史: {}", patient.medical_history);
                    println!("  测量数量: {measurement_count}");
                    println!("  历史分析:");
                    for analysis in analyses {
                        println!(
                            "    [{}] risk={} confidence={:.2} - {}",
                            analysis.created_at.format("%Y-%m-%d %H:%M:%S"),
                            analysis.risk,
                            analysis.confidence,
                            analysis.diagnosis
                        );
                    }
                }
                Err(e) => println!("无法获取患者 '{id}' 的信息: {e}"),
            }
        }
        Commands::ResetConfig => {
            // 重置配置
            let default_config = Config::default();
            if let Some(config_path) = Config::get_user_config_path() {
                default_config.save_to_file(&config_path)?;
                println!("配置已重置到: {}", config_path.display());
            } else {
                println!("无法确定配置文件路径");
            }
        }
    }

    Ok(())
}
