//! Gemini Key Pool CLI Tool
//!
//! 命令行工具，用于查看密钥池、试抽密钥、批量验证密钥有效性

mod commands;

use clap::{Parser, Subcommand};

use gemini_key_pool::model::config::Config;

#[derive(Parser)]
#[command(name = "key-pool-cli")]
#[command(version, about = "Gemini 密钥池命令行工具", long_about = None)]
struct Cli {
    /// 配置文件路径（环境变量会覆盖文件中的同名配置）
    #[arg(short, long, global = true, default_value = Config::default_config_path())]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出所有密钥（脱敏）和端点
    Keys,

    /// 按轮换顺序抽取密钥
    Draw {
        /// 抽取次数
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// 验证所有密钥的有效性
    Validate {
        /// 并发数（默认使用配置中的 validationConcurrency）
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Keys => commands::keys::list(&cli.config).await,
        Commands::Draw { count } => commands::keys::draw(&cli.config, count).await,
        Commands::Validate { concurrency } => {
            commands::validate::run(&cli.config, concurrency).await
        }
    };

    if let Err(e) = result {
        eprintln!("错误: {}", e);
        std::process::exit(1);
    }
}
