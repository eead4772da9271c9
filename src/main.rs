use clap::Parser;
use mock_json_api::config::cli::{CheckArgs, Command, ServeArgs};
use mock_json_api::utils::error::ErrorSeverity;
use mock_json_api::utils::{logger, validation::Validate};
use mock_json_api::{CliConfig, ContractSuite, MockError, MockServer};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    match &config.command {
        Command::Serve(args) if args.log_json => logger::init_json_logger(config.verbose),
        _ => logger::init_cli_logger(config.verbose),
    }

    tracing::info!("Starting mock-json-api CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let result = match config.command {
        Command::Serve(args) => serve(args).await,
        Command::Check(args) => check(args).await,
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn serve(args: ServeArgs) -> Result<(), MockError> {
    let config = args.load_config()?;
    let addr = config.bind_addr()?;
    let server = MockServer::new(&config)?;

    if let Some(seed) = config.seed() {
        tracing::info!("🎲 Failure branches seeded with {}", seed);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    server
        .run_until(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for ctrl-c: {}", e);
            }
        })
        .await
}

async fn check(args: CheckArgs) -> Result<(), MockError> {
    if let Err(e) = args.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }

    let mut suite = ContractSuite::new(&args)?;
    suite.retain_cases(&args.cases)?;

    let report = suite.run().await;
    for outcome in &report.outcomes {
        let mark = if outcome.passed { "✅" } else { "❌" };
        println!("{} {:<14} {:>10.1?}  {}", mark, outcome.name, outcome.elapsed, outcome.detail);
    }
    println!(
        "📈 {}/{} cases passed in {:?}",
        report.passed_count(),
        report.outcomes.len(),
        report.duration
    );

    report.into_result()
}
