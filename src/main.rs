use clap::{Arg, Command};
use log::LevelFilter;
use scamshield::api::{self, AppState};
use scamshield::config::AppConfig;
use scamshield::engine::AnalysisEngine;
use scamshield::rules::RuleSet;
use std::net::SocketAddr;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("scamshield")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rule-based scam message analysis engine and HTTP API")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("scamshield.yaml"),
        )
        .arg(
            Arg::new("rules")
                .long("rules")
                .value_name("FILE")
                .help("YAML rule table overriding the compiled-in defaults")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration and rule table validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("analyze")
                .long("analyze")
                .value_name("TEXT")
                .help("Analyze a single message and print the result as JSON")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("listen")
                .short('l')
                .long("listen")
                .value_name("ADDR")
                .help("Override the listen address from the configuration")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = match AppConfig::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if let Some(rules_path) = matches.get_one::<String>("rules") {
        config.rules_path = Some(rules_path.clone());
    }

    let rules = match load_rules(&config) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("Error loading rules: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("Configuration: {config_path}");
        println!("Rules: {} patterns compiled", rules.len());
        match AnalysisEngine::new(config.engine.clone(), rules) {
            Ok(_) => println!("Configuration is valid."),
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let engine = match AnalysisEngine::new(config.engine.clone(), rules) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error creating analysis engine: {e}");
            process::exit(1);
        }
    };

    if let Some(message) = matches.get_one::<String>("analyze") {
        analyze_one(&engine, message);
        return;
    }

    let listen = matches
        .get_one::<String>("listen")
        .unwrap_or(&config.server.listen);
    let addr: SocketAddr = match listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid listen address '{listen}': {e}");
            process::exit(1);
        }
    };

    log::info!("starting scamshield v{}", env!("CARGO_PKG_VERSION"));
    let state = AppState::new(engine, config.server.analytics_capacity);
    if let Err(e) = api::serve(addr, state).await {
        log::error!("server error: {e}");
        process::exit(1);
    }
}

fn load_rules(config: &AppConfig) -> anyhow::Result<RuleSet> {
    match config.rules_path.as_deref() {
        Some(path) => {
            let rules = RuleSet::load_from_file(path)?;
            log::info!("loaded {} rules from {path}", rules.len());
            Ok(rules)
        }
        None => Ok(RuleSet::with_defaults()),
    }
}

fn analyze_one(engine: &AnalysisEngine, message: &str) {
    match engine.analyze(message) {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing result: {e}");
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Analysis failed: {e}");
            process::exit(1);
        }
    }
}

fn generate_default_config(path: &str) {
    let config = AppConfig::default();
    match std::fs::write(path, config.to_yaml()) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}
