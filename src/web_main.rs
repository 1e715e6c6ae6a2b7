//! Web server entry point

#[cfg(feature = "web")]
use siteproxy::config::ProxyConfig;
#[cfg(feature = "web")]
use siteproxy::core::ProxyManager;
#[cfg(feature = "web")]
use siteproxy::web::{WebConfig, WebServer};

#[cfg(feature = "web")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use siteproxy::env::{core::LogLevel, EnvVar};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    if std::env::args().skip(1).any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    let level = LogLevel::get().unwrap_or_else(|e| {
        eprintln!("Warning: {}", e);
        "info".to_string()
    });
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("siteproxy={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let proxy_config = ProxyConfig::load(None)?;
    let manager = ProxyManager::new(proxy_config)?;
    let web_config = WebConfig::from_env()?;

    let server = WebServer::new(web_config, manager)?;
    server.start().await?;

    Ok(())
}

#[cfg(feature = "web")]
fn print_help() {
    println!("siteproxy web server");
    println!();
    println!("USAGE:");
    println!("    siteproxy-web");
    println!();
    println!("ENVIRONMENT:");
    for (name, description) in siteproxy::env::describe() {
        println!("    {:<32} {}", name, description);
    }
}

#[cfg(not(feature = "web"))]
fn main() {
    eprintln!("Error: Web feature not enabled. Please compile with --features web");
    std::process::exit(1);
}
