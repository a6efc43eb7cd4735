//! Dashboard Strategy Loader CLI
//!
//! Resolves module paths and checks built bundles against a recorded host
//! snapshot (`{"module_url": ..., "scripts": [...], "page_url": ...}`).

use dashboard_strategy_loader::{
    config, import::FsImporter, version, ManifestLoader, ModuleResolver, StaticHost,
    TaggedImporter,
};

use anyhow::{anyhow, Context, Result};
use std::env;
use std::io::Read;
use std::process;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

fn print_usage() {
    eprintln!(
        r#"strategy-loader {}

Usage:
  strategy-loader resolve <host.json|-> <path>...   Print resolved specifiers
  strategy-loader manifest <host.json|->            Print the resolved manifest
  strategy-loader tag <host.json|->                 Print the discovered tag
  strategy-loader check <host.json|-> <bundle-dir>  Load the manifest from disk
  strategy-loader version                           Print version
  strategy-loader help                              Show this message

Configuration is read from $STRATEGY_LOADER_CONFIG_DIR/config.* and
STRATEGY_LOADER_* environment variables."#,
        version::version_string()
    );
}

fn read_host(arg: &str) -> Result<StaticHost> {
    let json = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read host snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(arg).with_context(|| format!("Failed to read {}", arg))?
    };
    serde_json::from_str(&json).with_context(|| format!("Invalid host snapshot {}", arg))
}

/// URL path the bundle is served under: the loader module's directory
fn bundle_mount(host: &StaticHost, base_url: Option<&str>) -> String {
    base_url
        .map(str::to_string)
        .or_else(|| host.module_url.clone())
        .and_then(|u| Url::parse(&u).ok())
        .map(|u| {
            let path = u.path();
            match path.rfind('/') {
                Some(i) => path[..=i].to_string(),
                None => "/".to_string(),
            }
        })
        .unwrap_or_else(|| "/".to_string())
}

async fn run(args: &[String]) -> Result<()> {
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    if matches!(command, "help" | "--help" | "-h") {
        print_usage();
        return Ok(());
    }
    if matches!(command, "version" | "--version" | "-V") {
        println!("{}", version::version_string());
        return Ok(());
    }

    let host_arg = args
        .get(2)
        .ok_or_else(|| anyhow!("Missing host snapshot argument"))?;
    let host = read_host(host_arg)?;

    let config = config::load_config()?;
    tracing::debug!("Configuration loaded, tag key: {}", config.tag_key);

    let resolver = Arc::new(ModuleResolver::from_config(host.clone(), &config)?);

    match command {
        "resolve" => {
            let paths = &args[3..];
            if paths.is_empty() {
                return Err(anyhow!("Missing path argument"));
            }
            for path in paths {
                println!("{}", resolver.resolve(path, None));
            }
        }
        "manifest" => {
            for path in &config.manifest {
                println!("{}", resolver.resolve(path, None));
            }
        }
        "tag" => match resolver.tag() {
            Some(tag) => println!("{}={}", resolver.tag_key(), tag),
            None => println!("(none)"),
        },
        "check" => {
            let bundle_dir = args
                .get(3)
                .ok_or_else(|| anyhow!("Missing bundle directory argument"))?;
            let mount = bundle_mount(&host, config.base_url.as_deref());
            let importer = FsImporter::new(bundle_dir).with_mount(mount.clone());
            tracing::info!("Checking bundle {} mounted at {}", bundle_dir, mount);

            let loader = ManifestLoader::new(
                TaggedImporter::new(resolver, importer),
                config.manifest.clone(),
            );
            match loader.load_all().await {
                Ok(loaded) => {
                    for module in &loaded {
                        println!(
                            "ok  {}  {} bytes  {}",
                            module.path,
                            module.module.len(),
                            module.specifier
                        );
                    }
                }
                Err(dashboard_strategy_loader::LoadError::Import {
                    path,
                    specifier,
                    error,
                }) => {
                    println!("err {}  {}  {}", path, specifier, error);
                    return Err(anyhow!("Bundle check failed at {}", path));
                }
                Err(e) => return Err(e.into()),
            }
        }
        other => {
            print_usage();
            return Err(anyhow!("Unknown command: {}", other));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard_strategy_loader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
