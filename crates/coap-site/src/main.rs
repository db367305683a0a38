// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CoAP demonstration site CLI
//!
//! Drives the site in-process, without a network transport.
//!
//! # Usage
//!
//! ```bash
//! # Single request
//! coap-site request GET /whoami
//!
//! # Store a sensor record given as hex
//! coap-site request POST /sensor/data --hex 01ff
//!
//! # Block-wise download, 64-byte windows
//! coap-site request GET /other/block --block-size 64
//!
//! # Watch notifications
//! coap-site observe /time --count 2
//!
//! # Discovery listing
//! coap-site links --json
//! ```

use clap::{Parser, Subcommand};
use coap_site::chunked::split_blocks;
use coap_site::{
    BlockOption, ChannelSink, ContentFormat, LinkEntry, Method, NullSink, Request, Response,
    ResponseCode, Site, SiteConfig, SubscriberId, TokioScheduler,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// CoAP demonstration site
#[derive(Parser, Debug)]
#[command(name = "coap-site")]
#[command(about = "CoAP demonstration resources with periodic observation")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one request and print the response
    Request {
        /// GET, PUT or POST
        method: String,

        /// Resource path, e.g. /other/block
        path: String,

        /// Text payload
        #[arg(short, long, conflicts_with = "hex")]
        payload: Option<String>,

        /// Payload as hex bytes
        #[arg(long)]
        hex: Option<String>,

        /// Accepted content format (numeric id)
        #[arg(short, long)]
        accept: Option<u16>,

        /// Transfer block-wise with this block size (16..1024)
        #[arg(short, long)]
        block_size: Option<usize>,
    },

    /// Register as observer and print notifications
    Observe {
        /// Resource path
        path: String,

        /// Stop after this many notifications (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,
    },

    /// List registered resources
    Links {
        /// Print JSON instead of link-format
        #[arg(long)]
        json: bool,
    },

    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "site.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SiteConfig::from_file(path)?,
        None => SiteConfig::default(),
    };

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::Request {
            method,
            path,
            payload,
            hex,
            accept,
            block_size,
        } => {
            let payload = match (payload, hex) {
                (Some(text), _) => text.into_bytes(),
                (None, Some(hex)) => hex::decode(hex.trim())?,
                (None, None) => Vec::new(),
            };
            cmd_request(&config, &method, &path, payload, accept, block_size).await
        }
        Commands::Observe { path, count } => cmd_observe(&config, &path, count).await,
        Commands::Links { json } => cmd_links(&config, json),
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { file } => cmd_validate(file),
    }
}

fn build_site(config: &SiteConfig) -> Result<Site, Box<dyn std::error::Error>> {
    let scheduler = TokioScheduler::current()?;
    Ok(Site::demo(config, Arc::new(scheduler), Arc::new(NullSink))?)
}

async fn cmd_request(
    config: &SiteConfig,
    method: &str,
    path: &str,
    payload: Vec<u8>,
    accept: Option<u16>,
    block_size: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = Method::parse(method).ok_or_else(|| format!("Unknown method: {}", method))?;
    let site = build_site(config)?;

    let mut request = Request::new(method, path).with_payload(payload);
    if let Some(accept) = accept {
        request = request.with_accept(ContentFormat(accept));
    }

    let response = match block_size {
        Some(size) => {
            let szx = BlockOption::exponent_for(size);
            if method == Method::Get {
                fetch_blockwise(&site, request, szx).await?
            } else {
                upload_blockwise(&site, request, szx).await?
            }
        }
        None => site.handle(request).await,
    };

    print_response(&response);
    if !response.code.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Walk block2 windows until the server clears the more-flag.
async fn fetch_blockwise(
    site: &Site,
    request: Request,
    szx: u8,
) -> Result<Response, Box<dyn std::error::Error>> {
    let mut body = Vec::new();
    let mut num = 0;
    loop {
        let block = BlockOption::new(num, false, szx)?;
        let response = site.handle(request.clone().with_block2(block)).await;
        if !response.code.is_success() {
            return Ok(response);
        }
        body.extend_from_slice(&response.payload);
        let more = response.block2.is_some_and(|b| b.more);
        tracing::debug!(num, bytes = response.payload.len(), more, "Block received");
        if !more {
            return Ok(Response {
                payload: body,
                block2: None,
                ..response
            });
        }
        num += 1;
    }
}

async fn upload_blockwise(
    site: &Site,
    request: Request,
    szx: u8,
) -> Result<Response, Box<dyn std::error::Error>> {
    let blocks = split_blocks(&request.payload, szx)?;
    let mut last = None;
    for (block, data) in blocks {
        let response = site
            .handle(request.clone().with_payload(data).with_block1(block))
            .await;
        if response.code != ResponseCode::Continue && !response.code.is_success() {
            return Ok(response);
        }
        last = Some(response);
    }
    last.ok_or_else(|| "No blocks to send".into())
}

async fn cmd_observe(
    config: &SiteConfig,
    path: &str,
    count: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(ChannelSink::new());
    let site = Site::demo(config, Arc::new(TokioScheduler::current()?), sink.clone())?;
    let peer = SubscriberId::new("cli");
    let mut notifications = sink.connect(peer.clone(), 16);

    let response = site.handle(Request::get(path).observe(peer.clone())).await;
    print_response(&response);
    if response.observe.is_none() {
        eprintln!("{} is not observable", path);
        return Ok(());
    }
    println!();
    println!("Observing {} every {:?}, press Ctrl+C to stop...", path, config.observe.interval());

    let mut received = 0;
    loop {
        tokio::select! {
            next = notifications.recv() => match next {
                Some(notification) => {
                    println!();
                    println!("--- Notification (version {}) ---", notification.version);
                    print_response(&notification.response);
                    received += 1;
                    if count > 0 && received >= count {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                break;
            }
        }
    }

    site.handle(Request::get(path).deregister(peer)).await;
    let stats = site.stats();
    println!(
        "\n{} notifications delivered, {} failed",
        stats.notifications_delivered, stats.delivery_failures
    );
    Ok(())
}

fn cmd_links(config: &SiteConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let site = build_site(config)?;
    let links = site.links();
    if json {
        println!("{}", serde_json::to_string_pretty(&links)?);
    } else {
        println!("{}", link_format(&links));
    }
    Ok(())
}

/// RFC 6690 rendering of the discovery listing.
fn link_format(links: &[LinkEntry]) -> String {
    links
        .iter()
        .map(|link| {
            let mut entry = format!("<{}>", link.path);
            for format in &link.content_formats {
                entry.push_str(&format!(";ct={}", format.0));
            }
            if let Some(title) = &link.title {
                entry.push_str(&format!(";title=\"{}\"", title));
            }
            if link.observable {
                entry.push_str(";obs");
            }
            entry
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let toml_str = toml::to_string_pretty(&SiteConfig::default())?;

    let content = format!(
        r#"# CoAP Site Configuration
# Generated by coap-site gen-config

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match SiteConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Site: {}", config.name);
            println!("Observe interval: {:?}", config.observe.interval());
            println!(
                "Block padding: {} bytes threshold, {} byte filler",
                config.block.pad_threshold,
                config.block.filler.len()
            );
            println!("Separate delay: {:?}", config.separate.delay());
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_response(response: &Response) {
    println!("{}", response.code);
    if let Some(format) = response.content_format {
        println!("Content-Format: {}", format);
    }
    if let Some(observe) = response.observe {
        println!("Observe: {}", observe);
    }
    if let Some(etag) = response.etag {
        println!("ETag: {:016x}", etag);
    }
    if !response.payload.is_empty() {
        println!();
        println!("{}", response.payload_text());
    }
}
