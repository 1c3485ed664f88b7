mod api;
mod blockchain;
mod config;

use std::io;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{error, info};

use api::AppState;
use blockchain::{Blockchain, DEMO_PAYLOADS, LogProgress};
use config::Config;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env().map_err(|e| {
        error!("bad configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    println!("⛓️ A simple proof-of-work ledger.\n");
    info!(
        "digest modulus={}, target modulus={}, search offset={}",
        config.params.digest_modulus(),
        config.params.target_modulus(),
        config.params.search_offset()
    );

    let blockchain = build_chain(&config).map_err(|e| {
        error!("could not build the startup chain: {}", e);
        io::Error::other(e)
    })?;
    if !blockchain.is_empty() {
        println!("\n{}", blockchain.report());
        info!(
            "startup chain: {} blocks, links valid={}",
            blockchain.len(),
            blockchain.is_valid()
        );
    }

    let (host, port) = (config.host.clone(), config.port);
    println!("⛓️ Starting ledger API at http://{host}:{port}");

    let state = web::Data::new(AppState::new(
        blockchain,
        config.limits,
        config.mining_timeout,
    ));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

/// Startup chain: optional genesis, then the demo payloads mined in order.
fn build_chain(config: &Config) -> Result<Blockchain, blockchain::ChainError> {
    let mut bc = if config.genesis {
        Blockchain::with_genesis(
            config.params,
            &config.limits,
            &mut LogProgress { block_id: 0 },
        )?
    } else {
        Blockchain::new(config.params)
    };

    if config.seed_demo {
        for payload in DEMO_PAYLOADS {
            println!("mining blk: {}", bc.next_id());
            let mut progress = LogProgress {
                block_id: bc.next_id(),
            };
            bc.mine_block(payload, &config.limits, &mut progress)?;
        }
    }
    Ok(bc)
}
