#![deny(missing_docs)]
//! svcaudit server executable.
//!
//! Hosts HTTP endpoints for structure inspection, architecture analysis,
//! remediation planning and file-creation checks.

mod openapi;
mod routes;

#[cfg(not(test))]
use actix_cors::Cors;
#[cfg(not(test))]
use actix_web::{App, HttpServer, http::header, web};
#[cfg(not(test))]
use dotenvy::dotenv;

#[allow(unused_imports)]
use std::str::FromStr;

#[cfg(not(test))]
use std::path::PathBuf;
#[cfg(not(test))]
use svcaudit_core::watcher::{DEFAULT_POLL_INTERVAL, DEFAULT_RULES_FILE};
#[cfg(not(test))]
use svcaudit_core::{RulesWatcher, find_rules_file};

#[cfg(not(test))]
use crate::routes::{AppState, configure};

#[cfg(not(test))]
fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let base_path =
        PathBuf::from(std::env::var("SVCAUDIT_BASE_PATH").unwrap_or_else(|_| ".".to_string()));
    let template_path = std::env::var("SVCAUDIT_TEMPLATE").ok().map(PathBuf::from);
    let rules_name =
        std::env::var("SVCAUDIT_RULES_FILE").unwrap_or_else(|_| DEFAULT_RULES_FILE.to_string());
    let rules_path = find_rules_file(&base_path, &rules_name);

    let mut watcher = RulesWatcher::new(rules_path, DEFAULT_POLL_INTERVAL);
    watcher.start();
    let state = web::Data::new(AppState::new(base_path, template_path, watcher));

    let origins = std::env::var("SVCAUDIT_UI_ORIGINS")
        .unwrap_or_else(|_| "http://127.0.0.1:4200,http://localhost:4200".to_string());
    let allowed_origins: Vec<String> = origins
        .split(',')
        .map(|value| value.trim())
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect();

    let listen_addr = std::env::var("SVCAUDIT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let listen_port =
        u16::from_str(&std::env::var("SVCAUDIT_PORT").unwrap_or_else(|_| "8080".to_string()))
            .map_err(|err| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("SVCAUDIT_PORT must be a u16 number: {err}"),
                )
            })?;
    log::info!("listening on {listen_addr}:{listen_port}");

    actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            let mut cors = Cors::default()
                .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                .allowed_headers(vec![header::CONTENT_TYPE])
                .max_age(3600);
            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            App::new()
                .wrap(actix_web::middleware::Logger::default())
                .wrap(cors)
                .app_data(state.clone())
                .configure(configure)
        })
        .bind((listen_addr, listen_port))?
        .run()
        .await
    })
}

#[cfg(test)]
fn main() {}
