// Copyright 2026 Revtail Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use revtail_serve::{load_serve_config, router, AppState, MergeOpts, ServeConfig};

#[derive(Parser)]
struct Opts {
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Directory log files are served from (env: REVTAIL_BASE_DIR)
    #[arg(long)]
    base_dir: Option<std::path::PathBuf>,
    /// Address to listen on (env: REVTAIL_HOST)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (env: REVTAIL_PORT)
    #[arg(long)]
    port: Option<u16>,
    /// Backward read block size in bytes
    #[arg(long)]
    block_size: Option<usize>,
    /// Unterminated-line buffer ceiling in bytes
    #[arg(long)]
    leftover_ceiling: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing using the RUST_LOG env var when present, default to `info`
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper_util=warn,hyper=warn,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();

    let cfg = load_serve_config(
        ServeConfig::default(),
        MergeOpts {
            config_path: opts.config,
            cli_base_dir: opts.base_dir,
            cli_host: opts.host,
            cli_port: opts.port,
            cli_block_size: opts.block_size,
            cli_leftover_ceiling: opts.leftover_ceiling,
        },
    )?;

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    tracing::info!(
        base_dir = %cfg.base_dir.display(),
        "starting tail server on {}",
        addr
    );

    let app = router(AppState { cfg: Arc::new(cfg) });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
