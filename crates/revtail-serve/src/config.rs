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

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use revtail_rs::{DEFAULT_BLOCK_SIZE, DEFAULT_LEFTOVER_CEILING};

/// Service configuration after the merge chain has run.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    /// Directory all `filepath` query values are resolved under. Canonicalized
    /// by `load_serve_config` so the escape check is a plain prefix test.
    pub base_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Backward read block size handed to the reader.
    pub block_size: usize,
    /// Unterminated-line buffer ceiling handed to the reader.
    pub leftover_ceiling: usize,
    /// Permissive CORS when true; GET-only otherwise.
    pub cors_all: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            host: "127.0.0.1".to_string(),
            port: 8080,
            block_size: DEFAULT_BLOCK_SIZE,
            leftover_ceiling: DEFAULT_LEFTOVER_CEILING,
            cors_all: true,
        }
    }
}

/// CLI-level options that binaries pass to `load_serve_config`.
/// Keep this small and explicit; binaries can expand for extra fields.
#[derive(Clone, Debug, Default)]
pub struct MergeOpts {
    pub config_path: Option<PathBuf>,
    pub cli_base_dir: Option<PathBuf>,
    pub cli_host: Option<String>,
    pub cli_port: Option<u16>,
    pub cli_block_size: Option<usize>,
    pub cli_leftover_ceiling: Option<usize>,
}

/// Load and merge ServeConfig from: defaults <- config file <- env vars <- CLI.
pub fn load_serve_config(mut base: ServeConfig, opts: MergeOpts) -> Result<ServeConfig> {
    if let Some(path) = opts.config_path.as_ref() {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let v: toml::Value = toml::from_str(&s)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            if let Some(d) = v.get("base_dir").and_then(|x| x.as_str()) {
                base.base_dir = PathBuf::from(d);
            }
            if let Some(h) = v.get("host").and_then(|x| x.as_str()) {
                base.host = h.to_string();
            }
            if let Some(p) = v.get("port").and_then(|x| x.as_integer()) {
                base.port = p as u16;
            }
            if let Some(b) = v.get("block_size").and_then(|x| x.as_integer()) {
                base.block_size = b as usize;
            }
            if let Some(c) = v.get("leftover_ceiling").and_then(|x| x.as_integer()) {
                base.leftover_ceiling = c as usize;
            }
            if let Some(c) = v.get("cors_all").and_then(|x| x.as_bool()) {
                base.cors_all = c;
            }
        }
    }

    // env vars override file
    if let Ok(d) = std::env::var("REVTAIL_BASE_DIR") {
        base.base_dir = PathBuf::from(d);
    }
    if let Ok(h) = std::env::var("REVTAIL_HOST") {
        base.host = h;
    }
    if let Ok(p) = std::env::var("REVTAIL_PORT") {
        if let Ok(v) = p.parse::<u16>() {
            base.port = v;
        }
    }
    if let Ok(b) = std::env::var("REVTAIL_BLOCK_SIZE") {
        if let Ok(v) = b.parse::<usize>() {
            base.block_size = v;
        }
    }
    if let Ok(c) = std::env::var("REVTAIL_LEFTOVER_CEILING") {
        if let Ok(v) = c.parse::<usize>() {
            base.leftover_ceiling = v;
        }
    }

    // CLI overrides everything
    if let Some(d) = opts.cli_base_dir {
        base.base_dir = d;
    }
    if let Some(h) = opts.cli_host {
        base.host = h;
    }
    if let Some(p) = opts.cli_port {
        base.port = p;
    }
    if let Some(b) = opts.cli_block_size {
        base.block_size = b;
    }
    if let Some(c) = opts.cli_leftover_ceiling {
        base.leftover_ceiling = c;
    }

    base.base_dir = base
        .base_dir
        .canonicalize()
        .with_context(|| format!("base directory {} does not exist", base.base_dir.display()))?;

    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn merge_file_env_cli_precedence() {
        std::env::remove_var("REVTAIL_BASE_DIR");
        std::env::remove_var("REVTAIL_HOST");
        std::env::remove_var("REVTAIL_PORT");
        std::env::remove_var("REVTAIL_BLOCK_SIZE");
        std::env::remove_var("REVTAIL_LEFTOVER_CEILING");

        let dir = tempfile::tempdir().unwrap();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        let toml = r#"
host = "from-file"
port = 1111
block_size = 1024
"#;
        fs::write(tmp.path(), toml).unwrap();

        std::env::set_var("REVTAIL_HOST", "from-env");
        std::env::set_var("REVTAIL_PORT", "2222");

        let opts = MergeOpts {
            config_path: Some(tmp.path().to_path_buf()),
            cli_base_dir: Some(dir.path().to_path_buf()),
            cli_host: Some("from-cli".into()),
            cli_port: Some(3333),
            cli_block_size: None,
            cli_leftover_ceiling: None,
        };

        let got = load_serve_config(ServeConfig::default(), opts).expect("load");
        assert_eq!(got.host, "from-cli");
        assert_eq!(got.port, 3333);
        // Untouched by env/CLI, so the file value wins.
        assert_eq!(got.block_size, 1024);
        assert_eq!(got.base_dir, dir.path().canonicalize().unwrap());

        std::env::remove_var("REVTAIL_HOST");
        std::env::remove_var("REVTAIL_PORT");
    }

    #[test]
    #[serial_test::serial]
    fn missing_base_dir_is_an_error() {
        std::env::remove_var("REVTAIL_BASE_DIR");
        let opts = MergeOpts {
            cli_base_dir: Some(PathBuf::from("/definitely/not/here")),
            ..Default::default()
        };
        assert!(load_serve_config(ServeConfig::default(), opts).is_err());
    }
}
