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

//! HTTP front end for the reverse tail reader.
//!
//! Thin plumbing by design: query validation, path resolution under a fixed
//! base directory, and a streaming `text/plain` response wired to
//! `revtail_rs::LineStream`. All algorithmic weight lives in `revtail-rs`.

pub mod config;
pub mod validate;
pub mod web;

pub use config::{load_serve_config, MergeOpts, ServeConfig};
pub use web::{router, AppState};
