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

//! Bounded-memory reverse line reading for large append-only log files.
//!
//! The crate walks a file backward in fixed-size blocks, reconstructs complete
//! lines across block boundaries and hands them out most-recent-first. Memory
//! use stays bounded no matter how large the file or how long a single line is:
//! a line that outgrows the configured ceiling is resolved by scanning for its
//! start and then streaming it forward chunk by chunk through an incremental
//! UTF-8 validator.
//!
//! ## Key invariants
//! - Output order is strictly reverse physical order; a substring filter only
//!   removes lines, it never reorders them.
//! - Block size affects how many reads happen, never the output bytes.
//! - Content is validated as strict UTF-8; any malformed sequence is a hard
//!   error, never a replacement character.
//! - The file handle is released on every exit path: completion, error, and
//!   consumer cancellation.
//!
//! ## Entry points
//! - [`FileSession`]: positioned reads plus a modification-time consistency
//!   check against the state captured at open.
//! - [`ReverseTailReader`] / [`TailOptions`]: the backward block reader,
//!   stepped externally via `next_chunk`.
//! - [`LineStream`]: adapts the reader to an async `Stream` of byte chunks
//!   with backpressure and cancellation on receiver drop.

pub mod encoding;
pub mod error;
pub mod reader;
pub mod scan;
pub mod session;
pub mod stream;

pub use encoding::Utf8Guard;
pub use error::TailError;
pub use reader::{ReverseTailReader, TailOptions};
pub use scan::OverlapScanner;
pub use session::FileSession;
pub use stream::LineStream;

/// Default backward read block size.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Default ceiling on the accumulated unterminated-line buffer before the
/// oversized-line resolution path kicks in.
pub const DEFAULT_LEFTOVER_CEILING: usize = 10 * 1024 * 1024;
