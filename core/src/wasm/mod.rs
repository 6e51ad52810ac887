//! Browser surface of the reconciliation core
//!
//! Only compiled with the `wasm` feature. Edits and outcomes cross into
//! JavaScript as JSON strings in the camelCase wire shape, so callers never
//! deal with Rust types directly.

mod bindings;
mod utils;

pub use bindings::{diff, merge_known_json, process, WasmDocumentSession};
pub use utils::init_panic_hook;
