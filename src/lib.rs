//! Purpose: Library crate shared by the `navigate` resolver and the `nav-eval` wrapper.
//! Exports: `core` (database, query resolution, errors), `wrapper`, `shell`, `logging`.
//! Role: Keeps resolver semantics and wrapper semantics testable without a shell.
//! Invariants: Nothing here writes to stdout; binaries own all terminal output.
pub mod core;
pub mod logging;
pub mod shell;
pub mod wrapper;
