//! Shared test utilities for algoviz
//!
//! - Trace and workspace fixtures
//! - In-process fake tracer/chat backend
