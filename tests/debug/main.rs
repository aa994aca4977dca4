//! Integration tests for Layer 1: Debug
//!
//! Tests for the event log cap, sanitizer bounds and termination, and the
//! hook tracer running against a live hook bus.

mod event_log;
mod sanitizer;
mod tracer;
