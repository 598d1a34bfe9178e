//! Integration tests against a real relay on loopback.

mod helpers;

mod end_to_end;
mod signaling;
