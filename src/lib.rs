//! Claude Code usage monitor - billing window tracking core

pub mod usage;
