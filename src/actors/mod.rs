//! Long-running background tasks
//!
//! Each actor runs as an independent tokio task and is controlled through a
//! handle that sends commands over an mpsc channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │   Hub (main)     │
//!                 └────────┬─────────┘
//!                          │ spawns
//!           ┌──────────────┴───────────────┐
//!           │                              │
//!  ┌────────▼─────────┐           ┌────────▼────────┐
//!  │ MonitorScheduler │           │  BalanceActor   │
//!  └────────┬─────────┘           └────────┬────────┘
//!           │ per exchange                 │ per wallet
//!  ┌────────▼─────────┐           ┌────────▼────────┐
//!  │ Composition +    │           │ BalanceMonitor  │
//!  │ Volume monitors  │           └────────┬────────┘
//!  └────────┬─────────┘                    │
//!           └──────────────┬───────────────┘
//!                  ┌───────▼───────┐
//!                  │   Notifier    │
//!                  └───────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: each actor has an mpsc command channel
//! 2. **Request/Response**: oneshot channels inside `RunNow` / `CheckNow`

pub mod balance;
pub mod messages;
pub mod scheduler;
