//! # CNC Panel Core Library
//!
//! Serial link between the control panel and the motor controller board.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Single-byte motion command encoding
//! - Non-blocking drain of the controller's status stream
//! - Decoding of cycle ticks and position reports
//! - Link configuration and a simulated controller for demo mode
//!
//! ## Example
//!
//! ```rust,ignore
//! use cncpanel_core::prelude::*;
//!
//! let config = LinkConfig::load("link.json")?;
//! let mut link = ControllerLink::open(&config);
//! link.initialize();
//!
//! let mut readout = PanelReadout::new();
//! loop {
//!     readout.apply(&link.poll_and_decode());
//!     // draw readout.cycles / readout.position
//! }
//! ```

pub mod config;
pub mod demo;
pub mod panel;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, LinkConfig, RampSettings};
    pub use crate::demo::DemoController;
    pub use crate::panel::PanelReadout;
    pub use crate::protocol::{
        decode, ControllerLink, DecodedEvent, MotionCommand, PortHandle, ProtocolError,
        RampDirection, RawFrame,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
