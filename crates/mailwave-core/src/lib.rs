//! Mailwave Core Library
//!
//! This crate provides shared types, errors, configuration and the
//! application URL policy for Mailwave.

pub mod config;
pub mod error;
pub mod types;
pub mod urls;

pub use config::{AccountConfig, ConfigStore, ScreenSharePickerMode, ShellConfig, UiConfig};
pub use error::{MailwaveError, MailwaveResult};
pub use types::{AccountId, Bounds, Size, SurfaceId, WindowId};
pub use urls::AppUrls;
