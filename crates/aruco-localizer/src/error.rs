use aruco_localizer_map::{MapIoError, MarkerMapError};

use crate::config::ConfigError;
use crate::replay::SessionError;

/// Fatal setup errors. Per-frame problems never surface here.
#[derive(thiserror::Error, Debug)]
pub enum LocalizerError {
    #[error("marker map: {0}")]
    Map(#[from] MarkerMapError),
    #[error("marker map file: {0}")]
    MapIo(#[from] MapIoError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("session: {0}")]
    Session(#[from] SessionError),
    #[error("output: {0}")]
    Output(#[from] std::io::Error),
}
