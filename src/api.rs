use {
    super::*,
    axum::extract::{Json, Path, State},
    http_server::error::{OptionExt, ServerResult},
};

pub(crate) mod pool;
pub(crate) mod proxy;
