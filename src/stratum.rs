use super::*;

// Import snafu for derive macro
use snafu::Snafu;
// Import context selectors for use in submodules
use error::{InvalidValueSnafu, ParseSnafu};

mod authorize;
mod client;
mod configure;
mod difficulty;
mod error;
mod event;
mod extranonce;
mod job_id;
mod merkle;
mod message;
mod nbits;
mod nonce;
mod notify;
mod ntime;
mod prevhash;
mod set_difficulty;
mod si;
mod submit;
mod subscribe;
mod suggest_difficulty;
mod version;

pub use {
    authorize::Authorize,
    client::{Client, ClientConfig},
    configure::Configure,
    difficulty::Difficulty,
    error::{InternalError, JsonRpcError, StratumError},
    event::{Event, EventReceiver},
    extranonce::Extranonce,
    job_id::JobId,
    merkle::{MerkleNode, merkle_branches, merkle_root},
    message::{Id, Message},
    nbits::Nbits,
    nonce::Nonce,
    notify::Notify,
    ntime::Ntime,
    prevhash::PrevHash,
    set_difficulty::SetDifficulty,
    submit::Submit,
    subscribe::{Subscribe, SubscribeResult},
    suggest_difficulty::SuggestDifficulty,
    version::Version,
};
