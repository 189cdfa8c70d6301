use super::*;

mod authorize;
mod error;
mod extranonce;
mod job_id;
mod message;
mod nbits;
mod nonce;
mod notify;
mod ntime;
mod prevhash;
mod set_difficulty;
mod submit;
mod subscribe;
mod username;
mod version;

pub use {
    authorize::Authorize,
    error::{JsonRpcError, StratumError},
    extranonce::Extranonce,
    job_id::JobId,
    message::{Id, Message},
    nbits::Nbits,
    nonce::Nonce,
    notify::Notify,
    ntime::Ntime,
    prevhash::PrevHash,
    set_difficulty::SetDifficulty,
    submit::Submit,
    subscribe::{Subscribe, SubscribeResult},
    username::{Username, Worker},
    version::Version,
};
