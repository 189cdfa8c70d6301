#![allow(clippy::too_many_arguments)]
use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    aux_merkle::AuxMerkleTree,
    auxpow::AuxPow,
    bitcoin::{
        CompactTarget,
        consensus::encode::VarInt,
        hashes::{Hash, sha256d},
        script::write_scriptint,
    },
    block_template::{AuxBlock, BlockTemplate, TemplateTransaction},
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    chain::Chain,
    clap::Parser,
    coinbase::CoinbaseBuilder,
    derive_more::Display,
    futures::{SinkExt, stream::StreamExt},
    hash256::{Hash256, double_sha256, scrypt_digest},
    lru::LruCache,
    options::Options,
    primitive_types::{U256, U512},
    rand::RngCore,
    record_sink::RecordSink,
    rpc::{RpcManager, SubmitOutcome},
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::{Value, json},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    server::PoolServer,
    settings::Settings,
    share::{BlockKind, FoundBlock, Share},
    stats::Stats,
    std::{
        collections::{BTreeMap, VecDeque},
        fmt::{self, Display, Formatter},
        fs,
        net::SocketAddr,
        num::NonZeroUsize,
        path::PathBuf,
        process,
        str::FromStr,
        sync::{
            Arc, LazyLock,
            atomic::{AtomicU64, AtomicUsize, Ordering},
        },
        time::{Duration, Instant, SystemTime, UNIX_EPOCH},
    },
    stratum::{
        Authorize, Extranonce, Id, JobId, JsonRpcError, Message, Nbits, Nonce, Notify, Ntime,
        PrevHash, SetDifficulty, StratumError, Submit, Subscribe, SubscribeResult, Username,
        Version,
    },
    subcommand::Subcommand,
    target::Target,
    tokio::{
        net::TcpListener,
        runtime::Runtime,
        sync::{mpsc, watch},
        task::JoinSet,
        time::timeout,
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec},
        sync::CancellationToken,
    },
    tracing::{debug, error, info, warn},
    tracing_subscriber::EnvFilter,
    validator::Evaluation,
    work_cache::WorkCache,
    workbase::Workbase,
};

mod arguments;
pub mod aux_merkle;
pub mod auxpow;
pub mod block_template;
pub mod chain;
pub mod coinbase;
mod config;
mod generator;
pub mod hash256;
mod options;
pub mod record_sink;
pub mod rpc;
pub mod server;
mod session;
pub mod settings;
pub mod share;
mod signal;
mod stats;
pub mod stratum;
mod subcommand;
pub mod target;
pub mod validator;
pub mod work_cache;
pub mod workbase;
mod zmq;

pub const COIN_VALUE: u64 = 100_000_000;

/// Four random bytes assigned per session, four rolled by the miner.
pub const ENONCE1_SIZE: usize = 4;
pub const ENONCE2_SIZE: usize = 4;
pub const EXTRANONCE_RESERVATION: usize = ENONCE1_SIZE + ENONCE2_SIZE;

pub const MAX_MESSAGE_SIZE: usize = 8 * 1024;
pub const SUBSCRIPTION_ID: &str = "72656d6f7261";

/// Submitted ntime may run ahead of the wall clock by twice this.
pub const MEDIAN_TIME_DRIFT: u64 = 3600;

pub const RPC_DEADLINE: Duration = Duration::from_secs(10);

type Result<T = (), E = Error> = std::result::Result<T, E>;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Arguments::parse();

    match args.run() {
        Err(err) => {
            error!("error: {err}");

            if std::env::var_os("RUST_BACKTRACE")
                .map(|val| val == "1")
                .unwrap_or_default()
            {
                error!("{}", err.backtrace());
            }
            process::exit(1);
        }
        Ok(_) => {
            process::exit(0);
        }
    }
}
