#![allow(clippy::too_many_arguments)]
use {
    anyhow::{Context, Error, anyhow, bail, ensure},
    arguments::Arguments,
    axum::{
        Extension, Router,
        extract::{DefaultBodyLimit, Json},
        http::{
            self, HeaderValue, StatusCode,
            header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        },
        response::{IntoResponse, Response},
        routing::{MethodRouter, get, post},
    },
    axum_server::Handle,
    bitcoin::{
        Address, Amount, Block, BlockHash, CompactTarget, Network, OutPoint, ScriptBuf, Sequence,
        Target, Transaction, TxIn, TxMerkleNode, TxOut, Txid, VarInt, Witness,
        address::NetworkUnchecked,
        block::{self, Header},
        consensus::{self, Decodable, Encodable},
        hashes::{Hash, sha256d},
        locktime::absolute::LockTime,
        script::write_scriptint,
    },
    bitcoind_async_client::{Auth, Client},
    boilerplate::Boilerplate,
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    chain::Chain,
    clap::{Args, Parser},
    coinbase_builder::CoinbaseBuilder,
    dashmap::DashMap,
    derive_more::Display,
    futures::stream::StreamExt,
    hash_rate::HashRate,
    hex::FromHex,
    lazy_static::lazy_static,
    lru::LruCache,
    rand::RngCore,
    reqwest::Url,
    rust_embed::RustEmbed,
    rustls_acme::{
        AcmeConfig,
        acme::{LETS_ENCRYPT_PRODUCTION_DIRECTORY, LETS_ENCRYPT_STAGING_DIRECTORY},
        axum::AxumAcceptor,
        caches::DirCache,
    },
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::{Value, json},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    sqlx::{Pool, Postgres, postgres::PgPoolOptions},
    std::{
        collections::{BTreeMap, HashMap},
        env,
        fmt::{self, Display, Formatter},
        fs,
        io::{self, Write},
        net::{SocketAddr, ToSocketAddrs},
        num::NonZeroUsize,
        ops::{Add, AddAssign, BitAnd, BitOr, BitXor, Div, Mul, Not, Sub, SubAssign},
        path::{Path, PathBuf},
        process,
        str::FromStr,
        sync::{
            Arc, LazyLock,
            atomic::{AtomicBool, AtomicU64, Ordering},
        },
        thread,
        time::{Duration, Instant, SystemTime, UNIX_EPOCH},
    },
    stratum::{
        Authorize, Configure, Difficulty, Extranonce, Id, JobId, Message, MerkleNode, Nbits,
        Notify, Ntime, PrevHash, SetDifficulty, StratumError, Submit, Subscribe, SubscribeResult,
        Version,
    },
    sysinfo::{Disks, System},
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter},
        net::{TcpListener, TcpStream, tcp::{OwnedReadHalf, OwnedWriteHalf}},
        runtime::Runtime,
        signal::ctrl_c,
        sync::{Mutex, mpsc, oneshot, watch},
        task::{self, JoinHandle, JoinSet},
        time::{MissedTickBehavior, interval, sleep, timeout},
    },
    tokio_util::{
        codec::{FramedRead, FramedWrite, LinesCodec},
        sync::CancellationToken,
    },
    tower_http::{
        services::ServeDir, set_header::SetResponseHeaderLayer,
        validate_request::ValidateRequestHeaderLayer,
    },
    tracing::{debug, error, info, warn},
    tracing_subscriber::EnvFilter,
    zeromq::{Socket, SocketRecv, SubSocket},
};

mod api;
mod arguments;
mod block_template;
mod chain;
pub mod coinbase_builder;
mod decay;
mod extranonces;
mod generator;
pub mod hash_rate;
mod http_server;
mod job;
mod jobs;
mod metatron;
mod metrics;
mod record_sink;
mod settings;
mod signal;
mod stats;
pub mod stratifier;
pub mod stratum;
pub mod subcommand;
mod throbber;
mod upstream;
mod username;
mod vardiff;
mod workbase;
mod zmq;

pub(crate) use {
    block_template::{BlockTemplate, TemplateTransaction},
    extranonces::{Extranonces, PoolExtranonces, ProxyExtranonces},
    generator::spawn_generator,
    http_server::HttpConfig,
    job::Job,
    jobs::Jobs,
    metatron::Metatron,
    metrics::Metrics,
    record_sink::build_record_sink,
    settings::{PoolOptions, ProxyOptions, Settings},
    stats::{UserStats, WorkerStats},
    stratifier::Stratifier,
    throbber::{StatusLine, spawn_throbber},
    upstream::Upstream,
    username::{AddressError, ParsedUsername, Username},
    vardiff::{Vardiff, VardiffConfig},
    workbase::Workbase,
    zmq::{Endpoint, Zmq},
};

pub const COIN_VALUE: u64 = 100_000_000;
pub const USER_AGENT: &str = "paraminer/0.0.1";
pub const ENONCE1_SIZE: usize = 4;
pub const ENONCE1_EXTENSION_SIZE: usize = 2;
pub const MIN_ENONCE_SIZE: usize = 2;
pub const MAX_ENONCE_SIZE: usize = 8;
pub(crate) const LRU_CACHE_SIZE: usize = 1024;
pub(crate) const MAX_MESSAGE_SIZE: usize = 8192;
pub(crate) const SUBSCRIPTION_ID: &str = "ae6812eb4cd7735a302a8a9dd95cf71f";
pub(crate) const MAX_NTIME_OFFSET: u32 = 7200;

type Result<T = (), E = Error> = std::result::Result<T, E>;

fn target_as_block_hash(target: bitcoin::Target) -> BlockHash {
    BlockHash::from_raw_hash(Hash::from_byte_array(target.to_le_bytes()))
}

pub(crate) fn integration_test() -> bool {
    env::var_os("PARA_INTEGRATION_TEST").is_some()
}

pub(crate) fn logs_enabled() -> bool {
    env::var_os("RUST_LOG").is_some()
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Arguments::parse();

    let cancel_token = signal::setup_signal_handler();

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to start tokio runtime: {err}");
            process::exit(1);
        }
    };

    match runtime.block_on(args.run(cancel_token)) {
        Err(err) => {
            error!("error: {err}");

            if env::var_os("RUST_BACKTRACE")
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
