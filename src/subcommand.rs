use super::*;

pub(crate) mod pool;
pub(crate) mod proxy;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Run a solo pool, generating work from a Bitcoin Core node")]
    Pool(pool::Pool),
    #[command(about = "Run a Stratum proxy in front of an upstream pool")]
    Proxy(proxy::Proxy),
}

impl Subcommand {
    pub(crate) async fn run(self, cancel_token: CancellationToken) -> Result {
        match self {
            Self::Pool(pool) => pool.run(cancel_token).await,
            Self::Proxy(proxy) => proxy.run(cancel_token).await,
        }
    }
}
