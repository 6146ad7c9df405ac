use super::*;

pub(crate) async fn spawn_generator(
    settings: Arc<Settings>,
    cancel_token: CancellationToken,
    tasks: &mut JoinSet<()>,
) -> Result<watch::Receiver<Arc<BlockTemplate>>> {
    let client = Arc::new(settings.bitcoin_rpc_client().await?);

    let mut zmq = Zmq::connect(settings.clone()).await?;

    let initial = fetch_block_template(&client, &settings).await?;

    let (sender, receiver) = watch::channel(Arc::new(initial));

    tasks.spawn(async move {
        let mut ticker = interval(settings.update_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    match fetch_block_template(&client, &settings).await {
                        Ok(template) => { sender.send_replace(Arc::new(template)); }
                        Err(err) => warn!("Failed to fetch block template: {err}"),
                    }
                }
                result = zmq.recv_blockhash() => {
                    match result {
                        Ok(hash) => {
                            info!("Observed new block {hash}, fetching updated template");
                            match fetch_block_template(&client, &settings).await {
                                Ok(template) => { sender.send_replace(Arc::new(template)); }
                                Err(err) => warn!("Failed to fetch block template after notification: {err}"),
                            }
                        }
                        Err(err) => warn!("ZMQ error, falling back to polling: {err}"),
                    }
                }
            }
        }

        info!("Shutting down generator");
    });

    Ok(receiver)
}

async fn fetch_block_template(client: &Client, settings: &Settings) -> Result<BlockTemplate> {
    info!("Fetching new block template");

    let mut rules = vec!["segwit"];
    if settings.chain().network() == Network::Signet {
        rules.push("signet");
    }

    let params = json!({
        "capabilities": ["coinbasetxn", "workid", "coinbase/append"],
        "rules": rules,
    });

    client
        .call::<BlockTemplate>("getblocktemplate", &[params])
        .await
        .context("getblocktemplate RPC call failed")
}
