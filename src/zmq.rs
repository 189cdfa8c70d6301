use {super::*, zeromq::{Socket, SocketRecv, SubSocket}};

/// A `hashblock` subscription to one daemon's ZMQ publisher. New-block pushes
/// are the fast path for template refresh; the backstop ticker covers chains
/// without one.
pub struct Zmq {
    chain: String,
    socket: SubSocket,
}

impl Zmq {
    pub async fn connect(chain: &str, endpoint: &str) -> Result<Self> {
        info!("Subscribing to hashblock for {chain} on ZMQ endpoint {endpoint}");

        let socket = match timeout(Duration::from_secs(1), async {
            let mut socket = SubSocket::new();

            socket
                .connect(endpoint)
                .await
                .with_context(|| format!("failed to connect to ZMQ endpoint `{endpoint}`"))?;

            socket
                .subscribe("hashblock")
                .await
                .with_context(|| format!("failed to subscribe to hashblock on `{endpoint}`"))?;

            Ok::<_, Error>(socket)
        })
        .await
        {
            Ok(Ok(socket)) => socket,
            Ok(Err(err)) => return Err(err),
            Err(_) => bail!(
                "timed out connecting to ZMQ endpoint `{endpoint}` - ensure the {chain} daemon runs with `-zmqpubhashblock={endpoint}`"
            ),
        };

        Ok(Self {
            chain: chain.into(),
            socket,
        })
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub async fn recv_blockhash(&mut self) -> Result<Hash256> {
        let message = self.socket.recv().await?;

        ensure!(
            message.len() == 3,
            "hashblock: expected 3 frames, got {}",
            message.len()
        );

        let topic = message.get(0).context("hashblock: missing topic")?;

        ensure!(topic.as_ref() == b"hashblock", "hashblock: wrong topic");

        let body = message.get(1).context("hashblock: missing body")?;

        ensure!(body.len() == 32, "hashblock: body len {}", body.len());

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(body);
        bytes.reverse();

        Ok(Hash256::from_byte_array(bytes))
    }
}
