//! TCP transport.
//!
//! Frames are newline-delimited JSON envelopes. Each accepted socket gets a
//! fresh [`ConnectionId`], a reader loop that feeds the [`EventRouter`], and
//! a writer task draining an unbounded queue registered with the [`Hub`].
//! Routing is synchronous and short, so it runs inline on the reader task.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::protocol::Outbound;
use crate::router::{EventRouter, Outbox};
use crate::state::{ConnectionId, ConnectionIds};

/// Outbound queues for every open connection.
#[derive(Debug, Default)]
pub struct Hub {
    senders: RwLock<HashMap<ConnectionId, UnboundedSender<String>>>,
}

impl Hub {
    pub fn register(&self, connection: ConnectionId, sender: UnboundedSender<String>) {
        self.senders.write().insert(connection, sender);
    }

    pub fn unregister(&self, connection: ConnectionId) {
        self.senders.write().remove(&connection);
    }

    pub fn len(&self) -> usize {
        self.senders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.read().is_empty()
    }
}

impl Outbox for Hub {
    fn deliver(&self, to: ConnectionId, event: Outbound) {
        let line = match event.to_line() {
            Ok(line) => line,
            Err(e) => {
                log::warn!("failed to encode {} for {}: {}", event.name(), to, e);
                return;
            }
        };
        match self.senders.read().get(&to) {
            Some(sender) => {
                if sender.send(line).is_err() {
                    log::warn!("dropping {} for closed {}", event.name(), to);
                }
            }
            None => log::debug!("no queue for {}, dropping {}", to, event.name()),
        }
    }
}

pub struct Server {
    router: EventRouter,
    hub: Hub,
    ids: ConnectionIds,
}

impl Server {
    pub fn new(router: EventRouter) -> Arc<Self> {
        Arc::new(Self {
            router,
            hub: Hub::default(),
            ids: ConnectionIds::new(),
        })
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub async fn bind(addr: &str) -> anyhow::Result<TcpListener> {
        TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {}", addr))
    }

    /// Accept connections until the listener fails.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
        log::info!("listening on {}", listener.local_addr()?);
        loop {
            let (stream, peer) = listener.accept().await.context("accepting connection")?;
            tokio::spawn(self.clone().serve(stream, peer));
        }
    }

    async fn serve(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let connection = self.ids.allocate();
        log::info!("{} connected from {}", connection, peer);

        let (read, mut write) = stream.into_split();
        let (tx, mut rx) = unbounded_channel::<String>();
        self.hub.register(connection, tx);

        let writer = tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                if let Err(e) = write.write_all(line.as_bytes()).await {
                    log::debug!("{}: write failed: {}", connection, e);
                    break;
                }
            }
        });

        let mut lines = BufReader::new(read).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => self.router.handle_frame(connection, &line, &self.hub),
                Ok(None) => break,
                Err(e) => {
                    log::debug!("{}: read failed: {}", connection, e);
                    break;
                }
            }
        }

        self.router.disconnect(connection, &self.hub);
        self.hub.unregister(connection);
        let _ = writer.await;
        log::info!("{} disconnected", connection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dealer::RandomDealer;
    use crate::state::{CodeGenerator, SessionRegistry};
    use crate::words::{Lexicon, WordValidator};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::tcp::OwnedReadHalf;
    use tokio::net::tcp::OwnedWriteHalf;

    struct TestClient {
        lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
        write: OwnedWriteHalf,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (read, write) = stream.into_split();
            Self {
                lines: BufReader::new(read).lines(),
                write,
            }
        }

        async fn send(&mut self, frame: &str) {
            self.write.write_all(frame.as_bytes()).await.unwrap();
            self.write.write_all(b"\n").await.unwrap();
        }

        async fn recv(&mut self) -> Outbound {
            let line = self.lines.next_line().await.unwrap().unwrap();
            Outbound::parse(&line).unwrap()
        }
    }

    async fn start() -> (Arc<Server>, SocketAddr) {
        let lexicon = Lexicon::new(WordValidator::from_words(["tide"]), vec!["Moon".to_string()]).unwrap();
        let router = EventRouter::with_parts(
            SessionRegistry::with_codes(CodeGenerator::seeded(3, 6)),
            lexicon,
            RandomDealer::seeded(3),
        );
        let server = Server::new(router);
        let listener = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.clone().run(listener));
        (server, addr)
    }

    #[tokio::test]
    async fn test_create_join_over_tcp() {
        let (server, addr) = start().await;
        let mut ava = TestClient::connect(addr).await;
        let mut ben = TestClient::connect(addr).await;

        ava.send(r#"{"event":"create_game","data":{"playerName":"Ava"}}"#).await;
        let code = match ava.recv().await {
            Outbound::GameCreated(p) => p.game_code,
            other => panic!("unexpected {:?}", other),
        };

        ben.send(&format!(
            r#"{{"event":"join_game","data":{{"gameCode":"{}","playerName":"Ben"}}}}"#,
            code
        ))
        .await;
        for client in [&mut ava, &mut ben] {
            match client.recv().await {
                Outbound::PlayerJoined(p) => assert_eq!(p.players.len(), 2),
                other => panic!("unexpected {:?}", other),
            }
        }

        ben.send("garbage").await;
        assert_eq!(ben.recv().await.name(), "error");

        drop(ben);
        match ava.recv().await {
            Outbound::PlayerLeft(p) => assert_eq!(p.players, vec!["Ava".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(server.router().registry().contains(&code));
    }
}
