use crate::agent::AthenexAgent;
use crate::history::{ Session, SessionError };
use crate::models::websocket::{ ClientMessage, ServerMessage };

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio_rustls::TlsAcceptor;

use tokio_tungstenite::{ accept_async, WebSocketStream };
use tokio_tungstenite::tungstenite::protocol::Message;

use chrono::Utc;
use futures::{ Sink, SinkExt, Stream, StreamExt };
use log::{ info, warn, error };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

pub async fn start_ws_server(
    addr: &str,
    agent: Arc<AthenexAgent>,
    tls_acceptor: Option<TlsAcceptor>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    let protocol = if tls_acceptor.is_some() { "WSS" } else { "WS" };
    info!("{} server listening on: {}", protocol, listener.local_addr()?);
    serve(listener, agent, tls_acceptor).await
}

pub async fn serve(
    listener: TcpListener,
    agent: Arc<AthenexAgent>,
    tls_acceptor: Option<TlsAcceptor>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Incoming connection from: {}", peer);
        let agent = Arc::clone(&agent);
        let tls_acceptor = tls_acceptor.clone();

        tokio::spawn(async move {
            let result = match tls_acceptor {
                Some(acceptor) =>
                    match acceptor.accept(stream).await {
                        Ok(tls_stream) => process_connection(peer, tls_stream, agent).await,
                        Err(e) => Err(Box::new(e) as Box<dyn Error + Send + Sync>),
                    }
                None => process_connection(peer, stream, agent).await,
            };
            if let Err(e) = result {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

async fn process_connection<S>(
    peer: SocketAddr,
    stream: S,
    agent: Arc<AthenexAgent>
) -> Result<(), Box<dyn Error + Send + Sync>>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    let ws = accept_async(stream).await.map_err(|e| {
        error!("Handshake failed for {}: {}", peer, e);
        Box::new(e) as Box<dyn Error + Send + Sync>
    })?;
    handle_connection(peer, ws, &agent).await;
    Ok(())
}

async fn send_message<T>(tx: &mut T, message: &ServerMessage) -> Result<(), Box<dyn Error + Send + Sync>>
    where T: Sink<Message> + Unpin, T::Error: Error + Send + Sync + 'static
{
    let json = serde_json::to_string(message)?;
    tx.send(Message::Text(json)).await.map_err(|e| Box::new(e) as _)
}

/// One connection is one chat session: the session lives and dies with the socket.
pub async fn handle_connection<S>(peer: SocketAddr, websocket: WebSocketStream<S>, agent: &AthenexAgent)
    where S: AsyncRead + AsyncWrite + Unpin
{
    let (mut tx, mut rx) = websocket.split();
    let mut session = agent.start_session();
    info!("Assigned session {} to {}", session.id(), peer);

    let greeting = ServerMessage::Session {
        session_id: session.id().to_string(),
        model: session.config().model_id.clone(),
        domain: session.config().domain.to_string(),
    };
    if let Err(e) = send_message(&mut tx, &greeting).await {
        error!("Failed to greet {}: {}", peer, e);
        return;
    }

    while let Some(msg) = rx.next().await {
        let message = match msg {
            Ok(message) => message,
            Err(e) => {
                info!("WebSocket connection closed or errored for {}: {}", peer, e);
                break;
            }
        };

        if message.len() > MAX_MESSAGE_SIZE {
            warn!("Message from {} exceeds size limit ({} > {})", peer, message.len(), MAX_MESSAGE_SIZE);
            let _ = send_message(&mut tx, &(ServerMessage::Error {
                message: "Message too large".to_string(),
            })).await;
            break;
        }

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => {
                info!("Received close frame from {}", peer);
                break;
            }
            Message::Ping(data) => {
                if tx.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                continue;
            }
            Message::Binary(_) => {
                warn!("Ignoring binary message from {}", peer);
                continue;
            }
            Message::Pong(_) | Message::Frame(_) => {
                continue;
            }
        };

        let reply = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Chat { content }) => {
                if content.trim().is_empty() {
                    ServerMessage::Error { message: "Message is empty".to_string() }
                } else {
                    if send_message(&mut tx, &ServerMessage::Processing).await.is_err() {
                        break;
                    }
                    match await_reply(peer, agent, &mut session, &content, &mut tx, &mut rx).await {
                        Some(Ok(content)) =>
                            ServerMessage::Response {
                                content,
                                timestamp: Utc::now().timestamp(),
                            },
                        Some(Err(e)) => ServerMessage::Error { message: e.to_string() },
                        None => {
                            break;
                        }
                    }
                }
            }
            Ok(ClientMessage::Configure { model, domain }) => {
                match agent.select(session.config(), model.as_deref(), domain.as_deref()) {
                    Ok(config) => {
                        session.reconfigure(config);
                        configured(&session)
                    }
                    Err(e) => ServerMessage::Error { message: e.to_string() },
                }
            }
            Ok(ClientMessage::Reset { model, domain }) => {
                match agent.select(session.config(), model.as_deref(), domain.as_deref()) {
                    Ok(config) => {
                        session.reset(config);
                        configured(&session)
                    }
                    Err(e) => ServerMessage::Error { message: e.to_string() },
                }
            }
            Ok(ClientMessage::History) => ServerMessage::History {
                turns: session.transcript().visible_turns().to_vec(),
            },
            Err(e) => {
                error!("Failed to parse message from {}: {}", peer, e);
                ServerMessage::Error { message: format!("Failed to parse message: {}", e) }
            }
        };

        if let Err(e) = send_message(&mut tx, &reply).await {
            error!("Error sending reply to {}: {}", peer, e);
            break;
        }
    }
    info!("WebSocket connection closed for {} (session {})", peer, session.id());
}

fn configured(session: &Session) -> ServerMessage {
    ServerMessage::Configured {
        model: session.config().model_id.clone(),
        domain: session.config().domain.to_string(),
    }
}

/// Drives the provider call while still servicing the socket. Returns `None` if
/// the client went away, which cancels the call.
async fn await_reply<T, R>(
    peer: SocketAddr,
    agent: &AthenexAgent,
    session: &mut Session,
    content: &str,
    tx: &mut T,
    rx: &mut R
) -> Option<Result<String, SessionError>>
    where
        T: Sink<Message> + Unpin,
        T::Error: Error + Send + Sync + 'static,
        R: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin
{
    let call = agent.converse(session, content);
    tokio::pin!(call);

    loop {
        tokio::select! {
            result = &mut call => {
                return Some(result);
            }
            incoming = rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                        let busy = ServerMessage::Error {
                            message: "A reply is still pending; wait for it before sending another message".to_string(),
                        };
                        if send_message(tx, &busy).await.is_err() {
                            return None;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if tx.send(Message::Pong(data)).await.is_err() {
                            return None;
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        info!("{} disconnected while a reply was pending", peer);
                        return None;
                    }
                }
            }
        }
    }
}
