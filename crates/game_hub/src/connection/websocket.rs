//! Mapping between axum WebSocket messages and transport frames.

use super::Frame;
use axum::extract::ws::{Message, WebSocket};
use futures::{future, Sink, SinkExt, Stream, StreamExt};

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => Frame::Text(text),
            Message::Binary(bytes) => Frame::Binary(bytes),
            Message::Ping(payload) => Frame::Ping(payload),
            Message::Pong(payload) => Frame::Pong(payload),
            Message::Close(_) => Frame::Close,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
            Frame::Ping(payload) => Message::Ping(payload),
            Frame::Pong(payload) => Message::Pong(payload),
            Frame::Close => Message::Close(None),
        }
    }
}

/// Splits an upgraded socket into the frame sink and frame stream expected
/// by [`serve_connection`](super::serve_connection).
pub fn split_socket(
    socket: WebSocket,
) -> (
    impl Sink<Frame, Error = axum::Error> + Unpin + Send + 'static,
    impl Stream<Item = Result<Frame, axum::Error>> + Unpin + Send + 'static,
) {
    let (sink, stream) = socket.split();
    let sink = sink.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(Message::from(frame))));
    let stream = stream.map(|message| message.map(Frame::from));
    (sink, stream)
}
