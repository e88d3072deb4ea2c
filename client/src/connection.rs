//! Framed TCP connection to the trivia server.

use shared::{write_frame, Frame, FrameReader, ProtocolError};
use tokio::net::TcpStream;

/// A connected client socket with its per-connection frame buffer.
pub struct Connection {
    stream: TcpStream,
    reader: FrameReader,
}

impl Connection {
    pub async fn connect(addr: &str) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            reader: FrameReader::new(),
        })
    }

    pub async fn send(&mut self, msg_type: &str, data: &str) -> Result<(), ProtocolError> {
        write_frame(&mut self.stream, msg_type, data).await
    }

    pub async fn recv(&mut self) -> Result<Frame, ProtocolError> {
        self.reader.read_frame(&mut self.stream).await
    }
}
