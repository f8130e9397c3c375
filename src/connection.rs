use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use uuid::Uuid;

use crate::codec::CommandCodec;
use crate::frame::Frame;
use crate::Error;

pub struct Connection {
    pub id: Uuid,
    // Requests are decoded straight off the socket. Bytes of a partial command stay in the
    // codec buffer until the rest arrives.
    reader: FramedRead<OwnedReadHalf, CommandCodec>,
    writer: OwnedWriteHalf,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Self::with_codec(stream, CommandCodec::default())
    }

    pub fn with_codec(stream: TcpStream, codec: CommandCodec) -> Connection {
        let (reader, writer) = stream.into_split();

        Connection {
            id: Uuid::new_v4(),
            reader: FramedRead::new(reader, codec),
            writer,
        }
    }

    /// Reads the next command as its list of arguments. `None` once the peer
    /// closed the connection.
    pub async fn read_command(&mut self) -> Result<Option<Vec<Bytes>>, Error> {
        self.reader.next().await.transpose()
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        self.writer.write_all(&frame.serialize()).await?;
        Ok(())
    }
}
