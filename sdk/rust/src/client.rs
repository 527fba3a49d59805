use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::ClientError;
use crate::wire::{AM_SOURCE, AM_TARGET, RESP_DATA_NUMS, RESP_HELLO, RESP_RECVD, VALUE_WIDTH};

/// What the client does with the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The client produces batches; the server reads them.
    Source,
    /// The client consumes batches written by the server.
    Target,
}

impl Role {
    fn as_byte(self) -> u8 {
        match self {
            Role::Source => AM_SOURCE,
            Role::Target => AM_TARGET,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Role::Source => "source",
            Role::Target => "target",
        }
    }
}

/// A negotiated analog stream.
pub struct Client {
    stream: TcpStream,
    role: Role,
    data_size: usize,
    wire: Vec<u8>,
}

impl Client {
    /// Connect and run the client half of the handshake.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        role: Role,
        data_size: usize,
        name: &str,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let size = u32::try_from(data_size).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "data size does not fit in u32")
        })?;
        let name_len = u32::try_from(name.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "name length does not fit in u32")
        })?;

        let mut client = Self {
            stream,
            role,
            data_size,
            wire: vec![0; data_size * VALUE_WIDTH],
        };

        client.exchange("direction", &[role.as_byte()], RESP_HELLO)?;
        client.exchange("data type", &[RESP_DATA_NUMS], RESP_RECVD)?;
        client.exchange("data size", &size.to_le_bytes(), RESP_RECVD)?;

        let mut name_frame = Vec::with_capacity(4 + name.len());
        name_frame.extend_from_slice(&name_len.to_le_bytes());
        name_frame.extend_from_slice(name.as_bytes());
        client.exchange("name", &name_frame, RESP_RECVD)?;

        Ok(client)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Bound how long `recv_batch` and ack reads may block.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Write one batch and wait for the server's acknowledgement.
    pub fn send_batch(&mut self, values: &[f64]) -> Result<(), ClientError> {
        self.require(Role::Source, "send_batch")?;
        if values.len() != self.data_size {
            return Err(ClientError::BatchSize {
                expected: self.data_size,
                got: values.len(),
            });
        }
        for (chunk, value) in self.wire.chunks_exact_mut(VALUE_WIDTH).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        self.stream.write_all(&self.wire)?;
        self.expect_byte("acknowledgement", RESP_RECVD)
    }

    /// Read one batch and acknowledge it.
    pub fn recv_batch(&mut self) -> Result<Vec<f64>, ClientError> {
        self.require(Role::Target, "recv_batch")?;
        read_exact(&mut self.stream, &mut self.wire)?;
        let values = self
            .wire
            .chunks_exact(VALUE_WIDTH)
            .map(|chunk| {
                let mut bytes = [0u8; VALUE_WIDTH];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect();
        self.stream.write_all(&[RESP_RECVD])?;
        Ok(values)
    }

    /// Close both directions of the socket.
    pub fn close(self) -> Result<(), ClientError> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn require(&self, role: Role, operation: &'static str) -> Result<(), ClientError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ClientError::WrongRole {
                operation,
                role: self.role.as_str(),
            })
        }
    }

    fn exchange(&mut self, stage: &'static str, frame: &[u8], reply: u8) -> Result<(), ClientError> {
        self.stream.write_all(frame)?;
        self.expect_byte(stage, reply)
    }

    fn expect_byte(&mut self, stage: &'static str, expected: u8) -> Result<(), ClientError> {
        let mut byte = [0u8; 1];
        read_exact(&mut self.stream, &mut byte)?;
        if byte[0] != expected {
            return Err(ClientError::UnexpectedReply {
                stage,
                expected,
                got: byte[0],
            });
        }
        Ok(())
    }
}

fn read_exact(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), ClientError> {
    stream.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset => ClientError::Closed,
        _ => ClientError::Io(e),
    })
}
