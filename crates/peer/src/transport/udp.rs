//! Line transport over a non-blocking UDP socket.
//!
//! Each line is sent as one datagram terminated by `\n`. Datagrams holding
//! several lines are split and queued. Datagrams from any address other
//! than the configured peer are ignored. UDP may lose or reorder lines;
//! nothing here retries.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use tracing::{debug, warn};

use crate::ports::{check_line, LineTransport, TransportError, MAX_LINE_LENGTH};

/// UDP-backed [`LineTransport`].
#[derive(Debug)]
pub struct UdpLineTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
}

impl UdpLineTransport {
    /// Binds a local socket and fixes the remote peer.
    pub fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        debug!(local = %socket.local_addr()?, peer = %peer, "UDP link bound");

        Ok(Self {
            socket,
            peer,
            buffer: vec![0u8; MAX_LINE_LENGTH * 4],
            pending: VecDeque::new(),
        })
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    /// Remote address lines are sent to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Changes the remote address (used when the peer binds an ephemeral port).
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = peer;
    }

    fn poll_socket(&mut self) {
        loop {
            match self.socket.recv_from(&mut self.buffer) {
                Ok((len, from)) if from == self.peer => {
                    let text = String::from_utf8_lossy(&self.buffer[..len]);
                    self.pending.extend(
                        text.split('\n')
                            .map(|l| l.trim_end_matches('\r'))
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                    );
                    return;
                }
                Ok((_, from)) => {
                    debug!(from = %from, "Ignoring datagram from unknown sender");
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!(error = %e, "UDP receive failed");
                    return;
                }
            }
        }
    }
}

impl LineTransport for UdpLineTransport {
    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        check_line(line)?;
        let datagram = format!("{}\n", line);
        self.socket.send_to(datagram.as_bytes(), self.peer)?;
        Ok(())
    }

    fn try_receive_line(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            self.poll_socket();
        }
        self.pending.pop_front()
    }
}
