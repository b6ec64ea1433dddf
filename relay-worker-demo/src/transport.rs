//! `TcpTransport`: a `TcpStream`-backed `relay_core::remote::Transport`
//! writing the 8-byte framed header in network byte order (spec §4.8, §6).

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;

use relay_core::error::{DelegateError, Result};
use relay_core::header::Header;
use relay_core::remote::Transport;

pub struct TcpTransport {
    write_half: Mutex<TcpStream>,
    read_half: Mutex<TcpStream>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        let read_half = stream.try_clone()?;
        Ok(TcpTransport { write_half: Mutex::new(stream), read_half: Mutex::new(read_half) })
    }
}

impl Transport for TcpTransport {
    fn send(&self, payload: &[u8], header: &Header) -> i32 {
        let mut stream = self.write_half.lock().unwrap();
        if header.write(&mut *stream).is_err() {
            return -1;
        }
        match stream.write_all(payload) {
            Ok(()) => 0,
            Err(_) => -2,
        }
    }

    fn receive(&self) -> Result<(Header, Vec<u8>)> {
        let mut stream = self.read_half.lock().unwrap();
        let header = Header::read(&mut *stream).map_err(|_| DelegateError::StreamNotGood)?;
        let mut payload = vec![0u8; header.length as usize];
        stream.read_exact(&mut payload).map_err(|_| DelegateError::StreamNotGood)?;
        Ok((header, payload))
    }
}
