//! ConnectionEvent: bentuk owned dari Packet
//!
//! Dipakai di sisi yang perlu menyimpan event melewati umur buffer
//! (misalnya antrian prompt di user-space), atau yang membangun event dari
//! hasil capture sebelum encode.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use log::warn;

use super::packet::{address_words, Direction, IpProtocol, Packet, PacketArgs, PacketOffset};
use crate::core::Builder;
use crate::error::{BuildError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub id: u32,
    pub process_id: Option<u64>,
    pub process_path: Option<String>,
    pub direction: Direction,
    pub protocol: u8,
    pub local: Option<IpAddr>,
    pub local_port: u16,
    pub remote: Option<IpAddr>,
    pub remote_port: u16,
}

impl Default for ConnectionEvent {
    fn default() -> Self {
        Self {
            id: 0,
            process_id: None,
            process_path: None,
            direction: Direction::NotApplicable,
            protocol: 0,
            local: None,
            local_port: 0,
            remote: None,
            remote_port: 0,
        }
    }
}

impl ConnectionEvent {
    /// Family dari alamat yang ada; `Err` jika local dan remote berbeda.
    pub fn ip_v6(&self) -> Result<bool> {
        match (self.local, self.remote) {
            (Some(local), Some(remote)) if local.is_ipv6() != remote.is_ipv6() => {
                Err(BuildError::MixedAddressFamily)
            }
            (Some(addr), _) | (None, Some(addr)) => Ok(addr.is_ipv6()),
            (None, None) => Ok(false),
        }
    }

    pub fn encode(&self, fbb: &mut Builder) -> Result<PacketOffset> {
        let ip_v6 = self.ip_v6()?;
        let local_ip = self.local.as_ref().map(address_words);
        let remote_ip = self.remote.as_ref().map(address_words);

        Packet::create(
            fbb,
            &PacketArgs {
                id: self.id,
                process_id: self.process_id,
                process_path: self.process_path.as_deref().map(str::as_bytes),
                direction: self.direction as u8,
                ip_v6,
                protocol: self.protocol,
                local_ip: local_ip.as_deref(),
                remote_ip: remote_ip.as_deref(),
                local_port: self.local_port,
                remote_port: self.remote_port,
            },
        )
    }

    /// Salin semua field dari view. Direction yang tidak dikenal menjadi
    /// `NotApplicable`; path non-UTF-8 di-decode lossy.
    pub fn from_packet(packet: &Packet<'_>) -> Self {
        let direction = Direction::from_u8(packet.direction()).unwrap_or_else(|| {
            warn!("unknown direction {} in packet {}", packet.direction(), packet.id());
            Direction::NotApplicable
        });

        Self {
            id: packet.id(),
            process_id: packet.process_id(),
            process_path: packet
                .process_path()
                .map(|path| String::from_utf8_lossy(path).into_owned()),
            direction,
            protocol: packet.protocol(),
            local: packet.local_address(),
            local_port: packet.local_port(),
            remote: packet.remote_address(),
            remote_port: packet.remote_port(),
        }
    }
}

impl From<&Packet<'_>> for ConnectionEvent {
    fn from(packet: &Packet<'_>) -> Self {
        Self::from_packet(packet)
    }
}

fn endpoint(addr: Option<IpAddr>, port: u16) -> String {
    match addr {
        Some(addr) => SocketAddr::new(addr, port).to_string(),
        None => format!("?:{}", port),
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ",
            endpoint(self.local, self.local_port),
            endpoint(self.remote, self.remote_port)
        )?;
        match IpProtocol::from_u8(self.protocol) {
            Some(protocol) => write!(f, "{:?}", protocol)?,
            None => write!(f, "proto={}", self.protocol)?,
        }
        write!(f, " {:?}", self.direction)?;
        if let Some(path) = &self.process_path {
            write!(f, " app={}", path)?;
        }
        Ok(())
    }
}
