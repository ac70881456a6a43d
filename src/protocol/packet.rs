//! Packet Message: satu event percobaan koneksi
//!
//! Layout slot:
//!
//! | slot | field        | tipe        | absent              |
//! |------|--------------|-------------|---------------------|
//! | 0    | id           | u32         | 0                   |
//! | 1    | process_id   | u64         | `None` (bukan 0!)   |
//! | 2    | process_path | bytes       | `None`              |
//! | 3    | direction    | u8          | 0                   |
//! | 4    | ip_v6        | bool        | false               |
//! | 5    | protocol     | u8          | 0                   |
//! | 6    | local_ip     | `[u32]`     | `None`              |
//! | 7    | remote_ip    | `[u32]`     | `None`              |
//! | 8    | local_port   | u16         | 0                   |
//! | 9    | remote_port  | u16         | 0                   |
//!
//! Alamat IP: IPv4 = 1 word, IPv6 = 4 word. Tiap word adalah nilai numerik
//! big-endian (network order) dari 4 byte alamat. Flag `ip_v6` yang
//! menentukan family, bukan jumlah word.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use log::warn;

use super::schema::{FieldDef, FieldKind, TableSchema};
use crate::core::{
    root_loc, root_table, size_prefixed_root_table, Builder, Offset, Table, TableMut, Vector,
};
use crate::error::Result;

/// Nomor slot Packet
pub mod slot {
    pub const ID: u16 = 0;
    pub const PROCESS_ID: u16 = 1;
    pub const PROCESS_PATH: u16 = 2;
    pub const DIRECTION: u16 = 3;
    pub const IP_V6: u16 = 4;
    pub const PROTOCOL: u16 = 5;
    pub const LOCAL_IP: u16 = 6;
    pub const REMOTE_IP: u16 = 7;
    pub const LOCAL_PORT: u16 = 8;
    pub const REMOTE_PORT: u16 = 9;
}

/// Deskriptor per field; sumber tunggal slot, tipe, dan default
pub mod field {
    use super::{slot, FieldDef, FieldKind};

    pub const ID: FieldDef = FieldDef::scalar("id", slot::ID, FieldKind::U32, 0);
    pub const PROCESS_ID: FieldDef =
        FieldDef::optional("process_id", slot::PROCESS_ID, FieldKind::U64);
    pub const PROCESS_PATH: FieldDef =
        FieldDef::optional("process_path", slot::PROCESS_PATH, FieldKind::Bytes);
    pub const DIRECTION: FieldDef =
        FieldDef::scalar("direction", slot::DIRECTION, FieldKind::U8, 0);
    pub const IP_V6: FieldDef = FieldDef::scalar("ip_v6", slot::IP_V6, FieldKind::Bool, 0);
    pub const PROTOCOL: FieldDef = FieldDef::scalar("protocol", slot::PROTOCOL, FieldKind::U8, 0);
    pub const LOCAL_IP: FieldDef =
        FieldDef::optional("local_ip", slot::LOCAL_IP, FieldKind::WordVector);
    pub const REMOTE_IP: FieldDef =
        FieldDef::optional("remote_ip", slot::REMOTE_IP, FieldKind::WordVector);
    pub const LOCAL_PORT: FieldDef =
        FieldDef::scalar("local_port", slot::LOCAL_PORT, FieldKind::U16, 0);
    pub const REMOTE_PORT: FieldDef =
        FieldDef::scalar("remote_port", slot::REMOTE_PORT, FieldKind::U16, 0);
}

pub static PACKET: TableSchema = TableSchema {
    name: "Packet",
    fields: &[
        field::ID,
        field::PROCESS_ID,
        field::PROCESS_PATH,
        field::DIRECTION,
        field::IP_V6,
        field::PROTOCOL,
        field::LOCAL_IP,
        field::REMOTE_IP,
        field::LOCAL_PORT,
        field::REMOTE_PORT,
    ],
};

/// Arah koneksi
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound = 0,
    Inbound = 1,
    NotApplicable = 255,
}

impl Direction {
    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Outbound),
            1 => Some(Self::Inbound),
            255 => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

/// Transport protocol (nomor IANA)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    Icmp = 1,
    Tcp = 6,
    Udp = 17,
    IcmpV6 = 58,
}

impl IpProtocol {
    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Icmp),
            6 => Some(Self::Tcp),
            17 => Some(Self::Udp),
            58 => Some(Self::IcmpV6),
            _ => None,
        }
    }
}

/// Alamat ke word wire: 1 word untuk IPv4, 4 word untuk IPv6
pub fn address_words(addr: &IpAddr) -> Vec<u32> {
    match addr {
        IpAddr::V4(v4) => vec![u32::from(*v4)],
        IpAddr::V6(v6) => v6
            .octets()
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    }
}

/// Word wire ke alamat. `ip_v6` authoritative; jumlah word yang tidak cocok
/// dengan family menghasilkan `None`.
pub fn words_to_address(words: &Vector<'_, u32>, ip_v6: bool) -> Option<IpAddr> {
    match (ip_v6, words.len()) {
        (false, 1) => Some(IpAddr::V4(Ipv4Addr::from(words.get(0)))),
        (true, 4) => {
            let mut octets = [0u8; 16];
            for (chunk, word) in octets.chunks_exact_mut(4).zip(words.iter()) {
                chunk.copy_from_slice(&word.to_be_bytes());
            }
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        (ip_v6, len) => {
            warn!("address with {} words does not match ip_v6={}", len, ip_v6);
            None
        }
    }
}

pub type PacketOffset = Offset<Packet<'static>>;

/// Typed view ke table Packet
#[derive(Clone, Copy, PartialEq)]
pub struct Packet<'a> {
    table: Table<'a>,
}

impl<'a> Packet<'a> {
    #[inline(always)]
    pub fn init_from_table(table: Table<'a>) -> Self {
        Self { table }
    }

    #[inline(always)]
    pub fn table(&self) -> Table<'a> {
        self.table
    }

    #[inline(always)]
    pub fn id(&self) -> u32 {
        field::ID.read(&self.table)
    }

    /// `None` berarti process tidak diketahui; `Some(0)` adalah PID 0.
    #[inline(always)]
    pub fn process_id(&self) -> Option<u64> {
        field::PROCESS_ID.read_optional(&self.table)
    }

    #[inline(always)]
    pub fn process_path(&self) -> Option<&'a [u8]> {
        self.table.get_bytes(field::PROCESS_PATH.slot)
    }

    /// Path sebagai UTF-8, `None` jika absent atau bukan UTF-8 valid
    pub fn process_path_str(&self) -> Option<&'a str> {
        self.process_path()
            .and_then(|path| std::str::from_utf8(path).ok())
    }

    #[inline(always)]
    pub fn direction(&self) -> u8 {
        field::DIRECTION.read(&self.table)
    }

    pub fn direction_kind(&self) -> Option<Direction> {
        Direction::from_u8(self.direction())
    }

    #[inline(always)]
    pub fn ip_v6(&self) -> bool {
        field::IP_V6.read(&self.table)
    }

    #[inline(always)]
    pub fn protocol(&self) -> u8 {
        field::PROTOCOL.read(&self.table)
    }

    pub fn protocol_kind(&self) -> Option<IpProtocol> {
        IpProtocol::from_u8(self.protocol())
    }

    #[inline(always)]
    pub fn local_ip(&self) -> Option<Vector<'a, u32>> {
        self.table.get_vector(field::LOCAL_IP.slot)
    }

    #[inline(always)]
    pub fn remote_ip(&self) -> Option<Vector<'a, u32>> {
        self.table.get_vector(field::REMOTE_IP.slot)
    }

    #[inline(always)]
    pub fn local_port(&self) -> u16 {
        field::LOCAL_PORT.read(&self.table)
    }

    #[inline(always)]
    pub fn remote_port(&self) -> u16 {
        field::REMOTE_PORT.read(&self.table)
    }

    pub fn local_address(&self) -> Option<IpAddr> {
        self.local_ip()
            .and_then(|words| words_to_address(&words, self.ip_v6()))
    }

    pub fn remote_address(&self) -> Option<IpAddr> {
        self.remote_ip()
            .and_then(|words| words_to_address(&words, self.ip_v6()))
    }

    /// Tulis Packet lengkap: child variable-length dulu, lalu table.
    pub fn create(fbb: &mut Builder, args: &PacketArgs<'_>) -> Result<PacketOffset> {
        let process_path = args
            .process_path
            .map(|path| fbb.create_byte_string(path))
            .transpose()?;
        let local_ip = args
            .local_ip
            .map(|words| fbb.create_vector(words))
            .transpose()?;
        let remote_ip = args
            .remote_ip
            .map(|words| fbb.create_vector(words))
            .transpose()?;

        // Field besar dulu supaya padding minimal
        let mut builder = PacketBuilder::new(fbb)?;
        if let Some(process_id) = args.process_id {
            builder.add_process_id(process_id)?;
        }
        if let Some(remote_ip) = remote_ip {
            builder.add_remote_ip(remote_ip)?;
        }
        if let Some(local_ip) = local_ip {
            builder.add_local_ip(local_ip)?;
        }
        if let Some(process_path) = process_path {
            builder.add_process_path(process_path)?;
        }
        builder.add_id(args.id)?;
        builder.add_remote_port(args.remote_port)?;
        builder.add_local_port(args.local_port)?;
        builder.add_protocol(args.protocol)?;
        builder.add_ip_v6(args.ip_v6)?;
        builder.add_direction(args.direction)?;
        builder.finish()
    }
}

impl fmt::Debug for Packet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in PACKET.fields_of(&self.table) {
            map.entry(&name, &value);
        }
        map.finish()
    }
}

/// Argumen untuk `Packet::create`. Field absent = `None`/default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketArgs<'a> {
    pub id: u32,
    pub process_id: Option<u64>,
    pub process_path: Option<&'a [u8]>,
    pub direction: u8,
    pub ip_v6: bool,
    pub protocol: u8,
    pub local_ip: Option<&'a [u32]>,
    pub remote_ip: Option<&'a [u32]>,
    pub local_port: u16,
    pub remote_port: u16,
}

/// Builder table Packet: `new` (start) -> `add_*` urutan bebas -> `finish` (end).
///
/// Child (`process_path`, `local_ip`, `remote_ip`) harus sudah dibuat
/// sebelum `new`.
pub struct PacketBuilder<'b> {
    fbb: &'b mut Builder,
}

impl<'b> PacketBuilder<'b> {
    pub fn new(fbb: &'b mut Builder) -> Result<Self> {
        fbb.start_table(PACKET.field_count())?;
        Ok(Self { fbb })
    }

    #[inline(always)]
    pub fn add_id(&mut self, id: u32) -> Result<()> {
        field::ID.add(self.fbb, id)
    }

    /// Selalu ditulis, termasuk 0
    #[inline(always)]
    pub fn add_process_id(&mut self, process_id: u64) -> Result<()> {
        field::PROCESS_ID.add(self.fbb, process_id)
    }

    #[inline(always)]
    pub fn add_process_path(&mut self, process_path: Offset<[u8]>) -> Result<()> {
        self.fbb.add_offset(field::PROCESS_PATH.slot, process_path)
    }

    #[inline(always)]
    pub fn add_direction(&mut self, direction: u8) -> Result<()> {
        field::DIRECTION.add(self.fbb, direction)
    }

    #[inline(always)]
    pub fn add_ip_v6(&mut self, ip_v6: bool) -> Result<()> {
        field::IP_V6.add(self.fbb, ip_v6)
    }

    #[inline(always)]
    pub fn add_protocol(&mut self, protocol: u8) -> Result<()> {
        field::PROTOCOL.add(self.fbb, protocol)
    }

    #[inline(always)]
    pub fn add_local_ip(&mut self, local_ip: Offset<[u32]>) -> Result<()> {
        self.fbb.add_offset(field::LOCAL_IP.slot, local_ip)
    }

    #[inline(always)]
    pub fn add_remote_ip(&mut self, remote_ip: Offset<[u32]>) -> Result<()> {
        self.fbb.add_offset(field::REMOTE_IP.slot, remote_ip)
    }

    #[inline(always)]
    pub fn add_local_port(&mut self, local_port: u16) -> Result<()> {
        field::LOCAL_PORT.add(self.fbb, local_port)
    }

    #[inline(always)]
    pub fn add_remote_port(&mut self, remote_port: u16) -> Result<()> {
        field::REMOTE_PORT.add(self.fbb, remote_port)
    }

    pub fn finish(self) -> Result<PacketOffset> {
        self.fbb.end_table()
    }
}

/// Mutasi in-place field fixed-width. Semua `mutate_*` return `false`
/// (tanpa mengubah buffer) jika field absent.
pub struct PacketMut<'a> {
    table: TableMut<'a>,
}

impl<'a> PacketMut<'a> {
    pub fn init_from_table(table: TableMut<'a>) -> Self {
        Self { table }
    }

    pub fn as_packet(&self) -> Packet<'_> {
        Packet::init_from_table(self.table.as_table())
    }

    pub fn mutate_id(&mut self, id: u32) -> bool {
        self.table.mutate(slot::ID, id)
    }

    pub fn mutate_process_id(&mut self, process_id: u64) -> bool {
        self.table.mutate(slot::PROCESS_ID, process_id)
    }

    pub fn mutate_direction(&mut self, direction: u8) -> bool {
        self.table.mutate(slot::DIRECTION, direction)
    }

    pub fn mutate_ip_v6(&mut self, ip_v6: bool) -> bool {
        self.table.mutate(slot::IP_V6, ip_v6)
    }

    pub fn mutate_protocol(&mut self, protocol: u8) -> bool {
        self.table.mutate(slot::PROTOCOL, protocol)
    }

    pub fn mutate_local_port(&mut self, local_port: u16) -> bool {
        self.table.mutate(slot::LOCAL_PORT, local_port)
    }

    pub fn mutate_remote_port(&mut self, remote_port: u16) -> bool {
        self.table.mutate(slot::REMOTE_PORT, remote_port)
    }

    /// # Panics
    /// Panic jika `index` di luar panjang vector.
    pub fn mutate_local_ip(&mut self, index: usize, word: u32) -> bool {
        self.table.mutate_vector_element(slot::LOCAL_IP, index, word)
    }

    /// # Panics
    /// Panic jika `index` di luar panjang vector.
    pub fn mutate_remote_ip(&mut self, index: usize, word: u32) -> bool {
        self.table.mutate_vector_element(slot::REMOTE_IP, index, word)
    }
}

pub fn root_as_packet(buf: &[u8]) -> Packet<'_> {
    Packet::init_from_table(root_table(buf))
}

pub fn size_prefixed_root_as_packet(buf: &[u8]) -> Packet<'_> {
    Packet::init_from_table(size_prefixed_root_table(buf))
}

pub fn root_as_packet_mut(buf: &mut [u8]) -> PacketMut<'_> {
    let loc = root_loc(buf, false);
    PacketMut::init_from_table(TableMut::new(buf, loc))
}

pub fn size_prefixed_root_as_packet_mut(buf: &mut [u8]) -> PacketMut<'_> {
    let loc = root_loc(buf, true);
    PacketMut::init_from_table(TableMut::new(buf, loc))
}

pub fn finish_packet_buffer(fbb: &mut Builder, root: PacketOffset) -> Result<()> {
    fbb.finish(root)
}

pub fn finish_size_prefixed_packet_buffer(fbb: &mut Builder, root: PacketOffset) -> Result<()> {
    fbb.finish_size_prefixed(root)
}
