//! Protocol Layer: message shape di atas Buffer Codec
//!
//! Prinsip desain:
//! - Declarative: Setiap shape dideskripsikan oleh `TableSchema` statis
//! - Lazy: Field dibaca saat accessor dipanggil, tidak ada deserialisasi
//! - Extensible: Kind command baru tidak mematahkan reader lama

mod command;
mod event;
mod packet;
mod schema;

pub use command::{
    encode_packet_command, finish_command_buffer, finish_size_prefixed_command_buffer,
    root_as_command, root_as_command_mut, size_prefixed_root_as_command,
    size_prefixed_root_as_command_mut, Command, CommandArgs, CommandBuilder, CommandKind,
    CommandMut, CommandOffset, CommandPayload, COMMAND,
};
pub use event::ConnectionEvent;
pub use packet::{
    address_words, finish_packet_buffer, finish_size_prefixed_packet_buffer, root_as_packet,
    root_as_packet_mut, size_prefixed_root_as_packet, size_prefixed_root_as_packet_mut,
    words_to_address, Direction, IpProtocol, Packet, PacketArgs, PacketBuilder, PacketMut,
    PacketOffset, PACKET,
};
pub use schema::{FieldDef, FieldKind, FieldScalar, FieldValue, Presence, TableSchema};

/// Nomor slot per message
pub mod slots {
    pub use super::command::slot as command;
    pub use super::packet::slot as packet;
}

/// Deskriptor field per message
pub mod fields {
    pub use super::command::field as command;
    pub use super::packet::field as packet;
}
