//! Command Envelope: tagged union di atas table 2-slot
//!
//! Layout:
//! ┌───────────────────────────┬──────────────────────────────┐
//! │ slot 0: command_type (u8) │ slot 1: command (uoffset)    │
//! └───────────────────────────┴──────────────────────────────┘
//!
//! Discriminant dibaca dulu. Payload hanya di-dereference untuk kind yang
//! dikenal; kind baru dari writer yang lebih baru menjadi `Unrecognized`.

use std::fmt;

use log::debug;

use super::packet::{Packet, PacketArgs, PacketMut};
use super::schema::{FieldDef, FieldKind, TableSchema};
use crate::core::{
    root_loc, root_table, size_prefixed_root_table, Builder, Offset, Table, TableMut, UnionValue,
};
use crate::error::Result;

/// Nomor slot Command
pub mod slot {
    pub const COMMAND_TYPE: u16 = 0;
    pub const COMMAND: u16 = 1;
}

/// Deskriptor per field Command
pub mod field {
    use super::{slot, FieldDef, FieldKind};

    pub const COMMAND_TYPE: FieldDef =
        FieldDef::scalar("command_type", slot::COMMAND_TYPE, FieldKind::UnionType, 0);
    pub const COMMAND: FieldDef =
        FieldDef::optional("command", slot::COMMAND, FieldKind::UnionValue);
}

pub static COMMAND: TableSchema = TableSchema {
    name: "Command",
    fields: &[field::COMMAND_TYPE, field::COMMAND],
};

/// Kind command yang dikenal reader ini
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Tidak ada payload
    None = 0,
    Packet = 1,
}

impl CommandKind {
    #[inline(always)]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Packet),
            _ => None,
        }
    }
}

/// Hasil dispatch union
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandPayload<'a> {
    /// `CommandKind::None` atau referensi payload absent
    Empty,
    Packet(Packet<'a>),
    /// Discriminant dari schema yang lebih baru; payload tidak disentuh
    Unrecognized(u8),
}

pub type CommandOffset = Offset<Command<'static>>;

#[derive(Clone, Copy, PartialEq)]
pub struct Command<'a> {
    table: Table<'a>,
}

impl<'a> Command<'a> {
    #[inline(always)]
    pub fn init_from_table(table: Table<'a>) -> Self {
        Self { table }
    }

    #[inline(always)]
    pub fn table(&self) -> Table<'a> {
        self.table
    }

    /// Discriminant mentah, termasuk nilai yang tidak dikenal
    #[inline(always)]
    pub fn command_type(&self) -> u8 {
        field::COMMAND_TYPE.read(&self.table)
    }

    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::from_u8(self.command_type())
    }

    pub fn payload(&self) -> CommandPayload<'a> {
        match self.kind() {
            Some(CommandKind::None) => CommandPayload::Empty,
            Some(CommandKind::Packet) => match self.table.get_table(field::COMMAND.slot) {
                Some(table) => CommandPayload::Packet(Packet::init_from_table(table)),
                None => CommandPayload::Empty,
            },
            None => {
                let kind = self.command_type();
                debug!("unrecognized command kind {}, payload left untouched", kind);
                CommandPayload::Unrecognized(kind)
            }
        }
    }

    pub fn command_as_packet(&self) -> Option<Packet<'a>> {
        match self.payload() {
            CommandPayload::Packet(packet) => Some(packet),
            _ => None,
        }
    }

    pub fn create(fbb: &mut Builder, args: &CommandArgs) -> Result<CommandOffset> {
        let mut builder = CommandBuilder::new(fbb)?;
        if let Some(command) = args.command {
            builder.add_command(command)?;
        }
        builder.add_command_type(args.command_type)?;
        builder.finish()
    }
}

impl fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("command_type", &self.command_type())
            .field("payload", &self.payload())
            .finish()
    }
}

/// Argumen untuk `Command::create`.
///
/// `command_type` mentah supaya writer bisa mengirim kind yang belum ada di
/// `CommandKind` reader ini.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandArgs {
    pub command_type: u8,
    pub command: Option<Offset<UnionValue>>,
}

impl Default for CommandArgs {
    fn default() -> Self {
        Self {
            command_type: field::COMMAND_TYPE.default_value(),
            command: None,
        }
    }
}

/// Builder envelope. Payload varian harus sudah selesai sebelum `new`.
pub struct CommandBuilder<'b> {
    fbb: &'b mut Builder,
}

impl<'b> CommandBuilder<'b> {
    pub fn new(fbb: &'b mut Builder) -> Result<Self> {
        fbb.start_table(COMMAND.field_count())?;
        Ok(Self { fbb })
    }

    #[inline(always)]
    pub fn add_command_type(&mut self, command_type: u8) -> Result<()> {
        field::COMMAND_TYPE.add(self.fbb, command_type)
    }

    #[inline(always)]
    pub fn add_command(&mut self, command: Offset<UnionValue>) -> Result<()> {
        self.fbb.add_offset(field::COMMAND.slot, command)
    }

    pub fn finish(self) -> Result<CommandOffset> {
        self.fbb.end_table()
    }
}

/// Akses mutable ke envelope yang sudah final
pub struct CommandMut<'a> {
    table: TableMut<'a>,
}

impl<'a> CommandMut<'a> {
    pub fn init_from_table(table: TableMut<'a>) -> Self {
        Self { table }
    }

    pub fn as_command(&self) -> Command<'_> {
        Command::init_from_table(self.table.as_table())
    }

    /// Packet mutable, hanya jika discriminant = `CommandKind::Packet`
    pub fn packet_mut(self) -> Option<PacketMut<'a>> {
        if self.as_command().kind() != Some(CommandKind::Packet) {
            return None;
        }
        self.table
            .into_child(slot::COMMAND)
            .map(PacketMut::init_from_table)
    }
}

pub fn root_as_command(buf: &[u8]) -> Command<'_> {
    Command::init_from_table(root_table(buf))
}

pub fn size_prefixed_root_as_command(buf: &[u8]) -> Command<'_> {
    Command::init_from_table(size_prefixed_root_table(buf))
}

pub fn root_as_command_mut(buf: &mut [u8]) -> CommandMut<'_> {
    let loc = root_loc(buf, false);
    CommandMut::init_from_table(TableMut::new(buf, loc))
}

pub fn size_prefixed_root_as_command_mut(buf: &mut [u8]) -> CommandMut<'_> {
    let loc = root_loc(buf, true);
    CommandMut::init_from_table(TableMut::new(buf, loc))
}

pub fn finish_command_buffer(fbb: &mut Builder, root: CommandOffset) -> Result<()> {
    fbb.finish(root)
}

pub fn finish_size_prefixed_command_buffer(fbb: &mut Builder, root: CommandOffset) -> Result<()> {
    fbb.finish_size_prefixed(root)
}

/// Encode Packet dalam envelope Command ke builder (di-reset dulu).
///
/// Returns slice ke buffer final di dalam builder.
pub fn encode_packet_command<'b>(
    fbb: &'b mut Builder,
    args: &PacketArgs<'_>,
    size_prefixed: bool,
) -> Result<&'b [u8]> {
    fbb.reset();

    let packet = Packet::create(fbb, args)?;
    let command = Command::create(
        fbb,
        &CommandArgs {
            command_type: CommandKind::Packet as u8,
            command: Some(packet.as_union_value()),
        },
    )?;

    if size_prefixed {
        finish_size_prefixed_command_buffer(fbb, command)?;
    } else {
        finish_command_buffer(fbb, command)?;
    }
    fbb.finished_data()
}
