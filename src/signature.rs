use crate::matcher::Pattern;
use crate::profile::VersionProfile;

pub const OP_MOV_MEM_AX: u8 = 0xa3;
pub const OP_MOV_AX_MEM: u8 = 0xa1;
pub const OP_MOV_AL_MEM: u8 = 0xa0;
pub const OP_MOV_RM16_R16: u8 = 0x89;
pub const MODRM_BX_DISP16: u8 = 0x1e;

/// `push bp; mov bp, sp; push bp; jmp +0`, the key handler prologue.
const KEY_HANDLER_PROLOGUE: [u8; 7] = [0x55, 0x8b, 0xec, 0x55, 0xe9, 0x00, 0x00];

/// `jmp A7E9; mov cx, 8`, shown just before the round number message.
const ROUND_MESSAGE: [u8; 6] = [0xe9, 0xa7, 0x01, 0xb9, 0x08, 0x00];

/// The round start hook replaces the `mov cx, 8` after the jump.
pub const ROUND_MESSAGE_SITE_SKIP: usize = 3;

/// Distance from `mov al, [up_flag]` to the low byte of the xPos operand
/// that the movement check should read as yPos.
pub const UP_FLAG_OPERAND_SKIP: usize = 7;

/// Byte signatures for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatures {
    pub key_handler: Pattern,
    pub init_scancode: Pattern,
    pub write_scancode: Pattern,
    pub read_scancode: Pattern,
    pub round_message: Pattern,
    pub read_up_flag: Pattern,
}

impl Signatures {
    #[must_use]
    pub fn for_profile(profile: &VersionProfile) -> Self {
        let scancode = profile.last_scancode_addr.to_le_bytes();
        let up_flag = profile.up_flag_addr.to_le_bytes();

        let read_scancode = [OP_MOV_AX_MEM, scancode[0], scancode[1]];
        let mut key_handler = KEY_HANDLER_PROLOGUE.to_vec();
        key_handler.extend_from_slice(&read_scancode);

        Self {
            key_handler: Pattern::new("key handler entry", key_handler),
            init_scancode: Pattern::new(
                "mov [last_scancode], ax",
                [OP_MOV_MEM_AX, scancode[0], scancode[1]],
            ),
            write_scancode: Pattern::new(
                "mov [last_scancode], bx",
                [OP_MOV_RM16_R16, MODRM_BX_DISP16, scancode[0], scancode[1]],
            ),
            read_scancode: Pattern::new("mov ax, [last_scancode]", read_scancode),
            round_message: Pattern::new("round message jump", ROUND_MESSAGE),
            read_up_flag: Pattern::new("mov al, [up_flag]", [OP_MOV_AL_MEM, up_flag[0], up_flag[1]]),
        }
    }
}
