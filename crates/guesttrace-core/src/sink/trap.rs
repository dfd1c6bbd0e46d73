//! Magic-instruction transport for an observing hypervisor.
//!
//! `xchg bx, bx` is a no-op on real hardware; an instrumented emulator
//! treats it as a trap and reads six registers:
//!
//! | register | value                       |
//! |----------|-----------------------------|
//! | rax      | operation (1 = register)    |
//! | rbx      | address of the record       |
//! | rcx      | record kind                 |
//! | rdx      | record size                 |
//! | rsi      | core scope                  |
//! | rdi      | reserved, 0                 |

use guesttrace_record::EncodedRecord;

use super::{CoreScope, TransportSink};

/// Trap operation: register one record.
pub const TRAP_OP_REGISTER: u64 = 1;

/// Delivers records through the x86_64 magic trap.
///
/// Delivery is synchronous: the observer copies the record before the
/// instruction retires, so the record buffer may live on the stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapSink;

impl TrapSink {
    /// Create a trap sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TransportSink for TrapSink {
    #[inline]
    #[expect(unsafe_code, reason = "the magic trap is an inline asm instruction")]
    fn emit(&self, record: &EncodedRecord, scope: CoreScope) -> bool {
        let bytes = record.as_bytes();
        let addr = bytes.as_ptr() as u64;
        let kind = u64::from(record.kind().code());
        let size = u64::from(record.len());

        // SAFETY: rbx is reserved by LLVM, so the address goes through a
        // scratch register and is swapped in and back out around the trap,
        // leaving rbx unchanged. The trap itself only reads `bytes`, which
        // stays borrowed for the duration of the asm block, and touches no
        // stack.
        unsafe {
            core::arch::asm!(
                "xchg {addr}, rbx",
                "xchg bx, bx",
                "xchg {addr}, rbx",
                addr = inout(reg) addr => _,
                in("rax") TRAP_OP_REGISTER,
                in("rcx") kind,
                in("rdx") size,
                in("rsi") scope.raw(),
                in("rdi") 0u64,
                options(nostack, preserves_flags, readonly),
            );
        }
        true
    }
}
