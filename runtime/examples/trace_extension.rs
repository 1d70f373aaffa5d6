//! A minimal tracing extension: alias the real handler, then override the
//! host's dispatch slot with a wrapper that logs and forwards through the
//! alias.
//!
//! Run with `RUST_LOG=debug cargo run --example trace_extension` to see the
//! stage-by-stage bring-up and teardown.

use graft_runtime::{
    AliasSlot, Descriptor, DispatchSlot, Orchestrator, Registry, SlotPatcher, StaticSymbolTable,
};

/// Populated during the SYMBOL_ALIAS stage with the address of
/// `handle_command`, so the override can call the original.
static ORIG_HANDLE_COMMAND: AliasSlot = AliasSlot::new();

/// The host's real handler, normally reached through a dispatch slot.
extern "C" fn handle_command(opcode: u32) -> u32 {
    opcode.wrapping_mul(2)
}

/// The override: log the call, then forward to the original via the alias.
extern "C" fn traced_handle_command(opcode: u32) -> u32 {
    let addr = ORIG_HANDLE_COMMAND
        .get()
        .expect("alias resolves before any override is installed");
    let original: extern "C" fn(u32) -> u32 = unsafe { core::mem::transmute(addr) };
    let result = original(opcode);
    log::info!("handle_command(opcode={opcode:#x}) -> {result:#x}");
    result
}

fn call_host(slot: &DispatchSlot, opcode: u32) -> u32 {
    let entry: extern "C" fn(u32) -> u32 = unsafe { core::mem::transmute(slot.destination()) };
    entry(opcode)
}

fn main() -> graft_runtime::Result<()> {
    env_logger::init();

    // Stands in for the host program's indirect call site.
    let slot: &'static DispatchSlot =
        Box::leak(Box::new(DispatchSlot::new(handle_command as usize)));

    let symbols = StaticSymbolTable::new().with("handle_command", handle_command as usize);

    let mut registry = Registry::new();
    registry.register(Descriptor::symbol_alias(
        "handle_command",
        &ORIG_HANDLE_COMMAND,
    ));
    registry.register(Descriptor::function_override(
        "handle_command_entry",
        Some(slot.target()),
        traced_handle_command as usize,
    ));
    registry.register(Descriptor::final_init(
        "banner",
        || {
            log::info!("trace extension armed");
            Ok(())
        },
        || log::info!("trace extension disarmed"),
    ));

    let mut orchestrator =
        Orchestrator::new(registry, Box::new(symbols), Box::new(SlotPatcher::new()));
    orchestrator.start()?;

    for opcode in [0x01, 0x02, 0x80] {
        let result = call_host(slot, opcode);
        println!("host saw handle_command({opcode:#x}) = {result:#x}");
    }

    orchestrator.stop();
    assert_eq!(call_host(slot, 0x01), 0x02, "original handler restored");
    Ok(())
}
