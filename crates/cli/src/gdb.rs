//! Minimal GDB remote stub.
//!
//! Serves one debugger connection over TCP using the remote serial
//! protocol (`$payload#checksum` framing with `+`/`-` acks). The stub is
//! a plain consumer of the core's step/read/write interface; supported
//! packets:
//!
//! * `g` — read registers (32 GPRs then the PC, little-endian hex)
//! * `m<addr>,<len>` — read memory (unmapped bytes render as `cd`)
//! * `Z0`/`z0` — software breakpoints by patching `ebreak`/`c.ebreak`
//! * `s` / `c` — single-step / continue, both reporting `S05`
//! * `?`, `H*`, `qSupported`, `qfThreadInfo`, `qsThreadInfo`, `qC`,
//!   `qAttached`, `vCont?`

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use tracing::{debug, info};

use rv32emu_core::common::addr::PhysAddr;
use rv32emu_core::common::data::MemoryAccessSize;
use rv32emu_core::sim::Emulator;

/// 32-bit `ebreak` encoding.
const EBREAK: u32 = 0x0010_0073;
/// 16-bit `c.ebreak` encoding.
const C_EBREAK: u16 = 0x9002;

/// A patched-in software breakpoint and the bytes it replaced.
#[derive(Clone, Copy, Debug)]
struct Breakpoint {
    original: u32,
    kind: usize,
}

/// Serves GDB remote sessions on the given port until the debugger
/// disconnects.
pub fn serve(emulator: &mut Emulator, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port))?;
    info!(port, "gdb stub listening");

    let (stream, peer) = listener.accept()?;
    info!(%peer, "debugger attached");
    session(emulator, stream)
}

fn session(emulator: &mut Emulator, mut stream: TcpStream) -> std::io::Result<()> {
    let mut breakpoints: HashMap<u32, Breakpoint> = HashMap::new();
    let mut rx = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        rx.extend_from_slice(&buf[..n]);

        while let Some(packet) = extract_packet(&mut rx) {
            debug!(packet = %packet, "gdb packet");
            stream.write_all(b"+")?;
            let response = handle_packet(emulator, &mut breakpoints, &packet);
            send_packet(&mut stream, &response)?;
            if packet == "D" || packet == "k" {
                return Ok(());
            }
        }
    }
}

/// Pulls one `$payload#checksum` packet out of the receive buffer,
/// discarding acks and junk before it.
fn extract_packet(rx: &mut Vec<u8>) -> Option<String> {
    let start = rx.iter().position(|&b| b == b'$')?;
    let end = rx[start..].iter().position(|&b| b == b'#')? + start;
    if rx.len() < end + 3 {
        return None;
    }
    let payload = String::from_utf8_lossy(&rx[start + 1..end]).into_owned();
    rx.drain(..end + 3);
    Some(payload)
}

fn send_packet(stream: &mut TcpStream, payload: &str) -> std::io::Result<()> {
    let checksum = payload.bytes().fold(0u8, u8::wrapping_add);
    stream.write_all(format!("${payload}#{checksum:02x}").as_bytes())
}

fn handle_packet(
    emulator: &mut Emulator,
    breakpoints: &mut HashMap<u32, Breakpoint>,
    packet: &str,
) -> String {
    match packet {
        "?" => "S05".to_string(),
        "g" => read_registers(emulator),
        "s" => {
            let _ = emulator.step();
            "S05".to_string()
        }
        "c" => {
            run_to_breakpoint(emulator, breakpoints);
            "S05".to_string()
        }
        "qSupported" => "PacketSize=1000".to_string(),
        "qfThreadInfo" => "m0".to_string(),
        "qsThreadInfo" => "l".to_string(),
        "qC" => "QC0".to_string(),
        "qAttached" => "1".to_string(),
        "vCont?" => "vCont;c;s".to_string(),
        _ if packet.starts_with('H') => "OK".to_string(),
        _ if packet.starts_with('m') => read_memory(emulator, &packet[1..]),
        _ if packet.starts_with("Z0,") => insert_breakpoint(emulator, breakpoints, &packet[3..]),
        _ if packet.starts_with("z0,") => remove_breakpoint(emulator, breakpoints, &packet[3..]),
        _ => String::new(),
    }
}

fn read_registers(emulator: &mut Emulator) -> String {
    let processor = emulator.system().processor();
    let mut response = String::with_capacity(33 * 8);
    for reg in processor.int_regs() {
        for byte in reg.to_le_bytes() {
            response.push_str(&format!("{byte:02x}"));
        }
    }
    for byte in processor.pc().to_le_bytes() {
        response.push_str(&format!("{byte:02x}"));
    }
    response
}

fn read_memory(emulator: &mut Emulator, args: &str) -> String {
    let Some((addr, len)) = parse_addr_len(args) else {
        return "E01".to_string();
    };

    let bus = emulator.system_mut().bus_mut();
    let mut response = String::with_capacity(len as usize * 2);
    for i in 0..len {
        let paddr = PhysAddr::new(u64::from(addr) + u64::from(i));
        if bus.is_valid_range(paddr, 1) {
            match bus.read(paddr, MemoryAccessSize::Byte) {
                Ok(byte) => response.push_str(&format!("{:02x}", byte as u8)),
                Err(_) => response.push_str("cd"),
            }
        } else {
            // The debugger renders unmapped memory as 0xcd filler.
            response.push_str("cd");
        }
    }
    response
}

fn insert_breakpoint(
    emulator: &mut Emulator,
    breakpoints: &mut HashMap<u32, Breakpoint>,
    args: &str,
) -> String {
    let Some((addr, kind)) = parse_addr_len(args) else {
        return "E01".to_string();
    };
    let kind = kind as usize;
    let bus = emulator.system_mut().bus_mut();
    let paddr = PhysAddr::new(u64::from(addr));

    let Ok(original) = bus.read_u32(paddr) else {
        return "E02".to_string();
    };
    let patched = if kind == 2 {
        bus.write(paddr, MemoryAccessSize::HalfWord, u64::from(C_EBREAK))
    } else {
        bus.write_u32(paddr, EBREAK)
    };
    if patched.is_err() {
        return "E02".to_string();
    }
    breakpoints.insert(addr, Breakpoint { original, kind });
    "OK".to_string()
}

fn remove_breakpoint(
    emulator: &mut Emulator,
    breakpoints: &mut HashMap<u32, Breakpoint>,
    args: &str,
) -> String {
    let Some((addr, _)) = parse_addr_len(args) else {
        return "E01".to_string();
    };
    let Some(breakpoint) = breakpoints.remove(&addr) else {
        return "OK".to_string();
    };
    let bus = emulator.system_mut().bus_mut();
    let paddr = PhysAddr::new(u64::from(addr));
    let restored = if breakpoint.kind == 2 {
        bus.write(
            paddr,
            MemoryAccessSize::HalfWord,
            u64::from(breakpoint.original as u16),
        )
    } else {
        bus.write_u32(paddr, breakpoint.original)
    };
    if restored.is_err() {
        return "E02".to_string();
    }
    "OK".to_string()
}

/// Steps until the PC lands on a breakpoint or the machine faults.
fn run_to_breakpoint(emulator: &mut Emulator, breakpoints: &HashMap<u32, Breakpoint>) {
    loop {
        if emulator.step().is_err() {
            return;
        }
        let pc = emulator.system().processor().pc();
        if breakpoints.contains_key(&pc) {
            return;
        }
        if emulator.system().host_io_value() != 0 {
            return;
        }
    }
}

/// Parses `<addr-hex>,<len-hex>`.
fn parse_addr_len(args: &str) -> Option<(u32, u32)> {
    let (addr, len) = args.split_once(',')?;
    let addr = u32::from_str_radix(addr, 16).ok()?;
    let len = u32::from_str_radix(len, 16).ok()?;
    Some((addr, len))
}
