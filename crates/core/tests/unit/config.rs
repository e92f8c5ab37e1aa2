//! Configuration parsing tests.

use pretty_assertions::assert_eq;

use rv32emu_core::config::{Config, Xlen};

#[test]
fn json_config_overrides_defaults() {
    let config = Config::from_json(
        r#"{
            "xlen": "32",
            "pc": 2147483648,
            "ram_size": 1048576,
            "cycles": 100,
            "host_io_addr": 2147488768,
            "dump": { "skip_cycles": 5, "csr": true }
        }"#,
    )
    .unwrap();

    assert_eq!(config.xlen, Xlen::Rv32);
    assert_eq!(config.pc, 0x8000_0000);
    assert_eq!(config.ram_size, 1024 * 1024);
    assert_eq!(config.cycles, 100);
    assert_eq!(config.host_io_addr, Some(0x8000_1400));
    assert_eq!(config.dump.skip_cycles, 5);
    assert!(config.dump.csr);
    assert!(!config.dump.memory);
    assert!(config.dump.path.is_none());
}

#[test]
fn empty_json_yields_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.pc, 0x8000_0000);
    assert_eq!(config.ram_size, 64 * 1024 * 1024);
    assert_eq!(config.xlen, Xlen::Rv32);
    assert!(config.load.is_empty());
}

#[test]
fn xlen_64_parses_for_the_codec_surface() {
    let config = Config::from_json(r#"{ "xlen": "64" }"#).unwrap();
    assert_eq!(config.xlen, Xlen::Rv64);
    assert_eq!(config.xlen.bits(), 64);
}
