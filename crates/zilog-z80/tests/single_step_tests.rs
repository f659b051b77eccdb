//! Single-instruction vectors in the `SingleStepTests` JSON format.
//!
//! A handful of hand-checked vectors are embedded below and always run. The
//! full Tom Harte suite (1,604 opcode files × 1,000 cases) runs with
//! `--ignored` when `test-data/z80/v1/` is present. Only architectural state
//! is compared; the Q and P latches are outside this core's model.

use std::collections::HashMap;
use std::fs;
use std::panic;
use std::path::Path;

use emu_core::{Bus, Cpu};
use serde::Deserialize;
use zilog_z80::Z80;

/// Flat 64KB RAM bus with preloaded I/O port values.
struct TestBus {
    ram: Vec<u8>,
    io_read_values: HashMap<u16, u8>,
}

impl TestBus {
    fn new() -> Self {
        Self {
            ram: vec![0; 0x10000],
            io_read_values: HashMap::new(),
        }
    }

    fn load_ram(&mut self, entries: &[(u16, u8)]) {
        for &(addr, value) in entries {
            self.ram[addr as usize] = value;
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }
}

impl Bus for TestBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.io_read_values.get(&port).copied().unwrap_or(0xFF)
    }

    fn io_write(&mut self, _port: u16, _value: u8) {}
}

#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    /// One entry per T-state in the upstream suite.
    #[serde(default)]
    cycles: Vec<serde_json::Value>,
    /// Shorthand used by the embedded vectors.
    #[serde(default)]
    t_states: Option<u32>,
    #[serde(default)]
    ports: Vec<(u16, u8, String)>,
}

impl TestCase {
    fn expected_t_states(&self) -> u32 {
        self.t_states.unwrap_or(self.cycles.len() as u32)
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CpuState {
    pc: u16,
    sp: u16,
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: u8,
    h: u8,
    l: u8,
    i: u8,
    r: u8,
    ix: u16,
    iy: u16,
    wz: u16,
    #[serde(rename = "af_")]
    af_alt: u16,
    #[serde(rename = "bc_")]
    bc_alt: u16,
    #[serde(rename = "de_")]
    de_alt: u16,
    #[serde(rename = "hl_")]
    hl_alt: u16,
    iff1: u8,
    iff2: u8,
    im: u8,
    ei: u8,
    ram: Vec<(u16, u8)>,
}

fn setup(cpu: &mut Z80, bus: &mut TestBus, state: &CpuState, ports: &[(u16, u8, String)]) {
    bus.load_ram(&state.ram);

    bus.io_read_values.clear();
    for (port, value, dir) in ports {
        if dir == "r" {
            bus.io_read_values.insert(*port, *value);
        }
    }

    let regs = &mut cpu.regs;
    regs.a = state.a;
    regs.f = state.f;
    regs.b = state.b;
    regs.c = state.c;
    regs.d = state.d;
    regs.e = state.e;
    regs.h = state.h;
    regs.l = state.l;

    [regs.a_alt, regs.f_alt] = state.af_alt.to_be_bytes();
    [regs.b_alt, regs.c_alt] = state.bc_alt.to_be_bytes();
    [regs.d_alt, regs.e_alt] = state.de_alt.to_be_bytes();
    [regs.h_alt, regs.l_alt] = state.hl_alt.to_be_bytes();

    regs.ix = state.ix;
    regs.iy = state.iy;
    regs.sp = state.sp;
    regs.pc = state.pc;
    regs.i = state.i;
    regs.r = state.r;
    regs.wz = state.wz;

    regs.iff1 = state.iff1 != 0;
    regs.iff2 = state.iff2 != 0;
    regs.im = state.im;

    cpu.set_ei_delay(state.ei != 0);
}

/// Compare the CPU/bus state against expected, returning a list of mismatches.
fn compare(cpu: &Z80, bus: &TestBus, expected: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();
    let regs = &cpu.regs;

    check_u8(&mut errors, "A", regs.a, expected.a);
    check_u8(&mut errors, "F", regs.f, expected.f);
    check_u8(&mut errors, "B", regs.b, expected.b);
    check_u8(&mut errors, "C", regs.c, expected.c);
    check_u8(&mut errors, "D", regs.d, expected.d);
    check_u8(&mut errors, "E", regs.e, expected.e);
    check_u8(&mut errors, "H", regs.h, expected.h);
    check_u8(&mut errors, "L", regs.l, expected.l);

    let pair = |hi: u8, lo: u8| u16::from_be_bytes([hi, lo]);
    check_u16(&mut errors, "AF'", pair(regs.a_alt, regs.f_alt), expected.af_alt);
    check_u16(&mut errors, "BC'", pair(regs.b_alt, regs.c_alt), expected.bc_alt);
    check_u16(&mut errors, "DE'", pair(regs.d_alt, regs.e_alt), expected.de_alt);
    check_u16(&mut errors, "HL'", pair(regs.h_alt, regs.l_alt), expected.hl_alt);

    check_u16(&mut errors, "IX", regs.ix, expected.ix);
    check_u16(&mut errors, "IY", regs.iy, expected.iy);
    check_u16(&mut errors, "SP", regs.sp, expected.sp);
    check_u16(&mut errors, "PC", regs.pc, expected.pc);
    check_u8(&mut errors, "I", regs.i, expected.i);
    check_u8(&mut errors, "R", regs.r, expected.r);
    check_u16(&mut errors, "WZ", regs.wz, expected.wz);

    check_u8(&mut errors, "IFF1", u8::from(regs.iff1), expected.iff1);
    check_u8(&mut errors, "IFF2", u8::from(regs.iff2), expected.iff2);
    check_u8(&mut errors, "IM", regs.im, expected.im);
    check_u8(&mut errors, "EI", u8::from(cpu.ei_delay()), expected.ei);

    for &(addr, expected_val) in &expected.ram {
        let actual_val = bus.peek(addr);
        if actual_val != expected_val {
            errors.push(format!(
                "RAM[${addr:04X}]: got ${actual_val:02X}, want ${expected_val:02X}"
            ));
        }
    }

    errors
}

fn check_u8(errors: &mut Vec<String>, name: &str, actual: u8, expected: u8) {
    if actual != expected {
        errors.push(format!("{name}: got ${actual:02X}, want ${expected:02X}"));
    }
}

fn check_u16(errors: &mut Vec<String>, name: &str, actual: u16, expected: u16) {
    if actual != expected {
        errors.push(format!("{name}: got ${actual:04X}, want ${expected:04X}"));
    }
}

/// Run one case: a single `step()` must reproduce the final state and the
/// T-state count.
fn run_case(test: &TestCase) -> Vec<String> {
    let mut cpu = Z80::new();
    let mut bus = TestBus::new();
    setup(&mut cpu, &mut bus, &test.initial, &test.ports);

    let t = cpu.step(&mut bus);
    let mut errors = compare(&cpu, &bus, &test.final_state);
    let expected = test.expected_t_states();
    if t != expected {
        errors.push(format!("T-states: got {t}, want {expected}"));
    }
    errors
}

const EMBEDDED: &str = r#"[
  {
    "name": "00 NOP wraps R within bit 7",
    "initial": { "pc": 256, "r": 127, "ram": [[256, 0]] },
    "final": { "pc": 257, "r": 0 },
    "t_states": 4
  },
  {
    "name": "ed 44 NEG of 1",
    "initial": { "pc": 0, "a": 1, "ram": [[0, 237], [1, 68]] },
    "final": { "pc": 2, "a": 255, "f": 187, "r": 2 },
    "t_states": 8
  },
  {
    "name": "dd 7e LD A,(IX+5)",
    "initial": { "pc": 0, "ix": 8192, "ram": [[0, 221], [1, 126], [2, 5], [8197, 153]] },
    "final": { "pc": 3, "a": 153, "ix": 8192, "wz": 8197, "r": 2, "ram": [[8197, 153]] },
    "t_states": 19
  },
  {
    "name": "cb 06 RLC (HL)",
    "initial": { "pc": 0, "h": 48, "l": 0, "ram": [[0, 203], [1, 6], [12288, 128]] },
    "final": { "pc": 2, "h": 48, "f": 1, "r": 2, "ram": [[12288, 1]] },
    "t_states": 15
  },
  {
    "name": "ed b0 LDIR last iteration",
    "initial": {
      "pc": 0, "b": 0, "c": 1, "h": 16, "l": 0, "d": 32, "e": 0,
      "ram": [[0, 237], [1, 176], [4096, 90]]
    },
    "final": {
      "pc": 2, "b": 0, "c": 0, "h": 16, "l": 1, "d": 32, "e": 1, "f": 40, "r": 2,
      "ram": [[8192, 90]]
    },
    "t_states": 16
  },
  {
    "name": "fb EI opens the shadow",
    "initial": { "pc": 0, "ram": [[0, 251]] },
    "final": { "pc": 1, "r": 1, "iff1": 1, "iff2": 1, "ei": 1 },
    "t_states": 4
  },
  {
    "name": "db fe IN A,(n) puts A on the high byte",
    "initial": { "pc": 0, "a": 245, "ram": [[0, 219], [1, 254]] },
    "final": { "pc": 2, "a": 30, "wz": 62975, "r": 1 },
    "ports": [[62974, 30, "r"]],
    "t_states": 11
  }
]"#;

#[test]
fn embedded_vectors() {
    let tests: Vec<TestCase> = serde_json::from_str(EMBEDDED).expect("embedded vectors parse");
    let failures: Vec<String> = tests
        .iter()
        .filter_map(|test| {
            let errors = run_case(test);
            (!errors.is_empty()).then(|| format!("{}: {}", test.name, errors.join(", ")))
        })
        .collect();
    assert!(failures.is_empty(), "{failures:#?}");
}

/// Run all Z80 SingleStepTests.
#[test]
#[ignore = "requires test-data/z80, run with --ignored"]
fn run_all() {
    let test_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-data/z80/v1");

    if !test_dir.exists() {
        eprintln!("Test data not found at {}", test_dir.display());
        return;
    }

    let mut filenames: Vec<String> = Vec::new();
    for opcode in 0..=0xFFu8 {
        if !matches!(opcode, 0xCB | 0xDD | 0xED | 0xFD) {
            filenames.push(format!("{opcode:02x}.json"));
        }
    }
    for prefix in ["cb", "dd", "ed", "fd", "dd cb __", "fd cb __"] {
        for opcode in 0..=0xFFu8 {
            filenames.push(format!("{prefix} {opcode:02x}.json"));
        }
    }

    let mut total_pass = 0u64;
    let mut total_fail = 0u64;

    for filename in &filenames {
        let path = test_dir.join(filename);
        if !path.exists() {
            continue;
        }

        let data = fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!("Failed to read {}: {e}", path.display());
        });
        let tests: Vec<TestCase> = serde_json::from_str(&data).unwrap_or_else(|e| {
            panic!("Failed to parse {}: {e}", path.display());
        });

        let mut file_fail = 0u32;
        let mut first_failures: Vec<String> = Vec::new();

        for test in &tests {
            let result = panic::catch_unwind(panic::AssertUnwindSafe(|| run_case(test)));
            let message = match result {
                Ok(errors) if errors.is_empty() => None,
                Ok(errors) => Some(format!("  FAIL [{}]: {}", test.name, errors.join(", "))),
                Err(_) => Some(format!("  PANIC [{}]", test.name)),
            };
            if let Some(message) = message {
                file_fail += 1;
                if first_failures.len() < 5 {
                    first_failures.push(message);
                }
            }
        }

        let file_pass = tests.len() as u32 - file_fail;
        let status = if file_fail == 0 { "PASS" } else { "FAIL" };
        println!("{filename}: {status} {file_pass}/{}", tests.len());
        for msg in &first_failures {
            println!("{msg}");
        }

        total_pass += u64::from(file_pass);
        total_fail += u64::from(file_fail);
    }

    println!("=== Z80 SingleStepTests: {total_pass} passed, {total_fail} failed ===");
    assert_eq!(total_fail, 0, "{total_fail} tests failed");
}
