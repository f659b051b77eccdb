use std::collections::HashMap;

use emu_core::{Bus, Cpu, IntRequest, InterruptSource, Observable, Value};

use super::Z80;
use crate::flags::{CF, HF, NF, PF, SF, ZF};

struct TestBus {
    ram: Vec<u8>,
    ports: HashMap<u16, u8>,
    writes: Vec<(u16, u8)>,
    request: IntRequest,
    polls: u32,
}

impl TestBus {
    fn with_program(program: &[u8]) -> Self {
        let mut ram = vec![0; 0x10000];
        ram[..program.len()].copy_from_slice(program);
        Self {
            ram,
            ports: HashMap::new(),
            writes: Vec::new(),
            request: IntRequest::None,
            polls: 0,
        }
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
        self.ports.get(&port).copied().unwrap_or(0xFF)
    }

    fn io_write(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
    }
}

impl InterruptSource for TestBus {
    fn poll_interrupt(&mut self) -> IntRequest {
        self.polls += 1;
        self.request
    }
}

fn setup(program: &[u8]) -> (Z80, TestBus) {
    let mut cpu = Z80::new();
    cpu.regs.sp = 0xFFF0;
    (cpu, TestBus::with_program(program))
}

#[test]
fn load_and_add() {
    // LD A,0x3C; ADD A,0x0F
    let (mut cpu, mut bus) = setup(&[0x3E, 0x3C, 0xC6, 0x0F]);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.regs.a, 0x4B);
    assert_eq!(cpu.regs.f & HF, HF);
    assert_eq!(cpu.regs.pc, 4);
    assert_eq!(cpu.total_t_states(), 14);
}

#[test]
fn refresh_counts_every_m1_and_keeps_bit_7() {
    let (mut cpu, mut bus) = setup(&[0x00, 0x00, 0x00]);
    cpu.regs.r = 0xFF;
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.r, 0x82);
    assert_eq!(cpu.m1_cycles(), 3);
}

#[test]
fn refresh_counts_prefixes() {
    // LD IX,0x1234
    let (mut cpu, mut bus) = setup(&[0xDD, 0x21, 0x34, 0x12]);
    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.regs.ix, 0x1234);
    assert_eq!(cpu.regs.r, 2);

    // RLC (IX+5),B: only DD and CB are opcode fetches
    let (mut cpu, mut bus) = setup(&[0xDD, 0xCB, 0x05, 0x00]);
    cpu.regs.ix = 0x3000;
    bus.ram[0x3005] = 0x81;
    assert_eq!(cpu.step(&mut bus), 23);
    assert_eq!(bus.ram[0x3005], 0x03);
    assert_eq!(cpu.regs.b, 0x03);
    assert_eq!(cpu.regs.f & CF, CF);
    assert_eq!(cpu.regs.r, 2);
    assert_eq!(cpu.regs.wz, 0x3005);
}

#[test]
fn bit_on_indexed_operand() {
    // BIT 7,(IY-1)
    let (mut cpu, mut bus) = setup(&[0xFD, 0xCB, 0xFF, 0x7E]);
    cpu.regs.iy = 0x2001;
    bus.ram[0x2000] = 0x80;
    assert_eq!(cpu.step(&mut bus), 20);
    assert_eq!(cpu.regs.f & (SF | ZF | HF), SF | HF);
    assert_eq!(bus.ram[0x2000], 0x80);
}

#[test]
fn repeated_index_prefix_is_reparsed() {
    // DD DD 21 nn: the first DD costs 4 and is dropped
    let (mut cpu, mut bus) = setup(&[0xDD, 0xDD, 0x21, 0x78, 0x56]);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 1);
    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.regs.ix, 0x5678);
    assert_eq!(cpu.regs.pc, 5);

    // FD ED 47: the FD is dropped and LD I,A runs
    let (mut cpu, mut bus) = setup(&[0xFD, 0xED, 0x47]);
    cpu.regs.a = 0x3F;
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.step(&mut bus), 9);
    assert_eq!(cpu.regs.i, 0x3F);
}

#[test]
fn undefined_ed_is_an_eight_cycle_nop() {
    let (mut cpu, mut bus) = setup(&[0xED, 0x00]);
    let before = cpu.regs;
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.pc, 2);
    assert_eq!(cpu.regs.a, before.a);
    assert_eq!(cpu.regs.f, before.f);
}

#[test]
fn conditional_timing() {
    // DJNZ -2 with B=2: taken then not taken
    let (mut cpu, mut bus) = setup(&[0x10, 0xFE]);
    cpu.regs.b = 2;
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.pc, 2);

    // CALL Z,0x0010 taken; RET Z taken
    let mut program = vec![0xCC, 0x10, 0x00];
    program.resize(0x10, 0);
    program.push(0xC8);
    let (mut cpu, mut bus) = setup(&program);
    cpu.regs.f = ZF;
    assert_eq!(cpu.step(&mut bus), 17);
    assert_eq!(cpu.regs.pc, 0x0010);
    assert_eq!(cpu.regs.sp, 0xFFEE);
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x0003);

    // JR NZ not taken
    let (mut cpu, mut bus) = setup(&[0x20, 0x10]);
    cpu.regs.f = ZF;
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.regs.pc, 2);
}

#[test]
fn ldir_copies_and_repeats() {
    let (mut cpu, mut bus) = setup(&[0xED, 0xB0]);
    bus.ram[0x1000..0x1003].copy_from_slice(&[1, 2, 3]);
    cpu.regs.set_hl(0x1000);
    cpu.regs.set_de(0x2000);
    cpu.regs.set_bc(3);

    assert_eq!(cpu.step(&mut bus), 21);
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(cpu.regs.f & PF, PF);
    assert_eq!(cpu.step(&mut bus), 21);
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.pc, 2);
    assert_eq!(&bus.ram[0x2000..0x2003], &[1, 2, 3]);
    assert_eq!(cpu.regs.bc(), 0);
    assert_eq!(cpu.regs.hl(), 0x1003);
    assert_eq!(cpu.regs.de(), 0x2003);
    assert_eq!(cpu.regs.f & (PF | HF | NF), 0);
}

#[test]
fn cpir_stops_on_match() {
    let (mut cpu, mut bus) = setup(&[0xED, 0xB1]);
    bus.ram[0x1000..0x1003].copy_from_slice(&[0x10, 0x42, 0x99]);
    cpu.regs.a = 0x42;
    cpu.regs.set_hl(0x1000);
    cpu.regs.set_bc(3);

    assert_eq!(cpu.step(&mut bus), 21);
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.pc, 2);
    assert_eq!(cpu.regs.hl(), 0x1002);
    assert_eq!(cpu.regs.bc(), 1);
    assert_eq!(cpu.regs.f & (ZF | PF | NF), ZF | PF | NF);
}

#[test]
fn port_io() {
    // IN A,(C); OUT (C),0 (ED 71)
    let (mut cpu, mut bus) = setup(&[0xED, 0x78, 0xED, 0x71]);
    cpu.regs.set_bc(0xF5FF);
    cpu.regs.f = CF;
    bus.ports.insert(0xF5FF, 0x00);
    assert_eq!(cpu.step(&mut bus), 12);
    assert_eq!(cpu.regs.a, 0x00);
    assert_eq!(cpu.regs.f, CF | ZF | PF);
    assert_eq!(cpu.regs.wz, 0xF600);

    assert_eq!(cpu.step(&mut bus), 12);
    assert_eq!(bus.writes, vec![(0xF5FF, 0x00)]);
}

#[test]
fn otir_sends_block_to_port() {
    let (mut cpu, mut bus) = setup(&[0xED, 0xB3]);
    bus.ram[0x4000..0x4002].copy_from_slice(&[0xAA, 0x55]);
    cpu.regs.set_bc(0x02BC);
    cpu.regs.set_hl(0x4000);

    assert_eq!(cpu.step(&mut bus), 21);
    assert_eq!(cpu.step(&mut bus), 16);
    // B is decremented before the port is driven
    assert_eq!(bus.writes, vec![(0x01BC, 0xAA), (0x00BC, 0x55)]);
    assert_eq!(cpu.regs.b, 0);
    assert_eq!(cpu.regs.f & ZF, ZF);
}

#[test]
fn ld_a_i_reports_iff2() {
    let (mut cpu, mut bus) = setup(&[0xED, 0x57, 0xED, 0x57]);
    cpu.regs.i = 0x80;
    cpu.regs.iff2 = true;
    assert_eq!(cpu.step(&mut bus), 9);
    assert_eq!(cpu.regs.a, 0x80);
    assert_eq!(cpu.regs.f & (SF | PF), SF | PF);

    cpu.regs.iff2 = false;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.f & PF, 0);
}

#[test]
fn rld_and_rrd() {
    let (mut cpu, mut bus) = setup(&[0xED, 0x6F, 0xED, 0x67]);
    cpu.regs.a = 0x12;
    cpu.regs.set_hl(0x5000);
    bus.ram[0x5000] = 0x34;

    assert_eq!(cpu.step(&mut bus), 18);
    assert_eq!(cpu.regs.a, 0x13);
    assert_eq!(bus.ram[0x5000], 0x42);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.a, 0x12);
    assert_eq!(bus.ram[0x5000], 0x34);
}

#[test]
fn daa_after_bcd_add() {
    // LD A,0x15; ADD A,0x27; DAA
    let (mut cpu, mut bus) = setup(&[0x3E, 0x15, 0xC6, 0x27, 0x27]);
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.regs.f & CF, 0);
}

#[test]
fn im1_interrupt() {
    let (mut cpu, mut bus) = setup(&[0x00, 0x00]);
    cpu.regs.im = 1;
    cpu.regs.iff1 = true;
    cpu.regs.iff2 = true;
    cpu.step(&mut bus);

    assert!(cpu.interrupt());
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(cpu.regs.sp, 0xFFEE);
    assert_eq!(bus.ram[0xFFEE], 0x01);
    assert_eq!(bus.ram[0xFFEF], 0x00);
    assert!(!cpu.regs.iff1);
    assert!(!cpu.regs.iff2);
    assert!(!cpu.int_pending());
}

#[test]
fn im0_with_floating_bus_is_rst_38() {
    let (mut cpu, mut bus) = setup(&[0x00]);
    cpu.regs.iff1 = true;
    cpu.interrupt();
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn im2_interrupt_reads_vector() {
    let (mut cpu, mut bus) = setup(&[0x00]);
    cpu.regs.im = 2;
    cpu.regs.i = 0x80;
    cpu.regs.iff1 = true;
    bus.ram[0x80FF] = 0x00;
    bus.ram[0x8100] = 0x90;

    cpu.interrupt();
    assert_eq!(cpu.step(&mut bus), 19);
    assert_eq!(cpu.regs.pc, 0x9000);
}

#[test]
fn interrupt_stays_latched_while_disabled() {
    // NOP; EI; NOP
    let (mut cpu, mut bus) = setup(&[0x00, 0xFB, 0x00, 0x00]);
    cpu.regs.im = 1;
    assert!(!cpu.interrupt());
    assert_eq!(cpu.step(&mut bus), 4);
    assert!(cpu.int_pending());

    // EI, then one more instruction runs before acceptance
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 3);
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(bus.ram[0xFFEE], 0x03);
}

#[test]
fn clear_interrupt_drops_request() {
    let (mut cpu, mut bus) = setup(&[0x00, 0x00]);
    cpu.interrupt();
    cpu.clear_interrupt();
    cpu.regs.iff1 = true;
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 1);
}

#[test]
fn halt_idles_until_interrupt() {
    let (mut cpu, mut bus) = setup(&[0x76]);
    cpu.regs.im = 1;
    cpu.regs.iff1 = true;

    assert_eq!(cpu.step(&mut bus), 4);
    assert!(cpu.is_halted());
    assert_eq!(cpu.regs.pc, 1);

    let r = cpu.regs.r;
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 1);
    assert_eq!(cpu.regs.r, r + 1);

    cpu.interrupt();
    assert_eq!(cpu.step(&mut bus), 13);
    assert!(!cpu.is_halted());
    assert_eq!(bus.ram[0xFFEE], 0x01);
}

#[test]
fn no_interrupt_inside_prefix_chain() {
    // DD DD NOP: the first DD is dropped, the second applies to NOP
    let (mut cpu, mut bus) = setup(&[0xDD, 0xDD, 0x00, 0x00]);
    cpu.regs.im = 1;
    cpu.regs.iff1 = true;

    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.regs.pc, 1);

    cpu.interrupt();
    cpu.nmi();
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.regs.pc, 3);
    assert!(cpu.int_pending());

    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x0066);
}

#[test]
fn nmi_saves_iff1() {
    let (mut cpu, mut bus) = setup(&[0x00]);
    cpu.regs.iff1 = true;
    cpu.nmi();
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.regs.pc, 0x0066);
    assert!(!cpu.regs.iff1);
    assert!(cpu.regs.iff2);
}

#[test]
fn retn_restores_iff1() {
    let (mut cpu, mut bus) = setup(&[0xED, 0x45]);
    cpu.regs.iff1 = false;
    cpu.regs.iff2 = true;
    cpu.regs.sp = 0x8000;
    bus.ram[0x8000] = 0x34;
    bus.ram[0x8001] = 0x12;
    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.regs.pc, 0x1234);
    assert!(cpu.regs.iff1);
}

#[test]
fn execute_polls_once_per_period() {
    let (mut cpu, mut bus) = setup(&[]);
    cpu.set_iperiod(10);

    // Three NOPs overshoot the 10 T-state period by 2
    assert_eq!(cpu.execute(&mut bus), 12);
    assert_eq!(bus.polls, 1);
    assert_eq!(cpu.icount(), 8);

    // The overshoot shortens the next period
    assert_eq!(cpu.execute(&mut bus), 8);
    assert_eq!(bus.polls, 2);
    assert_eq!(cpu.icount(), 10);
}

#[test]
fn execute_delivers_polled_interrupt() {
    let (mut cpu, mut bus) = setup(&[]);
    cpu.set_iperiod(4);
    cpu.regs.im = 1;
    cpu.regs.iff1 = true;
    bus.request = IntRequest::Int;

    cpu.execute(&mut bus);
    assert!(cpu.int_pending());
    bus.request = IntRequest::None;
    assert_eq!(cpu.execute(&mut bus), 13);
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn iperiod_is_clamped() {
    let mut cpu = Z80::new();
    cpu.set_iperiod(0);
    assert_eq!(cpu.iperiod(), 1);
}

#[test]
fn reset_state() {
    let (mut cpu, mut bus) = setup(&[0x00]);
    cpu.step(&mut bus);
    cpu.reset();
    assert_eq!(cpu.regs.af(), 0xFFFF);
    assert_eq!(cpu.regs.sp, 0xFFFF);
    assert_eq!(cpu.regs.pc, 0);
    assert_eq!(cpu.total_t_states(), 0);
}

#[test]
fn observable_paths() {
    let (mut cpu, mut bus) = setup(&[0x01, 0x34, 0x12]);
    cpu.step(&mut bus);
    assert_eq!(cpu.query("bc"), Some(Value::U16(0x1234)));
    assert_eq!(cpu.query("pc"), Some(Value::U16(3)));
    assert_eq!(cpu.query("t_states"), Some(Value::U64(10)));
    assert_eq!(cpu.query("flags.z"), Some(Value::Bool(false)));
    assert_eq!(cpu.query("nope"), None);
    for path in cpu.query_paths() {
        assert!(cpu.query(path).is_some(), "{path}");
    }
}
