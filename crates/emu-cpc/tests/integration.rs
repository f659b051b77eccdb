//! Whole-machine tests: snapshot files, banked RAM and disk images.
//!
//! These run with a blank system ROM, so the CPU only executes code a test
//! puts in RAM through a snapshot.

use std::fs;
use std::path::PathBuf;

use emu_core::Cpu;
use emu_cpc::{Cpc, CpcConfig, CpcModel, DiskImage};
use format_sna::{SnaCpu, Snapshot};
use nec_upd765::SectorId;

fn make_cpc(model: CpcModel) -> Cpc {
    Cpc::new(&CpcConfig::new(model, vec![0u8; 0x8000])).expect("blank ROM is valid")
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("emu-cpc-{}-{name}", std::process::id()))
}

/// A 128K snapshot with `program` at 0x4000, interrupts off, both ROMs
/// enabled and the standard RAM layout.
fn snapshot_with_program(program: &[u8]) -> Snapshot {
    let mut ram = vec![0u8; 128 * 1024];
    ram[0x4000..0x4000 + program.len()].copy_from_slice(program);
    Snapshot {
        version: 3,
        cpu: SnaCpu {
            pc: 0x4000,
            sp: 0xBFF0,
            im: 1,
            ..SnaCpu::default()
        },
        ga_pen: 0,
        ga_inks: [0x14; 17],
        ga_rom_config: 0x81,
        ga_ram_config: 0xC0,
        crtc_selected: 0,
        crtc_registers: [63, 40, 46, 0x8E, 38, 0, 25, 30, 0, 7, 0, 0, 0x30, 0, 0, 0, 0, 0],
        rom_select: 0,
        ppi: [0, 0, 0, 0x82],
        psg_selected: 0,
        psg_registers: [0; 16],
        cpc_type: 2,
        fdd_motor: false,
        crtc_type: 0,
        ga_int_counter: 0,
        int_request: false,
        ram,
    }
}

#[test]
fn banked_writes_from_snapshot_program() {
    // LD A,&11 : LD (&0000),A    write under the lower ROM
    // LD A,&22 : LD (&C000),A    write under the upper ROM, block 3
    // LD BC,&7FC1 : OUT (C),C    RAM config 1: block 7 at &C000
    // LD A,&33 : LD (&C000),A
    // HALT
    let program = [
        0x3E, 0x11, 0x32, 0x00, 0x00, //
        0x3E, 0x22, 0x32, 0x00, 0xC0, //
        0x01, 0xC1, 0x7F, 0xED, 0x49, //
        0x3E, 0x33, 0x32, 0x00, 0xC0, //
        0x76,
    ];
    let path = temp_path("banked.sna");
    fs::write(&path, snapshot_with_program(&program).to_bytes()).expect("write snapshot");

    let mut cpc = make_cpc(CpcModel::Cpc6128);
    cpc.load_snapshot(&path).expect("snapshot loads");
    assert_eq!(cpc.cpu().regs.pc, 0x4000);

    cpc.tick();
    let ram = cpc.bus().memory.ram();
    assert_eq!(ram[0x0000], 0x11);
    assert_eq!(ram[0xC000], 0x22);
    assert_eq!(ram[0x1C000], 0x33);
    assert!(cpc.cpu().is_halted());
    // The CPU still sees the ROMs where it wrote
    assert_eq!(cpc.bus().memory.read(0x0000), 0x00);
    assert_eq!(cpc.bus().gate_array.ram_config(), 0x01);

    fs::remove_file(&path).ok();
}

#[test]
fn saved_snapshot_loads_into_fresh_machine() {
    let program = [0x3E, 0x5A, 0x32, 0x00, 0x80, 0x76];
    let mut cpc = make_cpc(CpcModel::Cpc6128);
    emu_cpc::sna::load_sna(&mut cpc, &snapshot_with_program(&program).to_bytes())
        .expect("snapshot loads");
    cpc.tick();

    let path = temp_path("saved.sna");
    cpc.save_snapshot(&path).expect("save");

    let mut other = make_cpc(CpcModel::Cpc6128);
    other.load_snapshot(&path).expect("load");
    assert_eq!(other.bus().memory.ram()[0x8000], 0x5A);
    assert_eq!(other.cpu().regs.sp, cpc.cpu().regs.sp);
    assert_eq!(other.bus().gate_array.mode(), 1);
    assert_eq!(emu_cpc::sna::capture(&other), emu_cpc::sna::capture(&cpc));

    fs::remove_file(&path).ok();
}

#[test]
fn halted_cpu_stays_halted_after_reload() {
    // LD A,0 : HALT : INC A : INC A : INC A
    let program = [0x3E, 0x00, 0x76, 0x3C, 0x3C, 0x3C];
    let mut cpc = make_cpc(CpcModel::Cpc6128);
    emu_cpc::sna::load_sna(&mut cpc, &snapshot_with_program(&program).to_bytes())
        .expect("snapshot loads");
    cpc.tick();
    assert!(cpc.cpu().is_halted());
    assert_eq!(cpc.cpu().regs.pc, 0x4003);

    let path = temp_path("halted.sna");
    cpc.save_snapshot(&path).expect("save");
    let mut other = make_cpc(CpcModel::Cpc6128);
    other.load_snapshot(&path).expect("load");
    assert_eq!(other.cpu().regs.pc, 0x4002);

    cpc.tick();
    other.tick();
    assert!(other.cpu().is_halted());
    assert_eq!(other.cpu().regs.pc, 0x4003);
    assert_eq!(other.cpu().regs.a, 0);
    assert_eq!(cpc.cpu().regs.a, 0);

    fs::remove_file(&path).ok();
}

#[test]
fn unreadable_snapshot_leaves_machine_alone() {
    let mut cpc = make_cpc(CpcModel::Cpc464);
    cpc.tick();
    cpc.cpu_mut().regs.pc = 0x1234;

    let err = cpc
        .load_snapshot(&temp_path("does-not-exist.sna"))
        .expect_err("missing file");
    assert!(err.contains("does-not-exist"), "{err}");
    assert_eq!(cpc.cpu().regs.pc, 0x1234);
    assert_eq!(cpc.frame_count(), 1);
}

#[test]
fn malformed_snapshot_resets_machine() {
    let path = temp_path("junk.sna");
    fs::write(&path, b"this is not a snapshot").expect("write junk");

    let mut cpc = make_cpc(CpcModel::Cpc464);
    cpc.tick();
    cpc.cpu_mut().regs.pc = 0x1234;

    assert!(cpc.load_snapshot(&path).is_err());
    assert_eq!(cpc.cpu().regs.pc, 0);
    assert_eq!(cpc.frame_count(), 0);

    fs::remove_file(&path).ok();
}

fn data_disk() -> DiskImage {
    let mut image = DiskImage::unformatted(40, 1);
    let ids: Vec<SectorId> = (0xC1..=0xC9)
        .map(|r| SectorId { c: 0, h: 0, r, n: 2 })
        .collect();
    image.format_track(0, 0, &ids, 0x4E, 0xE5);
    image
}

#[test]
fn disk_insert_modify_save() {
    let original = temp_path("disk-in.dsk");
    let saved = temp_path("disk-out.dsk");
    fs::write(&original, data_disk().to_bytes()).expect("write image");

    let mut cpc = make_cpc(CpcModel::Cpc6128);
    cpc.insert_disk(0, &original).expect("insert");
    let status = cpc.drive_status(0);
    assert!(status.starts_with("A: 40 cyl, 1 side,"), "{status}");
    assert!(!status.contains("modified"), "{status}");

    let id = SectorId { c: 0, h: 0, r: 0xC1, n: 2 };
    let disk = cpc.bus_mut().fdc.disk_mut(0).expect("disk inserted");
    assert!(disk.write_sector(0, 0, id, &[0xAB; 512]));
    assert!(cpc.drive_status(0).contains("modified"));

    cpc.save_disk(0, &saved).expect("save");
    assert!(!cpc.drive_status(0).contains("modified"));

    let reread = DiskImage::parse(&fs::read(&saved).expect("read back")).expect("parse");
    assert_eq!(reread.read_sector(0, 0, id), Some(&[0xAB; 512][..]));
    let untouched = SectorId { r: 0xC2, ..id };
    assert_eq!(reread.read_sector(0, 0, untouched), Some(&[0xE5; 512][..]));

    fs::remove_file(&original).ok();
    fs::remove_file(&saved).ok();
}

#[test]
fn disk_errors() {
    let mut cpc = make_cpc(CpcModel::Cpc6128);
    assert!(cpc.insert_disk(2, &temp_path("any.dsk")).is_err());
    assert!(cpc.insert_disk(0, &temp_path("missing.dsk")).is_err());
    assert!(cpc.save_disk(1, &temp_path("empty.dsk")).is_err());
    assert_eq!(cpc.drive_status(1), "B: empty, motor off");

    cpc.insert_disk_image(1, data_disk()).expect("insert image");
    let ejected = cpc.remove_disk(1).expect("disk in B");
    assert_eq!(ejected.cylinders(), 40);
    assert!(cpc.remove_disk(1).is_none());
}
