//! SNA snapshot loading and saving.
//!
//! `format-sna` turns bytes into a [`Snapshot`]; this module moves that
//! state into and out of a running [`Cpc`]. The whole file is validated
//! before anything is touched, so a rejected snapshot never leaves the
//! machine half-loaded.

use emu_core::Cpu;
use format_sna::{SnaCpu, Snapshot};
use log::{debug, info};
use motorola_6845::CRTC_TYPE;

use crate::Cpc;
use crate::config::CpcModel;

/// Load a SNA snapshot into the given CPC.
///
/// The RAM dump may be smaller than the installed RAM; the rest is
/// cleared.
///
/// # Errors
///
/// Returns an error if the data isn't a snapshot or its RAM dump is larger
/// than the installed RAM.
pub fn load_sna(cpc: &mut Cpc, data: &[u8]) -> Result<(), String> {
    let snapshot = Snapshot::parse(data).map_err(|e| e.to_string())?;

    let installed = cpc.bus().memory.ram_kb();
    if snapshot.ram_kb() > installed {
        return Err(format!(
            "snapshot holds {} KB of RAM but only {installed} KB is installed",
            snapshot.ram_kb()
        ));
    }
    if snapshot.crtc_type != CRTC_TYPE {
        debug!("snapshot CRTC type {} treated as type {CRTC_TYPE}", snapshot.crtc_type);
    }
    let model = cpc.config().model;
    if snapshot.version >= 2 {
        match CpcModel::from_snapshot_type(snapshot.cpc_type) {
            Some(taken_on) if taken_on != model => info!(
                "snapshot was taken on a {}, running on a {}",
                taken_on.name(),
                model.name()
            ),
            Some(_) => {}
            None => debug!("unknown CPC type {} in snapshot", snapshot.cpc_type),
        }
    }

    apply(cpc, &snapshot);
    Ok(())
}

fn apply(cpc: &mut Cpc, snapshot: &Snapshot) {
    cpc.reset();

    let s = &snapshot.cpu;
    let regs = &mut cpc.cpu_mut().regs;
    regs.a = s.a;
    regs.f = s.f;
    regs.b = s.b;
    regs.c = s.c;
    regs.d = s.d;
    regs.e = s.e;
    regs.h = s.h;
    regs.l = s.l;
    regs.a_alt = s.a_alt;
    regs.f_alt = s.f_alt;
    regs.b_alt = s.b_alt;
    regs.c_alt = s.c_alt;
    regs.d_alt = s.d_alt;
    regs.e_alt = s.e_alt;
    regs.h_alt = s.h_alt;
    regs.l_alt = s.l_alt;
    regs.r = s.r;
    regs.i = s.i;
    regs.iff1 = s.iff1;
    regs.iff2 = s.iff2;
    regs.ix = s.ix;
    regs.iy = s.iy;
    regs.sp = s.sp;
    regs.pc = s.pc;
    regs.im = s.im;

    let bus = cpc.bus_mut();

    bus.gate_array.restore(
        snapshot.ga_pen,
        &snapshot.ga_inks,
        snapshot.ga_rom_config,
        snapshot.ga_ram_config,
        snapshot.ga_int_counter,
        snapshot.int_request,
    );

    bus.crtc.select(snapshot.crtc_selected);
    for (reg, &value) in snapshot.crtc_registers.iter().enumerate() {
        bus.crtc.set_register(reg, value);
    }

    bus.memory.select_upper_rom(snapshot.rom_select);

    let [a, b, c, control] = snapshot.ppi;
    bus.ppi.restore(a, b, c, control);

    for (reg, &value) in snapshot.psg_registers.iter().enumerate() {
        bus.psg.set_register(reg, value);
    }
    bus.psg.select_register(snapshot.psg_selected);

    let ram = bus.memory.ram_mut();
    ram.fill(0);
    ram[..snapshot.ram.len()].copy_from_slice(&snapshot.ram);

    bus.fdc.set_motor(snapshot.fdd_motor);
    bus.remap();

    if snapshot.int_request {
        cpc.cpu_mut().interrupt();
    }
}

/// Capture the CPC's state as a version 3 snapshot.
#[must_use]
pub fn save_sna(cpc: &Cpc) -> Vec<u8> {
    capture(cpc).to_bytes()
}

/// Capture the CPC's state.
///
/// SNA has no halt flag. A halted CPU is saved with PC on the `HALT`
/// opcode so the restored machine halts again.
#[must_use]
pub fn capture(cpc: &Cpc) -> Snapshot {
    let r = &cpc.cpu().regs;
    let pc = if r.halted { r.pc.wrapping_sub(1) } else { r.pc };
    let bus = cpc.bus();
    let ga = &bus.gate_array;

    Snapshot {
        version: format_sna::WRITE_VERSION,
        cpu: SnaCpu {
            a: r.a,
            f: r.f,
            b: r.b,
            c: r.c,
            d: r.d,
            e: r.e,
            h: r.h,
            l: r.l,
            a_alt: r.a_alt,
            f_alt: r.f_alt,
            b_alt: r.b_alt,
            c_alt: r.c_alt,
            d_alt: r.d_alt,
            e_alt: r.e_alt,
            h_alt: r.h_alt,
            l_alt: r.l_alt,
            r: r.r,
            i: r.i,
            iff1: r.iff1,
            iff2: r.iff2,
            ix: r.ix,
            iy: r.iy,
            sp: r.sp,
            pc,
            im: r.im,
        },
        ga_pen: ga.pen(),
        ga_inks: *ga.inks(),
        ga_rom_config: ga.rom_config(),
        ga_ram_config: ga.ram_config(),
        crtc_selected: bus.crtc.selected(),
        crtc_registers: bus.crtc.registers(),
        rom_select: bus.memory.rom_select(),
        ppi: [
            bus.ppi.port_a(),
            bus.ppi.port_b(),
            bus.ppi.port_c(),
            bus.ppi.control(),
        ],
        psg_selected: bus.psg.selected_register(),
        psg_registers: bus.psg.registers(),
        cpc_type: cpc.config().model.snapshot_type(),
        fdd_motor: bus.fdc.motor(),
        crtc_type: CRTC_TYPE,
        ga_int_counter: ga.line_counter(),
        int_request: ga.int_request(),
        ram: bus.memory.ram().to_vec(),
    }
}
