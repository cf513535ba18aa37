use chip::{chip8::Machine, resources::Rom};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::mock::StepRng;

/// A busy loop touching most of the instruction families.
///
/// ```text
/// 0x200: A000  I = 0
/// 0x202: 6105  V1 = 5
/// 0x204: 7001  V0 += 1
/// 0x206: 8014  V0 += V1
/// 0x208: C10F  V1 = rand & 0x0F
/// 0x20A: D015  draw glyph 0 at (V0, V1)
/// 0x20C: F033  BCD of V0 into I
/// 0x20E: A000  I = 0
/// 0x210: 1204  jump to 0x204
/// ```
const LOOP_PROGRAM: [u8; 18] = [
    0xA0, 0x00, 0x61, 0x05, 0x70, 0x01, 0x80, 0x14, 0xC1, 0x0F, 0xD0, 0x15, 0xF0, 0x33, 0xA0,
    0x00, 0x12, 0x04,
];

static BASE_ROM: once_cell::sync::Lazy<Rom> =
    once_cell::sync::Lazy::new(|| Rom::new("LOOP", &LOOP_PROGRAM));

/// will setup the default configured chip
fn get_default_chip() -> Machine {
    let mut chip = Machine::new().expect("The machine could not be allocated.");
    chip.set_rng(Box::new(StepRng::new(0x42, 0x13)));
    chip.load_rom(&BASE_ROM)
        .expect("The benchmark program does not fit.");
    chip
}

pub fn step_bench(c: &mut Criterion) {
    let mut chip = get_default_chip();
    c.bench_function("step_bench", |b| {
        b.iter(|| black_box(chip.step().expect("The benchmark program failed.")));
    });
}

pub fn print_bench(c: &mut Criterion) {
    let chip = get_default_chip();
    c.bench_function("print_bench", |b| {
        b.iter(|| {
            let _ = format!("{}", chip);
        });
    });
}

criterion_group!(benches, step_bench, print_bench);
criterion_main!(benches);
