use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pic18_dasm::{Disassembler, InstructionDecoder, ProgramMemory};

fn benchmark_listing(c: &mut Criterion) {
    let mut memory = ProgramMemory::new();
    // Programme factice : motif répétitif de 32 Ko
    let image: Vec<u8> = (0..0x8000u32).map(|i| (i.wrapping_mul(0x9E37_79B9) >> 24) as u8).collect();
    memory.write_block(0, &image);

    let disassembler = Disassembler::new(InstructionDecoder::pic18().unwrap());

    c.bench_function("listing_sequential_32k", |b| {
        b.iter(|| {
            disassembler
                .disassemble_memory(black_box(&memory), 0, 0x8000, false)
                .unwrap()
        })
    });

    c.bench_function("listing_parallel_32k", |b| {
        b.iter(|| {
            disassembler
                .disassemble_memory(black_box(&memory), 0, 0x8000, true)
                .unwrap()
        })
    });
}

criterion_group!(benches, benchmark_listing);
criterion_main!(benches);
